use std::fs;
use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::error::Result;
use crate::model::Record;

/// Write `records` as CSV with a header row, replacing any existing file.
pub fn write_csv(records: &[Record], path: &Path) -> Result<usize> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    // Header is written by hand so an empty batch still gets one.
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(Record::FIELDS)?;
    for r in records {
        writer.serialize(r)?;
    }
    writer.flush()?;

    info!("Exported {} records to {:?}", records.len(), path);
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str, abstract_text: &str) -> Record {
        Record::new(
            id,
            title,
            "Ada Lovelace, Alan Turing",
            "Computation and Language (cs.CL), Machine Learning (cs.LG)",
            abstract_text,
            &format!("https://arxiv.org/abs/{}", id),
            "2024-01-03",
        )
        .unwrap()
    }

    #[test]
    fn writes_header_plus_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("arxiv.csv");
        let batch = vec![
            record("2401.00001", "One, with comma", "Line one.\nLine \"two\"."),
            record("2401.00002", "Two", "Plain."),
        ];

        assert_eq!(write_csv(&batch, &path).unwrap(), 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), Record::FIELDS.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == Record::FIELDS.len()));
        assert_eq!(&rows[0][1], "One, with comma");
        assert_eq!(&rows[0][4], "Line one.\nLine \"two\".");
    }

    #[test]
    fn line_count_is_records_plus_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arxiv.csv");
        let batch: Vec<Record> = ["2401.00001", "2401.00002", "2401.00003"]
            .iter()
            .map(|id| record(id, "Title", "Plain."))
            .collect();

        write_csv(&batch, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), batch.len() + 1);
    }

    #[test]
    fn empty_batch_writes_header_only_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arxiv.csv");
        std::fs::write(&path, "stale contents\nmore\nlines\n").unwrap();

        assert_eq!(write_csv(&[], &path).unwrap(), 0);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), Record::FIELDS.join(","));
    }
}
