use std::fs;
use std::path::Path;

use rusqlite::{Connection, Row};
use tracing::debug;

use crate::error::Result;
use crate::model::Record;

/// Exclusive handle on the record table. The connection closes when this drops.
pub struct Store {
    conn: Connection,
    table: String,
}

impl Store {
    /// Open (creating if needed) the database file and ensure the table exists.
    /// `table` must already be a validated SQL identifier.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!("Opened store {:?} (table {})", path, table);
        Self::with_connection(conn, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        let store = Store {
            conn,
            table: table.to_string(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {} (
                identifier      TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                authors         TEXT NOT NULL,
                subjects        TEXT NOT NULL,
                abstract        TEXT NOT NULL,
                link            TEXT NOT NULL,
                submission_date TEXT NOT NULL
            );
            ",
            self.table
        ))?;
        Ok(())
    }

    /// Insert every record whose identifier is not stored yet; existing rows win.
    /// Returns how many rows were actually inserted. The batch is all-or-nothing.
    pub fn upsert(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(identifier) DO NOTHING",
                self.table,
                Record::FIELDS.join(", ")
            ))?;
            for r in records {
                count += stmt.execute(r.values())?;
            }
        }
        // An early return above drops `tx`, which rolls the whole batch back.
        tx.commit()?;
        Ok(count)
    }

    pub fn count(&self) -> Result<usize> {
        let n: usize = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |r| r.get(0))?;
        Ok(n)
    }

    #[cfg(test)]
    pub fn get(&self, identifier: &str) -> Result<Option<Record>> {
        use rusqlite::OptionalExtension;

        let sql = format!("{} WHERE identifier = ?1", self.select_sql());
        let row = self
            .conn
            .query_row(&sql, [identifier], read_row)
            .optional()?;
        row.map(into_record).transpose()
    }

    /// Every stored record in insertion order.
    pub fn all(&self) -> Result<Vec<Record>> {
        let sql = format!("{} ORDER BY rowid", self.select_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_record).collect()
    }

    pub fn latest_submission(&self) -> Result<Option<String>> {
        let latest: Option<String> = self.conn.query_row(
            &format!("SELECT MAX(submission_date) FROM {}", self.table),
            [],
            |r| r.get(0),
        )?;
        Ok(latest)
    }

    fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", Record::FIELDS.join(", "), self.table)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        debug!("Closing store (table {})", self.table);
    }
}

type RawRow = [String; 7];

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok([
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ])
}

fn into_record(row: RawRow) -> Result<Record> {
    let [identifier, title, authors, subjects, abstract_text, link, date] = row;
    Ok(Record::new(
        &identifier,
        &title,
        &authors,
        &subjects,
        &abstract_text,
        &link,
        &date,
    )?)
}
