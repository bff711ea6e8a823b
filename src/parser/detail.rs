use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{Error, Result};
use crate::html;

/// `[Submitted on 3 Jan 2024 (v1), last revised ...]` → `3 Jan 2024`
static SUBMITTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[?\s*Submitted on\s+([^(\]]+)").unwrap());

const DATELINE_FORMAT: &str = "%d %b %Y";

pub struct Detail {
    pub submission_date: NaiveDate,
    pub abstract_text: String,
}

pub fn parse_detail(markup: &str) -> Result<Detail> {
    let doc = html::parse(markup);

    let dateline = html::text(html::require(&doc, &html::DATELINE)?);
    let submission_date = parse_dateline(&dateline)?;

    let block = html::require(&doc, &html::ABSTRACT_BLOCK)?;
    let abstract_text = html::text_without(block, &html::DESCRIPTOR);

    Ok(Detail {
        submission_date,
        abstract_text,
    })
}

pub fn parse_dateline(dateline: &str) -> Result<NaiveDate> {
    let raw = SUBMITTED_RE
        .captures(dateline.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(',').trim())
        .ok_or_else(|| Error::markup("unrecognized dateline", dateline))?;

    NaiveDate::parse_from_str(raw, DATELINE_FORMAT)
        .map_err(|e| Error::markup("bad submission date", format!("'{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detail_fixture() {
        let markup = std::fs::read_to_string("tests/fixtures/detail.html").unwrap();
        let d = parse_detail(&markup).unwrap();
        assert_eq!(d.submission_date.to_string(), "2024-01-03");
        assert!(d.abstract_text.starts_with("We present a survey"));
        assert!(!d.abstract_text.contains("Abstract:"));
    }

    #[test]
    fn dateline_single_digit_day() {
        let d = parse_dateline("[Submitted on 3 Jan 2024]").unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), "2024-01-03");
    }

    #[test]
    fn dateline_with_revision_suffix() {
        let d = parse_dateline("[Submitted on 11 Dec 2023 (v1), last revised 2 Jan 2024 (this version, v2)]")
            .unwrap();
        assert_eq!(d.to_string(), "2023-12-11");
    }

    #[test]
    fn malformed_date_is_markup_error() {
        assert!(matches!(
            parse_dateline("[Submitted on 2024-01-03]"),
            Err(Error::Markup { .. })
        ));
        assert!(matches!(
            parse_dateline("[Submitted on 32 Foo 2024]"),
            Err(Error::Markup { .. })
        ));
        assert!(matches!(parse_dateline("Posted yesterday"), Err(Error::Markup { .. })));
    }

    #[test]
    fn missing_abstract_fails() {
        let markup = r#"<div class="dateline">[Submitted on 3 Jan 2024]</div>"#;
        assert!(matches!(parse_detail(markup), Err(Error::Markup { .. })));
    }
}
