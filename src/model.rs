use chrono::NaiveDate;
use serde::Serialize;
use url::Url;

use crate::error::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A fully enriched listing entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    identifier: String,
    title: String,
    authors: String,
    subjects: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
    link: String,
    submission_date: String,
}

impl Record {
    /// Column names in declaration order; drives the store schema and CSV header.
    pub const FIELDS: [&'static str; 7] = [
        "identifier",
        "title",
        "authors",
        "subjects",
        "abstract",
        "link",
        "submission_date",
    ];

    pub fn new(
        identifier: &str,
        title: &str,
        authors: &str,
        subjects: &str,
        abstract_text: &str,
        link: &str,
        submission_date: &str,
    ) -> Result<Self, ValidationError> {
        let identifier = required("identifier", identifier)?;
        let title = required("title", &normalize_whitespace(title))?;
        let subjects = required("subjects", subjects)?;
        let abstract_text = required("abstract", abstract_text)?;
        let link = validate_link(link)?;
        let submission_date = validate_date(submission_date)?;

        Ok(Record {
            identifier,
            title,
            authors: authors.trim().to_string(),
            subjects,
            abstract_text,
            link,
            submission_date,
        })
    }

    /// Field values in the same order as [`Record::FIELDS`].
    pub fn values(&self) -> [&str; 7] {
        [
            &self.identifier,
            &self.title,
            &self.authors,
            &self.subjects,
            &self.abstract_text,
            &self.link,
            &self.submission_date,
        ]
    }
}

#[cfg(test)]
impl Record {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &str {
        &self.authors
    }

    pub fn subjects(&self) -> &str {
        &self.subjects
    }

    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn submission_date(&self) -> &str {
        &self.submission_date
    }
}

/// What the listing page knows about an entry before its detail page is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialRecord {
    pub identifier: String,
    pub link: Url,
    pub title: String,
    pub authors: Vec<String>,
    pub subjects: Vec<String>,
}

impl PartialRecord {
    pub fn complete(
        &self,
        submission_date: NaiveDate,
        abstract_text: &str,
    ) -> Result<Record, ValidationError> {
        Record::new(
            &self.identifier,
            &self.title,
            &self.authors.join(", "),
            &self.subjects.join(", "),
            abstract_text,
            self.link.as_str(),
            &submission_date.format(DATE_FORMAT).to_string(),
        )
    }
}

/// Collapse every run of whitespace (including newlines) into a single space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(value.to_string())
    }
}

fn validate_link(link: &str) -> Result<String, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidLink {
        link: link.to_string(),
        reason,
    };
    let url = Url::parse(link.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    Ok(url.to_string())
}

fn validate_date(date: &str) -> Result<String, ValidationError> {
    let date = date.trim();
    match NaiveDate::parse_from_str(date, DATE_FORMAT) {
        // Reject unpadded forms like 2024-1-3 that chrono would otherwise accept.
        Ok(parsed) if parsed.format(DATE_FORMAT).to_string() == date => Ok(date.to_string()),
        _ => Err(ValidationError::InvalidDate(date.to_string())),
    }
}
