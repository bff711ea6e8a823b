use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{context}: {detail}")]
    Markup { context: &'static str, detail: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("store error: {0}")]
    Persistence(#[from] rusqlite::Error),
    #[error("export error: {0}")]
    Export(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn markup(context: &'static str, detail: impl Into<String>) -> Self {
        Error::Markup {
            context,
            detail: detail.into(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field '{0}' must not be empty")]
    Empty(&'static str),
    #[error("link '{link}' is not an absolute http(s) URL: {reason}")]
    InvalidLink { link: String, reason: String },
    #[error("submission date '{0}' is not in YYYY-MM-DD form")]
    InvalidDate(String),
}
