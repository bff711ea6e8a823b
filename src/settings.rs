use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_SCRAPE_URL: &str = "https://arxiv.org/list/cs.CL/recent";
const DEFAULT_DATABASE_PATH: &str = "data/arxiv_data.sqlite";
const DEFAULT_TABLE_NAME: &str = "arxiv_articles";
const DEFAULT_CSV_PATH: &str = "data/arxiv_data.csv";
const DEFAULT_REQUEST_DELAY: f64 = 0.2;
const DOTENV_FILE: &str = ".env";

#[derive(Debug, Deserialize)]
struct RawSettings {
    scrape_url: String,
    database_path: PathBuf,
    table_name: String,
    csv_path: PathBuf,
    request_delay: f64,
}

/// Process settings, built once in `main` and passed down by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub scrape_url: Url,
    pub database_path: PathBuf,
    pub table_name: String,
    pub csv_path: PathBuf,
    /// Pause between consecutive detail-page requests.
    pub request_delay: Duration,
}

impl Settings {
    /// Read `SCRAPE_URL`, `DATABASE_PATH`, `TABLE_NAME`, `CSV_PATH` and
    /// `REQUEST_DELAY` from `./.env` and the process environment, falling
    /// back to defaults. Process variables override the file.
    pub fn load() -> Result<Self> {
        let process = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::load_with(Path::new(DOTENV_FILE), process)
    }

    fn load_with(
        dotenv: &Path,
        process: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut vars = HashMap::new();
        if dotenv.is_file() {
            let entries = dotenvy::from_path_iter(dotenv)
                .map_err(|e| Error::Config(format!("{}: {}", dotenv.display(), e)))?;
            for entry in entries {
                let (key, value) =
                    entry.map_err(|e| Error::Config(format!("{}: {}", dotenv.display(), e)))?;
                vars.insert(key.to_uppercase(), value);
            }
            debug!("Loaded {} variables from {:?}", vars.len(), dotenv);
        }
        vars.extend(process.into_iter().map(|(k, v)| (k.to_uppercase(), v)));

        Self::from_env(Environment::default().try_parsing(true).source(Some(vars)))
    }

    fn from_env(env: Environment) -> Result<Self> {
        let raw: RawSettings = Config::builder()
            .set_default("scrape_url", DEFAULT_SCRAPE_URL)?
            .set_default("database_path", DEFAULT_DATABASE_PATH)?
            .set_default("table_name", DEFAULT_TABLE_NAME)?
            .set_default("csv_path", DEFAULT_CSV_PATH)?
            .set_default("request_delay", DEFAULT_REQUEST_DELAY)?
            .add_source(env)
            .build()?
            .try_deserialize()?;
        raw.validate()
    }
}

impl RawSettings {
    fn validate(self) -> Result<Settings> {
        let scrape_url = Url::parse(&self.scrape_url)
            .map_err(|e| Error::Config(format!("SCRAPE_URL '{}': {}", self.scrape_url, e)))?;

        if !is_sql_identifier(&self.table_name) {
            return Err(Error::Config(format!(
                "TABLE_NAME '{}' must be letters, digits and underscores, not starting with a digit",
                self.table_name
            )));
        }

        let request_delay = Duration::try_from_secs_f64(self.request_delay).map_err(|_| {
            Error::Config(format!(
                "REQUEST_DELAY must be a finite, non-negative number of seconds (got {})",
                self.request_delay
            ))
        })?;

        Ok(Settings {
            scrape_url,
            database_path: self.database_path,
            table_name: self.table_name,
            csv_path: self.csv_path,
            request_delay,
        })
    }
}

/// The table name is interpolated into SQL, so only plain identifiers pass.
fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_env(Environment::default().try_parsing(true).source(Some(map)))
    }

    #[test]
    fn defaults_apply() {
        let s = from_vars(&[]).unwrap();
        assert_eq!(s.scrape_url.as_str(), DEFAULT_SCRAPE_URL);
        assert_eq!(s.table_name, "arxiv_articles");
        assert_eq!(s.database_path, PathBuf::from("data/arxiv_data.sqlite"));
        assert_eq!(s.csv_path, PathBuf::from("data/arxiv_data.csv"));
        assert_eq!(s.request_delay, Duration::from_millis(200));
    }

    #[test]
    fn environment_overrides() {
        let s = from_vars(&[
            ("SCRAPE_URL", "https://arxiv.org/list/cs.LG/recent"),
            ("TABLE_NAME", "papers"),
            ("REQUEST_DELAY", "1.5"),
        ])
        .unwrap();
        assert_eq!(s.scrape_url.as_str(), "https://arxiv.org/list/cs.LG/recent");
        assert_eq!(s.table_name, "papers");
        assert_eq!(s.request_delay, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_unsafe_table_name() {
        assert!(matches!(
            from_vars(&[("TABLE_NAME", "papers; DROP TABLE x")]),
            Err(Error::Config(_))
        ));
        assert!(!is_sql_identifier("1papers"));
        assert!(is_sql_identifier("_papers_2024"));
    }

    #[test]
    fn dotenv_file_fills_in_and_process_env_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# local overrides\nTABLE_NAME=from_file\nREQUEST_DELAY=0.5\nCSV_PATH=\"out/papers.csv\"\n",
        )
        .unwrap();

        let process = vec![("REQUEST_DELAY".to_string(), "2".to_string())];
        let s = Settings::load_with(&path, process).unwrap();
        assert_eq!(s.table_name, "from_file");
        assert_eq!(s.csv_path, PathBuf::from("out/papers.csv"));
        assert_eq!(s.request_delay, Duration::from_secs(2));
        assert_eq!(s.scrape_url.as_str(), DEFAULT_SCRAPE_URL);
    }

    #[test]
    fn missing_dotenv_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_with(&dir.path().join(".env"), Vec::new()).unwrap();
        assert_eq!(s.table_name, DEFAULT_TABLE_NAME);
    }

    #[test]
    fn malformed_dotenv_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "TABLE_NAME=papers\nthis line has no equals sign\n").unwrap();
        assert!(matches!(
            Settings::load_with(&path, Vec::new()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_negative_delay() {
        assert!(matches!(
            from_vars(&[("REQUEST_DELAY", "-1")]),
            Err(Error::Config(_))
        ));
    }
}
