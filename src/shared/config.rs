//! Application configuration. Storage and report paths.

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_DB_FILE: &str = "school.db";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding the database file. Read from SCHOOL_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Database file name inside `data_dir`. Read from SCHOOL_DB_FILE.
    #[serde(default)]
    pub db_file: Option<String>,

    /// Where exported reports go. Defaults to `<data_dir>/reports`. Read from SCHOOL_REPORTS_DIR.
    #[serde(default)]
    pub reports_dir: Option<String>,
}

impl AppConfig {
    /// Environment (`SCHOOL_*`, `.env` included) plus an optional file named by SCHOOL_CONFIG.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("SCHOOL_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(config::Environment::with_prefix("SCHOOL"));
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    pub fn db_file_or_default(&self) -> &str {
        self.db_file.as_deref().unwrap_or(DEFAULT_DB_FILE)
    }

    pub fn reports_dir_or_default(&self) -> PathBuf {
        self.reports_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir_or_default().join("reports"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.data_dir_or_default(), PathBuf::from("./data"));
        assert_eq!(cfg.db_file_or_default(), "school.db");
        assert_eq!(cfg.reports_dir_or_default(), PathBuf::from("./data/reports"));
    }

    #[test]
    fn reports_dir_follows_data_dir() {
        let cfg = AppConfig {
            data_dir: Some("/srv/school".into()),
            ..Default::default()
        };
        assert_eq!(
            cfg.reports_dir_or_default(),
            PathBuf::from("/srv/school/reports")
        );
    }
}
