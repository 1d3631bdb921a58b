use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use serde::Deserialize;
use std::path::Path;

use crate::error::AppError;
use crate::report::ReportFormat;

#[derive(Parser, Debug)]
#[command(name = "login-geo")]
#[command(version = "0.1.0")]
#[command(about = "Geolocates login-history events and aggregates per-country login statistics", long_about = None)]
pub struct Args {
    /// SQLite login-history database path
    #[arg(short = 'd', long, env = "LOGIN_GEO_DATABASE")]
    pub database: Option<String>,

    /// MaxMind City database path
    #[arg(short = 'g', long, env = "LOGIN_GEO_GEOIP_DB")]
    pub geoip_db: Option<String>,

    /// Start date (YYYY-MM-DD, defaults to yesterday)
    #[arg(short = 's', long, env = "LOGIN_GEO_START_DATE")]
    pub start_date: Option<NaiveDate>,

    /// End date (YYYY-MM-DD, defaults to today)
    #[arg(short = 'e', long, env = "LOGIN_GEO_END_DATE")]
    pub end_date: Option<NaiveDate>,

    /// Only include logins for this user
    #[arg(short = 'u', long, env = "LOGIN_GEO_USER")]
    pub user_name: Option<String>,

    /// Report output format
    #[arg(short = 'f', long, env = "LOGIN_GEO_FORMAT", value_enum, default_value = "json")]
    pub format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(short = 'o', long, env = "LOGIN_GEO_OUTPUT")]
    pub output: Option<String>,

    /// Optional TOML config file
    #[arg(short = 'c', long, env = "LOGIN_GEO_CONFIG", default_value = "login-geo.toml")]
    pub config: String,

    /// Verbose output
    #[arg(short = 'v', long, env = "LOGIN_GEO_VERBOSE")]
    pub verbose: bool,
}

/// Optional file-based configuration; command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database: Option<String>,
    pub geoip_db: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_name: Option<String>,
    pub format: Option<ReportFormat>,
    pub output: Option<String>,
    pub verbose: Option<bool>,
}

impl Args {
    /// Overlays the config file onto any flags not set on the command line.
    /// A missing config file is fine; a malformed one is an error.
    pub fn merge_with_config(mut self) -> Result<Self, AppError> {
        if !Path::new(&self.config).exists() {
            return Ok(self);
        }

        let text = std::fs::read_to_string(&self.config)?;
        let cfg: FileConfig = toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", self.config, e)))?;

        self.database = self.database.or(cfg.database);
        self.geoip_db = self.geoip_db.or(cfg.geoip_db);
        self.start_date = self.start_date.or(cfg.start_date);
        self.end_date = self.end_date.or(cfg.end_date);
        self.user_name = self.user_name.or(cfg.user_name);
        self.output = self.output.or(cfg.output);
        if let Some(format) = cfg.format {
            // The flag default is Json; an explicit file setting wins over it.
            if self.format == ReportFormat::Json {
                self.format = format;
            }
        }
        self.verbose = self.verbose || cfg.verbose.unwrap_or(false);

        Ok(self)
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or("login_history.db")
    }

    pub fn geoip_db(&self) -> &str {
        self.geoip_db.as_deref().unwrap_or("GeoLite2-City.mmdb")
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
            .unwrap_or_else(|| Local::now().date_naive() - Duration::days(1))
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn bare_args(config: &str) -> Args {
        Args {
            database: None,
            geoip_db: None,
            start_date: None,
            end_date: None,
            user_name: None,
            format: ReportFormat::Json,
            output: None,
            config: config.to_string(),
            verbose: false,
        }
    }

    #[test]
    fn test_missing_config_file_is_ok() {
        let args = bare_args("/nonexistent/login-geo.toml").merge_with_config().unwrap();
        assert_eq!(args.database(), "login_history.db");
        assert_eq!(args.geoip_db(), "GeoLite2-City.mmdb");
    }

    #[test]
    fn test_config_file_fills_unset_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database = \"history.db\"\ngeoip_db = \"city.mmdb\"\nstart_date = \"2024-06-12\"\nformat = \"csv\"\nverbose = true"
        )
        .unwrap();

        let args = bare_args(file.path().to_str().unwrap()).merge_with_config().unwrap();
        assert_eq!(args.database(), "history.db");
        assert_eq!(args.geoip_db(), "city.mmdb");
        assert_eq!(args.start_date(), NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
        assert_eq!(args.format, ReportFormat::Csv);
        assert!(args.verbose);
    }

    #[test]
    fn test_command_line_wins_over_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database = \"from_config.db\"").unwrap();

        let mut args = bare_args(file.path().to_str().unwrap());
        args.database = Some("from_cli.db".to_string());
        let args = args.merge_with_config().unwrap();
        assert_eq!(args.database(), "from_cli.db");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml [").unwrap();

        let err = bare_args(file.path().to_str().unwrap())
            .merge_with_config()
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
