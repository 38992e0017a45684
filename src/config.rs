use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// `mysql://…`, or `sqlite://…` when built with the `sqlite` feature.
    pub url: String,
}

/// Identity of the user on whose behalf transitions are submitted.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Session {
    pub user: Uuid,
}

impl Config {
    pub fn load(file_name: impl AsRef<Path>) -> Result<Config> {
        let file_name = file_name.as_ref();
        let content = std::fs::read_to_string(file_name)
            .wrap_err_with(|| format!("cannot load configuration file {}", file_name.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Config> {
        toml::from_str(content).wrap_err("cannot parse configuration file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(
            r#"
            [database]
            url = "mysql://projects@localhost/projects"

            [session]
            user = "0b7e4c1e-5b0c-4f57-9a0e-3f0f6c2a9d11"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.url, "mysql://projects@localhost/projects");
        assert_eq!(
            config.session.user,
            Uuid::parse_str("0b7e4c1e-5b0c-4f57-9a0e-3f0f6c2a9d11").unwrap()
        );
    }

    #[test]
    fn test_reject_incomplete_config() {
        assert!(Config::parse("[database]\nurl = \"mysql://localhost/x\"\n").is_err());
        assert!(Config::parse("[database]\nurl = 3\n[session]\nuser = \"nope\"\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/projlife.toml").unwrap_err();
        assert!(err.to_string().contains("cannot load configuration file"));
    }
}
