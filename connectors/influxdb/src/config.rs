//! InfluxDB connection configuration.

use std::time::Duration;

use tidewire_engine::Variables;
use tidewire_types::ConnectorError;

/// | Variable | Default |
/// |----------|---------|
/// | `URL` | required, e.g. `http://localhost:8086` |
/// | `TOKEN` | required |
/// | `ORGANIZATION` | required |
/// | `BUCKET` | required |
/// | `TIMEOUT` | `10` (seconds per request) |
#[derive(Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub organization: String,
    pub bucket: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("token", &"***")
            .field("organization", &self.organization)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InfluxConfig {
    /// # Errors
    ///
    /// Fatal config error for missing or invalid variables.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        let url = vars.require("URL")?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                format!("URL must start with http:// or https://, got '{url}'"),
            ));
        }
        let timeout_secs: u64 = vars.parse_or("TIMEOUT", 10)?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token: vars.require("TOKEN")?.to_string(),
            organization: vars.require("ORGANIZATION")?.to_string(),
            bucket: vars.require("BUCKET")?.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub(crate) fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("URL", "http://influx:8086/"),
            ("TOKEN", "s3cr3t"),
            ("ORGANIZATION", "acme"),
            ("BUCKET", "sensors"),
        ]
    }

    #[test]
    fn parses_and_trims_url() {
        let config = InfluxConfig::from_variables(&Variables::from_pairs(base())).unwrap();
        assert_eq!(config.write_url(), "http://influx:8086/api/v2/write");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn token_hidden_from_debug() {
        let config = InfluxConfig::from_variables(&Variables::from_pairs(base())).unwrap();
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }

    #[test]
    fn bucket_required() {
        let vars = Variables::from_pairs(base().into_iter().filter(|(k, _)| *k != "BUCKET"));
        let err = InfluxConfig::from_variables(&vars).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.message.contains("BUCKET"));
    }

    #[test]
    fn url_scheme_checked() {
        let mut pairs = base();
        pairs[0] = ("URL", "influx:8086");
        let err = InfluxConfig::from_variables(&Variables::from_pairs(pairs)).unwrap_err();
        assert_eq!(err.code, "INVALID_CONFIG");
    }
}
