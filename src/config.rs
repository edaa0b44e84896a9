use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::bucket::normalize_bucket_name;

/// Variables without which no store call is attempted.
pub const REQUIRED_VARS: [&str; 4] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "S3_ENDPOINT",
    "BUCKET",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub s3: S3Config,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Clone)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub bucket_raw: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    pub force_path_style: bool,
    pub presign_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Empty
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        Ok(Config {
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: var("PORT")
                    .unwrap_or_else(|| "3000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                static_dir: PathBuf::from(var("STATIC_DIR").unwrap_or_else(|| "public".to_string())),
            },
            s3: S3Config {
                endpoint: var("S3_ENDPOINT"),
                bucket_raw: var("BUCKET"),
                access_key_id: var("AWS_ACCESS_KEY_ID"),
                secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
                region: var("AWS_REGION").unwrap_or_else(|| "eu-central-1".to_string()),
                force_path_style: var("S3_FORCE_PATH_STYLE")
                    .unwrap_or_else(|| "true".to_string())
                    .eq_ignore_ascii_case("true"),
                presign_ttl_secs: var("PRESIGN_TTL_SECS")
                    .unwrap_or_else(|| "3600".to_string())
                    .parse()
                    .context("PRESIGN_TTL_SECS must be a number of seconds")?,
                request_timeout_secs: var("S3_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .context("S3_REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            },
        })
    }
}

impl S3Config {
    /// Names of the required variables that are unset, in a fixed order.
    pub fn missing(&self) -> Vec<&'static str> {
        let present = [
            self.access_key_id.is_some(),
            self.secret_access_key.is_some(),
            self.endpoint.is_some(),
            self.bucket_raw.is_some(),
        ];

        REQUIRED_VARS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_configured(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn bucket_name(&self) -> String {
        normalize_bucket_name(self.bucket_raw.as_deref().unwrap_or_default())
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Keeps the secret key out of logs.
impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("bucket_raw", &self.bucket_raw)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .field("presign_ttl_secs", &self.presign_ttl_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.static_dir, PathBuf::from("public"));
        assert_eq!(config.s3.region, "eu-central-1");
        assert!(config.s3.force_path_style);
        assert_eq!(config.s3.presign_ttl(), Duration::from_secs(3600));
        assert_eq!(config.s3.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn reports_every_missing_variable_in_order() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.s3.missing(), REQUIRED_VARS.to_vec());
        assert!(!config.s3.is_configured());

        let config = config_from(&[
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("S3_ENDPOINT", "https://s3.example.com"),
        ])
        .unwrap();
        assert_eq!(config.s3.missing(), vec!["AWS_SECRET_ACCESS_KEY", "BUCKET"]);
    }

    #[test]
    fn empty_values_count_as_missing() {
        let config = config_from(&[
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("S3_ENDPOINT", "https://s3.example.com"),
            ("BUCKET", ""),
        ])
        .unwrap();
        assert_eq!(config.s3.missing(), vec!["BUCKET"]);
        assert_eq!(config.s3.bucket_name(), "");
    }

    #[test]
    fn fully_configured_normalizes_bucket() {
        let config = config_from(&[
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("S3_ENDPOINT", "https://s3.eu-central-1.s4.mega.io"),
            ("BUCKET", "mybucket.s3.eu-central-1.s4.mega.io"),
            ("AWS_REGION", "us-east-1"),
            ("S3_FORCE_PATH_STYLE", "FALSE"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert!(config.s3.is_configured());
        assert_eq!(config.s3.bucket_name(), "mybucket");
        assert_eq!(config.s3.region, "us-east-1");
        assert!(!config.s3.force_path_style);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn path_style_accepts_any_case_of_true() {
        let config = config_from(&[("S3_FORCE_PATH_STYLE", "True")]).unwrap();
        assert!(config.s3.force_path_style);

        let config = config_from(&[("S3_FORCE_PATH_STYLE", "yes")]).unwrap();
        assert!(!config.s3.force_path_style);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config_from(&[("PORT", "not-a-port")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(config_from(&[("PRESIGN_TTL_SECS", "-1")]).is_err());
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = config_from(&[("AWS_SECRET_ACCESS_KEY", "hunter2")]).unwrap();
        let rendered = format!("{:?}", config.s3);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
