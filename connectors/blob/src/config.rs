//! Store selection and credentials.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use object_store::ObjectStore;
use tidewire_engine::Variables;
use tidewire_types::ConnectorError;

/// Backend selected by `PROVIDER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `BUCKET`, `REGION`, optional `ACCESS_KEY`/`SECRET_KEY` and `ENDPOINT`.
    S3 {
        bucket: String,
        region: String,
        access_key: Option<String>,
        secret_key: Option<String>,
        endpoint: Option<String>,
    },
    /// `BUCKET`, optional `JSON_KEY_FILE` holding the service account JSON.
    Gcs {
        bucket: String,
        service_account_key: Option<String>,
    },
    /// `ACCOUNT`, `CONTAINER`, optional `ACCESS_KEY`.
    Azure {
        account: String,
        container: String,
        access_key: Option<String>,
    },
    /// `ROOT` directory, created if missing.
    Local { root: PathBuf },
}

/// | Variable | Default |
/// |----------|---------|
/// | `PROVIDER` | required: `s3`, `gcs`, `azure` or `local` |
/// | `PATH_PREFIX` | empty |
/// | `TIMEOUT` | `10` (seconds per upload) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobConfig {
    pub provider: Provider,
    pub path_prefix: String,
    pub timeout: Duration,
}

fn optional(vars: &Variables, name: &str) -> Option<String> {
    vars.get(name).map(str::to_string)
}

impl BlobConfig {
    /// # Errors
    ///
    /// Fatal config error for an unknown provider or a missing variable.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        let provider = match vars.require("PROVIDER")?.to_ascii_lowercase().as_str() {
            "s3" => Provider::S3 {
                bucket: vars.require("BUCKET")?.to_string(),
                region: vars.get_or("REGION", "us-east-1").to_string(),
                access_key: optional(vars, "ACCESS_KEY"),
                secret_key: optional(vars, "SECRET_KEY"),
                endpoint: optional(vars, "ENDPOINT"),
            },
            "gcs" => Provider::Gcs {
                bucket: vars.require("BUCKET")?.to_string(),
                service_account_key: optional(vars, "JSON_KEY_FILE"),
            },
            "azure" => Provider::Azure {
                account: vars.require("ACCOUNT")?.to_string(),
                container: vars.require("CONTAINER")?.to_string(),
                access_key: optional(vars, "ACCESS_KEY"),
            },
            "local" => Provider::Local {
                root: PathBuf::from(vars.require("ROOT")?),
            },
            other => {
                return Err(ConnectorError::config(
                    "INVALID_CONFIG",
                    format!("Unknown PROVIDER '{other}', expected s3, gcs, azure or local"),
                ))
            }
        };
        let timeout_secs: u64 = vars.parse_or("TIMEOUT", 10)?;
        Ok(Self {
            provider,
            path_prefix: vars.get_or("PATH_PREFIX", "").to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Build the store client. Client construction does no I/O apart from
    /// creating the local root, so failures here are configuration errors.
    ///
    /// # Errors
    ///
    /// Fatal config error when the builder rejects the settings.
    pub fn build_store(&self) -> Result<Arc<dyn ObjectStore>, ConnectorError> {
        let setup = |backend: &str, e: &dyn std::fmt::Display| {
            ConnectorError::config(
                "CLIENT_SETUP_FAILED",
                format!("Failed to initialise {backend} client: {e}"),
            )
        };

        match &self.provider {
            Provider::S3 {
                bucket,
                region,
                access_key,
                secret_key,
                endpoint,
            } => {
                use object_store::aws::AmazonS3Builder;

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_region(region);
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                if let (Some(key), Some(secret)) = (access_key, secret_key) {
                    builder = builder
                        .with_access_key_id(key)
                        .with_secret_access_key(secret);
                }
                let store = builder.build().map_err(|e| setup("S3", &e))?;
                Ok(Arc::new(store))
            }
            Provider::Gcs {
                bucket,
                service_account_key,
            } => {
                use object_store::gcp::GoogleCloudStorageBuilder;

                let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(bucket);
                if let Some(key) = service_account_key {
                    builder = builder.with_service_account_key(key);
                }
                let store = builder.build().map_err(|e| setup("GCS", &e))?;
                Ok(Arc::new(store))
            }
            Provider::Azure {
                account,
                container,
                access_key,
            } => {
                use object_store::azure::MicrosoftAzureBuilder;

                let mut builder = MicrosoftAzureBuilder::new()
                    .with_account(account)
                    .with_container_name(container);
                if let Some(key) = access_key {
                    builder = builder.with_access_key(key);
                }
                let store = builder.build().map_err(|e| setup("Azure Storage", &e))?;
                Ok(Arc::new(store))
            }
            Provider::Local { root } => {
                use object_store::local::LocalFileSystem;

                std::fs::create_dir_all(root).map_err(|e| setup("local storage", &e))?;
                let store =
                    LocalFileSystem::new_with_prefix(root).map_err(|e| setup("local storage", &e))?;
                Ok(Arc::new(store))
            }
        }
    }
}
