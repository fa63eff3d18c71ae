//! Blob upload sink.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tidewire_engine::{Adapter, SinkAdapter, Variables};
use tidewire_types::{ConnectorError, Record};

use crate::config::BlobConfig;
use crate::error::classify;

enum Target {
    Configured(BlobConfig),
    Fixed(Arc<dyn ObjectStore>),
}

/// Uploads the file named by each record's `blob` field.
///
/// The store client is the connection handle: it is built on connect and
/// rebuilt after a recoverable upload failure.
pub struct BlobSink {
    target: Target,
    path_prefix: String,
    timeout: Duration,
}

impl BlobSink {
    pub fn new(config: BlobConfig) -> Self {
        Self {
            path_prefix: config.path_prefix.clone(),
            timeout: config.timeout,
            target: Target::Configured(config),
        }
    }

    /// Upload into an existing store instead of building one from config.
    pub fn with_store(store: Arc<dyn ObjectStore>, path_prefix: impl Into<String>) -> Self {
        Self {
            target: Target::Fixed(store),
            path_prefix: path_prefix.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// # Errors
    ///
    /// Fatal config error for missing or invalid variables.
    pub fn from_variables(vars: &Variables) -> Result<Self, ConnectorError> {
        BlobConfig::from_variables(vars).map(Self::new)
    }

    fn object_path(&self, file_name: &str) -> ObjectPath {
        let prefix = self.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            ObjectPath::from(file_name)
        } else {
            ObjectPath::from(format!("{prefix}/{file_name}"))
        }
    }
}

impl Adapter for BlobSink {
    type Handle = Arc<dyn ObjectStore>;

    fn name(&self) -> &str {
        "blob"
    }

    async fn connect(&mut self) -> Result<Arc<dyn ObjectStore>, ConnectorError> {
        match &self.target {
            Target::Configured(config) => config.build_store(),
            Target::Fixed(store) => Ok(Arc::clone(store)),
        }
    }

    async fn disconnect(&mut self, handle: Arc<dyn ObjectStore>) {
        drop(handle);
    }
}

impl SinkAdapter for BlobSink {
    async fn put_one(
        &mut self,
        handle: &mut Arc<dyn ObjectStore>,
        record: &Record,
    ) -> Result<(), ConnectorError> {
        let file_path = match record.get("blob") {
            Some(serde_json::Value::String(path)) => path.as_str(),
            Some(other) => {
                return Err(ConnectorError::data(
                    "INVALID_BLOB_PATH",
                    format!("Field 'blob' must be a string file path, got {other}"),
                ))
            }
            None => {
                return Err(ConnectorError::data(
                    "MISSING_FIELD",
                    "Field 'blob' is not given in the input",
                ))
            }
        };
        let Some(file_name) = Path::new(file_path).file_name().and_then(|n| n.to_str()) else {
            return Err(ConnectorError::data(
                "INVALID_BLOB_PATH",
                format!("Field 'blob' does not name a file: {file_path}"),
            ));
        };

        let data = tokio::fs::read(file_path).await.map_err(|e| {
            ConnectorError::data("UNREADABLE_BLOB", format!("Failed to read {file_path}: {e}"))
        })?;
        let size = data.len();
        let path = self.object_path(file_name);

        within(self.timeout, &path, handle.put(&path, PutPayload::from(data))).await?;

        tracing::info!(path = %path, bytes = size, "Blob inserted successfully");
        Ok(())
    }
}

/// Await an upload, treating an overrun of `limit` as a recoverable timeout.
async fn within<T, F>(limit: Duration, path: &ObjectPath, upload: F) -> Result<T, ConnectorError>
where
    F: Future<Output = object_store::Result<T>>,
{
    match tokio::time::timeout(limit, upload).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(classify(&e)),
        Err(_) => Err(ConnectorError::timeout(
            "UPLOAD_TIMEOUT",
            format!("Upload of {path} exceeded {}ms", limit.as_millis()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;
    use serde_json::json;
    use tidewire_engine::{Destination, Settings, Sink};

    use super::*;
    use crate::config::Provider;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn uploads_file_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.csv");
        std::fs::write(&file, b"a,b\n1,2\n").unwrap();

        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let mut sink = Sink::new(
            BlobSink::with_store(Arc::clone(&store), "exports/daily/"),
            &Settings::default(),
        );
        sink.insert(&record(json!({"blob": file.to_str().unwrap()})))
            .await
            .unwrap();
        sink.stop().await;

        let stored = store
            .get(&ObjectPath::from("exports/daily/report.csv"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&stored[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn missing_blob_field_is_fatal() {
        let mut sink = Sink::new(
            BlobSink::with_store(Arc::new(InMemory::new()), ""),
            &Settings::default(),
        );
        let err = sink.insert(&record(json!({"file": "x"}))).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.message, "Field 'blob' is not given in the input");
        assert_eq!(sink.lifecycle().invalidations(), 0);
    }

    #[tokio::test]
    async fn non_string_blob_field_is_fatal() {
        let mut sink = Sink::new(
            BlobSink::with_store(Arc::new(InMemory::new()), ""),
            &Settings::default(),
        );
        let err = sink.insert(&record(json!({"blob": 42}))).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code, "INVALID_BLOB_PATH");
        assert!(err.message.contains("must be a string"));
    }

    #[tokio::test]
    async fn slow_upload_is_recoverable_timeout() {
        let path = ObjectPath::from("out/slow.bin");
        let err = within::<(), _>(
            Duration::from_millis(10),
            &path,
            std::future::pending::<object_store::Result<()>>(),
        )
        .await
        .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.code, "UPLOAD_TIMEOUT");
        assert!(err.message.contains("out/slow.bin"));
    }

    #[tokio::test]
    async fn failed_upload_is_classified() {
        let path = ObjectPath::from("out/a.bin");
        let err = within::<(), _>(Duration::from_secs(1), &path, async {
            Err(object_store::Error::Generic {
                store: "S3",
                source: "connection reset".into(),
            })
        })
        .await
        .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.code, "UPLOAD_FAILED");
    }

    #[tokio::test]
    async fn unreadable_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.bin");
        let mut sink = Sink::new(
            BlobSink::with_store(Arc::new(InMemory::new()), ""),
            &Settings::default(),
        );
        let err = sink
            .insert(&record(json!({"blob": missing.to_str().unwrap()})))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code, "UNREADABLE_BLOB");
    }

    #[tokio::test]
    async fn local_provider_writes_to_root() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let file = input.path().join("image.png");
        std::fs::write(&file, [0_u8, 1, 2, 3]).unwrap();

        let config = BlobConfig {
            provider: Provider::Local {
                root: output.path().to_path_buf(),
            },
            path_prefix: "uploads".into(),
            timeout: Duration::from_secs(5),
        };
        let mut sink = Sink::new(BlobSink::new(config), &Settings::default());
        sink.insert(&record(json!({"blob": file.to_str().unwrap()})))
            .await
            .unwrap();
        sink.stop().await;

        let written = std::fs::read(output.path().join("uploads/image.png")).unwrap();
        assert_eq!(written, vec![0, 1, 2, 3]);
    }

    #[test]
    fn object_path_without_prefix_is_file_name() {
        let sink = BlobSink::with_store(Arc::new(InMemory::new()), "");
        assert_eq!(sink.object_path("a.txt").to_string(), "a.txt");
        let sink = BlobSink::with_store(Arc::new(InMemory::new()), "/in/");
        assert_eq!(sink.object_path("a.txt").to_string(), "in/a.txt");
    }
}
