use anyhow::{Context, Result};
use tidewire_engine::{Source, Variables};

use crate::registry::{AnySource, SourceKind};

/// Execute the `retrieve` command: one batch, printed as a JSON array.
pub async fn execute(kind: SourceKind) -> Result<()> {
    let vars = Variables::from_env();
    let mut source = AnySource::from_variables(kind, &vars)
        .with_context(|| format!("Invalid configuration for {}", kind.name()))?;

    let result = source.retrieve().await;
    source.stop().await;

    let batch = result.with_context(|| format!("Retrieve from {} failed", kind.name()))?;
    tracing::debug!(connector = kind.name(), rows = batch.len(), "Batch complete");
    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}
