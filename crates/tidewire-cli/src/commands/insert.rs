use anyhow::{bail, Context, Result};
use tidewire_engine::{Destination, Record, Variables};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::registry::{AnyDestination, DestinationKind};

/// Execute the `insert` command: one `insert` call per record, in order.
///
/// Stops at the first failed record; earlier records stay written.
pub async fn execute(kind: DestinationKind, records: Vec<String>) -> Result<()> {
    let records = if records.is_empty() {
        read_stdin().await?
    } else {
        records
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_record(raw).with_context(|| format!("--record #{}", i + 1)))
            .collect::<Result<Vec<_>>>()?
    };

    let vars = Variables::from_env();
    let mut destination = AnyDestination::from_variables(kind, &vars)
        .with_context(|| format!("Invalid configuration for {}", kind.name()))?;

    let mut inserted = 0usize;
    let mut failure = None;
    for (i, record) in records.iter().enumerate() {
        if let Err(e) = destination.insert(record).await {
            failure = Some((i + 1, e));
            break;
        }
        inserted += 1;
    }
    destination.stop().await;

    if let Some((index, e)) = failure {
        return Err(anyhow::Error::new(e).context(format!(
            "Insert of record {index} into {} failed ({inserted} inserted)",
            kind.name()
        )));
    }

    println!("Inserted {inserted} records into {}", kind.name());
    Ok(())
}

async fn read_stdin() -> Result<Vec<Record>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut records = Vec::new();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_record(&line).with_context(|| format!("stdin line {line_no}"))?);
    }
    Ok(records)
}

fn parse_record(raw: &str) -> Result<Record> {
    match serde_json::from_str::<serde_json::Value>(raw).context("Invalid JSON")? {
        serde_json::Value::Object(record) => Ok(record),
        other => bail!("Expected a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_record_accepts_objects_only() {
        let record = parse_record(r#"{"blob": "/tmp/a.csv"}"#).unwrap();
        assert_eq!(record["blob"], "/tmp/a.csv");
        assert!(parse_record("[1]").is_err());
        assert!(parse_record("{oops").is_err());
    }
}
