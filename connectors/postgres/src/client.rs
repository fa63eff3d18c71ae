//! Connection setup and error classification shared by the PostgreSQL adapters.

use pg_escape::quote_identifier;
use tidewire_types::ConnectorError;
use tokio_postgres::{Client, Config as PgConfig, NoTls};

use crate::config::Config;

/// Connect to PostgreSQL using the provided config.
///
/// The connection task is spawned onto the current runtime; dropping the
/// returned client ends it.
pub(crate) async fn connect(config: &Config) -> Result<Client, ConnectorError> {
    let mut pg = PgConfig::new();
    pg.host(&config.host)
        .port(config.port)
        .user(&config.user)
        .dbname(&config.database)
        .connect_timeout(config.timeout)
        .options(&format!(
            "-c statement_timeout={}",
            config.timeout.as_millis()
        ));
    if !config.password.is_empty() {
        pg.password(&config.password);
    }

    let (client, connection) = pg
        .connect(NoTls)
        .await
        .map_err(|e| classify(&e, "CONNECT_FAILED", "Failed to connect to database"))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(error = %e, "PostgreSQL connection error");
        }
    });

    Ok(client)
}

/// `"schema"."table"`, quoted.
pub(crate) fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// Map a driver error to the connector taxonomy.
///
/// Errors without a SQLSTATE never reached the server's SQL layer (I/O,
/// timeout, closed connection) and are recoverable.
pub(crate) fn classify(err: &tokio_postgres::Error, code: &str, context: &str) -> ConnectorError {
    let message = describe(context, err);
    match err.code() {
        Some(state) => classify_sqlstate(state.code(), code, message),
        None if err.is_closed() => ConnectorError::connection(code, message),
        None => ConnectorError::network(code, message),
    }
}

/// Error text including the server's own message. `tokio_postgres::Error`
/// displays server errors as just "db error".
fn describe(context: &str, err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => server_message(context, db.message(), db.detail(), db.hint()),
        None => format!("{context}: {err}"),
    }
}

fn server_message(context: &str, message: &str, detail: Option<&str>, hint: Option<&str>) -> String {
    let mut out = format!("{context}: {message}");
    if let Some(detail) = detail {
        out.push_str(&format!(" (detail: {detail})"));
    }
    if let Some(hint) = hint {
        out.push_str(&format!(" (hint: {hint})"));
    }
    out
}

pub(crate) fn classify_sqlstate(sqlstate: &str, code: &str, message: String) -> ConnectorError {
    let err = match sqlstate {
        // query_canceled: statement_timeout fired
        "57014" => ConnectorError::timeout(code, message),
        // undefined_table, undefined_column, undefined_function, invalid_schema_name, invalid_catalog_name
        "42P01" | "42703" | "42883" | "3F000" | "3D000" => ConnectorError::schema(code, message),
        _ => match sqlstate.get(..2).unwrap_or_default() {
            "08" => ConnectorError::connection(code, message),
            "25" | "40" | "53" | "55" | "57" | "58" => ConnectorError::backend(code, message),
            "28" => ConnectorError::auth(code, message),
            "42" => ConnectorError::query(code, message),
            "22" | "23" => ConnectorError::data(code, message),
            _ => ConnectorError::internal(code, message),
        },
    };
    err.with_details(serde_json::json!({ "sqlstate": sqlstate }))
}

#[cfg(test)]
mod tests {
    use tidewire_types::ErrorCategory;

    use super::*;

    fn category(sqlstate: &str) -> ErrorCategory {
        classify_sqlstate(sqlstate, "X", "msg".to_string()).category
    }

    #[test]
    fn transient_states_are_recoverable() {
        for state in ["08006", "08001", "40001", "40P01", "53300", "57P01", "55P03", "25P02", "57014"] {
            let err = classify_sqlstate(state, "X", "msg".to_string());
            assert!(err.is_recoverable(), "{state}");
        }
        assert_eq!(category("57014"), ErrorCategory::Timeout);
    }

    #[test]
    fn input_states_are_fatal() {
        assert_eq!(category("28P01"), ErrorCategory::Auth);
        assert_eq!(category("42601"), ErrorCategory::Query);
        assert_eq!(category("42P01"), ErrorCategory::Schema);
        assert_eq!(category("42703"), ErrorCategory::Schema);
        assert_eq!(category("22P02"), ErrorCategory::Data);
        assert_eq!(category("23505"), ErrorCategory::Data);
        assert_eq!(category("XX000"), ErrorCategory::Internal);
        assert!(classify_sqlstate("42601", "X", String::new()).is_fatal());
    }

    #[test]
    fn sqlstate_kept_in_details() {
        let err = classify_sqlstate("23505", "INSERT_FAILED", "duplicate key".to_string());
        assert_eq!(err.details, Some(serde_json::json!({"sqlstate": "23505"})));
        assert_eq!(err.code, "INSERT_FAILED");
    }

    #[test]
    fn server_message_keeps_server_text() {
        let message = server_message(
            "Failed to insert data",
            "column \"nope\" of relation \"products\" does not exist",
            None,
            Some("Check the record's field names."),
        );
        assert_eq!(
            message,
            "Failed to insert data: column \"nope\" of relation \"products\" does not exist \
             (hint: Check the record's field names.)"
        );
        assert!(classify_sqlstate("42703", "INSERT_FAILED", message)
            .message
            .contains("column \"nope\""));
    }

    #[test]
    fn server_message_appends_detail() {
        let message = server_message(
            "Failed to insert data",
            "duplicate key value violates unique constraint \"products_pkey\"",
            Some("Key (id)=(1) already exists."),
            None,
        );
        assert!(message.ends_with("(detail: Key (id)=(1) already exists.)"));
    }

    #[test]
    fn qualified_name_quotes_when_needed() {
        assert_eq!(qualified_name("Raw", "Events"), "\"Raw\".\"Events\"");
    }
}
