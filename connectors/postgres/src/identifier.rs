/// PostgreSQL identifier validation for configured schema and table names.
pub(crate) fn validate_pg_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err("identifier must not be empty".to_string());
    };

    if name.len() > 63 {
        return Err(format!(
            "identifier '{}' exceeds PostgreSQL maximum length of 63 bytes (got {})",
            name,
            name.len()
        ));
    }

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(format!(
            "identifier must start with a letter or underscore, got '{first}'"
        ));
    }

    if let Some(ch) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(format!("identifier contains invalid character '{ch}'"));
    }

    Ok(())
}
