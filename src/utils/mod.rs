use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::error::SystemError;

const MAX_NAME_LEN: usize = 100;
const FALLBACK_NAME: &str = "file";

/// Final segment of a client supplied path, splitting on both `/` and `\`.
pub fn base_component(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Reduces a client supplied filename to `[A-Za-z0-9._-]`, safe to use as a
/// single path segment inside the upload directory.
pub fn sanitize_filename(original: &str) -> String {
    let mut cleaned = String::with_capacity(original.len());
    for c in base_component(original).chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }

    let cleaned = cleaned.trim_start_matches(['.', '_']);
    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    truncate_keeping_extension(cleaned, MAX_NAME_LEN)
}

fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if name.len() - dot < max / 2 => {
            let ext = &name[dot..];
            format!("{}{}", &name[..max - ext.len()], ext)
        }
        _ => name[..max].to_string(),
    }
}

/// Storage name of the form `{unix-millis}-{random token}-{sanitized name}`.
pub fn generate_storage_name(original: &str, now: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", now.timestamp_millis(), &token[..12], sanitize_filename(original))
}

/// Validates a filename taken from a request path before it touches the
/// filesystem.
pub fn requested_filename(raw: &str) -> Result<&str, SystemError> {
    if raw.is_empty() || raw.contains("..") || raw.contains('/') || raw.contains('\\') {
        return Err(SystemError::invalid_filename("Filename must be a plain file name"));
    }
    let name = base_component(raw);
    if name.is_empty() || name.chars().any(char::is_control) {
        return Err(SystemError::invalid_filename("Filename must be a plain file name"));
    }
    Ok(name)
}
