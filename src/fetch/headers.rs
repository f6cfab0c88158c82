//! Parsing of `key: value` header lines.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::FetchError;

/// Parses header lines into a case-insensitive, multi-valued header map.
///
/// Each line is split at its first `:`. Key and value are trimmed and must
/// both be non-empty. Repeated keys are appended rather than overwritten.
///
/// # Errors
///
/// Returns [`FetchError::InvalidHeaders`] for the first line that has no key,
/// no value, or a key/value that is not a valid HTTP token.
pub fn parse_headers<S: AsRef<str>>(lines: &[S]) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();

    for line in lines {
        let line = line.as_ref();
        let invalid = || FetchError::invalid_headers(line);

        let (key, value) = line.split_once(':').ok_or_else(invalid)?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            return Err(invalid());
        }

        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.append(name, value);
    }

    Ok(headers)
}
