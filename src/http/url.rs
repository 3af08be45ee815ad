//! URL construction for stream endpoints

use super::client::{HttpError, HttpResult};

/// Join a base URL, a relative path and query parameters
///
/// Query values are appended in the order given. Undefined parameters are
/// expressed by the caller simply omitting the pair.
pub fn build_url(base: &str, path: &str, query: &[(&str, String)]) -> HttpResult<String> {
    let base = reqwest::Url::parse(base).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
    let mut url = base
        .join(path)
        .map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url.to_string())
}
