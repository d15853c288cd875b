use std::time::Duration;

use anyhow::Context as _;
use palaver_domain::Provider;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};

use crate::error::Error;

/// Helper function to format HTTP request/response context for logging and
/// error reporting
pub(crate) fn format_http_context<U: AsRef<str>>(
    status: Option<StatusCode>,
    method: &str,
    url: U,
) -> String {
    if let Some(status) = status {
        format!("{} {} {}", status.as_u16(), method, url.as_ref())
    } else {
        format!("{} {}", method, url.as_ref())
    }
}

/// Maps a transport failure to a timeout error when it is one.
pub(crate) fn transport_error(error: reqwest::Error, timeout: Duration) -> anyhow::Error {
    if error.is_timeout() {
        anyhow::Error::from(error).context(Error::Timeout(timeout.as_secs()))
    } else {
        error.into()
    }
}

/// Resolves `path` below the base URL, which is treated as a directory even
/// without a trailing slash.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> anyhow::Result<Url> {
    // Validate the path doesn't contain certain patterns
    if path.contains("://") || path.contains("..") {
        anyhow::bail!("Invalid path: Contains forbidden patterns");
    }

    // Remove leading slash to avoid double slashes
    let path = path.trim_start_matches('/');

    let mut base_url = base_url.clone();
    if !base_url.path().ends_with('/') {
        let dir = format!("{}/", base_url.path());
        base_url.set_path(&dir);
    }

    base_url
        .join(path)
        .with_context(|| format!("Failed to append {path} to base URL: {base_url}"))
}

/// Bearer authentication plus the static headers of the provider.
pub(crate) fn headers(provider: &Provider) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(ref api_key) = provider.key {
        let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("API key is not a valid header value")?;
        headers.insert(AUTHORIZATION, value);
    }
    for (name, value) in &provider.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name: {name}"))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header: {name}"))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
