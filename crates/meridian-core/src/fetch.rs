//! Touch-icon download

use futures_util::StreamExt;
use std::time::Duration;

use crate::error::CoreError;
use crate::Result;

pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(10))
        .build()?)
}

/// Download an icon, refusing bodies larger than `max_bytes`.
pub async fn fetch_touch_icon(
    client: &reqwest::Client,
    url: &str,
    max_bytes: usize,
) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?.error_for_status()?;

    if let Some(length) = response.content_length() {
        if length > max_bytes as u64 {
            return Err(too_large(url, max_bytes));
        }
    }

    let mut icon = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if icon.len() + chunk.len() > max_bytes {
            return Err(too_large(url, max_bytes));
        }
        icon.extend_from_slice(&chunk);
    }

    tracing::debug!(url = %url, bytes = icon.len(), "Fetched touch icon");
    Ok(icon)
}

fn too_large(url: &str, max_bytes: usize) -> CoreError {
    CoreError::Io(std::io::Error::other(format!(
        "touch icon {} exceeds {} bytes",
        url, max_bytes
    )))
}
