// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::ThumbnailConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ThumbnailConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a URL and decode its JSON body.
pub async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<serde_json::Value> {
    let value = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(value)
}
