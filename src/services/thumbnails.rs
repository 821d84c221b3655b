// src/services/thumbnails.rs

//! Placeholder thumbnails for videos shown before consent.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Provider, ThumbnailConfig, ThumbnailSize};
use crate::utils::http;

static VIMEO_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"d_(\d+)x(\d+)").expect("Vimeo size pattern is valid"));

/// Source of thumbnail image URLs.
#[async_trait]
pub trait ThumbnailSource: Send + Sync {
    /// Resolve a thumbnail URL for a video.
    async fn thumbnail_url(
        &self,
        provider: Provider,
        video_id: &str,
        size: ThumbnailSize,
    ) -> Result<String>;
}

/// YouTube thumbnails follow a fixed template; no request needed.
pub fn youtube_thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg")
}

/// Substitute the requested size into a templated Vimeo thumbnail URL.
pub fn resize_vimeo_thumbnail(url: &str, size: ThumbnailSize) -> String {
    let replacement = format!("d_{}x{}", size.width, size.height);
    VIMEO_SIZE
        .replace(url, regex::NoExpand(&replacement))
        .into_owned()
}

/// Extract and resize `thumbnail_url` from a Vimeo oEmbed response.
pub fn vimeo_thumbnail_from_oembed(body: &serde_json::Value, size: ThumbnailSize) -> Result<String> {
    let url = body["thumbnail_url"]
        .as_str()
        .ok_or_else(|| AppError::thumbnail("oEmbed response has no thumbnail_url"))?;
    Ok(resize_vimeo_thumbnail(url, size))
}

/// Resolves thumbnails over HTTP (Vimeo oEmbed) or by template (YouTube).
pub struct ThumbnailResolver {
    client: reqwest::Client,
    oembed_endpoint: String,
}

impl ThumbnailResolver {
    pub fn new(config: &ThumbnailConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(config)?,
            oembed_endpoint: config.oembed_endpoint.clone(),
        })
    }

    async fn fetch_vimeo(&self, video_id: &str, size: ThumbnailSize) -> Result<String> {
        let target = format!("https://vimeo.com/{video_id}");
        let url = Url::parse_with_params(&self.oembed_endpoint, &[("url", target.as_str())])?;
        log::debug!("Fetching Vimeo thumbnail from {}", url);
        let body = http::fetch_json(&self.client, url.as_str()).await?;
        vimeo_thumbnail_from_oembed(&body, size)
    }
}

#[async_trait]
impl ThumbnailSource for ThumbnailResolver {
    async fn thumbnail_url(
        &self,
        provider: Provider,
        video_id: &str,
        size: ThumbnailSize,
    ) -> Result<String> {
        match provider {
            Provider::YouTube => Ok(youtube_thumbnail_url(video_id)),
            Provider::Vimeo => self.fetch_vimeo(video_id, size).await.map_err(|e| match e {
                AppError::ThumbnailFetch(_) => e,
                other => AppError::thumbnail(format!(
                    "Error fetching Vimeo thumbnail for {video_id}: {other}"
                )),
            }),
            Provider::Buzzsprout | Provider::Orbita => Err(AppError::thumbnail(format!(
                "{provider} has no video thumbnails"
            ))),
        }
    }
}
