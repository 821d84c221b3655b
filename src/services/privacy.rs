// src/services/privacy.rs

//! Playback URL rewriting, including privacy-enhanced variants.
//!
//! Privacy-enhanced playback is used when a provider declares a dependent
//! consent category and the visitor has not granted it.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Provider;
use crate::utils::url::append_param;

static OEMBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(/media/oembed\?url=)([^&]+)(.+)").expect("oEmbed pattern is valid")
});

static YOUTUBE_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(youtu\.be|youtube\.com)/").expect("YouTube host pattern is valid")
});

/// Whether the URL goes through the site's oEmbed proxy.
pub fn is_oembed(url: &str) -> bool {
    OEMBED.is_match(url)
}

/// Build the URL an activated player should load.
///
/// - oEmbed proxy URLs only gain `privacy_enhanced=1` when enhanced.
/// - Vimeo gains `dnt=1` when enhanced.
/// - YouTube moves to `youtube-nocookie.com` when enhanced and always
///   gains `enablejsapi=1` so the player API can drive it.
pub fn playback_url(data_src: &str, provider: Provider, privacy_enhanced: bool) -> String {
    if is_oembed(data_src) {
        return if privacy_enhanced {
            append_param(data_src, "privacy_enhanced=1")
        } else {
            data_src.to_string()
        };
    }

    match provider {
        Provider::Vimeo if privacy_enhanced => append_param(data_src, "dnt=1"),
        Provider::YouTube => {
            let src = if privacy_enhanced {
                YOUTUBE_HOST
                    .replace(data_src, "youtube-nocookie.com/")
                    .into_owned()
            } else {
                data_src.to_string()
            };
            append_param(&src, "enablejsapi=1")
        }
        _ => data_src.to_string(),
    }
}
