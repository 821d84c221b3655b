// src/services/sdk.rs

//! Player SDK boundary and readiness helpers.
//!
//! Players may finish loading well after their script element fires its
//! load event, so readiness is always detected by polling a
//! provider-specific predicate on the host.

use std::fmt;

use crate::error::Result;
use crate::models::{ElementSelector, Provider, WaitPolicy};
use crate::page::{ElementId, Page};
use crate::utils::await_ready;

/// Why a player refused to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Autoplay was blocked by the browser
    NotAllowed,
    Other(String),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::NotAllowed => f.write_str("playback not allowed"),
            PlaybackError::Other(message) => f.write_str(message),
        }
    }
}

/// The environment hosting third-party player and chatbot SDKs.
pub trait PlayerHost: Send + Sync {
    /// Whether the provider's player global is loaded and usable.
    fn sdk_ready(&self, provider: Provider) -> bool;

    /// Whether the chatbot global exists and reports itself loaded.
    fn chatbot_ready(&self) -> bool;

    /// Instantiate a player on the iframe with `player_id` and start it.
    fn start_playback(
        &self,
        provider: Provider,
        player_id: &str,
    ) -> std::result::Result<(), PlaybackError>;

    /// Unload and reload a player so its first frame shows.
    fn reload(&self, provider: Provider, player_id: &str, video_id: &str);
}

/// Insert the provider's SDK script once and wait until the SDK is usable.
pub async fn load_player_api(
    page: &Page,
    host: &dyn PlayerHost,
    provider: Provider,
    policy: WaitPolicy,
) -> Result<()> {
    let Some((script_id, src)) = provider.sdk_script() else {
        return Ok(());
    };
    if host.sdk_ready(provider) {
        return Ok(());
    }

    if page.get_element_by_id(script_id).is_none() {
        log::debug!("Loading {} player API from {}", provider, src);
        let script = page.create_element("script");
        page.set_attr(script, "id", script_id);
        page.set_attr(script, "src", src);
        page.append_child(page.head(), script);
    }

    let what = format!("{provider} player API");
    await_ready(&what, policy, || host.sdk_ready(provider).then_some(())).await
}

/// Wait for the chatbot to report itself loaded.
pub async fn await_chatbot(host: &dyn PlayerHost, policy: WaitPolicy) -> Result<()> {
    await_ready("Orbita chatbot", policy, || host.chatbot_ready().then_some(())).await
}

/// Wait for an element matching `selector` to appear on the page.
pub async fn await_element(
    page: &Page,
    selector: &ElementSelector,
    policy: WaitPolicy,
) -> Result<ElementId> {
    let what = format!(
        "{}[{}=\"{}\"]",
        selector.tag, selector.attribute, selector.value
    );
    await_ready(&what, policy, || {
        page.query_attr(&selector.tag, &selector.attribute, &selector.value)
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::AppError;

    #[derive(Default)]
    struct Host {
        ready: AtomicBool,
    }

    impl PlayerHost for Host {
        fn sdk_ready(&self, _provider: Provider) -> bool {
            self.ready.load(Ordering::SeqCst)
        }
        fn chatbot_ready(&self) -> bool {
            false
        }
        fn start_playback(
            &self,
            _provider: Provider,
            _player_id: &str,
        ) -> std::result::Result<(), PlaybackError> {
            Ok(())
        }
        fn reload(&self, _provider: Provider, _player_id: &str, _video_id: &str) {}
    }

    #[tokio::test]
    async fn test_ready_sdk_inserts_nothing() {
        let page = Page::default();
        let host = Host::default();
        host.ready.store(true, Ordering::SeqCst);

        load_player_api(&page, &host, Provider::YouTube, WaitPolicy::default())
            .await
            .unwrap();
        assert!(page.get_element_by_id("youtube-api").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_inserted_once_and_times_out() {
        let page = Page::default();
        let host = Host::default();
        let policy = WaitPolicy::new(100, 3);

        let result = load_player_api(&page, &host, Provider::Vimeo, policy).await;
        assert!(matches!(result, Err(AppError::Timeout { .. })));
        let script = page.get_element_by_id("vimeo-api").unwrap();
        assert_eq!(
            page.attr(script, "src").as_deref(),
            Some("https://player.vimeo.com/api/player.js")
        );

        let _ = load_player_api(&page, &host, Provider::Vimeo, policy).await;
        assert_eq!(page.children(page.head()).len(), 1);
    }

    #[tokio::test]
    async fn test_script_providers_have_no_sdk() {
        let page = Page::default();
        let host = Host::default();
        load_player_api(&page, &host, Provider::Buzzsprout, WaitPolicy::default())
            .await
            .unwrap();
        assert!(page.children(page.head()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_element_sees_late_button() {
        let page = std::sync::Arc::new(Page::default());
        let selector = ElementSelector::default();

        let writer = page.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let button = writer.create_element("button");
            writer.set_attr(button, "aria-label", "Show Chatbot");
            writer.append_child(writer.body(), button);
        });

        let found = await_element(&page, &selector, WaitPolicy::default())
            .await
            .unwrap();
        assert_eq!(page.tag(found), "button");
    }
}
