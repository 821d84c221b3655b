//! Shared fixtures for the activation tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use media_consent::ActivationController;
use media_consent::error::{AppError, Result};
use media_consent::models::{Config, Provider, ThumbnailSize};
use media_consent::page::{ElementId, Page};
use media_consent::services::overlay::{CLOSE_CLASS, CONSENT_BUTTON_CLASS, THUMBNAIL_CLASS};
use media_consent::services::{InMemoryPlatform, PlaybackError, PlayerHost, ThumbnailSource};

pub const VIMEO_SRC: &str = "https://player.vimeo.com/video/76979871";
pub const YOUTUBE_SRC: &str = "https://www.youtube.com/embed/dQw4w9WgXcQ";
pub const BUZZSPROUT_SRC: &str =
    "https://www.buzzsprout.com/123456.js?container_id=buzzsprout-player-1&player=small";
pub const ORBITA_SRC: &str = "https://app.orbita.cloud/acme/chatbot/loader.js";

/// Category ids used by the sample configuration.
pub const VIDEO_CATEGORY: &str = "C0004";
pub const DEPENDENT_CATEGORY: &str = "C0002";
pub const PODCAST_CATEGORY: &str = "C0005";
pub const CHAT_CATEGORY: &str = "C0003";

pub fn config() -> Config {
    toml::from_str(include_str!("../../config.toml")).expect("sample config parses")
}

/// Player host double recording every call it receives.
pub struct MockHost {
    pub sdk_ready: AtomicBool,
    pub chatbot_ready: AtomicBool,
    pub block_autoplay: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockHost {
    pub fn ready() -> Self {
        Self {
            sdk_ready: AtomicBool::new(true),
            chatbot_ready: AtomicBool::new(true),
            block_autoplay: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PlayerHost for MockHost {
    fn sdk_ready(&self, _provider: Provider) -> bool {
        self.sdk_ready.load(Ordering::SeqCst)
    }

    fn chatbot_ready(&self) -> bool {
        self.chatbot_ready.load(Ordering::SeqCst)
    }

    fn start_playback(
        &self,
        provider: Provider,
        player_id: &str,
    ) -> std::result::Result<(), PlaybackError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("play {provider} {player_id}"));
        if self.block_autoplay.load(Ordering::SeqCst) {
            Err(PlaybackError::NotAllowed)
        } else {
            Ok(())
        }
    }

    fn reload(&self, provider: Provider, player_id: &str, video_id: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("reload {provider} {player_id} {video_id}"));
    }
}

/// Thumbnail source that answers from a template, or always fails.
#[derive(Default)]
pub struct StubThumbnails {
    pub fail: bool,
}

#[async_trait]
impl ThumbnailSource for StubThumbnails {
    async fn thumbnail_url(
        &self,
        provider: Provider,
        video_id: &str,
        size: ThumbnailSize,
    ) -> Result<String> {
        if self.fail {
            return Err(AppError::thumbnail("stub failure"));
        }
        Ok(format!(
            "https://thumbs.test/{provider}/{video_id}-{}x{}.jpg",
            size.width, size.height
        ))
    }
}

pub struct Fixture {
    pub controller: Arc<ActivationController>,
    pub page: Arc<Page>,
    pub platform: Arc<InMemoryPlatform>,
    pub host: Arc<MockHost>,
}

impl Fixture {
    pub fn new(platform: InMemoryPlatform) -> Self {
        Self::with_config(config(), platform)
    }

    pub fn with_config(config: Config, platform: InMemoryPlatform) -> Self {
        Self::build(config, platform, StubThumbnails::default())
    }

    pub fn build(config: Config, platform: InMemoryPlatform, thumbnails: StubThumbnails) -> Self {
        let page = Arc::new(Page::new(config.engine.breakpoint_px));
        let platform = Arc::new(platform);
        let host = Arc::new(MockHost::ready());
        let controller = ActivationController::new(
            &config,
            page.clone(),
            platform.clone(),
            host.clone(),
            Arc::new(thumbnails),
        );
        Self {
            controller,
            page,
            platform,
            host,
        }
    }

    /// A `div#video-N` container holding an iframe with the given `data-src`.
    pub fn iframe(&self, data_src: &str) -> (ElementId, ElementId) {
        let container = self.page.create_element("div");
        let id = self.page.generate_id("video-");
        self.page.set_attr(container, "id", id);
        self.page.append_child(self.page.body(), container);

        let iframe = self.page.create_element("iframe");
        self.page.set_attr(iframe, "data-src", data_src);
        self.page.append_child(container, iframe);
        (container, iframe)
    }

    /// Gate an iframe and return its container, iframe and thumbnail.
    pub async fn gated_iframe(&self, data_src: &str) -> (ElementId, ElementId, ElementId) {
        let (container, iframe) = self.iframe(data_src);
        self.controller
            .init_iframe(iframe, Default::default())
            .await
            .unwrap();
        let thumbnail = self
            .page
            .child_with_class(container, THUMBNAIL_CLASS)
            .expect("thumbnail appended");
        (container, iframe, thumbnail)
    }

    /// A script element with `data-src`, appended to the body.
    pub fn script(&self, data_src: &str) -> ElementId {
        let script = self.page.create_element("script");
        self.page.set_attr(script, "data-src", data_src);
        self.page.append_child(self.page.body(), script);
        script
    }

    /// An element with the given id, appended to the body.
    pub fn element_with_id(&self, tag: &str, id: &str) -> ElementId {
        let element = self.page.create_element(tag);
        self.page.set_attr(element, "id", id);
        self.page.append_child(self.page.body(), element);
        element
    }

    pub fn agree_button(&self) -> ElementId {
        self.overlay_control(CONSENT_BUTTON_CLASS)
    }

    pub fn close_button(&self) -> ElementId {
        self.overlay_control(CLOSE_CLASS)
    }

    fn overlay_control(&self, class: &str) -> ElementId {
        let open = self.page.open_overlay().expect("an overlay is open");
        self.page
            .descendant_with_class(open.overlay, class)
            .expect("overlay control present")
    }
}

/// Collects the targets passed to cancel callbacks.
#[derive(Clone, Default)]
pub struct CancelLog(Arc<Mutex<Vec<ElementId>>>);

impl CancelLog {
    pub fn record(&self) -> impl Fn(ElementId) + Send + Sync + 'static {
        let log = self.0.clone();
        move |target| log.lock().unwrap().push(target)
    }

    pub fn targets(&self) -> Vec<ElementId> {
        self.0.lock().unwrap().clone()
    }
}
