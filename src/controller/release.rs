// src/controller/release.rs

//! Final activation of gated media once consent is settled.

use serde_json::json;

use super::ActivationController;
use crate::error::Result;
use crate::models::{MediaKind, Provider, SessionSpec};
use crate::page::{ElementId, PageEvent, events};
use crate::services::overlay::{
    CUSTOM_PODCAST_PLACEHOLDER_CLASS, CUSTOM_VIDEO_OVERLAY_CLASS,
    DEFAULT_PODCAST_PLACEHOLDER_CLASS, DEFAULT_VIDEO_OVERLAY_CLASS, OVERLAY_CLASS,
};
use crate::services::{PlaybackError, privacy, recognize, sdk};

impl ActivationController {
    /// Load the provider SDK, drop any overlay left on the target and run
    /// the media-specific activation.
    pub(super) async fn release(&self, spec: &SessionSpec) -> Result<()> {
        sdk::load_player_api(&self.page, self.host.as_ref(), spec.provider, self.engine.wait)
            .await?;

        if let Some(overlay) = self.page.child_with_class(spec.target, OVERLAY_CLASS) {
            self.page.remove(overlay);
        }

        match &spec.media {
            MediaKind::Iframe {
                iframe,
                thumbnail,
                overlay_image,
            } => {
                self.page.remove_class(spec.target, CUSTOM_VIDEO_OVERLAY_CLASS);
                self.page.remove_class(spec.target, DEFAULT_VIDEO_OVERLAY_CLASS);
                if let Some(image) = overlay_image {
                    self.page.remove(*image);
                }
                self.page.remove(*thumbnail);
                self.play_iframe_video(*iframe).await;

                let target_id = self.page.element_id(spec.target);
                self.page.dispatch(PageEvent::new(events::LOAD_PLAYER, target_id));
            }
            MediaKind::VideoBlock {
                container,
                url,
                overlay_image,
            } => {
                self.page.remove_class(*container, CUSTOM_VIDEO_OVERLAY_CLASS);
                self.page.remove_class(*container, DEFAULT_VIDEO_OVERLAY_CLASS);
                if let Some(image) = overlay_image {
                    self.page.remove(*image);
                }

                let target_id = self.page.element_id(*container);
                let detail = json!({ "url": url, "autoplay": spec.options.autoplay });
                self.page.dispatch(
                    PageEvent::new(events::LOAD_VIDEO_WITH_CONSENT, target_id).with_detail(detail),
                );
            }
            MediaKind::Buzzsprout {
                script,
                wrapper,
                overlay_image,
            } => {
                self.page.remove_class(*wrapper, CUSTOM_PODCAST_PLACEHOLDER_CLASS);
                self.page.remove_class(*wrapper, DEFAULT_PODCAST_PLACEHOLDER_CLASS);
                if let Some(image) = overlay_image {
                    self.page.remove(*image);
                }
                self.insert_script(*script);

                let target_id = self.page.element_id(*wrapper);
                self.page.dispatch(PageEvent::new(events::LOAD_PLAYER_BP, target_id));
            }
            MediaKind::Orbita { script, widget } => {
                self.page.remove(*widget);
                self.insert_script(*script);

                sdk::await_chatbot(self.host.as_ref(), self.engine.wait).await?;
                let button =
                    sdk::await_element(&self.page, &self.engine.chat_button, self.engine.wait)
                        .await?;
                log::debug!("Opening chatbot");
                self.page.click(button);
            }
        }
        Ok(())
    }

    /// Point the iframe at its playback URL and start the player.
    async fn play_iframe_video(&self, iframe: ElementId) {
        let Some(data_src) = self.page.attr(iframe, "data-src") else {
            return;
        };
        let Some(source) = recognize(&data_src) else {
            return;
        };
        let provider = source.provider;

        self.page.set_style_property(iframe, "display", "block");

        let privacy_enhanced = self.is_privacy_enhanced(provider).await;
        let src = privacy::playback_url(&data_src, provider, privacy_enhanced);
        self.page.set_attr(iframe, "src", src);

        if privacy::is_oembed(&data_src) || !provider.is_video() {
            return;
        }

        let player_id = self.page.ensure_id(iframe, super::integrations::PLAYER_ID_PREFIX);
        match self.host.start_playback(provider, &player_id) {
            Ok(()) => {}
            Err(PlaybackError::NotAllowed) if provider == Provider::Vimeo => {
                // Without a reload the player stays blank instead of showing its first frame.
                if let Some(video_id) = source.video_id() {
                    self.host.reload(provider, &player_id, video_id);
                }
            }
            Err(e) => log::warn!("{} playback did not start: {}", provider, e),
        }
    }

    /// A provider plays privacy-enhanced when its dependent category is
    /// configured and not consented. A CMP failure counts as not consented.
    async fn is_privacy_enhanced(&self, provider: Provider) -> bool {
        let Some(dependent) = self.registry.dependent_category(provider) else {
            return false;
        };
        match self.gateway.is_consented(dependent).await {
            Ok(consented) => !consented,
            Err(e) => {
                log::warn!("Dependent category {} check failed: {}", dependent, e);
                true
            }
        }
    }

    /// Inserting a script means copying its `data-src` into `src`.
    pub(super) fn insert_script(&self, script: ElementId) {
        if let Some(src) = self.page.attr(script, "data-src") {
            log::debug!("Inserting script {}", src);
            self.page.set_attr(script, "src", src);
        }
    }
}
