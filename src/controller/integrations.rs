// src/controller/integrations.rs

//! Entry points that turn embedded media into gated surrogates.

use std::sync::Arc;

use super::{ActivationController, advance_locked};
use crate::error::{AppError, Result, format_error_message};
use crate::models::{GateOptions, MediaKind, Provider, SessionSpec, SessionState, ThumbnailSize};
use crate::page::{ElementId, PageEvent, events};
use crate::services::overlay::{
    CUSTOM_PODCAST_PLACEHOLDER_CLASS, CUSTOM_VIDEO_OVERLAY_CLASS,
    DEFAULT_PODCAST_PLACEHOLDER_CLASS, DEFAULT_VIDEO_OVERLAY_CLASS, OVERLAY_CLASS,
    OVERLAY_IMAGE_CLASS, OVERLAY_IMAGE_TRANSPARENT_CLASS, THUMBNAIL_CLASS,
};
use crate::services::recognize;
use crate::utils::html;
use crate::utils::url::query_param;

pub(super) const PLAYER_ID_PREFIX: &str = "otsk-player-";

const VIDEO_PLACEHOLDER_CLASS: &str = "video-placeholder";

const RESPONSIVE_CONTAINER_STYLE: &str =
    "width:100%; height:0; position:relative; padding-bottom:56.25%";
const RESPONSIVE_IFRAME_STYLE: &str = "width:100%; height:100%; position:absolute; left:0; top:0";

fn video_defaults() -> GateOptions {
    GateOptions::default()
        .show_modal(false)
        .with_close_button(true)
        .with_default_overlay(true)
        .display_error_modal(true)
}

impl ActivationController {
    /// Gate an iframe whose `data-src` points at a managed video.
    ///
    /// The iframe is hidden behind a thumbnail that acts as the surrogate.
    /// Unmanaged sources and disabled providers are left untouched.
    pub async fn init_iframe(self: &Arc<Self>, iframe: ElementId, options: GateOptions) -> Result<()> {
        let options = options.or(video_defaults()).resolve();
        let Some(data_src) = self.page.attr(iframe, "data-src") else {
            return Ok(());
        };
        let Some(source) = recognize(&data_src) else {
            return Ok(());
        };
        let Some(video_id) = source.video_id() else {
            return Ok(());
        };
        let provider = source.provider;
        if !self.registry.is_enabled(provider) {
            return Ok(());
        }
        let container = self
            .page
            .parent(iframe)
            .ok_or_else(|| AppError::invalid_target("init_iframe: iframe has no parent"))?;

        self.page.ensure_id(iframe, PLAYER_ID_PREFIX);
        self.page.set_attr(container, "style", RESPONSIVE_CONTAINER_STYLE);
        self.page.set_attr(iframe, "style", RESPONSIVE_IFRAME_STYLE);
        self.page.set_style_property(iframe, "display", "none");

        let thumbnail = self.thumbnail_image(iframe, provider, video_id).await;
        self.page.append_child(container, thumbnail);

        let overlay_image = self.overlay_image(provider);
        if let Some(image) = overlay_image {
            self.page.add_class(image, OVERLAY_IMAGE_TRANSPARENT_CLASS);
            self.page.add_class(container, CUSTOM_VIDEO_OVERLAY_CLASS);
            self.page.append_child(container, image);
        } else if options.with_default_overlay {
            self.page.add_class(container, DEFAULT_VIDEO_OVERLAY_CLASS);
            self.page.observe_width(container);
        }

        let show_modal = options.show_modal;
        let spec = SessionSpec {
            target: container,
            provider,
            media: MediaKind::Iframe {
                iframe,
                thumbnail,
                overlay_image,
            },
            options,
        };
        self.bind_surrogate(thumbnail, spec.clone());
        log::debug!("Gated {} iframe {}", provider, video_id);

        if show_modal {
            self.activate(spec).await?;
        }
        Ok(())
    }

    /// Gate a video block rendered by an external player.
    ///
    /// Consent releases the container through a `loadVideoWithConsent` event.
    pub async fn init_video_block(
        self: &Arc<Self>,
        container: ElementId,
        video_url: &str,
        options: GateOptions,
    ) -> Result<()> {
        let options = options.or(video_defaults()).resolve();
        let Some(source) = recognize(video_url) else {
            return Ok(());
        };
        if source.video_id().is_none() {
            return Ok(());
        }
        let provider = source.provider;
        let placeholder = self
            .page
            .descendant_with_class(container, VIDEO_PLACEHOLDER_CLASS);

        let overlay_image = self.overlay_image(provider);
        if let Some(image) = overlay_image {
            self.page.add_class(image, OVERLAY_IMAGE_TRANSPARENT_CLASS);
            self.page.add_class(container, CUSTOM_VIDEO_OVERLAY_CLASS);
            self.page.append_child(placeholder.unwrap_or(container), image);
        } else if options.with_default_overlay {
            self.page.add_class(container, DEFAULT_VIDEO_OVERLAY_CLASS);
            self.page.observe_width(container);
        }

        let show_modal = options.show_modal;
        let spec = SessionSpec {
            target: container,
            provider,
            media: MediaKind::VideoBlock {
                container,
                url: video_url.to_string(),
                overlay_image,
            },
            options,
        };
        self.bind_surrogate(placeholder.unwrap_or(container), spec.clone());

        if show_modal {
            self.activate(spec).await?;
        }
        Ok(())
    }

    /// Gate a third-party script by the provider of its `data-src`.
    pub async fn init_script(self: &Arc<Self>, script: ElementId, options: GateOptions) -> Result<()> {
        let options = options.or(GateOptions::default().show_modal(true).with_close_button(true));
        let provider = self
            .page
            .attr(script, "data-src")
            .and_then(|src| recognize(&src))
            .map(|source| source.provider);

        match provider {
            Some(Provider::Buzzsprout) => self.init_buzzsprout_script(script, options).await,
            Some(Provider::Orbita) => self.init_orbita_script(script, options).await,
            _ => Ok(()),
        }
    }

    /// Gate a Buzzsprout podcast script. Its player renders into the element
    /// named by the `container_id` query parameter of the script URL.
    pub async fn init_buzzsprout_script(
        self: &Arc<Self>,
        script: ElementId,
        options: GateOptions,
    ) -> Result<()> {
        let options = options
            .or(GateOptions::default()
                .show_modal(true)
                .with_close_button(true)
                .with_default_overlay(true)
                .display_error_modal(true))
            .resolve();
        let data_src = self.script_source(script, Provider::Buzzsprout, "init_buzzsprout_script")?;
        let wrapper = self.buzzsprout_wrapper(&data_src)?;

        // Errors surface again when the surrogate is activated.
        let consented = match self.registry.consent_category(Provider::Buzzsprout) {
            Some(category) => self
                .gateway
                .is_consented(category)
                .await
                .unwrap_or_else(|e| {
                    log::debug!("Buzzsprout consent pre-check failed: {}", e);
                    false
                }),
            None => false,
        };
        if consented {
            self.insert_script(script);
            let target_id = self.page.element_id(wrapper);
            self.page.dispatch(PageEvent::new(events::LOAD_PLAYER_BP, target_id));
            return Ok(());
        }

        let overlay_image = self.overlay_image(Provider::Buzzsprout);
        if let Some(image) = overlay_image {
            self.page.add_class(wrapper, CUSTOM_PODCAST_PLACEHOLDER_CLASS);
            self.page.append_child(wrapper, image);
        } else if options.with_default_overlay {
            self.page.add_class(wrapper, DEFAULT_PODCAST_PLACEHOLDER_CLASS);
        }

        let show_modal = options.show_modal;
        let spec = SessionSpec {
            target: wrapper,
            provider: Provider::Buzzsprout,
            media: MediaKind::Buzzsprout {
                script,
                wrapper,
                overlay_image,
            },
            options,
        };
        self.bind_surrogate(wrapper, spec.clone());

        if show_modal {
            self.activate(spec).await?;
        }
        Ok(())
    }

    /// Undo `init_buzzsprout_script` on the script's wrapper.
    pub fn deinit_buzzsprout_script(&self, script: ElementId) -> Result<()> {
        let data_src = self.script_source(script, Provider::Buzzsprout, "deinit_buzzsprout_script")?;
        let wrapper = self.buzzsprout_wrapper(&data_src)?;

        if let Some(image) = self.page.descendant_with_class(wrapper, OVERLAY_IMAGE_CLASS) {
            self.page.remove(image);
        }
        self.page.remove_class(wrapper, CUSTOM_PODCAST_PLACEHOLDER_CLASS);
        self.page.remove_class(wrapper, DEFAULT_PODCAST_PLACEHOLDER_CLASS);

        let mut state = self.state();
        if let Some(open) = self.page.open_overlay().filter(|o| o.target == wrapper) {
            if let Some(session) = open.session {
                advance_locked(&mut state, session, SessionState::Canceled);
            }
        }
        if let Some(overlay) = self.page.child_with_class(wrapper, OVERLAY_CLASS) {
            self.page.remove(overlay);
        }
        state.bindings.remove(&wrapper);
        Ok(())
    }

    /// Gate the Orbita chatbot script behind a widget stub.
    ///
    /// The gating target is the document body; the close button is always
    /// shown.
    pub async fn init_orbita_script(
        self: &Arc<Self>,
        script: ElementId,
        options: GateOptions,
    ) -> Result<()> {
        let options = options
            .or(GateOptions::default().display_error_modal(false))
            .with_close_button(true)
            .resolve();
        self.script_source(script, Provider::Orbita, "init_orbita_script")?;

        let Some(settings) = self
            .registry
            .settings(Provider::Orbita)
            .filter(|_| self.registry.is_enabled(Provider::Orbita))
        else {
            log::debug!("Orbita is not gated; inserting chatbot script");
            self.insert_script(script);
            return Ok(());
        };

        let consented = match self.gateway.is_consented(&settings.cat_id).await {
            Ok(consented) => consented,
            Err(e) if !options.display_error_modal => return Err(e),
            Err(e) => {
                log::debug!("Orbita consent pre-check failed: {}", e);
                false
            }
        };
        if consented {
            self.insert_script(script);
            return Ok(());
        }

        let widget_settings = settings
            .widget
            .as_ref()
            .ok_or_else(|| AppError::config("Orbita widget settings are missing"))?;
        let wrapper = self
            .page
            .get_element_by_id(&widget_settings.wrapper_id)
            .ok_or_else(|| {
                AppError::invalid_target(format!(
                    "Orbita widget wrapper #{} not found",
                    widget_settings.wrapper_id
                ))
            })?;
        let widget = html::element_from_html(&self.page, &widget_settings.html)
            .ok_or_else(|| AppError::config("Orbita widget HTML has no element"))?;
        let styles = html::element_from_text(&self.page, &widget_settings.css, "style");
        self.page.append_child(wrapper, widget);
        self.page.append_child(wrapper, styles);

        let spec = SessionSpec {
            target: self.page.body(),
            provider: Provider::Orbita,
            media: MediaKind::Orbita { script, widget },
            options,
        };
        self.bind_surrogate(widget, spec);
        log::debug!("Gated Orbita chatbot behind widget");
        Ok(())
    }

    /// The script's `data-src` if it belongs to `expected`; an
    /// `InvalidTarget` error otherwise.
    fn script_source(&self, script: ElementId, expected: Provider, caller: &str) -> Result<String> {
        let data_src = self.page.attr(script, "data-src").unwrap_or_default();
        match recognize(&data_src) {
            Some(source) if source.provider == expected => Ok(data_src),
            _ => {
                let e = AppError::invalid_target(format!("{caller}: invalid script element"));
                log::error!("{}", format_error_message(&e));
                Err(e)
            }
        }
    }

    fn buzzsprout_wrapper(&self, data_src: &str) -> Result<ElementId> {
        query_param(data_src, "container_id")
            .and_then(|id| self.page.get_element_by_id(&id))
            .ok_or_else(|| {
                let e = AppError::invalid_target("Buzzsprout wrapper element not found");
                log::error!("{}", format_error_message(&e));
                e
            })
    }

    /// Thumbnail image for an iframe, sized like the iframe. A failed lookup
    /// leaves the image without a source.
    async fn thumbnail_image(&self, iframe: ElementId, provider: Provider, video_id: &str) -> ElementId {
        let size = match self.page.size(iframe) {
            (0, _) | (_, 0) => self.default_thumbnail,
            (width, height) => ThumbnailSize::new(width, height),
        };

        let image = self.page.create_element("img");
        self.page.add_class(image, THUMBNAIL_CLASS);
        match self.thumbnails.thumbnail_url(provider, video_id, size).await {
            Ok(src) => self.page.set_attr(image, "src", src),
            Err(e) => log::warn!("No thumbnail for {} video {}: {}", provider, video_id, e),
        }
        image
    }

    /// Custom overlay image configured for `provider`.
    fn overlay_image(&self, provider: Provider) -> Option<ElementId> {
        let src = self.registry.overlay_image(provider)?;
        let image = self.page.create_element("img");
        self.page.set_attr(image, "src", src);
        self.page.add_class(image, OVERLAY_IMAGE_CLASS);
        Some(image)
    }
}
