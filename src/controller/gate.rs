// src/controller/gate.rs

//! The gating state machine: consent checks, overlays and their controls.

use std::sync::Arc;

use super::{ActivationController, Binding, ControllerState, Interaction, advance_locked};
use crate::error::{AppError, Result, format_error_message};
use crate::models::{GateOutcome, Provider, SessionId, SessionOptions, SessionSpec, SessionState};
use crate::page::{ElementId, OpenOverlay};
use crate::services::overlay::{self, OVERLAY_CLASS};

const OVERLAY_TARGET_PREFIX: &str = "mc-overlay-id-";

/// Marks a target as being gated until dropped.
struct PendingTarget<'a> {
    controller: &'a ActivationController,
    target: ElementId,
}

impl Drop for PendingTarget<'_> {
    fn drop(&mut self) {
        self.controller.state().pending.remove(&self.target);
    }
}

impl ActivationController {
    /// Gate a surrogate activation. Failures become an error modal when the
    /// session asks for one and are returned otherwise.
    pub async fn activate(self: &Arc<Self>, spec: SessionSpec) -> Result<GateOutcome> {
        let provider = spec.provider;
        let target = spec.target;
        let options = spec.options.clone();

        match self.gate(spec).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.fail(provider, target, &options, e)?;
                Ok(GateOutcome::ErrorShown)
            }
        }
    }

    /// Run one gating attempt on `spec.target`.
    pub async fn gate(self: &Arc<Self>, spec: SessionSpec) -> Result<GateOutcome> {
        let _pending = {
            let mut state = self.reconciled();
            if self.has_overlay(spec.target) || !state.pending.insert(spec.target) {
                log::debug!("Overlay already open or pending for {} target", spec.provider);
                return Ok(GateOutcome::AlreadyOpen);
            }
            PendingTarget {
                controller: self.as_ref(),
                target: spec.target,
            }
        };

        let provider = spec.provider;
        let target = spec.target;
        let session = self.open_session(spec.clone());

        let Some(settings) = self
            .registry
            .settings(provider)
            .filter(|_| self.registry.is_enabled(provider))
        else {
            log::debug!("{} is not gated; releasing without consent", provider);
            self.finish(session, &spec).await?;
            return Ok(GateOutcome::Consented);
        };

        let consented = match self.gateway.is_consented(&settings.cat_id).await {
            Ok(consented) => consented,
            Err(e) => {
                self.advance(session, SessionState::Errored);
                return Err(e);
            }
        };
        if consented {
            log::debug!("Consent to {} already given", settings.cat_id);
            self.finish(session, &spec).await?;
            return Ok(GateOutcome::Consented);
        }

        let parts = overlay::build_consent_overlay(
            &self.page,
            provider,
            settings,
            spec.options.with_close_button,
        );
        if parts.modal.is_none() {
            log::warn!("{} modal has no description; consent overlay suppressed", provider);
            self.state().sessions.remove(&session);
            return Ok(GateOutcome::Suppressed);
        }

        self.page.ensure_id(target, OVERLAY_TARGET_PREFIX);
        {
            let mut state = self.state();
            if let Some(evicted) = self.page.attach_overlay(target, parts.overlay, Some(session)) {
                forget_evicted(&mut state, evicted);
            }
            if let Some(agree) = parts.agree {
                state.bindings.insert(agree, Binding::Agree(session));
            }
            if let Some(close) = parts.close {
                state.bindings.insert(close, Binding::Close(session));
            }
            advance_locked(&mut state, session, SessionState::RequestingConsent);
        }

        self.listen_for_consent_changes();
        log::info!("Requesting consent to {} for {}", settings.cat_id, provider);
        Ok(GateOutcome::AwaitingConsent(session))
    }

    /// Opt in from the agree control of `session`'s overlay.
    pub(super) async fn agree(
        self: &Arc<Self>,
        session: SessionId,
        agree: ElementId,
    ) -> Result<Interaction> {
        let Some(spec) = self.requesting(session) else {
            return Ok(Interaction::Ignored);
        };
        let Some(category) = self
            .registry
            .consent_category(spec.provider)
            .map(str::to_string)
        else {
            return Ok(Interaction::Ignored);
        };

        self.page.set_attr(agree, "disabled", "disabled");
        if !self.gateway.request_consent(&category).await {
            self.page.remove_attr(agree, "disabled");
            return Ok(Interaction::ConsentFailed);
        }

        // The consent-change listener may have released the media already.
        if let Some(_releasing) = self.claim(session) {
            if let Err(e) = self.finish(session, &spec).await {
                self.fail(spec.provider, spec.target, &spec.options, e)?;
            }
        }
        Ok(Interaction::ConsentGranted)
    }

    /// Dismiss `session`'s overlay and notify the integrator.
    pub(super) fn close(&self, session: SessionId) -> Interaction {
        let spec = {
            let mut state = self.state();
            let Some(spec) = state
                .sessions
                .get(&session)
                .filter(|s| s.state == SessionState::RequestingConsent)
                .map(|s| s.spec.clone())
            else {
                return Interaction::Ignored;
            };
            if let Some(open) = self.page.open_overlay().filter(|o| o.session == Some(session)) {
                self.page.remove(open.overlay);
            }
            advance_locked(&mut state, session, SessionState::Canceled);
            spec
        };

        log::debug!("{} dismissed", session);
        if let Some(callback) = &spec.options.cancel_callback {
            callback(spec.target);
        }
        Interaction::Closed
    }

    /// Re-check the open session's category after any CMP consent change.
    pub async fn handle_consent_changed(&self) {
        let Some(OpenOverlay {
            session: Some(session),
            ..
        }) = self.page.open_overlay()
        else {
            return;
        };
        let Some(spec) = self.requesting(session) else {
            return;
        };
        let Some(category) = self
            .registry
            .consent_category(spec.provider)
            .map(str::to_string)
        else {
            return;
        };

        match self.gateway.is_consented(&category).await {
            Ok(true) => {
                log::info!("Consent to {} granted outside the overlay", category);
                if let Some(_releasing) = self.claim(session) {
                    if let Err(e) = self.finish(session, &spec).await {
                        let _ = self.fail(spec.provider, spec.target, &spec.options, e);
                    }
                }
            }
            Ok(false) => {}
            Err(e) => log::warn!("Consent change re-check failed: {}", e),
        }
    }

    /// Show the close-only error modal on `target`.
    pub fn show_error_modal(&self, target: ElementId, options: &SessionOptions) {
        let mut state = self.state();
        if self.has_overlay(target) {
            return;
        }

        self.page.ensure_id(target, OVERLAY_TARGET_PREFIX);
        let parts = overlay::build_error_overlay(
            &self.page,
            self.registry.general(),
            options.with_close_button,
        );
        if let Some(evicted) = self.page.attach_overlay(target, parts.overlay, None) {
            forget_evicted(&mut state, evicted);
        }
        if let Some(close) = parts.close {
            state.bindings.insert(
                close,
                Binding::ErrorClose {
                    target,
                    options: options.clone(),
                },
            );
        }
    }

    pub(super) fn close_error_modal(&self, target: ElementId, options: &SessionOptions) -> Interaction {
        {
            let mut state = self.state();
            let Some(overlay) = self.page.child_with_class(target, OVERLAY_CLASS) else {
                return Interaction::Ignored;
            };
            self.page.remove(overlay);
            state.bindings.retain(|_, binding| !is_error_close_for(binding, target));
        }

        if let Some(callback) = &options.cancel_callback {
            callback(target);
        }
        Interaction::Closed
    }

    /// Whether `target` has an overlay as a direct child.
    pub fn has_overlay(&self, target: ElementId) -> bool {
        self.page.child_with_class(target, OVERLAY_CLASS).is_some()
    }

    /// Release the media and settle the session on the outcome.
    async fn finish(&self, session: SessionId, spec: &SessionSpec) -> Result<()> {
        match self.release(spec).await {
            Ok(()) => {
                self.advance(session, SessionState::Consented);
                Ok(())
            }
            Err(e) => {
                self.advance(session, SessionState::Errored);
                Err(e)
            }
        }
    }

    /// Take ownership of `session`'s release by removing its open overlay.
    /// Only one caller can succeed. The target stays pending until the
    /// returned guard is dropped, so surrogate activations during the
    /// release are turned away.
    fn claim(&self, session: SessionId) -> Option<PendingTarget<'_>> {
        let mut state = self.state();
        let target = state
            .sessions
            .get(&session)
            .filter(|s| s.state == SessionState::RequestingConsent)
            .map(|s| s.spec.target)?;
        let open = self
            .page
            .open_overlay()
            .filter(|o| o.session == Some(session))?;

        self.page.remove(open.overlay);
        state.bindings.retain(|_, binding| !binding.belongs_to(session));
        state.pending.insert(target);
        Some(PendingTarget {
            controller: self,
            target,
        })
    }

    fn requesting(&self, session: SessionId) -> Option<SessionSpec> {
        self.state()
            .sessions
            .get(&session)
            .filter(|s| s.state == SessionState::RequestingConsent)
            .map(|s| s.spec.clone())
    }

    /// Log a failed activation. Recoverable failures become an error modal
    /// when the session asks for one.
    fn fail(
        &self,
        provider: Provider,
        target: ElementId,
        options: &SessionOptions,
        error: AppError,
    ) -> Result<()> {
        log::error!(
            "{}",
            format_error_message(format!("{provider} activation failed: {error}"))
        );
        if options.display_error_modal && error.is_recoverable() {
            self.show_error_modal(target, options);
            Ok(())
        } else {
            Err(error)
        }
    }
}

/// Settle whatever an overlay eviction pushed out of the page-wide slot.
/// Evicted sessions are canceled without their cancel callback.
fn forget_evicted(state: &mut ControllerState, evicted: OpenOverlay) {
    match evicted.session {
        Some(previous) => {
            log::debug!("Evicting overlay of {}", previous);
            advance_locked(state, previous, SessionState::Canceled);
        }
        None => state
            .bindings
            .retain(|_, binding| !is_error_close_for(binding, evicted.target)),
    }
}

fn is_error_close_for(binding: &Binding, target: ElementId) -> bool {
    matches!(binding, Binding::ErrorClose { target: t, .. } if *t == target)
}
