// src/controller/mod.rs

//! Activation controller.
//!
//! Owns the per-target state machine that turns a surrogate activation
//! into either released media or an open consent overlay. The controller
//! is shared behind an `Arc`: consent-change notifications are delivered to
//! a background task that holds only a weak reference back to it.
//!
//! Locking order is controller state first, then the page. Neither lock is
//! held across an `.await`.

mod gate;
mod integrations;
mod release;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::Result;
use crate::models::{
    Config, EngineConfig, GateOutcome, Session, SessionId, SessionOptions, SessionSpec,
    SessionState, ThumbnailSize,
};
use crate::page::{ElementId, Page};
use crate::services::{
    ConsentGateway, ConsentPlatform, PlayerHost, ProviderRegistry, ThumbnailSource,
};

/// What a click or key press on an engine-owned element led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// The element has no engine binding
    Ignored,
    /// A surrogate was activated
    Gated(GateOutcome),
    /// Consent was recorded and the media released
    ConsentGranted,
    /// The CMP could not record consent; the agree control is usable again
    ConsentFailed,
    /// An overlay was dismissed
    Closed,
}

/// Handler attached to an engine-owned element.
#[derive(Debug, Clone)]
enum Binding {
    Surrogate(SessionSpec),
    Agree(SessionId),
    Close(SessionId),
    /// Close control of an error modal, which has no session
    ErrorClose {
        target: ElementId,
        options: SessionOptions,
    },
}

impl Binding {
    fn belongs_to(&self, session: SessionId) -> bool {
        matches!(self, Binding::Agree(id) | Binding::Close(id) if *id == session)
    }
}

#[derive(Default)]
struct ControllerState {
    next_session: u64,
    bindings: HashMap<ElementId, Binding>,
    /// Live sessions; terminal ones are dropped
    sessions: HashMap<SessionId, Session>,
    /// Targets with a gating attempt between its first check and its overlay
    pending: HashSet<ElementId>,
}

/// Consent-gated media activation for one page.
pub struct ActivationController {
    registry: ProviderRegistry,
    gateway: ConsentGateway,
    page: Arc<Page>,
    host: Arc<dyn PlayerHost>,
    thumbnails: Arc<dyn ThumbnailSource>,
    engine: EngineConfig,
    default_thumbnail: ThumbnailSize,
    state: Mutex<ControllerState>,
    changes: watch::Sender<u64>,
    listening: AtomicBool,
}

impl ActivationController {
    pub fn new(
        config: &Config,
        page: Arc<Page>,
        platform: Arc<dyn ConsentPlatform>,
        host: Arc<dyn PlayerHost>,
        thumbnails: Arc<dyn ThumbnailSource>,
    ) -> Arc<Self> {
        let (changes, _) = watch::channel(0);
        Arc::new(Self {
            registry: ProviderRegistry::new(config.consent.clone()),
            gateway: ConsentGateway::new(platform, config.engine.wait),
            page,
            host,
            thumbnails,
            engine: config.engine.clone(),
            default_thumbnail: ThumbnailSize::new(
                config.thumbnails.default_width,
                config.thumbnails.default_height,
            ),
            state: Mutex::new(ControllerState::default()),
            changes,
            listening: AtomicBool::new(false),
        })
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// State of a live session. Terminal sessions are not retained.
    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        self.reconciled().sessions.get(&id).map(|session| session.state)
    }

    pub fn live_sessions(&self) -> usize {
        self.reconciled().sessions.len()
    }

    /// Whether the element carries a surrogate binding.
    pub fn is_surrogate(&self, element: ElementId) -> bool {
        matches!(
            self.state().bindings.get(&element),
            Some(Binding::Surrogate(_))
        )
    }

    /// Handle a click on `element`.
    pub async fn click(self: &Arc<Self>, element: ElementId) -> Result<Interaction> {
        let binding = self.reconciled().bindings.get(&element).cloned();
        match binding {
            None => Ok(Interaction::Ignored),
            Some(Binding::Surrogate(spec)) => self.activate(spec).await.map(Interaction::Gated),
            Some(Binding::Agree(session)) => self.agree(session, element).await,
            Some(Binding::Close(session)) => Ok(self.close(session)),
            Some(Binding::ErrorClose { target, options }) => {
                Ok(self.close_error_modal(target, &options))
            }
        }
    }

    /// Handle a key press on `element`. Only Enter activates.
    pub async fn key_down(self: &Arc<Self>, element: ElementId, key: &str) -> Result<Interaction> {
        if key != "Enter" {
            return Ok(Interaction::Ignored);
        }
        self.click(element).await
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state after canceling sessions whose overlay left the page
    /// without going through the controller, e.g. when the integrator
    /// removed the target's subtree.
    fn reconciled(&self) -> MutexGuard<'_, ControllerState> {
        let mut state = self.state();
        let open = self.page.open_overlay().and_then(|o| o.session);
        let orphaned: Vec<SessionId> = state
            .sessions
            .values()
            .filter(|s| s.state == SessionState::RequestingConsent)
            .filter(|s| open != Some(s.id) && !state.pending.contains(&s.spec.target))
            .map(|s| s.id)
            .collect();
        for id in orphaned {
            log::debug!("{} lost its overlay; canceling", id);
            advance_locked(&mut state, id, SessionState::Canceled);
        }
        state
    }

    fn bind(&self, element: ElementId, binding: Binding) {
        self.state().bindings.insert(element, binding);
    }

    /// Bind a surrogate and make it keyboard reachable.
    fn bind_surrogate(&self, element: ElementId, spec: SessionSpec) {
        self.page.set_attr(element, "role", "button");
        self.page.set_attr(element, "tabindex", "0");
        self.bind(element, Binding::Surrogate(spec));
    }

    fn open_session(&self, spec: SessionSpec) -> SessionId {
        let mut state = self.state();
        let id = SessionId(state.next_session);
        state.next_session += 1;
        state.sessions.insert(
            id,
            Session {
                id,
                spec,
                state: SessionState::Blocked,
            },
        );
        id
    }

    /// Move a session to `next`. Terminal states drop the session and the
    /// bindings of its overlay controls.
    fn advance(&self, id: SessionId, next: SessionState) -> bool {
        let mut state = self.state();
        advance_locked(&mut state, id, next)
    }

    /// Register the consent-change subscription and its listener task once.
    fn listen_for_consent_changes(self: &Arc<Self>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let notifier = self.changes.clone();
        self.gateway.on_consent_changed(Arc::new(move || {
            notifier.send_modify(|generation| *generation += 1);
        }));

        let mut changes = self.changes.subscribe();
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.handle_consent_changed().await;
            }
            log::debug!("Consent change listener stopped");
        });
    }
}

fn advance_locked(state: &mut ControllerState, id: SessionId, next: SessionState) -> bool {
    let Some(session) = state.sessions.get_mut(&id) else {
        return false;
    };
    if !session.state.can_advance(next) {
        log::debug!("{} cannot move from {:?} to {:?}", id, session.state, next);
        return false;
    }
    log::debug!("{}: {:?} -> {:?}", id, session.state, next);
    session.state = next;

    if next.is_terminal() {
        state.sessions.remove(&id);
        state.bindings.retain(|_, binding| !binding.belongs_to(id));
    }
    true
}
