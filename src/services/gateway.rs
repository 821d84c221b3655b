// src/services/gateway.rs

//! Consent gateway over the consent management platform (CMP).
//!
//! The CMP is the source of truth for consent. Nothing here caches a
//! category's state: every check waits for the CMP and re-reads its
//! active groups.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{AppError, Result, format_error_message};
use crate::models::WaitPolicy;
use crate::utils::await_ready;

/// Callback invoked by the CMP on any consent change.
pub type ConsentChangeHandler = Arc<dyn Fn() + Send + Sync>;

/// The global object a CMP exposes once its script has loaded.
pub trait ConsentPlatform: Send + Sync {
    /// Comma-separated active category ids, or `None` while the CMP has
    /// not loaded yet.
    fn active_groups(&self) -> Option<String>;

    /// Opt the visitor in to `category_id`.
    fn update_consent(&self, category_id: &str);

    /// Register a callback fired on any consent change.
    fn on_consent_changed(&self, handler: ConsentChangeHandler);
}

/// Consent checks and opt-ins, each waiting for the CMP first.
pub struct ConsentGateway {
    platform: Arc<dyn ConsentPlatform>,
    policy: WaitPolicy,
    subscribed: AtomicBool,
}

impl ConsentGateway {
    pub fn new(platform: Arc<dyn ConsentPlatform>, policy: WaitPolicy) -> Self {
        Self {
            platform,
            policy,
            subscribed: AtomicBool::new(false),
        }
    }

    /// Wait for the CMP and return its active groups.
    async fn await_cmp(&self) -> Result<String> {
        let platform = Arc::clone(&self.platform);
        await_ready("CMP", self.policy, move || platform.active_groups())
            .await
            .map_err(|e| {
                log::debug!("CMP wait failed: {}", e);
                AppError::CmpUnavailable
            })
    }

    /// Whether `category_id` is among the CMP's active groups.
    pub async fn is_consented(&self, category_id: &str) -> Result<bool> {
        let groups = self.await_cmp().await?;
        Ok(groups
            .split(',')
            .map(str::trim)
            .any(|group| group == category_id))
    }

    /// Opt in to `category_id`. Returns `false` if the CMP never loaded.
    ///
    /// The update is fire-and-forget: it is not re-verified afterwards.
    pub async fn request_consent(&self, category_id: &str) -> bool {
        if let Err(e) = self.await_cmp().await {
            log::error!(
                "{}",
                format_error_message(format!("Error consenting to category {category_id}: {e}"))
            );
            return false;
        }
        log::info!("Opting in to consent category {}", category_id);
        self.platform.update_consent(category_id);
        true
    }

    /// Register the single global consent-change subscription.
    ///
    /// Returns `false` when a subscription already exists; the handler is
    /// dropped in that case.
    pub fn on_consent_changed(&self, handler: ConsentChangeHandler) -> bool {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return false;
        }
        log::debug!("Subscribing to CMP consent changes");
        self.platform.on_consent_changed(handler);
        true
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct PlatformState {
    loaded: bool,
    groups: Vec<String>,
    updates: Vec<String>,
    handlers: Vec<ConsentChangeHandler>,
}

/// In-process CMP, for embedding the engine without a browser CMP.
#[derive(Default)]
pub struct InMemoryPlatform {
    state: Mutex<PlatformState>,
}

impl InMemoryPlatform {
    /// A platform that has already loaded with the given active groups.
    pub fn loaded_with(groups: &[&str]) -> Self {
        let platform = Self::default();
        platform.set_groups(groups);
        platform.load();
        platform
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the CMP global visible.
    pub fn load(&self) {
        self.state().loaded = true;
    }

    /// Hide the CMP global again, as if its script failed.
    pub fn unload(&self) {
        self.state().loaded = false;
    }

    pub fn set_groups(&self, groups: &[&str]) {
        self.state().groups = groups.iter().map(|g| g.to_string()).collect();
    }

    /// Grant a category out-of-band, as the CMP's own banner would.
    pub fn grant(&self, category_id: &str) {
        {
            let mut state = self.state();
            if !state.groups.iter().any(|g| g == category_id) {
                state.groups.push(category_id.to_string());
            }
        }
        self.notify();
    }

    /// Category ids passed to `update_consent`, in order.
    pub fn updates(&self) -> Vec<String> {
        self.state().updates.clone()
    }

    pub fn handler_count(&self) -> usize {
        self.state().handlers.len()
    }

    fn notify(&self) {
        let handlers = self.state().handlers.clone();
        for handler in handlers {
            handler();
        }
    }
}

impl ConsentPlatform for InMemoryPlatform {
    fn active_groups(&self) -> Option<String> {
        let state = self.state();
        state.loaded.then(|| state.groups.join(","))
    }

    fn update_consent(&self, category_id: &str) {
        {
            let mut state = self.state();
            state.updates.push(category_id.to_string());
            if !state.groups.iter().any(|g| g == category_id) {
                state.groups.push(category_id.to_string());
            }
        }
        self.notify();
    }

    fn on_consent_changed(&self, handler: ConsentChangeHandler) {
        self.state().handlers.push(handler);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    fn gateway(platform: &Arc<InMemoryPlatform>) -> ConsentGateway {
        ConsentGateway::new(platform.clone(), WaitPolicy::default())
    }

    #[tokio::test]
    async fn test_is_consented_reads_active_groups() {
        let platform = Arc::new(InMemoryPlatform::loaded_with(&["C0001", "C0003"]));
        let gateway = gateway(&platform);

        assert!(gateway.is_consented("C0003").await.unwrap());
        assert!(!gateway.is_consented("C0004").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_consented_is_never_cached() {
        let platform = Arc::new(InMemoryPlatform::loaded_with(&["C0001"]));
        let gateway = gateway(&platform);

        assert!(!gateway.is_consented("C0003").await.unwrap());
        platform.grant("C0003");
        assert!(gateway.is_consented("C0003").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cmp_unavailable_after_timeout() {
        let platform = Arc::new(InMemoryPlatform::default());
        let gateway = gateway(&platform);
        let start = tokio::time::Instant::now();

        let result = gateway.is_consented("C0003").await;
        assert!(matches!(result, Err(AppError::CmpUnavailable)));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_late_cmp() {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.set_groups(&["C0003"]);
        let gateway = gateway(&platform);

        let loader = platform.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(450)).await;
            loader.load();
        });

        assert!(gateway.is_consented("C0003").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_consent_without_cmp_returns_false() {
        let platform = Arc::new(InMemoryPlatform::default());
        let gateway = gateway(&platform);

        assert!(!gateway.request_consent("C0003").await);
        assert!(platform.updates().is_empty());
    }

    #[tokio::test]
    async fn test_request_consent_updates_cmp() {
        let platform = Arc::new(InMemoryPlatform::loaded_with(&[]));
        let gateway = gateway(&platform);

        assert!(gateway.request_consent("C0003").await);
        assert_eq!(platform.updates(), vec!["C0003".to_string()]);
        assert!(gateway.is_consented("C0003").await.unwrap());
    }

    #[test]
    fn test_single_subscription() {
        let platform = Arc::new(InMemoryPlatform::loaded_with(&[]));
        let gateway = gateway(&platform);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        assert!(gateway.on_consent_changed(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        assert!(!gateway.on_consent_changed(Arc::new(|| {})));
        assert_eq!(platform.handler_count(), 1);

        platform.grant("C0002");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
