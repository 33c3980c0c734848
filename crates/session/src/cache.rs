//! Single-flight session cache.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use waypost_auth::Identity;

use crate::provider::IdentityProvider;

/// One load cycle: not-loaded until the cell is initialized.
///
/// The cell is created when the cycle starts (construction or `reset`), so it
/// already exists before any caller reaches an await point. Every concurrent
/// `ensure_loaded` of the same cycle attaches to it; only one initializer runs.
type LoadCycle = Arc<OnceCell<Identity>>;

/// Holds the current identity and whether it has been loaded.
///
/// Construct one per process and share it by `Arc`; there is no global
/// instance.
pub struct SessionCache {
    provider: Arc<dyn IdentityProvider>,
    cycle: Mutex<LoadCycle>,
}

impl SessionCache {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            cycle: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    /// Current identity; the anonymous sentinel until a load completes.
    ///
    /// Never suspends.
    pub fn get(&self) -> Identity {
        self.current_cycle()
            .get()
            .cloned()
            .unwrap_or_else(Identity::anonymous)
    }

    pub fn is_loaded(&self) -> bool {
        self.current_cycle().initialized()
    }

    /// Make sure the current cycle has loaded an identity.
    ///
    /// The first caller of a cycle drives the provider fetch; everyone else
    /// waits on that same fetch. Once loaded this resolves without suspending
    /// and without touching the provider. Provider failures resolve to the
    /// anonymous identity, so this always completes.
    ///
    /// Returns the identity of the cycle that is current when the load
    /// finishes. If `reset` or `set` replaced the cycle while the fetch was in
    /// flight, the caller moves on to the new cycle instead of returning a
    /// discarded identity.
    pub async fn ensure_loaded(&self) -> Identity {
        loop {
            let cycle = self.current_cycle();
            let identity = cycle.get_or_init(|| self.load()).await.clone();

            if Arc::ptr_eq(&cycle, &self.current_cycle()) {
                return identity;
            }
            tracing::debug!("session cycle replaced during load; waiting on the new one");
        }
    }

    /// Override the identity after an explicit login. Marks the session loaded.
    pub fn set(&self, identity: Identity) {
        tracing::info!(account = %identity.account, "session identity set");
        self.replace_cycle(Arc::new(OnceCell::new_with(Some(identity))));
    }

    /// Forget the identity (logout). The next `ensure_loaded` fetches again.
    ///
    /// A fetch still in flight completes into the discarded cycle and is not
    /// observed; its waiters attach to the new cycle.
    pub fn reset(&self) {
        tracing::info!("session reset");
        self.replace_cycle(Arc::new(OnceCell::new()));
    }

    async fn load(&self) -> Identity {
        tracing::debug!("loading session identity");

        match self.provider.fetch_current_identity().await {
            Ok(Some(identity)) => {
                tracing::info!(account = %identity.account, role = ?identity.role, "session loaded");
                identity
            }
            Ok(None) => {
                tracing::info!("session loaded: not logged in");
                Identity::anonymous()
            }
            Err(err) => {
                tracing::warn!(error = %err, "identity fetch failed; treating session as anonymous");
                Identity::anonymous()
            }
        }
    }

    fn current_cycle(&self) -> LoadCycle {
        self.cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_cycle(&self, next: LoadCycle) {
        *self.cycle.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl core::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionCache")
            .field("loaded", &self.is_loaded())
            .field("identity", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::FutureExt;
    use tokio::sync::watch;
    use waypost_auth::Role;
    use waypost_core::UserId;

    use super::*;
    use crate::provider::ProviderError;

    /// Provider that counts calls and blocks until released.
    struct GatedProvider {
        calls: AtomicUsize,
        release: watch::Sender<bool>,
        answer: Result<Option<Identity>, ProviderError>,
    }

    impl GatedProvider {
        fn new(answer: Result<Option<Identity>, ProviderError>) -> Arc<Self> {
            let (release, _) = watch::channel(false);
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                release,
                answer,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn open(&self) {
            self.release.send_replace(true);
        }
    }

    #[async_trait]
    impl IdentityProvider for GatedProvider {
        async fn fetch_current_identity(&self) -> Result<Option<Identity>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut rx = self.release.subscribe();
            let _ = rx.wait_for(|open| *open).await;
            self.answer.clone()
        }
    }

    fn admin() -> Identity {
        Identity::new(UserId::new(1), "root", "Root", Some(Role::ADMIN))
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn starts_anonymous_and_not_loaded() {
        let provider = GatedProvider::new(Ok(Some(admin())));
        let cache = SessionCache::new(provider.clone());

        assert!(!cache.is_loaded());
        assert!(cache.get().is_anonymous());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let provider = GatedProvider::new(Ok(Some(admin())));
        let cache = Arc::new(SessionCache::new(provider.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let cache = cache.clone();
            tasks.spawn(async move { cache.ensure_loaded().await });
        }

        settle().await;
        assert_eq!(provider.calls(), 1);
        assert!(!cache.is_loaded());

        provider.open();
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        assert_eq!(provider.calls(), 1);
        assert!(cache.is_loaded());
        assert_eq!(cache.get(), admin());
    }

    #[tokio::test]
    async fn loaded_cache_resolves_without_suspending() {
        let provider = GatedProvider::new(Ok(Some(admin())));
        provider.open();
        let cache = SessionCache::new(provider.clone());

        cache.ensure_loaded().await;
        for _ in 0..5 {
            assert!(cache.ensure_loaded().now_or_never().is_some());
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn provider_failure_resolves_to_anonymous() {
        let provider = GatedProvider::new(Err(ProviderError::Transport("refused".into())));
        provider.open();
        let cache = SessionCache::new(provider.clone());

        cache.ensure_loaded().await;

        assert!(cache.is_loaded());
        assert!(cache.get().is_anonymous());
    }

    #[tokio::test]
    async fn set_marks_loaded_without_fetching() {
        let provider = GatedProvider::new(Ok(None));
        let cache = SessionCache::new(provider.clone());

        cache.set(admin());
        cache.ensure_loaded().await;

        assert!(cache.is_loaded());
        assert_eq!(cache.get(), admin());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn reset_rearms_the_load() {
        let provider = GatedProvider::new(Ok(Some(admin())));
        provider.open();
        let cache = SessionCache::new(provider.clone());

        cache.ensure_loaded().await;
        cache.reset();

        assert!(!cache.is_loaded());
        assert!(cache.get().is_anonymous());

        cache.ensure_loaded().await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.get(), admin());
    }

    #[tokio::test]
    async fn reset_during_load_waits_for_the_new_cycle() {
        let provider = GatedProvider::new(Ok(Some(admin())));
        let cache = Arc::new(SessionCache::new(provider.clone()));

        let in_flight = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.ensure_loaded().await })
        };
        settle().await;
        assert_eq!(provider.calls(), 1);

        cache.reset();
        provider.open();
        let identity = in_flight.await.unwrap();

        assert!(cache.is_loaded(), "waiter returned before the new cycle loaded");
        assert_eq!(provider.calls(), 2);
        assert_eq!(identity, admin());
        assert_eq!(cache.get(), admin());
    }

    #[tokio::test]
    async fn stale_fetch_does_not_overwrite_a_login() {
        let provider = GatedProvider::new(Ok(Some(admin())));
        let cache = Arc::new(SessionCache::new(provider.clone()));
        let user = Identity::new(UserId::new(2), "guest", "Guest", Some(Role::new("user")));

        let in_flight = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.ensure_loaded().await })
        };
        settle().await;

        cache.set(user.clone());
        provider.open();
        let identity = in_flight.await.unwrap();

        assert_eq!(identity, user);
        assert_eq!(cache.get(), user);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn dropped_waiter_does_not_wedge_the_cycle() {
        let provider = GatedProvider::new(Ok(Some(admin())));
        let cache = Arc::new(SessionCache::new(provider.clone()));

        let abandoned = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.ensure_loaded().await })
        };
        settle().await;
        abandoned.abort();
        let _ = abandoned.await;

        provider.open();
        cache.ensure_loaded().await;

        assert!(cache.is_loaded());
        assert_eq!(cache.get(), admin());
    }
}
