//! `GmaClient` and its builder.
//!
//! One client owns one session. The client is cheap to clone; clones share
//! the session, caches, transport and busy counter.

use crate::busy::{BusyIndicator, BusyTracker, NoopBusyIndicator};
use crate::relogin::ReloginHandler;
use crate::services::Language;
use gma_core::config::GmaConfig;
use gma_core::error::Result;
use gma_core::report::ReportOptions;
use gma_core::session::{SessionState, User};
use gma_core::transport::Transport;
use gma_infrastructure::ReqwestTransport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Catalogs fetched once per session.
#[derive(Debug, Default)]
pub(crate) struct SessionCaches {
    pub(crate) languages: Option<Vec<Language>>,
    pub(crate) report_options: HashMap<String, ReportOptions>,
}

pub(crate) struct ClientInner {
    pub(crate) config: GmaConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) session: RwLock<SessionState>,
    pub(crate) caches: Mutex<SessionCaches>,
    pub(crate) relogin: Option<Arc<dyn ReloginHandler>>,
    /// Serializes relogin attempts triggered by concurrent timeouts.
    pub(crate) relogin_lock: tokio::sync::Mutex<()>,
    pub(crate) busy: BusyTracker,
}

/// Client for one GMA session.
///
/// # Example
///
/// ```ignore
/// use gma_core::GmaConfig;
/// use gma_interaction::{CredentialRelogin, GmaClient};
///
/// let client = GmaClient::builder(GmaConfig::new("https://gma.example.org/", "https://cas.example.org/cas"))
///     .with_relogin(CredentialRelogin::new("jo", "secret"))
///     .build()?;
/// let user = client.login("jo", "secret").await?;
/// ```
#[derive(Clone)]
pub struct GmaClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub struct GmaClientBuilder {
    config: GmaConfig,
    transport: Option<Arc<dyn Transport>>,
    relogin: Option<Arc<dyn ReloginHandler>>,
    busy: Option<Arc<dyn BusyIndicator>>,
}

impl GmaClientBuilder {
    /// Overrides the default reqwest transport.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Installs the collaborator invoked when a session timeout is detected.
    pub fn with_relogin(mut self, handler: impl ReloginHandler + 'static) -> Self {
        self.relogin = Some(Arc::new(handler));
        self
    }

    pub fn with_busy_indicator(mut self, indicator: Arc<dyn BusyIndicator>) -> Self {
        self.busy = Some(indicator);
        self
    }

    pub fn build(self) -> Result<GmaClient> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_timeout(self.config.request_timeout())?),
        };
        let busy = self
            .busy
            .unwrap_or_else(|| Arc::new(NoopBusyIndicator) as Arc<dyn BusyIndicator>);

        Ok(GmaClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
                session: RwLock::new(SessionState::new()),
                caches: Mutex::new(SessionCaches::default()),
                relogin: self.relogin,
                relogin_lock: tokio::sync::Mutex::new(()),
                busy: BusyTracker::new(busy),
            }),
        })
    }
}

impl GmaClient {
    pub fn builder(config: GmaConfig) -> GmaClientBuilder {
        GmaClientBuilder {
            config,
            transport: None,
            relogin: None,
            busy: None,
        }
    }

    /// Client with the default transport and no relogin collaborator.
    pub fn new(config: GmaConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &GmaConfig {
        &self.inner.config
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().is_logged_in()
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.session().csrf_token().map(str::to_string)
    }

    pub fn user(&self) -> Option<User> {
        self.session().user().cloned()
    }

    /// Number of calls currently holding the busy indicator.
    pub fn in_flight_calls(&self) -> usize {
        self.inner.busy.in_flight()
    }

    pub(crate) fn session(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn session_mut(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn caches(&self) -> MutexGuard<'_, SessionCaches> {
        self.inner
            .caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    /// Drops session state and per-session caches.
    pub(crate) fn clear_session(&self) {
        self.session_mut().clear();
        *self.caches() = SessionCaches::default();
    }

    /// Like [`Self::clear_session`], and also empties the cookie store.
    pub(crate) async fn reset_session(&self) {
        self.clear_session();
        if let Err(err) = self.inner.transport.clear_cookies().await {
            warn!(error = %err, "failed to clear cookie store");
        }
    }
}
