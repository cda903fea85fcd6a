//! Application context for tourbook front-ends.
//!
//! `AppContext` wires the session, profile cache, router and API client
//! together. It is an ordinary value: build as many as you like, each with
//! its own store, which keeps tests isolated from one another.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::api::{ApiClient, ApiError, ErrorKind, RequestPipeline};
use crate::auth::{Principal, PrincipalPatch, PrincipalStore, SessionState};
use crate::config::Config;
use crate::notify::Notifier;
use crate::router::{Location, NavigationError, Navigator, Router, View, LANDING_PATH, LOGIN_PATH};
use crate::storage::KeyValueStore;

pub struct AppContext {
    pub config: Config,
    pub session: SessionState,
    pub principal: PrincipalStore,
    pub router: Arc<Router>,
    pub api: ApiClient,
}

impl AppContext {
    /// Build a context whose pipeline navigates through the context's router.
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let session = SessionState::new(store);
        let router = Arc::new(Router::new(session.clone()));
        let navigator: Arc<dyn Navigator> = router.clone();
        Self::with_navigator(config, session, router, navigator, notifier)
    }

    /// Build a context with a separate navigator for the pipeline's redirects.
    pub fn with_navigator(
        config: Config,
        session: SessionState,
        router: Arc<Router>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let pipeline = RequestPipeline::new(&config, session.clone(), navigator, notifier)?;
        Ok(Self {
            config,
            session,
            principal: PrincipalStore::new(),
            router,
            api: ApiClient::new(Arc::new(pipeline)),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Log in, then go to the landing route.
    pub async fn login(&self, username: &str, password: &str) -> Result<Location, ApiError> {
        self.api.login(username, password).await?;
        Ok(self.navigate(LANDING_PATH).unwrap_or_else(|e| {
            error!(error = %e, "Landing route unavailable after login");
            Location {
                path: LANDING_PATH,
                view: View::Library,
            }
        }))
    }

    /// Refresh the cached profile from the server.
    ///
    /// Returns `None` when there is no session or the fetch failed. Failures
    /// have already been reported by the pipeline; a rejected session also
    /// resets the cached profile.
    pub async fn fetch_user_info(&self) -> Option<Principal> {
        if !self.session.is_authenticated() {
            debug!("No session token, skipping profile fetch");
            return None;
        }

        match self.api.get_user_info().await {
            Ok(data) => {
                let merged = self.principal.merge(PrincipalPatch::from_value(&data));
                info!(user_id = %merged.id, "Profile updated");
                Some(merged)
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch profile");
                if e.kind() == ErrorKind::SessionInvalid || e.kind() == ErrorKind::ClientSideExpired {
                    self.principal.reset();
                }
                None
            }
        }
    }

    /// Drop the session and the cached profile, then go to the login route.
    pub fn logout(&self) {
        self.session.clear_token();
        self.principal.reset();
        self.router.navigate(LOGIN_PATH);
        info!("Logged out");
    }

    pub fn navigate(&self, path: &str) -> Result<Location, NavigationError> {
        self.router.push(path)
    }
}
