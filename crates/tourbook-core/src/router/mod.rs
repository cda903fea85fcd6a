//! Declarative route table and navigation.
//!
//! Routes:
//! - `/` redirects to `/library`
//! - `/login`, `/register` are public
//! - `/library` (lazily loaded) and `/user` require a session token
//!
//! `Router` applies the guard to every transition before committing it.

pub mod guard;

use std::collections::VecDeque;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::SessionState;

pub use guard::{guard, GuardDecision, PendingTransition};

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
/// Where authenticated users land
pub const LANDING_PATH: &str = "/library";
pub const USER_PATH: &str = "/user";

/// Screens the front-end can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Register,
    Library,
    User,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Login => "Login",
            View::Register => "Register",
            View::Library => "Library",
            View::User => "User",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    View(View),
    Redirect(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub target: RouteTarget,
    pub requires_auth: bool,
    /// Loaded on first visit rather than up front
    pub lazy: bool,
}

impl Route {
    const fn view(path: &'static str, view: View, requires_auth: bool, lazy: bool) -> Self {
        Self {
            path,
            target: RouteTarget::View(view),
            requires_auth,
            lazy,
        }
    }

    const fn redirect(path: &'static str, to: &'static str) -> Self {
        Self {
            path,
            target: RouteTarget::Redirect(to),
            requires_auth: false,
            lazy: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn default_routes() -> Self {
        Self::new(vec![
            Route::redirect(ROOT_PATH, LANDING_PATH),
            Route::view(LOGIN_PATH, View::Login, false, false),
            Route::view(REGISTER_PATH, View::Register, false, false),
            Route::view(LANDING_PATH, View::Library, true, true),
            Route::view(USER_PATH, View::User, true, false),
        ])
    }

    fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// Look up a path, following one redirect hop.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let route = self.find(&normalize(path))?;
        match route.target {
            RouteTarget::Redirect(to) => self.find(to),
            RouteTarget::View(_) => Some(route),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// Drop query/fragment and any trailing slash
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Anything that can be told to go somewhere.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NavigationError {
    #[error("No route matches {0}")]
    NotFound(String),

    #[error("Redirect loop while navigating to {0}")]
    RedirectLoop(String),
}

/// A committed location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: &'static str,
    pub view: View,
}

/// Committed locations kept by a `Router`; older ones are dropped
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Default)]
struct RouterState {
    current: Option<Location>,
    history: VecDeque<Location>,
}

/// Applies the guard and keeps the current location.
pub struct Router {
    table: RouteTable,
    session: SessionState,
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new(session: SessionState) -> Self {
        Self::with_table(RouteTable::default_routes(), session)
    }

    pub fn with_table(table: RouteTable, session: SessionState) -> Self {
        Self {
            table,
            session,
            state: Mutex::new(RouterState::default()),
        }
    }

    /// Navigate to `path`. Either the guarded destination is committed in
    /// full or nothing changes.
    pub fn push(&self, path: &str) -> Result<Location, NavigationError> {
        let location = self.resolve_guarded(path)?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.current = Some(location.clone());
        if state.history.len() == HISTORY_LIMIT {
            state.history.pop_front();
        }
        state.history.push_back(location.clone());
        debug!(from = path, to = location.path, "Navigation committed");
        Ok(location)
    }

    /// Where `path` would end up right now, without committing
    pub fn resolve_guarded(&self, path: &str) -> Result<Location, NavigationError> {
        let authenticated = self.session.is_authenticated();
        let route = self
            .table
            .resolve(path)
            .ok_or_else(|| NavigationError::NotFound(path.to_string()))?;

        let route = match guard(&PendingTransition::new(route), authenticated) {
            GuardDecision::Allow => route,
            GuardDecision::Redirect(to) => {
                debug!(route = route.path, redirect = to, authenticated, "Guard redirect");
                let redirected = self
                    .table
                    .resolve(to)
                    .ok_or_else(|| NavigationError::NotFound(to.to_string()))?;
                // the redirect target must pass on its own
                if guard(&PendingTransition::new(redirected), authenticated) != GuardDecision::Allow {
                    return Err(NavigationError::RedirectLoop(path.to_string()));
                }
                redirected
            }
        };

        match route.target {
            RouteTarget::View(view) => Ok(Location {
                path: route.path,
                view,
            }),
            RouteTarget::Redirect(_) => Err(NavigationError::RedirectLoop(path.to_string())),
        }
    }

    pub fn current(&self) -> Option<Location> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .clone()
    }

    /// Recent committed locations, oldest first
    pub fn history(&self) -> Vec<Location> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .iter()
            .cloned()
            .collect()
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) {
        if let Err(e) = self.push(path) {
            warn!(path = path, error = %e, "Navigation failed");
        }
    }
}

/// Remembers requested paths without resolving them.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }
}
