//! The navigation guard.
//!
//! A pure decision over one pending transition. It never touches state and
//! never suspends; the router applies its decision.

use super::{Route, LANDING_PATH, LOGIN_PATH};

/// A navigation attempt being resolved. Lives only for one `push`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition<'a> {
    pub target: &'a Route,
    pub requires_auth: bool,
}

impl<'a> PendingTransition<'a> {
    pub fn new(target: &'a Route) -> Self {
        Self {
            target,
            requires_auth: target.requires_auth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Commit the transition unchanged
    Allow,
    /// Abort and navigate here instead
    Redirect(&'static str),
}

/// Decide a transition given whether a session token is present.
pub fn guard(transition: &PendingTransition<'_>, authenticated: bool) -> GuardDecision {
    if transition.requires_auth && !authenticated {
        GuardDecision::Redirect(LOGIN_PATH)
    } else if transition.target.path == LOGIN_PATH && authenticated {
        GuardDecision::Redirect(LANDING_PATH)
    } else {
        GuardDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteTable;

    fn decide(path: &str, authenticated: bool) -> GuardDecision {
        let table = RouteTable::default_routes();
        let route = table.resolve(path).unwrap();
        guard(&PendingTransition::new(route), authenticated)
    }

    #[test]
    fn test_protected_routes_require_token() {
        assert_eq!(decide("/library", false), GuardDecision::Redirect("/login"));
        assert_eq!(decide("/user", false), GuardDecision::Redirect("/login"));
        // root redirects to /library, which is protected
        assert_eq!(decide("/", false), GuardDecision::Redirect("/login"));
    }

    #[test]
    fn test_login_while_authenticated_goes_to_landing() {
        assert_eq!(decide("/login", true), GuardDecision::Redirect("/library"));
    }

    #[test]
    fn test_everything_else_passes() {
        assert_eq!(decide("/library", true), GuardDecision::Allow);
        assert_eq!(decide("/user", true), GuardDecision::Allow);
        assert_eq!(decide("/", true), GuardDecision::Allow);
        assert_eq!(decide("/login", false), GuardDecision::Allow);
        assert_eq!(decide("/register", false), GuardDecision::Allow);
        assert_eq!(decide("/register", true), GuardDecision::Allow);
    }
}
