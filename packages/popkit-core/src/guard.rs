//! Protected-route guard decisions
//!
//! Pure decision function for the session-cookie route guard. Matching here
//! is stricter than the popup rules: a rule matches exactly unless it ends
//! with `/`, in which case it is a raw prefix match. The host performs the
//! actual navigation and session fetch.

/// What the host knows about the current session when the guard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session support exists but the state has not been fetched yet
    Unknown,
    LoggedIn,
    LoggedOut,
}

/// Protected-route configuration, already cleaned of blank entries
/// (see [`crate::config::ProtectedRoutesConfig::guard_config`]).
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub require_login_paths: Vec<String>,
    pub login_path: String,
    pub redirect_on_login: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            require_login_paths: Vec::new(),
            login_path: "/login".to_string(),
            redirect_on_login: "/".to_string(),
        }
    }
}

/// Outcome of a guard decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Let the navigation through
    Proceed,
    /// Redirect; `preserve_query` keeps the original query string so the
    /// login page can round-trip back
    Redirect { to: String, preserve_query: bool },
    /// The decision needs the session state; fetch it and decide again
    FetchSession,
}

/// Whether `route_path` falls under a single protected-path rule.
pub fn matches_protected_path(route_path: &str, rule: &str) -> bool {
    let rule = rule.trim();
    if rule.is_empty() {
        return false;
    }
    if rule == "/" {
        return route_path == "/";
    }
    if rule.ends_with('/') {
        return route_path.starts_with(rule);
    }
    route_path == rule
}

/// Decide what to do with a navigation to `path`.
///
/// `session` is `None` when the host has no session support at all; then any
/// protected path redirects straight to login.
pub fn decide(path: &str, config: &GuardConfig, session: Option<SessionState>) -> GuardOutcome {
    // A logged-in user landing on the login page goes home instead
    if path == config.login_path {
        match session {
            Some(SessionState::Unknown) => return GuardOutcome::FetchSession,
            Some(SessionState::LoggedIn) => {
                return GuardOutcome::Redirect {
                    to: config.redirect_on_login.clone(),
                    preserve_query: false,
                }
            }
            _ => {}
        }
    }

    if config.require_login_paths.is_empty() {
        return GuardOutcome::Proceed;
    }

    let is_protected = config
        .require_login_paths
        .iter()
        .any(|rule| matches_protected_path(path, rule));

    if !is_protected {
        return GuardOutcome::Proceed;
    }

    match session {
        None => GuardOutcome::Redirect {
            to: config.login_path.clone(),
            preserve_query: true,
        },
        Some(SessionState::Unknown) => GuardOutcome::FetchSession,
        Some(SessionState::LoggedIn) => GuardOutcome::Proceed,
        Some(SessionState::LoggedOut) => GuardOutcome::Redirect {
            to: config.login_path.clone(),
            preserve_query: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GuardConfig {
        GuardConfig {
            require_login_paths: vec!["/account".to_string(), "/admin/".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_protected_path_exact_match() {
        assert!(matches_protected_path("/account", "/account"));
        // No implicit prefix semantics without a trailing slash
        assert!(!matches_protected_path("/account/orders", "/account"));
    }

    #[test]
    fn test_protected_path_trailing_slash_prefix() {
        assert!(matches_protected_path("/admin/users", "/admin/"));
        assert!(matches_protected_path("/admin/", "/admin/"));
        assert!(!matches_protected_path("/admin", "/admin/"));
    }

    #[test]
    fn test_protected_root_rule() {
        assert!(matches_protected_path("/", "/"));
        assert!(!matches_protected_path("/about", "/"));
    }

    #[test]
    fn test_unprotected_path_proceeds() {
        assert_eq!(
            decide("/blog", &config(), Some(SessionState::LoggedOut)),
            GuardOutcome::Proceed
        );
    }

    #[test]
    fn test_protected_path_logged_out_redirects_with_query() {
        assert_eq!(
            decide("/account", &config(), Some(SessionState::LoggedOut)),
            GuardOutcome::Redirect {
                to: "/login".to_string(),
                preserve_query: true
            }
        );
    }

    #[test]
    fn test_protected_path_no_session_support_redirects() {
        assert_eq!(
            decide("/account", &config(), None),
            GuardOutcome::Redirect {
                to: "/login".to_string(),
                preserve_query: true
            }
        );
    }

    #[test]
    fn test_protected_path_unknown_session_fetches() {
        assert_eq!(
            decide("/account", &config(), Some(SessionState::Unknown)),
            GuardOutcome::FetchSession
        );
    }

    #[test]
    fn test_protected_path_logged_in_proceeds() {
        assert_eq!(
            decide("/account", &config(), Some(SessionState::LoggedIn)),
            GuardOutcome::Proceed
        );
    }

    #[test]
    fn test_login_path_logged_in_redirects_home() {
        assert_eq!(
            decide("/login", &config(), Some(SessionState::LoggedIn)),
            GuardOutcome::Redirect {
                to: "/".to_string(),
                preserve_query: false
            }
        );
    }

    #[test]
    fn test_login_path_logged_out_proceeds() {
        assert_eq!(
            decide("/login", &config(), Some(SessionState::LoggedOut)),
            GuardOutcome::Proceed
        );
    }

    #[test]
    fn test_login_path_unknown_session_fetches() {
        assert_eq!(
            decide("/login", &config(), Some(SessionState::Unknown)),
            GuardOutcome::FetchSession
        );
    }

    #[test]
    fn test_no_protected_paths_always_proceeds() {
        let config = GuardConfig::default();
        assert_eq!(decide("/anything", &config, None), GuardOutcome::Proceed);
    }
}
