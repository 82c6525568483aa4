//! Route allow/deny rules for popup display
//!
//! Paths are matched by exact equality or prefix with a `/` boundary, after
//! normalizing trailing slashes. The root rule `/` matches only the literal
//! root, so a site-wide popup is expressed with an empty include list rather
//! than a `/` rule.

/// Strip a trailing slash, leaving the literal root alone.
/// Empty paths normalize to the root.
pub fn normalize_path(path: &str) -> &str {
    if path.is_empty() || path == "/" {
        return "/";
    }
    path.strip_suffix('/').unwrap_or(path)
}

/// Whether `route_path` matches a single include/exclude rule.
/// Blank rules never match.
pub fn path_matches_rule(route_path: &str, rule: &str) -> bool {
    let rule = rule.trim();
    if rule.is_empty() {
        return false;
    }

    let rule = normalize_path(rule);
    let route = normalize_path(route_path);

    if rule == "/" {
        return route == "/";
    }

    route == rule || route.strip_prefix(rule).is_some_and(|rest| rest.starts_with('/'))
}

/// Include/exclude path-prefix rule set determining where the popup may
/// appear. An empty include list allows every path.
#[derive(Debug, Clone, Default)]
pub struct RouteRules {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl RouteRules {
    /// Build a rule set, dropping blank entries.
    pub fn new<I, S>(include: I, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keep = |paths: I| -> Vec<String> {
            paths
                .into_iter()
                .map(Into::into)
                .filter(|p| !p.trim().is_empty())
                .collect()
        };

        Self {
            include: keep(include),
            exclude: keep(exclude),
        }
    }

    /// Rules that allow every path
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// A path is allowed iff it matches some include rule (or the include
    /// list is empty) and matches no exclude rule.
    pub fn is_allowed(&self, route_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|rule| path_matches_rule(route_path, rule));
        let excluded = self.exclude.iter().any(|rule| path_matches_rule(route_path, rule));

        included && !excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/blog/"), "/blog");
        assert_eq!(normalize_path("/blog"), "/blog");
    }

    #[test]
    fn test_rule_requires_slash_boundary() {
        assert!(path_matches_rule("/blog", "/blog"));
        assert!(path_matches_rule("/blog/post-1", "/blog"));
        assert!(path_matches_rule("/blog/", "/blog"));
        // /blogger shares the prefix but not the boundary
        assert!(!path_matches_rule("/blogger", "/blog"));
    }

    #[test]
    fn test_root_rule_matches_only_root() {
        assert!(path_matches_rule("/", "/"));
        assert!(path_matches_rule("", "/"));
        assert!(!path_matches_rule("/about", "/"));
    }

    #[test]
    fn test_blank_rule_never_matches() {
        assert!(!path_matches_rule("/blog", ""));
        assert!(!path_matches_rule("/blog", "   "));
    }

    #[test]
    fn test_rule_with_trailing_slash() {
        assert!(path_matches_rule("/blog/post-1", "/blog/"));
        assert!(path_matches_rule("/blog", "/blog/"));
    }

    #[test]
    fn test_empty_include_allows_all() {
        let rules = RouteRules::allow_all();
        assert!(rules.is_allowed("/"));
        assert!(rules.is_allowed("/anything/at/all"));
    }

    #[test]
    fn test_include_and_exclude() {
        let rules = RouteRules::new(vec!["/blog"], vec!["/blog/drafts"]);
        assert!(rules.is_allowed("/blog/post-1"));
        assert!(!rules.is_allowed("/blog/drafts/x"));
        assert!(!rules.is_allowed("/about"));
    }

    #[test]
    fn test_exclude_only() {
        let rules = RouteRules::new(Vec::<String>::new(), vec!["/checkout".to_string()]);
        assert!(rules.is_allowed("/"));
        assert!(rules.is_allowed("/blog"));
        assert!(!rules.is_allowed("/checkout"));
        assert!(!rules.is_allowed("/checkout/payment"));
    }

    #[test]
    fn test_blank_entries_dropped() {
        let rules = RouteRules::new(vec!["/blog", "  "], vec!["", "/blog/drafts"]);
        assert!(rules.is_allowed("/blog"));
        assert!(!rules.is_allowed("/blog/drafts"));
        // The blank include must not shadow the real one
        assert!(!rules.is_allowed("/about"));
    }
}
