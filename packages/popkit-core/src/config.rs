//! Site configuration sections consumed by popkit
//!
//! These mirror the application-wide config the CMS front end ships as JSON,
//! so wire names are camelCase and every field is optional with a safe
//! default. Unknown keys are tolerated; other sections of the site config
//! are none of our business.

use crate::guard::GuardConfig;
use crate::rules::RouteRules;
use serde::{Deserialize, Serialize};

/// Popup section: whether popups are enabled at all and where they may
/// appear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupSettings {
    pub enabled: bool,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
}

impl PopupSettings {
    /// Convert to engine rules, dropping blank entries.
    pub fn rules(&self) -> RouteRules {
        RouteRules::new(self.include_paths.clone(), self.exclude_paths.clone())
    }
}

/// Protected-routes section backing the session route guard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtectedRoutesConfig {
    pub require_login_paths: Vec<String>,
    pub login_path: Option<String>,
    pub redirect_on_login: Option<String>,
}

impl ProtectedRoutesConfig {
    /// Convert to a [`GuardConfig`], applying defaults for blank or missing
    /// login/redirect paths and dropping blank protected paths.
    pub fn guard_config(&self) -> GuardConfig {
        let defaults = GuardConfig::default();

        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        GuardConfig {
            require_login_paths: self
                .require_login_paths
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned()
                .collect(),
            login_path: non_blank(&self.login_path).unwrap_or(defaults.login_path),
            redirect_on_login: non_blank(&self.redirect_on_login)
                .unwrap_or(defaults.redirect_on_login),
        }
    }
}

/// The slice of the application config popkit reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    pub popup: PopupSettings,
    pub protected_routes: ProtectedRoutesConfig,
}
