pub mod config;
pub mod engine;
pub mod guard;
pub mod rules;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use engine::{
    EngineOptions, EngineSnapshot, PopupEngine, SeenStore, TimerId, Timers, UiEvent, Viewport,
};
pub use rules::RouteRules;

/// Floor applied to configured delays so a misconfigured popup never fires
/// instantly (milliseconds).
pub const DEFAULT_MIN_DELAY_MS: u64 = 3000;

/// Cap on the idle-callback wait before the engine declares itself ready
/// anyway (milliseconds).
pub const IDLE_TIMEOUT_MS: u64 = 3000;

/// Plain-timer fallback used when idle callbacks are unavailable
/// (milliseconds).
pub const IDLE_FALLBACK_MS: u64 = 1500;

/// How long a "seen" flag persists after a show-once display.
pub const SEEN_TTL_SECS: u64 = 60 * 60 * 24 * 7;

/// Default key the seen flag is stored under.
pub const DEFAULT_SEEN_KEY: &str = "marketing_popup";

/// Which condition arms the popup for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Show after a fixed delay once the engine is ready
    #[default]
    Delay,
    /// Show once the page has been scrolled past a threshold
    Scroll,
    /// Show when the cursor leaves the top of the viewport
    Exit,
    /// Unrecognized trigger name from the CMS; arms nothing
    #[serde(other)]
    Unknown,
}

/// Per-popup behavior configuration, supplied by the CMS and subject to
/// change at runtime (a different popup per route, for example).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupConfig {
    pub trigger: TriggerKind,

    /// Delay before display in milliseconds. Non-finite or negative values
    /// are treated as zero; the engine applies its minimum-delay floor on
    /// top.
    #[serde(rename = "delay")]
    pub delay_ms: Option<f64>,

    /// Suppress redisplay for a period after a successful display
    pub show_once: bool,

    /// Scroll depth as a fraction of the scrollable height, in [0, 1]
    pub scroll_threshold: f64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerKind::Delay,
            delay_ms: None,
            show_once: false,
            scroll_threshold: 0.5,
        }
    }
}

/// The popup currently candidate for display. The identity token resets
/// trigger-arm state when the candidate changes; a candidate without an
/// identity is still displayable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupCandidate {
    pub id: Option<Uuid>,
}

impl PopupCandidate {
    pub fn new(id: Uuid) -> Self {
        Self { id: Some(id) }
    }

    /// Candidate with no identity token (the CMS omitted the uuid)
    pub fn anonymous() -> Self {
        Self { id: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_kind_wire_names() {
        assert_eq!(
            serde_json::from_str::<TriggerKind>("\"delay\"").unwrap(),
            TriggerKind::Delay
        );
        assert_eq!(
            serde_json::from_str::<TriggerKind>("\"scroll\"").unwrap(),
            TriggerKind::Scroll
        );
        assert_eq!(
            serde_json::from_str::<TriggerKind>("\"exit\"").unwrap(),
            TriggerKind::Exit
        );
        // Anything else from the CMS maps to Unknown rather than failing
        assert_eq!(
            serde_json::from_str::<TriggerKind>("\"hover\"").unwrap(),
            TriggerKind::Unknown
        );
    }

    #[test]
    fn test_popup_config_defaults_missing_fields() {
        let config: PopupConfig = serde_json::from_str(r#"{"trigger":"scroll"}"#).unwrap();
        assert_eq!(config.trigger, TriggerKind::Scroll);
        assert_eq!(config.delay_ms, None);
        assert!(!config.show_once);
        assert_eq!(config.scroll_threshold, 0.5);
    }

    #[test]
    fn test_popup_config_camel_case() {
        let config: PopupConfig = serde_json::from_str(
            r#"{"trigger":"delay","delay":5000,"showOnce":true,"scrollThreshold":0.8}"#,
        )
        .unwrap();
        assert_eq!(config.delay_ms, Some(5000.0));
        assert!(config.show_once);
        assert_eq!(config.scroll_threshold, 0.8);
    }
}
