//! Popup trigger engine
//!
//! One state machine with four input watchers, replacing the pile of
//! reactive dependency watchers with an explicit `reconcile` transition:
//! every input change tears down the active trigger first, then decides
//! whether to arm a new one. Browser concerns (timers, idle callbacks,
//! scroll metrics, the persisted seen flag) sit behind traits so the engine
//! runs under tests with fakes, using an adapter pattern for the host.
//!
//! The host is expected to:
//! - call [`PopupEngine::mount`] once the page is up,
//! - forward pointer/key/scroll/pointer-out events to
//!   [`PopupEngine::handle_event`],
//! - call [`PopupEngine::on_timer`] when a scheduled timeout fires and
//!   [`PopupEngine::on_idle`] when a requested idle callback completes,
//! - push input changes through the `set_*` methods,
//! - render [`PopupEngine::is_open`] as its modal signal.

use crate::rules::RouteRules;
use crate::{
    PopupCandidate, PopupConfig, TriggerKind, DEFAULT_MIN_DELAY_MS, DEFAULT_SEEN_KEY,
    IDLE_FALLBACK_MS, IDLE_TIMEOUT_MS, SEEN_TTL_SECS,
};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Handle for a scheduled timeout, issued by the host's [`Timers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Timer scheduling capability the host provides.
///
/// The host promises to call [`PopupEngine::on_timer`] with the returned id
/// when the timeout elapses, unless it was cleared first.
pub trait Timers {
    fn set_timeout(&mut self, after: Duration) -> TimerId;

    fn clear_timeout(&mut self, id: TimerId);

    /// Request an idle callback capped at `timeout`, after which the host
    /// calls [`PopupEngine::on_idle`]. Returns false when idle callbacks are
    /// unavailable; the engine then falls back to a plain timer.
    fn request_idle(&mut self, timeout: Duration) -> bool;
}

/// Scroll metrics of the hosting page. Queried per event rather than
/// cached, so documents that grow mid-scroll are measured as they are.
pub trait Viewport {
    /// Current vertical scroll offset in pixels
    fn scroll_offset(&self) -> f64;

    /// Full document height in pixels
    fn document_height(&self) -> f64;

    /// Visible viewport height in pixels
    fn viewport_height(&self) -> f64;
}

/// Persisted key-value store backing the "seen" flag (a cookie jar in the
/// browser). Values expire after `ttl_secs`.
pub trait SeenStore {
    fn get(&self, key: &str) -> Option<bool>;

    fn set(&mut self, key: &str, value: bool, ttl_secs: u64);
}

/// UI events the host forwards from its event sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    PointerDown,
    KeyDown,
    /// Vertical scroll position changed; the engine reads the offset from
    /// its [`Viewport`]
    Scroll,
    /// Pointer left an element. Exit intent is a pointer-out at the top of
    /// the viewport with nowhere else to go.
    PointerOut {
        client_y: f64,
        has_related_target: bool,
    },
}

/// Point-in-time view of the engine's output signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// Host renders this as its modal/dialog
    pub open: bool,
    /// Host may use this for conditional mounting
    pub route_allowed: bool,
    pub ready: bool,
}

/// Construction options for [`PopupEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub config: PopupConfig,
    pub rules: RouteRules,
    /// Floor under the configured delay
    pub min_delay: Duration,
    /// Key the seen flag is stored under
    pub seen_key: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            config: PopupConfig::default(),
            rules: RouteRules::allow_all(),
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            seen_key: DEFAULT_SEEN_KEY.to_string(),
        }
    }
}

/// The trigger mechanism currently armed. At most one exists per cycle;
/// re-arming always tears the previous one down first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Armed {
    Delay(TimerId),
    Scroll,
    Exit,
}

/// Listeners/timers waiting for the page to become interactively ready.
#[derive(Debug, Clone, Copy)]
struct ReadyWait {
    /// Fallback timer when idle callbacks are unavailable
    idle_timer: Option<TimerId>,
}

/// Decides, per page view, whether and when to reveal a promotional popup.
pub struct PopupEngine<T: Timers, V: Viewport, S: SeenStore> {
    timers: T,
    viewport: V,
    seen: S,

    config: PopupConfig,
    rules: RouteRules,
    min_delay: Duration,
    seen_key: String,

    // Watched inputs
    route_path: String,
    candidate: Option<PopupCandidate>,
    suppressed: bool,

    // Session state
    ready: bool,
    open: bool,
    has_triggered: bool,
    armed: Option<Armed>,
    ready_wait: Option<ReadyWait>,
    disposed: bool,
}

impl<T: Timers, V: Viewport, S: SeenStore> PopupEngine<T, V, S> {
    pub fn new(timers: T, viewport: V, seen: S, options: EngineOptions) -> Self {
        Self {
            timers,
            viewport,
            seen,
            config: options.config,
            rules: options.rules,
            min_delay: options.min_delay,
            seen_key: options.seen_key,
            route_path: "/".to_string(),
            candidate: None,
            suppressed: false,
            ready: false,
            open: false,
            has_triggered: false,
            armed: None,
            ready_wait: None,
            disposed: false,
        }
    }

    /// Start the readiness gate. No trigger arms before the first user
    /// interaction, an idle callback (capped at 3s), or a 1.5s fallback
    /// timer when idle callbacks are unavailable.
    pub fn mount(&mut self) {
        if self.disposed || self.ready || self.ready_wait.is_some() {
            return;
        }

        let idle_timer = if self
            .timers
            .request_idle(Duration::from_millis(IDLE_TIMEOUT_MS))
        {
            None
        } else {
            Some(
                self.timers
                    .set_timeout(Duration::from_millis(IDLE_FALLBACK_MS)),
            )
        };

        self.ready_wait = Some(ReadyWait { idle_timer });
    }

    /// Forward a UI event from the host's event sources.
    pub fn handle_event(&mut self, event: UiEvent) {
        if self.disposed {
            return;
        }

        // First interaction of any kind opens the readiness gate (one-shot)
        if self.ready_wait.is_some()
            && matches!(
                event,
                UiEvent::PointerDown | UiEvent::KeyDown | UiEvent::Scroll
            )
        {
            self.mark_ready();
        }

        match event {
            UiEvent::Scroll => {
                if self.armed == Some(Armed::Scroll) {
                    self.evaluate_scroll();
                }
            }
            UiEvent::PointerOut {
                client_y,
                has_related_target,
            } => {
                // Cursor leaving the top of the viewport toward browser chrome
                if self.armed == Some(Armed::Exit) && client_y <= 0.0 && !has_related_target {
                    self.show_modal_once();
                    self.teardown_trigger();
                }
            }
            _ => {}
        }
    }

    /// A timeout scheduled through [`Timers`] fired.
    pub fn on_timer(&mut self, id: TimerId) {
        if self.disposed {
            return;
        }

        if let Some(wait) = self.ready_wait {
            if wait.idle_timer == Some(id) {
                self.mark_ready();
                return;
            }
        }

        if self.armed == Some(Armed::Delay(id)) {
            self.armed = None;
            self.show_modal_once();
        }
    }

    /// A requested idle callback completed.
    pub fn on_idle(&mut self) {
        if self.disposed {
            return;
        }
        if self.ready_wait.is_some() {
            self.mark_ready();
        }
    }

    /// The route path changed. Resets the trigger cycle; force-closes when
    /// the new route is disallowed.
    pub fn set_route_path(&mut self, path: &str) {
        if self.disposed || path == self.route_path {
            return;
        }

        self.route_path = path.to_string();
        self.has_triggered = false;
        self.teardown_trigger();
        if !self.route_allowed() {
            self.open = false;
        }
        self.reconcile();
    }

    /// A new popup became candidate for display (or none is). An identity
    /// change gives the new candidate a fresh trigger cycle.
    pub fn set_candidate(&mut self, candidate: Option<PopupCandidate>) {
        if self.disposed {
            return;
        }

        let new_id: Option<Uuid> = candidate.as_ref().and_then(|c| c.id);
        let old_id: Option<Uuid> = self.candidate.as_ref().and_then(|c| c.id);
        if new_id != old_id {
            self.teardown_trigger();
            self.has_triggered = false;
        }

        self.candidate = candidate;
        self.reconcile();
    }

    /// Suppression force-closes and disarms; lifting it does not revive a
    /// cycle that already triggered.
    pub fn set_suppressed(&mut self, suppressed: bool) {
        if self.disposed || suppressed == self.suppressed {
            return;
        }

        self.suppressed = suppressed;
        if suppressed {
            self.open = false;
        }
        self.reconcile();
    }

    /// Swap the behavior configuration. Takes effect on the next arm; an
    /// already-armed cycle keeps running under the old config.
    pub fn set_config(&mut self, config: PopupConfig) {
        self.config = config;
    }

    /// Release every timer and listener. A disposed engine ignores all
    /// further events and callbacks.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.teardown_trigger();
        self.teardown_ready_wait();
        self.disposed = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn route_allowed(&self) -> bool {
        self.rules.is_allowed(&self.route_path)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            open: self.open,
            route_allowed: self.route_allowed(),
            ready: self.ready,
        }
    }

    fn mark_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.teardown_ready_wait();
        self.reconcile();
    }

    /// The single transition function: tear down the active trigger, then
    /// arm one mechanism if the full combination holds and this cycle has
    /// not already triggered.
    fn reconcile(&mut self) {
        self.teardown_trigger();

        let armable =
            self.candidate.is_some() && self.ready && self.route_allowed() && !self.suppressed;
        if !armable || self.has_triggered {
            return;
        }

        // The cycle is consumed at arm time, not at fire time
        self.has_triggered = true;

        match self.config.trigger {
            TriggerKind::Delay => {
                let id = self.timers.set_timeout(self.safe_delay());
                self.armed = Some(Armed::Delay(id));
            }
            TriggerKind::Scroll => {
                self.armed = Some(Armed::Scroll);
                // Evaluate right away for pages already scrolled past the
                // threshold
                self.evaluate_scroll();
            }
            TriggerKind::Exit => {
                self.armed = Some(Armed::Exit);
            }
            TriggerKind::Unknown => {}
        }
    }

    /// Configured delay clamped to something sane, with the minimum-delay
    /// floor applied.
    fn safe_delay(&self) -> Duration {
        let ms = self.config.delay_ms.unwrap_or(0.0);
        let ms = if ms.is_finite() && ms > 0.0 { ms } else { 0.0 };
        Duration::from_millis(ms as u64).max(self.min_delay)
    }

    fn evaluate_scroll(&mut self) {
        let scrollable = self.viewport.document_height() - self.viewport.viewport_height();
        // No scrollable content: the scroll trigger can never fire
        if scrollable <= 0.0 {
            return;
        }

        let percent = self.viewport.scroll_offset() / scrollable;
        let threshold = if self.config.scroll_threshold.is_finite() {
            self.config.scroll_threshold
        } else {
            1.0
        };

        if percent > threshold {
            self.show_modal_once();
            self.teardown_trigger();
        }
    }

    /// Idempotent within a cycle: no-ops when suppressed, disallowed,
    /// already open, or already seen under show-once.
    fn show_modal_once(&mut self) {
        if self.suppressed || !self.route_allowed() || self.open {
            return;
        }
        if self.config.show_once && self.seen.get(&self.seen_key) == Some(true) {
            return;
        }

        self.open = true;

        if self.config.show_once {
            self.seen.set(&self.seen_key, true, SEEN_TTL_SECS);
        }
    }

    fn teardown_trigger(&mut self) {
        if let Some(Armed::Delay(id)) = self.armed.take() {
            self.timers.clear_timeout(id);
        }
    }

    fn teardown_ready_wait(&mut self) {
        if let Some(wait) = self.ready_wait.take() {
            if let Some(id) = wait.idle_timer {
                self.timers.clear_timeout(id);
            }
        }
    }
}

impl<T: Timers, V: Viewport, S: SeenStore> Drop for PopupEngine<T, V, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
