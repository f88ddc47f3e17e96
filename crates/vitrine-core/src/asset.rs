//! Model asset lifecycle and load bookkeeping

use std::fmt;

use crate::graph::DecodedScene;

/// Generation number attached to every load request
///
/// Only the most recently issued ticket is honoured; anything older belongs
/// to a URL the viewport has since moved away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues tickets and remembers which one is current
#[derive(Debug, Default)]
pub struct LoadTracker {
    next: u64,
    latest: Option<LoadTicket>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> LoadTicket {
        self.next += 1;
        let ticket = LoadTicket(self.next);
        self.latest = Some(ticket);
        ticket
    }

    pub fn latest(&self) -> Option<LoadTicket> {
        self.latest
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.latest == Some(ticket)
    }

    /// Forget the current ticket so that no in-flight result is accepted
    pub fn invalidate(&mut self) {
        self.latest = None;
    }
}

/// Load progress as a percentage in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct LoadProgress(f32);

impl LoadProgress {
    pub const ZERO: Self = Self(0.0);
    pub const COMPLETE: Self = Self(100.0);

    /// Clamp to [0, 100]; NaN counts as no progress
    pub fn from_percent(percent: f32) -> Self {
        if percent.is_nan() {
            return Self::ZERO;
        }
        Self(percent.clamp(0.0, 100.0))
    }

    /// `loaded / total * 100`, or `None` when the total is unknown
    ///
    /// For loaders that see byte counts. The Bevy backend reports load
    /// phases instead, since its asset server does not expose bytes.
    pub fn from_bytes(loaded: u64, total: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        Some(Self::from_percent(loaded as f32 / total as f32 * 100.0))
    }

    pub fn percent(&self) -> f32 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 >= 100.0
    }

    /// Progress bar text: hidden at 0 and 100, two decimals otherwise
    pub fn label(&self) -> Option<String> {
        if self.0 <= 0.0 || self.is_complete() {
            None
        } else {
            Some(format!("{:.2}%", self.0))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    NotRequested,
    Loading { progress: LoadProgress },
    Ready,
    Failed { error: String },
}

/// A model identified by its source URL
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    url: String,
    state: AssetState,
}

impl ModelAsset {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: AssetState::NotRequested,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &AssetState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, AssetState::Ready)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AssetState::Loading { .. })
    }

    pub fn progress(&self) -> LoadProgress {
        match self.state {
            AssetState::Loading { progress } => progress,
            AssetState::Ready => LoadProgress::COMPLETE,
            AssetState::NotRequested | AssetState::Failed { .. } => LoadProgress::ZERO,
        }
    }

    /// Enter `Loading`; returns false if a load is in flight or already done
    pub fn begin(&mut self) -> bool {
        match self.state {
            AssetState::NotRequested | AssetState::Failed { .. } => {
                self.state = AssetState::Loading {
                    progress: LoadProgress::ZERO,
                };
                true
            }
            AssetState::Loading { .. } | AssetState::Ready => false,
        }
    }

    /// Record progress, never moving backwards. Returns the stored value.
    pub fn record_progress(&mut self, update: LoadProgress) -> Option<LoadProgress> {
        match &mut self.state {
            AssetState::Loading { progress } => {
                if update > *progress {
                    *progress = update;
                }
                Some(*progress)
            }
            _ => None,
        }
    }

    /// `Loading -> Ready`; returns false from any other state
    pub fn finish(&mut self) -> bool {
        if self.is_loading() {
            self.state = AssetState::Ready;
            true
        } else {
            false
        }
    }

    /// `Loading -> Failed`; returns false from any other state
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if !self.is_loading() {
            return false;
        }
        self.state = AssetState::Failed {
            error: error.into(),
        };
        true
    }
}

/// What a model loader reports back for a ticket
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Loaded(DecodedScene),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_only_latest_is_current() {
        let mut tracker = LoadTracker::new();
        let a = tracker.issue();
        let b = tracker.issue();
        assert!(!tracker.is_current(a));
        assert!(tracker.is_current(b));
        assert!(a < b);

        tracker.invalidate();
        assert!(!tracker.is_current(b));
        assert_eq!(tracker.latest(), None);
    }

    #[test]
    fn test_progress_from_bytes_guards_zero_total() {
        assert_eq!(LoadProgress::from_bytes(10, 0), None);
        assert_eq!(
            LoadProgress::from_bytes(25, 100).map(|p| p.percent()),
            Some(25.0)
        );
        assert_eq!(
            LoadProgress::from_bytes(300, 100).map(|p| p.percent()),
            Some(100.0)
        );
    }

    #[test]
    fn test_progress_clamps_and_ignores_nan() {
        assert_eq!(LoadProgress::from_percent(-5.0).percent(), 0.0);
        assert_eq!(LoadProgress::from_percent(f32::NAN).percent(), 0.0);
        assert_eq!(LoadProgress::from_percent(f32::INFINITY).percent(), 100.0);
    }

    #[test]
    fn test_progress_label_hidden_at_bounds() {
        assert_eq!(LoadProgress::ZERO.label(), None);
        assert_eq!(LoadProgress::COMPLETE.label(), None);
        assert_eq!(
            LoadProgress::from_percent(33.333).label().as_deref(),
            Some("33.33%")
        );
    }

    #[test]
    fn test_asset_progress_is_monotonic() {
        let mut asset = ModelAsset::new("model.glb");
        assert!(asset.begin());
        asset.record_progress(LoadProgress::from_percent(40.0));
        asset.record_progress(LoadProgress::from_percent(20.0));
        assert_eq!(asset.progress().percent(), 40.0);
    }

    #[test]
    fn test_asset_ready_once() {
        let mut asset = ModelAsset::new("model.glb");
        assert!(!asset.finish());
        assert!(asset.begin());
        assert!(!asset.begin());
        assert!(asset.finish());
        assert!(!asset.finish());
        assert!(!asset.begin());
        assert!(asset.is_ready());
        assert_eq!(asset.progress(), LoadProgress::COMPLETE);
    }

    #[test]
    fn test_failed_asset_can_retry() {
        let mut asset = ModelAsset::new("missing.glb");
        assert!(!asset.fail("too early"));
        asset.begin();
        assert!(asset.fail("404"));
        assert_eq!(
            asset.state(),
            &AssetState::Failed {
                error: "404".into()
            }
        );
        assert!(asset.begin());
    }

    #[test]
    fn test_ready_asset_ignores_failure() {
        let mut asset = ModelAsset::new("model.glb");
        asset.begin();
        asset.finish();
        assert!(!asset.fail("late"));
        assert!(asset.is_ready());
    }
}
