//! Engine configuration and the explicit patch entry point.
//!
//! Config changes take effect on the next cycle; an in-flight animation is
//! never retroactively altered. Side effects of a change (observer
//! re-subscription, host style restamp) are returned from [`AnimationConfig::apply`]
//! instead of being hidden inside field assignment.

use crate::ease::Ease;
use crate::error::{FlipError, FlipResult};

/// Default identity marker attribute.
pub const DEFAULT_IDENTITY_ATTR: &str = "data-flip-id";
/// Default marker class carrying the transition declaration.
pub const DEFAULT_MARKER_CLASS: &str = "flip-moving";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationConfig {
    /// Read lazily at cycle fire time, not snapshotted at schedule time.
    pub active: bool,
    pub identity_attr: String,
    pub duration_ms: u64,
    pub delay_ms: u64,
    pub easing: Ease,
    pub marker_class: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            active: true,
            identity_attr: DEFAULT_IDENTITY_ATTR.to_owned(),
            duration_ms: 200,
            delay_ms: 0,
            easing: Ease::EaseInOut,
            marker_class: DEFAULT_MARKER_CLASS.to_owned(),
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> FlipResult<()> {
        if self.identity_attr.trim().is_empty() {
            return Err(FlipError::config("identityAttr must not be empty"));
        }
        if self.marker_class.trim().is_empty() {
            return Err(FlipError::config("markerClass must not be empty"));
        }
        Ok(())
    }

    /// Transition declaration the host stamps onto the marker class.
    pub fn transition_css(&self) -> String {
        let (d, e, delay) = (self.duration_ms, self.easing.css_name(), self.delay_ms);
        format!("transform {d}ms {e} {delay}ms, opacity {d}ms {e} {delay}ms")
    }

    /// Time from play-phase start until the marker class is removed.
    pub fn cleanup_delay_ms(&self) -> u64 {
        self.delay_ms.saturating_add(self.duration_ms)
    }

    /// Merge a patch, returning which external side effects it requires.
    ///
    /// Identity-attr changes need an observer re-subscription; timing and
    /// marker changes alter the generated transition declaration, so the
    /// host must restamp it. Toggling `active` needs neither: the flag is
    /// read at fire time.
    pub fn apply(&mut self, patch: &ConfigPatch) -> SideEffects {
        let mut effects = SideEffects::default();

        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(attr) = &patch.identity_attr {
            if *attr != self.identity_attr {
                effects.resubscribe = true;
            }
            self.identity_attr = attr.clone();
        }
        if let Some(d) = patch.duration_ms {
            effects.rerender |= d != self.duration_ms;
            self.duration_ms = d;
        }
        if let Some(d) = patch.delay_ms {
            effects.rerender |= d != self.delay_ms;
            self.delay_ms = d;
        }
        if let Some(e) = patch.easing {
            effects.rerender |= e != self.easing;
            self.easing = e;
        }
        if let Some(class) = &patch.marker_class {
            effects.rerender |= *class != self.marker_class;
            self.marker_class = class.clone();
        }

        effects
    }
}

/// Partial configuration, typically parsed from a host attribute string.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub active: Option<bool>,
    pub identity_attr: Option<String>,
    pub duration_ms: Option<u64>,
    pub delay_ms: Option<u64>,
    pub easing: Option<Ease>,
    pub marker_class: Option<String>,
}

impl ConfigPatch {
    pub fn from_json_str(raw: &str) -> FlipResult<Self> {
        serde_json::from_str(raw).map_err(|e| FlipError::config(format!("invalid config JSON: {e}")))
    }
}

/// What a config change obliges the engine/host to do next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SideEffects {
    /// Re-watch the identity attribute on tracked children.
    pub resubscribe: bool,
    /// Restamp the host's marker-class transition declaration.
    pub rerender: bool,
}
