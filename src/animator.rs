//! Diff two snapshots and drive the two-phase animation.
//!
//! The revert phase runs synchronously inside the collection callback: with
//! the marker class off (no transition armed), each changed child is forced
//! back to its old visual state expressed relative to the new layout
//! position. The play phase runs at the next frame boundary: the marker
//! class comes back (arming the transition) and the child is released to its
//! natural final state, so the browser animates the gap. Reversing that
//! order breaks the illusion of motion.

use crate::config::AnimationConfig;
use crate::error::FlipResult;
use crate::geometry::{GeometrySnapshot, LayoutDelta};
use crate::host::HostEnv;
use crate::snapshot::{SnapshotMap, TrackedChild};

/// Deferred play-phase work for one changed child.
#[derive(Clone, Debug)]
pub struct PlayAction<E> {
    pub identity: String,
    pub element: E,
    /// The natural final geometry the child is released to.
    pub to: GeometrySnapshot,
}

/// Compare `previous` against `current`, revert every visibly changed child
/// in place, and return the play actions to run at the next frame boundary.
///
/// Identities new in `current` are skipped; they appear directly in their
/// final place. A child whose writes fail is skipped with a warning and the
/// rest of the cycle proceeds; its geometry diff self-corrects next cycle.
pub fn diff_and_revert<H: HostEnv>(
    host: &H,
    config: &AnimationConfig,
    previous: &SnapshotMap<H::Element>,
    current: &SnapshotMap<H::Element>,
) -> Vec<PlayAction<H::Element>> {
    let mut actions = Vec::new();
    for (identity, child) in current {
        let Some(prev) = previous.get(identity) else {
            continue;
        };
        let delta = child.geometry.delta_from(&prev.geometry);
        if !delta.is_visible_change() {
            continue;
        }
        if let Err(err) = revert_child(host, config, child, &prev.geometry, &delta) {
            tracing::warn!(%identity, error = %err, "revert write failed; skipping child this cycle");
            continue;
        }
        actions.push(PlayAction {
            identity: identity.clone(),
            element: child.element.clone(),
            to: child.geometry,
        });
    }
    tracing::debug!(
        changed = actions.len(),
        tracked = current.len(),
        "diff complete"
    );
    actions
}

/// Revert phase for one child: no transition active, old visual state forced
/// relative to the new layout position.
fn revert_child<H: HostEnv>(
    host: &H,
    config: &AnimationConfig,
    child: &TrackedChild<H::Element>,
    prev: &GeometrySnapshot,
    delta: &LayoutDelta,
) -> FlipResult<()> {
    host.toggle_class(&child.element, &config.marker_class, false)?;
    host.write_transform(
        &child.element,
        delta.d_left,
        delta.d_top,
        prev.scale_x,
        prev.scale_y,
    )?;
    host.write_opacity(&child.element, prev.opacity)
}

/// Play phase: runs once per cycle inside a single frame callback, so every
/// changed child starts moving in the same frame.
pub fn play<H: HostEnv>(host: &H, config: &AnimationConfig, actions: &[PlayAction<H::Element>]) {
    for action in actions {
        if let Err(err) = play_child(host, config, action) {
            tracing::warn!(identity = %action.identity, error = %err, "play write failed");
        }
    }
}

fn play_child<H: HostEnv>(
    host: &H,
    config: &AnimationConfig,
    action: &PlayAction<H::Element>,
) -> FlipResult<()> {
    host.toggle_class(&action.element, &config.marker_class, true)?;
    host.write_transform(&action.element, 0.0, 0.0, action.to.scale_x, action.to.scale_y)?;
    host.write_opacity(&action.element, action.to.opacity)
}

/// Drop the marker class after the transition has run, so later unrelated
/// style changes are not transitioned by accident.
pub fn cleanup<H: HostEnv>(host: &H, config: &AnimationConfig, actions: &[PlayAction<H::Element>]) {
    for action in actions {
        if let Err(err) = host.toggle_class(&action.element, &config.marker_class, false) {
            tracing::warn!(identity = %action.identity, error = %err, "cleanup class removal failed");
        }
    }
}
