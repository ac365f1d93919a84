//! Flipkit is a FLIP (First-Last-Invert-Play) layout-diff animation engine.
//!
//! When a host reorders, resizes, or fades a set of sibling elements, the
//! engine detects the per-child layout delta and plays a transform/opacity
//! transition from the old visual state to the new one.
//!
//! # Cycle overview
//!
//! 1. **Signal**: host mutation observers call [`FlipEngine::trigger`];
//!    bursts coalesce into one pending cycle.
//! 2. **Collect**: a fresh [`SnapshotMap`] is built over the live children,
//!    keyed by the identity attribute ([`collect_snapshot`]).
//! 3. **Diff + revert**: changed children are synchronously forced back to
//!    their old visual state relative to the new layout ([`diff_and_revert`]).
//! 4. **Play**: at the next frame boundary the marker class re-arms the
//!    transition and each child is released to its natural final state.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Host-abstracted**: all DOM-ish reads, writes, subscriptions and
//!   deferrals go through the [`HostEnv`] trait; the core holds no I/O.
//! - **Single-threaded**: suspension only via the host's microtask and
//!   frame tiers; no locks, one logical writer of the persisted map.
//! - **No fatal errors**: per-child failures degrade to a missed transition,
//!   never a crash or a corrupted map.
#![forbid(unsafe_code)]

pub mod animator;
pub mod config;
pub mod ease;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod snapshot;

pub use animator::{PlayAction, cleanup, diff_and_revert, play};
pub use config::{
    AnimationConfig, ConfigPatch, DEFAULT_IDENTITY_ATTR, DEFAULT_MARKER_CLASS, SideEffects,
};
pub use ease::Ease;
pub use engine::FlipEngine;
pub use error::{FlipError, FlipResult};
pub use geometry::{
    GeometrySnapshot, LAYOUT_TOLERANCE, LayoutDelta, Offset, parse_opacity, parse_scale,
    transform_css,
};
pub use host::{HostCallback, HostEnv, TimingTier};
pub use snapshot::{SnapshotMap, TrackedChild, collect_snapshot, extract_geometry};
