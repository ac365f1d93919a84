//! The host-environment seam.
//!
//! The engine never touches a real DOM; it runs against [`HostEnv`], which a
//! deployment implements over its document/query primitives. Structure reads,
//! computed-style reads, style writes, mutation subscriptions, and the two
//! deferral tiers all live behind this trait, which is what makes the core
//! testable against a scripted mock.

use std::rc::Rc;

use crate::error::FlipResult;
use crate::geometry::Offset;

/// Shared change-signal callback. Single-threaded by design: the engine runs
/// entirely on the host's event loop, so `Rc` suffices.
pub type HostCallback = Rc<dyn Fn()>;

/// Which deferral tier drives the first geometry collection pass of a cycle.
///
/// Microtask callbacks fire before the next paint on every engine; frame
/// callbacks are paint-synchronized but on some engines run after the paint,
/// which shows the jumped layout for one frame. The probe picks a strategy
/// once at construction; the play phase always uses frame timing regardless,
/// so the reveal is coupled to the frame actually painted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingTier {
    Microtask,
    #[default]
    Frame,
}

/// Capabilities the engine requires from its host environment.
///
/// Read methods must be pure with respect to style (no writes, no forced
/// layout mutation). Write methods may fail; the engine isolates failures
/// per child and never aborts a cycle over them.
pub trait HostEnv {
    /// Non-owning handle to a live element. The host tree owns the element;
    /// the engine only correlates handles across cycles. Handles end up in
    /// deferred play/cleanup closures, hence `'static`.
    type Element: Clone + 'static;

    /// The structural container whose children are tracked.
    fn container(&self) -> Self::Element;

    /// Current candidate children, in live order.
    fn children(&self) -> Vec<Self::Element>;

    /// Value of the identity marker on `el`, if present. Compared by exact
    /// value; no normalization.
    fn identity(&self, el: &Self::Element, attr: &str) -> Option<String>;

    /// Container-relative visual top/left of `el`.
    fn measure_layout(&self, el: &Self::Element, container: &Self::Element) -> FlipResult<Offset>;

    /// Raw computed transform string (`none`, `matrix(..)`, ...), if any.
    /// Parsing happens engine-side; see [`crate::geometry::parse_scale`].
    fn computed_transform(&self, el: &Self::Element) -> FlipResult<Option<String>>;

    /// Raw computed opacity string, if any.
    fn computed_opacity(&self, el: &Self::Element) -> FlipResult<Option<String>>;

    /// Set `el`'s transform to `translate(dx, dy) scale(sx, sy)`.
    fn write_transform(
        &self,
        el: &Self::Element,
        dx: f64,
        dy: f64,
        sx: f64,
        sy: f64,
    ) -> FlipResult<()>;

    fn write_opacity(&self, el: &Self::Element, value: f64) -> FlipResult<()>;

    fn toggle_class(&self, el: &Self::Element, class: &str, on: bool) -> FlipResult<()>;

    /// Subscribe to children being added, removed, or reordered. Signals are
    /// delivered asynchronously and may batch several underlying events.
    fn watch_structure(&self, cb: HostCallback);

    /// Watch the identity attribute on the given elements, replacing any
    /// previous watch set.
    ///
    /// The watcher must be scoped to `attr` only, never class or style,
    /// or the engine would observe its own marker-class and transform writes
    /// as fresh change signals and loop.
    fn watch_identity_attr(&self, elements: &[Self::Element], attr: &str, cb: HostCallback);

    /// Run `f` on the microtask queue (before the next paint). FIFO,
    /// non-preemptive.
    fn defer_microtask(&self, f: Box<dyn FnOnce()>);

    /// Run `f` at the next animation-frame boundary. FIFO, non-preemptive.
    fn defer_frame(&self, f: Box<dyn FnOnce()>);

    /// Run `f` after at least `ms` milliseconds.
    fn defer_timeout(&self, f: Box<dyn FnOnce()>, ms: u64);

    /// Capability probe for the collection tier, read once at engine
    /// construction.
    fn preferred_collect_tier(&self) -> TimingTier {
        TimingTier::Frame
    }
}
