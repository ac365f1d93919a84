//! The engine facade and the change-detection scheduler.
//!
//! Everything is single-threaded and cooperative: the engine suspends only
//! through the host's deferral tiers, and deferred closures hold `Weak`
//! handles so a dropped engine simply stops firing. There is exactly one
//! logical writer of the persisted [`SnapshotMap`], and it replaces the map
//! by single assignment at the end of a cycle.

use std::cell::RefCell;
use std::rc::Rc;

use crate::animator;
use crate::config::{AnimationConfig, ConfigPatch, SideEffects};
use crate::error::FlipResult;
use crate::host::{HostCallback, HostEnv, TimingTier};
use crate::snapshot::{self, SnapshotMap};

struct EngineState<E> {
    config: AnimationConfig,
    snapshot: SnapshotMap<E>,
    cycle_pending: bool,
}

/// The FLIP layout-diff engine.
///
/// Construction subscribes the structural watcher and takes a baseline
/// snapshot, so the first external reorder animates from a known state.
/// [`trigger`](Self::trigger) coalesces change signals into at most one
/// collection+diff pass per window.
pub struct FlipEngine<H: HostEnv + 'static> {
    host: Rc<H>,
    state: Rc<RefCell<EngineState<H::Element>>>,
    collect_tier: TimingTier,
}

impl<H: HostEnv + 'static> FlipEngine<H> {
    pub fn new(host: H, config: AnimationConfig) -> FlipResult<Self> {
        config.validate()?;
        let host = Rc::new(host);
        // Strategy probe happens once; the scheduler never re-sniffs.
        let collect_tier = host.preferred_collect_tier();
        let state = Rc::new(RefCell::new(EngineState {
            config,
            snapshot: SnapshotMap::new(),
            cycle_pending: false,
        }));
        let engine = Self {
            host,
            state,
            collect_tier,
        };
        engine.host.watch_structure(trigger_callback(
            &engine.host,
            &engine.state,
            engine.collect_tier,
        ));
        engine.refresh();
        Ok(engine)
    }

    /// The host environment this engine runs against.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> AnimationConfig {
        self.state.borrow().config.clone()
    }

    /// Identities currently tracked, sorted for stable output.
    pub fn tracked_identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.borrow().snapshot.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// External "something changed" signal. Returns immediately; the cycle
    /// runs on a later turn of the event loop. Signals arriving while a
    /// cycle is pending are coalesced into it.
    pub fn trigger(&self) {
        schedule_cycle(&self.host, &self.state, self.collect_tier);
    }

    /// Out-of-band snapshot collection without animating, for when cached
    /// geometry went stale (e.g. the host container was hidden). Updates the
    /// baseline even while inactive.
    pub fn refresh(&self) {
        refresh_now(&self.host, &self.state, self.collect_tier);
    }

    /// Merge a config patch. Takes effect on the next cycle; an in-flight
    /// animation is never altered. The engine performs the re-subscription
    /// itself when needed; `rerender` is returned for the host, whose style
    /// stamping lives outside this crate.
    pub fn set_config(&self, patch: &ConfigPatch) -> FlipResult<SideEffects> {
        let (merged, effects) = {
            let st = self.state.borrow();
            let mut merged = st.config.clone();
            let effects = merged.apply(patch);
            (merged, effects)
        };
        merged.validate()?;
        self.state.borrow_mut().config = merged;
        if effects.resubscribe {
            self.refresh();
        }
        Ok(effects)
    }
}

fn trigger_callback<H: HostEnv + 'static>(
    host: &Rc<H>,
    state: &Rc<RefCell<EngineState<H::Element>>>,
    tier: TimingTier,
) -> HostCallback {
    let host = Rc::downgrade(host);
    let state = Rc::downgrade(state);
    Rc::new(move || {
        if let (Some(host), Some(state)) = (host.upgrade(), state.upgrade()) {
            schedule_cycle(&host, &state, tier);
        }
    })
}

fn schedule_cycle<H: HostEnv + 'static>(
    host: &Rc<H>,
    state: &Rc<RefCell<EngineState<H::Element>>>,
    tier: TimingTier,
) {
    {
        let mut st = state.borrow_mut();
        if st.cycle_pending {
            tracing::debug!("change signal coalesced into pending cycle");
            return;
        }
        st.cycle_pending = true;
    }

    let run = {
        let host = Rc::downgrade(host);
        let state = Rc::downgrade(state);
        Box::new(move || {
            if let (Some(host), Some(state)) = (host.upgrade(), state.upgrade()) {
                run_cycle(&host, &state, tier);
            }
        })
    };
    match tier {
        TimingTier::Microtask => host.defer_microtask(run),
        TimingTier::Frame => host.defer_frame(run),
    }
}

#[tracing::instrument(skip_all)]
fn run_cycle<H: HostEnv + 'static>(
    host: &Rc<H>,
    state: &Rc<RefCell<EngineState<H::Element>>>,
    tier: TimingTier,
) {
    let config = {
        let mut st = state.borrow_mut();
        st.cycle_pending = false;
        // Read at fire time, not schedule time.
        if !st.config.active {
            tracing::debug!("engine inactive; cycle skipped");
            return;
        }
        st.config.clone()
    };

    let previous = state.borrow().snapshot.clone();
    let current = snapshot::collect_snapshot(host.as_ref(), &config.identity_attr, &previous);
    let actions = animator::diff_and_revert(host.as_ref(), &config, &previous, &current);

    // The persisted map becomes `current` right here, whether or not any
    // child animates.
    store_and_rewatch(host, state, &config, current, tier);

    if actions.is_empty() {
        return;
    }

    let weak_host = Rc::downgrade(host);
    host.defer_frame(Box::new(move || {
        let Some(host) = weak_host.upgrade() else {
            return;
        };
        animator::play(host.as_ref(), &config, &actions);

        let cleanup_host = Rc::downgrade(&host);
        let delay = config.cleanup_delay_ms();
        host.defer_timeout(
            Box::new(move || {
                if let Some(host) = cleanup_host.upgrade() {
                    animator::cleanup(host.as_ref(), &config, &actions);
                }
            }),
            delay,
        );
    }));
}

fn refresh_now<H: HostEnv + 'static>(
    host: &Rc<H>,
    state: &Rc<RefCell<EngineState<H::Element>>>,
    tier: TimingTier,
) {
    let config = state.borrow().config.clone();
    let previous = state.borrow().snapshot.clone();
    let current = snapshot::collect_snapshot(host.as_ref(), &config.identity_attr, &previous);
    store_and_rewatch(host, state, &config, current, tier);
}

fn store_and_rewatch<H: HostEnv + 'static>(
    host: &Rc<H>,
    state: &Rc<RefCell<EngineState<H::Element>>>,
    config: &AnimationConfig,
    current: SnapshotMap<H::Element>,
    tier: TimingTier,
) {
    let elements: Vec<H::Element> = current.values().map(|c| c.element.clone()).collect();
    state.borrow_mut().snapshot = current;
    host.watch_identity_attr(
        &elements,
        &config.identity_attr,
        trigger_callback(host, state, tier),
    );
}
