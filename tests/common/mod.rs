#![allow(dead_code)] // each test binary uses a different subset of the mock

//! Deterministic scripted host for driving the engine through whole cycles.
//!
//! Microtask, frame, and timeout queues are explicit and pumped by the test:
//! `run_microtasks` drains to exhaustion (tasks queued during the drain run
//! in the same drain), `run_frame` runs one frame boundary (tasks queued
//! during it land in the next frame), `advance` moves the clock and fires
//! due timeouts. Every style write is recorded in order.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::mem;

use flipkit::{FlipError, FlipResult, HostCallback, HostEnv, Offset, TimingTier};

pub type El = u32;

pub const CONTAINER: El = 0;

#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    Transform {
        el: El,
        dx: f64,
        dy: f64,
        sx: f64,
        sy: f64,
    },
    Opacity {
        el: El,
        value: f64,
    },
    Class {
        el: El,
        name: String,
        on: bool,
    },
}

#[derive(Clone, Debug, Default)]
struct ChildState {
    attrs: HashMap<String, String>,
    top: f64,
    left: f64,
    transform: Option<String>,
    opacity: Option<String>,
    classes: HashSet<String>,
}

#[derive(Default)]
struct Dom {
    children: Vec<(El, ChildState)>,
    origin: (f64, f64), // container's own (top, left)
}

impl Dom {
    fn child_mut(&mut self, el: El) -> &mut ChildState {
        &mut self
            .children
            .iter_mut()
            .find(|(handle, _)| *handle == el)
            .expect("unknown element handle")
            .1
    }
}

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
pub struct MockHost {
    dom: RefCell<Dom>,
    microtasks: RefCell<VecDeque<Task>>,
    frames: RefCell<VecDeque<Task>>,
    timeouts: RefCell<Vec<(u64, u64, Task)>>, // (due, seq, task)
    timeout_seq: Cell<u64>,
    now_ms: Cell<u64>,
    writes: RefCell<Vec<Write>>,
    structure_cb: RefCell<Option<HostCallback>>,
    identity_cb: RefCell<Option<HostCallback>>,
    watched: RefCell<Vec<El>>,
    resubscribes: Cell<usize>,
    measures: Cell<usize>,
    fail_measure: RefCell<HashSet<El>>,
    fail_writes: RefCell<HashSet<El>>,
    collect_tier: Cell<TimingTier>,
}

impl MockHost {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        Self::default()
    }

    pub fn with_tier(tier: TimingTier) -> Self {
        let host = Self::new();
        host.collect_tier.set(tier);
        host
    }

    // --- scripted DOM ---

    pub fn add_child(&self, el: El, id: &str, top: f64, left: f64) {
        self.add_unkeyed_child(el, top, left);
        self.set_attr(el, "data-flip-id", Some(id));
    }

    pub fn add_unkeyed_child(&self, el: El, top: f64, left: f64) {
        self.dom.borrow_mut().children.push((
            el,
            ChildState {
                top,
                left,
                ..Default::default()
            },
        ));
    }

    pub fn remove_child(&self, el: El) {
        self.dom
            .borrow_mut()
            .children
            .retain(|(handle, _)| *handle != el);
    }

    pub fn set_attr(&self, el: El, attr: &str, value: Option<&str>) {
        let mut dom = self.dom.borrow_mut();
        let child = dom.child_mut(el);
        match value {
            Some(v) => {
                child.attrs.insert(attr.to_owned(), v.to_owned());
            }
            None => {
                child.attrs.remove(attr);
            }
        }
    }

    pub fn move_child(&self, el: El, top: f64, left: f64) {
        let mut dom = self.dom.borrow_mut();
        let child = dom.child_mut(el);
        child.top = top;
        child.left = left;
    }

    pub fn set_transform(&self, el: El, transform: Option<&str>) {
        self.dom.borrow_mut().child_mut(el).transform = transform.map(str::to_owned);
    }

    pub fn set_opacity_style(&self, el: El, opacity: Option<&str>) {
        self.dom.borrow_mut().child_mut(el).opacity = opacity.map(str::to_owned);
    }

    pub fn set_container_origin(&self, top: f64, left: f64) {
        self.dom.borrow_mut().origin = (top, left);
    }

    pub fn fail_writes_for(&self, el: El) {
        self.fail_writes.borrow_mut().insert(el);
    }

    pub fn fail_measure_for(&self, el: El) {
        self.fail_measure.borrow_mut().insert(el);
    }

    pub fn clear_measure_failures(&self) {
        self.fail_measure.borrow_mut().clear();
    }

    // --- observer signals (async delivery simulated by the test) ---

    pub fn signal_structure(&self) {
        let cb = self.structure_cb.borrow().clone();
        if let Some(cb) = cb {
            cb();
        }
    }

    pub fn signal_identity_attr(&self) {
        let cb = self.identity_cb.borrow().clone();
        if let Some(cb) = cb {
            cb();
        }
    }

    // --- queue pumping ---

    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.microtasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    pub fn run_frame(&self) -> usize {
        let tasks: VecDeque<Task> = mem::take(&mut *self.frames.borrow_mut());
        let ran = tasks.len();
        for task in tasks {
            task();
        }
        ran
    }

    pub fn advance(&self, ms: u64) -> usize {
        self.now_ms.set(self.now_ms.get() + ms);
        let mut ran = 0;
        loop {
            let next = {
                let mut timeouts = self.timeouts.borrow_mut();
                let due_idx = (0..timeouts.len())
                    .filter(|&i| timeouts[i].0 <= self.now_ms.get())
                    .min_by_key(|&i| (timeouts[i].0, timeouts[i].1));
                due_idx.map(|i| timeouts.remove(i).2)
            };
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    // --- inspection ---

    pub fn writes(&self) -> Vec<Write> {
        self.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    pub fn transform_writes(&self) -> Vec<Write> {
        self.writes
            .borrow()
            .iter()
            .filter(|w| matches!(w, Write::Transform { .. }))
            .cloned()
            .collect()
    }

    pub fn has_class(&self, el: El, class: &str) -> bool {
        self.dom
            .borrow()
            .children
            .iter()
            .find(|(handle, _)| *handle == el)
            .is_some_and(|(_, c)| c.classes.contains(class))
    }

    pub fn watched_elements(&self) -> Vec<El> {
        self.watched.borrow().clone()
    }

    pub fn resubscribe_count(&self) -> usize {
        self.resubscribes.get()
    }

    pub fn measure_count(&self) -> usize {
        self.measures.get()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl HostEnv for MockHost {
    type Element = El;

    fn container(&self) -> El {
        CONTAINER
    }

    fn children(&self) -> Vec<El> {
        self.dom
            .borrow()
            .children
            .iter()
            .map(|(el, _)| *el)
            .collect()
    }

    fn identity(&self, el: &El, attr: &str) -> Option<String> {
        self.dom
            .borrow()
            .children
            .iter()
            .find(|(handle, _)| handle == el)
            .and_then(|(_, c)| c.attrs.get(attr).cloned())
    }

    fn measure_layout(&self, el: &El, _container: &El) -> FlipResult<Offset> {
        self.measures.set(self.measures.get() + 1);
        if self.fail_measure.borrow().contains(el) {
            return Err(FlipError::host("measure refused"));
        }
        let dom = self.dom.borrow();
        let (_, child) = dom
            .children
            .iter()
            .find(|(handle, _)| handle == el)
            .ok_or_else(|| FlipError::host("element detached"))?;
        Ok(Offset {
            top: child.top - dom.origin.0,
            left: child.left - dom.origin.1,
        })
    }

    fn computed_transform(&self, el: &El) -> FlipResult<Option<String>> {
        Ok(self
            .dom
            .borrow()
            .children
            .iter()
            .find(|(handle, _)| handle == el)
            .and_then(|(_, c)| c.transform.clone()))
    }

    fn computed_opacity(&self, el: &El) -> FlipResult<Option<String>> {
        Ok(self
            .dom
            .borrow()
            .children
            .iter()
            .find(|(handle, _)| handle == el)
            .and_then(|(_, c)| c.opacity.clone()))
    }

    fn write_transform(&self, el: &El, dx: f64, dy: f64, sx: f64, sy: f64) -> FlipResult<()> {
        if self.fail_writes.borrow().contains(el) {
            return Err(FlipError::host("write refused"));
        }
        self.writes.borrow_mut().push(Write::Transform {
            el: *el,
            dx,
            dy,
            sx,
            sy,
        });
        Ok(())
    }

    fn write_opacity(&self, el: &El, value: f64) -> FlipResult<()> {
        if self.fail_writes.borrow().contains(el) {
            return Err(FlipError::host("write refused"));
        }
        self.writes
            .borrow_mut()
            .push(Write::Opacity { el: *el, value });
        Ok(())
    }

    fn toggle_class(&self, el: &El, class: &str, on: bool) -> FlipResult<()> {
        if self.fail_writes.borrow().contains(el) {
            return Err(FlipError::host("write refused"));
        }
        {
            let mut dom = self.dom.borrow_mut();
            if let Some((_, child)) = dom.children.iter_mut().find(|(handle, _)| handle == el) {
                if on {
                    child.classes.insert(class.to_owned());
                } else {
                    child.classes.remove(class);
                }
            }
        }
        self.writes.borrow_mut().push(Write::Class {
            el: *el,
            name: class.to_owned(),
            on,
        });
        Ok(())
    }

    fn watch_structure(&self, cb: HostCallback) {
        *self.structure_cb.borrow_mut() = Some(cb);
    }

    fn watch_identity_attr(&self, elements: &[El], _attr: &str, cb: HostCallback) {
        self.resubscribes.set(self.resubscribes.get() + 1);
        *self.watched.borrow_mut() = elements.to_vec();
        *self.identity_cb.borrow_mut() = Some(cb);
    }

    fn defer_microtask(&self, f: Box<dyn FnOnce()>) {
        self.microtasks.borrow_mut().push_back(f);
    }

    fn defer_frame(&self, f: Box<dyn FnOnce()>) {
        self.frames.borrow_mut().push_back(f);
    }

    fn defer_timeout(&self, f: Box<dyn FnOnce()>, ms: u64) {
        let seq = self.timeout_seq.get();
        self.timeout_seq.set(seq + 1);
        self.timeouts
            .borrow_mut()
            .push((self.now_ms.get() + ms, seq, f));
    }

    fn preferred_collect_tier(&self) -> TimingTier {
        self.collect_tier.get()
    }
}
