//! Reconciler
//!
//! The [`Reconciler`] is the caller-facing entry point. It owns the instance
//! arena and the backend, and drives passes over them.
//!
//! # Passes
//!
//! A pass is one caller-initiated diff (`render`, `diff`, `diff_list`,
//! `unmount`) or one observable-triggered re-render. Every pass ends with a
//! commit:
//!
//! 1. ref callbacks fire for the instances created during the pass;
//! 2. `updated` listeners fire for every instance created or changed;
//! 3. replaced and removed instances are destroyed.
//!
//! After a caller-initiated pass, queued re-renders are drained, each as its
//! own pass, up to [`Config::max_rerenders_per_flush`].
//!
//! # Re-entrancy
//!
//! Component render functions run while the pass holds the tree. A change
//! notification arriving then (for example an observable set from inside a
//! render) is queued or rejected according to [`ReentrancyPolicy`]. Calling
//! back into the reconciler from a render fails with
//! [`ReconcileError::Busy`].
//!
//! # Failure
//!
//! The first error halts the reconciler. Caller-initiated passes return it;
//! errors from notification-triggered passes are logged and kept for
//! [`Reconciler::take_error`]. Every later pass fails with
//! [`ReconcileError::Halted`].

mod mount;
mod tree;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, warn};

pub use mount::{Mount, Surface};

use crate::backend::{Backend, WidgetHandle};
use crate::config::{Config, ReentrancyPolicy};
use crate::error::{ReconcileError, Result};
use crate::instance::{Instance, InstanceId};
use crate::tree::Node;
use tree::{Tree, Wake};

/// Handle returned by [`Reconciler::on_updated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

type UpdatedListener = Rc<dyn Fn(&Reconciler, InstanceId)>;

struct Shared {
    tree: RefCell<Tree>,
    config: Config,
    /// The bound root node of the last `render`.
    root: RefCell<Option<Node>>,
    queue: RefCell<VecDeque<InstanceId>>,
    busy: Cell<bool>,
    halted: Cell<bool>,
    /// Error raised inside a pass with no direct caller (rejected re-entry).
    pending: RefCell<Option<ReconcileError>>,
    /// Error from a notification-triggered pass.
    last_error: RefCell<Option<ReconcileError>>,
    listeners: RefCell<Vec<(ListenerId, UpdatedListener)>>,
}

/// Keyed tree reconciler over a [`Backend`].
///
/// Cloning yields another handle to the same reconciler.
///
/// ```rust,ignore
/// let reconciler = Reconciler::new(RecordingBackend::new());
/// let label = Kind::host("Label", HostSpec::leaf());
///
/// let root = reconciler.render(Node::new(&label).prop("text", "hello"))?;
/// reconciler.render(Node::new(&label).prop("text", "bye"))?; // same instance, one property set
/// ```
#[derive(Clone)]
pub struct Reconciler {
    shared: Rc<Shared>,
}

impl Reconciler {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::with_config(backend, Config::default())
    }

    pub fn with_config(backend: impl Backend + 'static, config: Config) -> Self {
        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            let wake: Wake = Rc::new(move |id| {
                if let Some(shared) = weak.upgrade() {
                    Reconciler { shared }.request_update(id);
                }
            });

            Shared {
                tree: RefCell::new(Tree::new(Box::new(backend), config.clone(), wake)),
                config,
                root: RefCell::new(None),
                queue: RefCell::new(VecDeque::new()),
                busy: Cell::new(false),
                halted: Cell::new(false),
                pending: RefCell::new(None),
                last_error: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
            }
        });
        Self { shared }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Reconcile `node` against the previously rendered root and return the
    /// root instance.
    pub fn render(&self, node: Node) -> Result<InstanceId> {
        self.run(|this, tree| {
            let old = this.shared.root.borrow_mut().take();
            let (id, root) = tree.reconcile(old, node, None)?;
            *this.shared.root.borrow_mut() = Some(root);
            Ok(id)
        })
    }

    /// Reconcile one detached node. The returned node is bound to its
    /// instance and is the `old` argument of the next call.
    pub fn diff(&self, old: Option<Node>, new: Node) -> Result<Node> {
        self.run(|_, tree| tree.diff(old, new, None))
    }

    /// Reconcile a detached sibling list.
    pub fn diff_list(&self, old: Vec<Node>, new: Vec<Node>) -> Result<Vec<Node>> {
        self.run(|_, tree| tree.diff_list(old, new, None))
    }

    /// Destroy the instance bound to a detached node, and everything it owns.
    pub fn destroy(&self, node: &Node) -> Result<()> {
        let id = node.instance();
        self.run(|_, tree| {
            if let Some(id) = id {
                tree.doom(id);
            }
            Ok(())
        })
    }

    /// Destroy the rendered root.
    pub fn unmount(&self) -> Result<()> {
        self.run(|this, tree| {
            let root = this.shared.root.borrow_mut().take();
            if let Some(id) = root.and_then(|root| root.instance()) {
                tree.doom(id);
            }
            Ok(())
        })
    }

    /// Root instance of the last `render`.
    pub fn root(&self) -> Option<InstanceId> {
        self.shared.root.borrow().as_ref().and_then(Node::instance)
    }

    /// Widgets surfaced by an instance, in order.
    pub fn widgets(&self, id: InstanceId) -> Result<Vec<WidgetHandle>> {
        let tree = self.shared.tree.try_borrow().map_err(|_| ReconcileError::Busy)?;
        Ok(tree.get_widgets(id)?.into_vec())
    }

    /// Run `f` against a live instance.
    pub fn inspect<R>(&self, id: InstanceId, f: impl FnOnce(&Instance) -> R) -> Result<R> {
        let tree = self.shared.tree.try_borrow().map_err(|_| ReconcileError::Busy)?;
        tree.instance(id).map(f).ok_or(ReconcileError::UnknownInstance(id))
    }

    /// Whether `id` is a live instance.
    ///
    /// While a pass holds the tree, as it does during a render, this
    /// answers `false`; use [`inspect`](Self::inspect) to tell that case
    /// apart through [`ReconcileError::Busy`].
    pub fn contains(&self, id: InstanceId) -> bool {
        self.shared.tree.try_borrow().map(|tree| tree.contains(id)).unwrap_or(false)
    }

    /// Number of live instances, or zero while a pass holds the tree.
    pub fn instance_count(&self) -> usize {
        self.shared.tree.try_borrow().map(|tree| tree.len()).unwrap_or(0)
    }

    /// Ask for a component to be re-rendered.
    ///
    /// Outside a pass the re-render runs immediately, followed by anything it
    /// queues. Inside a pass the request follows the re-entrancy policy.
    pub fn request_update(&self, id: InstanceId) {
        if self.shared.halted.get() {
            debug!(id = %id, "ignoring update request on halted reconciler");
            return;
        }

        if self.shared.busy.get() {
            match self.shared.config.reentrancy {
                ReentrancyPolicy::Queue => {
                    debug!(id = %id, "queueing re-entrant update");
                    self.enqueue(id);
                }
                ReentrancyPolicy::Reject => {
                    warn!(id = %id, "rejecting re-entrant update");
                    self.shared
                        .pending
                        .borrow_mut()
                        .get_or_insert(ReconcileError::Reentrant { id });
                }
            }
            return;
        }

        self.enqueue(id);
        self.shared.busy.set(true);
        let result = self.drain();
        self.shared.busy.set(false);

        if let Err(err) = result {
            self.halt(&err);
            self.shared.last_error.borrow_mut().get_or_insert(err);
        }
    }

    /// Register a listener called at commit for every instance created or
    /// updated by the pass.
    pub fn on_updated(&self, listener: impl Fn(&Reconciler, InstanceId) + 'static) -> ListenerId {
        let id = ListenerId::new();
        self.shared.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.shared.listeners.borrow_mut().retain(|(listener, _)| *listener != id);
    }

    /// Take the error that halted a notification-triggered pass, if any.
    pub fn take_error(&self) -> Option<ReconcileError> {
        self.shared.last_error.borrow_mut().take()
    }

    pub fn is_halted(&self) -> bool {
        self.shared.halted.get()
    }

    /// Destroy every live instance and forget the root.
    pub fn teardown(&self) -> Result<()> {
        if self.shared.busy.get() {
            return Err(ReconcileError::Busy);
        }
        let mut tree = self.shared.tree.try_borrow_mut().map_err(|_| ReconcileError::Busy)?;
        self.shared.root.borrow_mut().take();
        self.shared.queue.borrow_mut().clear();
        tree.teardown();
        Ok(())
    }

    fn enqueue(&self, id: InstanceId) {
        let mut queue = self.shared.queue.borrow_mut();
        if !queue.contains(&id) {
            queue.push_back(id);
        }
    }

    fn halt(&self, err: &ReconcileError) {
        self.shared.halted.set(true);
        self.shared.queue.borrow_mut().clear();
        error!(error = %err, "reconciler halted");
    }

    /// Run a caller-initiated pass followed by the queued re-renders.
    fn run<R>(&self, op: impl FnOnce(&Self, &mut Tree) -> Result<R>) -> Result<R> {
        if self.shared.halted.get() {
            return Err(ReconcileError::Halted);
        }
        if self.shared.busy.replace(true) {
            return Err(ReconcileError::Busy);
        }

        let result = self.pass(op).and_then(|value| self.drain().map(|()| value));
        self.shared.busy.set(false);

        if let Err(err) = &result {
            self.halt(err);
        }
        result
    }

    fn drain(&self) -> Result<()> {
        let limit = self.shared.config.max_rerenders_per_flush;
        let mut rerenders = 0;

        loop {
            let Some(id) = self.shared.queue.borrow_mut().pop_front() else {
                return Ok(());
            };
            rerenders += 1;
            if rerenders > limit {
                return Err(ReconcileError::RenderLoop { limit });
            }
            self.pass(|_, tree| tree.rerender(id))?;
        }
    }

    fn pass<R>(&self, op: impl FnOnce(&Self, &mut Tree) -> Result<R>) -> Result<R> {
        let result = {
            let mut tree = self.shared.tree.try_borrow_mut().map_err(|_| ReconcileError::Busy)?;
            op(self, &mut *tree)
        };

        match result {
            Ok(value) => {
                self.commit();
                match self.shared.pending.borrow_mut().take() {
                    Some(err) => Err(err),
                    None => Ok(value),
                }
            }
            Err(err) => {
                let mut tree = self.shared.tree.borrow_mut();
                tree.discard_events();
                tree.flush_doomed();
                Err(err)
            }
        }
    }

    fn commit(&self) {
        let events = self.shared.tree.borrow_mut().take_events();

        for (callback, id) in events.refs {
            callback.call(id);
        }

        if !events.updated.is_empty() {
            let listeners: Vec<UpdatedListener> = self
                .shared
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            for id in events.updated {
                for listener in &listeners {
                    listener(self, id);
                }
            }
        }

        self.shared.tree.borrow_mut().flush_doomed();
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("root", &self.root())
            .field("instances", &self.instance_count())
            .field("busy", &self.shared.busy.get())
            .field("halted", &self.shared.halted.get())
            .finish()
    }
}
