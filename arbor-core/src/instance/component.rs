//! Component Instances
//!
//! A component is user render logic. A [`ComponentInstance`] is one live use
//! of it in the tree, moving through
//! `Uninitialized -> Mounted -> (Updating -> Mounted)* -> Destroyed`.
//!
//! # Update protocol
//!
//! 1. For each prop change, release the subscription held for the old value,
//!    store the new value, and subscribe if the new value is observable.
//! 2. On the very first pass only: create the state (if the component has
//!    one), subscribe to it, and call `before_first_render`. Props are fully
//!    set by then.
//! 3. Render unconditionally with the current props and state.
//!
//! The reconciler then diffs the rendered nodes against the stored subtree
//! and hands the result back through [`ComponentInstance::finish_render`].
//! A change notification from any subscribed observable runs the same
//! protocol with an empty changeset.

use std::fmt;
use std::rc::Rc;

use crate::instance::InstanceId;
use crate::reactive::{Observable, ObservableRef, SubscriptionSlot, Subscriptions};
use crate::tree::{Change, Kind, Node, PropValue, Props};

/// Output of a render call: zero or more nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered(Vec<Node>);

impl Rendered {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.0
    }
}

impl From<Node> for Rendered {
    fn from(node: Node) -> Self {
        Self(vec![node])
    }
}

impl From<Vec<Node>> for Rendered {
    fn from(nodes: Vec<Node>) -> Self {
        Self(nodes)
    }
}

impl From<Option<Node>> for Rendered {
    fn from(node: Option<Node>) -> Self {
        Self(node.into_iter().collect())
    }
}

/// Component state: an observable created by the component itself.
#[derive(Debug, Clone, PartialEq)]
pub struct State(ObservableRef);

impl State {
    pub fn new<T: 'static>(observable: Observable<T>) -> Self {
        Self(observable.into())
    }

    /// Typed access to the state observable.
    pub fn observable<T: 'static>(&self) -> Option<Observable<T>> {
        self.0.downcast()
    }

    pub fn as_observable(&self) -> &ObservableRef {
        &self.0
    }
}

/// User render logic.
///
/// `render` must be a pure function of props and state: it may be called
/// any number of times, always synchronously, and must not call back into
/// the reconciler.
pub trait Component: 'static {
    /// Produce the component's subtree.
    fn render(&self, props: &Props, state: Option<&State>) -> Rendered;

    /// Build the component's state. Called once, after the initial props
    /// are stored and before the first render.
    fn create_state(&self, _props: &Props) -> Option<State> {
        None
    }

    /// Called once, right before the first render.
    fn before_first_render(&self, _props: &Props) {}
}

/// A stateless component backed by a closure.
pub struct FnComponent<F>(F);

impl<F> FnComponent<F>
where
    F: Fn(&Props, Option<&State>) -> Rendered + 'static,
{
    pub fn new(render: F) -> Self {
        Self(render)
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&Props, Option<&State>) -> Rendered + 'static,
{
    fn render(&self, props: &Props, state: Option<&State>) -> Rendered {
        (self.0)(props, state)
    }
}

/// Lifecycle phase of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Mounted,
    Updating,
    Destroyed,
}

/// A live component.
pub struct ComponentInstance {
    kind: Kind,
    component: Rc<dyn Component>,
    /// Re-render callback handed to every subscription.
    listener: Rc<dyn Fn()>,
    props: Props,
    state: Option<State>,
    subtree: Vec<Node>,
    subscriptions: Subscriptions,
    phase: Phase,
    renders: usize,
}

impl ComponentInstance {
    /// Create an uninitialized instance. Returns `None` for host kinds.
    pub(crate) fn new(kind: Kind, listener: Rc<dyn Fn()>) -> Option<Self> {
        let component = kind.component_impl()?;
        Some(Self {
            kind,
            component,
            listener,
            props: Props::new(),
            state: None,
            subtree: Vec::new(),
            subscriptions: Subscriptions::new(),
            phase: Phase::Uninitialized,
            renders: 0,
        })
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    /// The subtree produced by the last render, instance-bound.
    pub fn subtree(&self) -> &[Node] {
        &self.subtree
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of completed or running render calls.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// Number of live observable subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Instances owned through the current subtree.
    pub fn owned(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.subtree.iter().filter_map(Node::instance)
    }

    /// Store prop changes, moving subscriptions along with observable values.
    pub(crate) fn apply_changes(&mut self, changes: &[Change]) {
        for change in changes {
            let slot = SubscriptionSlot::Prop(change.key.clone());
            self.subscriptions.release(&slot);

            match &change.value {
                Some(value) => {
                    if let PropValue::Observable(observable) = value {
                        self.subscriptions.track(slot, observable, Rc::clone(&self.listener));
                    }
                    self.props.insert(change.key.clone(), value.clone());
                }
                None => {
                    self.props.shift_remove(&change.key);
                }
            }
        }
    }

    /// Run first-pass initialization if needed, then render.
    pub(crate) fn begin_render(&mut self) -> Rendered {
        if self.phase == Phase::Uninitialized {
            self.state = self.component.create_state(&self.props);
            if let Some(state) = &self.state {
                let listener = Rc::clone(&self.listener);
                self.subscriptions
                    .track(SubscriptionSlot::State, state.as_observable(), listener);
            }
            self.component.before_first_render(&self.props);
        }

        self.phase = Phase::Updating;
        self.renders += 1;
        self.component.render(&self.props, self.state.as_ref())
    }

    pub(crate) fn take_subtree(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.subtree)
    }

    pub(crate) fn finish_render(&mut self, subtree: Vec<Node>) {
        self.subtree = subtree;
        self.phase = Phase::Mounted;
    }

    /// Release every subscription and enter the terminal phase. Instances
    /// owned through the subtree are destroyed by the caller.
    pub(crate) fn release(&mut self) {
        self.subscriptions.release_all();
        self.subtree.clear();
        self.phase = Phase::Destroyed;
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("kind", &self.kind)
            .field("phase", &self.phase)
            .field("renders", &self.renders)
            .field("subscriptions", &self.subscriptions.len())
            .field("subtree", &self.subtree.len())
            .finish()
    }
}
