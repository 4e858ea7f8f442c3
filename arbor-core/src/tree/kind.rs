//! Element kinds.
//!
//! A [`Kind`] is the capability descriptor attached to every node. It says
//! whether the node is backed by a host widget or by a component, and for
//! host kinds which props are child slots and how many children each slot
//! accepts. The reconciler never inspects anything else to decide how to
//! build or patch an instance.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::instance::{Component, FnComponent, Rendered, State};
use crate::tree::node::CHILDREN;
use crate::tree::Props;

/// Counter for generating unique kind IDs.
static KIND_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_kind_id() -> u64 {
    KIND_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// How many resolved child widgets a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildArity {
    /// No children at all.
    None,
    /// Zero or one child.
    Single,
    /// Any number of ordered children.
    Many,
}

impl ChildArity {
    /// Whether `count` children fit.
    pub fn admits(self, count: usize) -> bool {
        match self {
            Self::None => count == 0,
            Self::Single => count <= 1,
            Self::Many => true,
        }
    }
}

/// Slot layout of a host kind.
///
/// The `children` slot always exists; additional *inflatable* slots are
/// props whose value is a node list resolved to widgets before the host
/// sees it (a window's title bar, a frame's label widget).
#[derive(Debug, Clone)]
pub struct HostSpec {
    children: ChildArity,
    inflatable: Vec<(Cow<'static, str>, ChildArity)>,
}

impl HostSpec {
    /// A widget that takes no children.
    pub fn leaf() -> Self {
        Self::with_children(ChildArity::None)
    }

    /// A widget with exactly one child slot of arity one.
    pub fn single() -> Self {
        Self::with_children(ChildArity::Single)
    }

    /// A widget holding an ordered list of children.
    pub fn container() -> Self {
        Self::with_children(ChildArity::Many)
    }

    pub fn with_children(children: ChildArity) -> Self {
        Self {
            children,
            inflatable: Vec::new(),
        }
    }

    /// Declare an inflatable slot.
    pub fn inflatable(mut self, slot: impl Into<Cow<'static, str>>, arity: ChildArity) -> Self {
        self.inflatable.push((slot.into(), arity));
        self
    }

    /// Arity of `slot`, or `None` if `slot` is not a structural prop.
    pub fn slot_arity(&self, slot: &str) -> Option<ChildArity> {
        if slot == CHILDREN {
            return Some(self.children);
        }
        self.inflatable
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, arity)| *arity)
    }

    pub fn is_slot(&self, key: &str) -> bool {
        self.slot_arity(key).is_some()
    }

    /// All structural slot names, `children` first.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        std::iter::once(CHILDREN).chain(self.inflatable.iter().map(|(name, _)| name.as_ref()))
    }
}

/// What backs nodes of a kind.
#[derive(Clone)]
pub enum KindClass {
    Host(HostSpec),
    Component(Rc<dyn Component>),
}

struct KindInner {
    id: u64,
    name: Cow<'static, str>,
    class: KindClass,
}

/// A shared, identity-compared element kind.
///
/// Two kinds are equal only if they are clones of the same registration,
/// even if they share a name.
#[derive(Clone)]
pub struct Kind(Rc<KindInner>);

impl Kind {
    fn new(name: Cow<'static, str>, class: KindClass) -> Self {
        Self(Rc::new(KindInner {
            id: next_kind_id(),
            name,
            class,
        }))
    }

    /// Register a host widget kind.
    pub fn host(name: impl Into<Cow<'static, str>>, spec: HostSpec) -> Self {
        Self::new(name.into(), KindClass::Host(spec))
    }

    /// Register a component kind.
    pub fn component(name: impl Into<Cow<'static, str>>, component: impl Component) -> Self {
        Self::new(name.into(), KindClass::Component(Rc::new(component)))
    }

    /// Register a stateless component from a render function.
    pub fn component_fn<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
    where
        F: Fn(&Props, Option<&State>) -> Rendered + 'static,
    {
        Self::component(name, FnComponent::new(render))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Identity string used in derived sibling keys.
    pub fn identity(&self) -> String {
        format!("{}#{}", self.0.name, self.0.id)
    }

    pub fn class(&self) -> &KindClass {
        &self.0.class
    }

    pub fn is_host(&self) -> bool {
        matches!(self.0.class, KindClass::Host(_))
    }

    pub fn host_spec(&self) -> Option<&HostSpec> {
        match &self.0.class {
            KindClass::Host(spec) => Some(spec),
            KindClass::Component(_) => None,
        }
    }

    pub fn component_impl(&self) -> Option<Rc<dyn Component>> {
        match &self.0.class {
            KindClass::Host(_) => None,
            KindClass::Component(component) => Some(Rc::clone(component)),
        }
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Kind {}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = if self.is_host() { "host" } else { "component" };
        write!(f, "Kind({} {})", class, self.identity())
    }
}
