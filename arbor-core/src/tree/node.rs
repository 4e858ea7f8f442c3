//! Tree Nodes
//!
//! A [`Node`] is a declarative description of one tree position: a kind and
//! a prop map. Nodes are built fresh on every render. The only part that
//! survives a render is the instance binding, which the differ sets on the
//! node it returns.

use indexmap::IndexMap;

use crate::instance::InstanceId;
use crate::tree::kind::Kind;
use crate::tree::value::{Callback, PropValue, RefCallback};

/// Explicit identity override for keyed siblings.
pub const KEY: &str = "key";

/// Callback receiving the instance once it is created.
pub const REF: &str = "ref";

/// The ordered child node list.
pub const CHILDREN: &str = "children";

/// Style class list, diffed as a set by host widgets.
pub const CLASS_NAMES: &str = "class_names";

/// Prefix of event handler props, e.g. `on_clicked`.
pub const SIGNAL_PREFIX: &str = "on_";

/// Prop map of a node. Iteration order is insertion order.
pub type Props = IndexMap<String, PropValue>;

/// Whether a key is reserved for the differ and never reaches an instance.
pub fn is_reserved(key: &str) -> bool {
    key == KEY || key == REF
}

/// A declarative tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: Kind,
    props: Props,
    instance: Option<InstanceId>,
}

impl Node {
    /// Create a node of the given kind with no props.
    pub fn new(kind: &Kind) -> Self {
        Self {
            kind: kind.clone(),
            props: Props::new(),
            instance: None,
        }
    }

    /// Create a node from an existing prop map.
    pub fn with_props(kind: &Kind, props: Props) -> Self {
        Self {
            kind: kind.clone(),
            props,
            instance: None,
        }
    }

    pub(crate) fn bound(kind: Kind, props: Props, instance: InstanceId) -> Self {
        Self {
            kind,
            props,
            instance: Some(instance),
        }
    }

    /// Set a prop.
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Set an explicit sibling key.
    ///
    /// Only string and integer `key` props are explicit keys. An empty
    /// string, or a `key` prop holding any other value, leaves the node
    /// keyed by its position.
    pub fn key(self, key: impl Into<String>) -> Self {
        self.prop(KEY, PropValue::Str(key.into()))
    }

    /// Register a callback invoked with the instance once it is created.
    pub fn with_ref(self, f: impl Fn(InstanceId) + 'static) -> Self {
        self.prop(REF, PropValue::Ref(RefCallback::new(f)))
    }

    /// Attach an event handler for `signal`.
    pub fn on(self, signal: &str, callback: Callback) -> Self {
        self.prop(format!("{SIGNAL_PREFIX}{signal}"), callback)
    }

    /// Set style classes.
    pub fn class_names<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let names = names.into_iter().map(PropValue::from).collect::<Vec<_>>();
        self.prop(CLASS_NAMES, PropValue::List(names))
    }

    /// Append one child.
    pub fn child(mut self, child: Node) -> Self {
        let slot = self
            .props
            .entry(CHILDREN.to_owned())
            .or_insert_with(|| PropValue::Nodes(Vec::new()));
        match slot {
            PropValue::Nodes(children) => children.push(child),
            other => *other = PropValue::Nodes(vec![child]),
        }
        self
    }

    /// Replace the child list.
    pub fn children(self, children: impl IntoIterator<Item = Node>) -> Self {
        self.slot(CHILDREN, children)
    }

    /// Fill a node-list slot, `children` or inflatable.
    pub fn slot(self, name: impl Into<String>, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.prop(name, PropValue::Nodes(nodes.into_iter().collect()))
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    /// The bound instance, once the node has been reconciled.
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// The explicit key, if one was given as a non-empty string or an
    /// integer.
    pub fn explicit_key(&self) -> Option<String> {
        match self.props.get(KEY)? {
            PropValue::Str(s) if !s.is_empty() => Some(s.clone()),
            PropValue::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Resolved child nodes of `slot`, empty if absent.
    pub fn slot_nodes(&self, slot: &str) -> &[Node] {
        self.props
            .get(slot)
            .and_then(PropValue::as_nodes)
            .unwrap_or(&[])
    }

    pub(crate) fn into_parts(self) -> (Kind, Props, Option<InstanceId>) {
        (self.kind, self.props, self.instance)
    }
}
