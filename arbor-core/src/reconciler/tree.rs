//! Instance Arena and Differ
//!
//! [`Tree`] owns every live instance and the backend. All diffing happens
//! here, under a single mutable borrow held by the running pass.
//!
//! # Destruction
//!
//! Instances replaced or removed during a pass are not destroyed on the spot.
//! They are pushed to a doomed list and destroyed when the pass commits, after
//! their parents have detached the widgets. Destroying an instance destroys
//! the instances it owns first, then its own widget.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::backend::{Backend, WidgetHandle};
use crate::config::Config;
use crate::error::{ReconcileError, Result, StructuralError};
use crate::instance::{ComponentInstance, HostInstance, Instance, InstanceId};
use crate::tree::{
    derive_keys, diff_props, index_by_key, initial_changes, is_reserved, Change, Changeset, Kind,
    KindClass, Node, PropValue, Props, RefCallback, REF,
};

pub(crate) type Widgets = SmallVec<[WidgetHandle; 4]>;

/// Callback a component's subscriptions fire: re-render instance `id`.
pub(crate) type Wake = Rc<dyn Fn(InstanceId)>;

#[derive(Debug)]
struct Entry {
    instance: Instance,
    /// Owning instance, `None` for roots.
    parent: Option<InstanceId>,
}

/// Children of one host slot after resolution.
struct ResolvedSlot {
    name: String,
    owned: Vec<InstanceId>,
    /// Whether the slot prop was declared at all.
    present: bool,
}

/// Side effects collected during a pass and run at commit.
#[derive(Default)]
pub(crate) struct Events {
    pub(crate) refs: Vec<(RefCallback, InstanceId)>,
    pub(crate) updated: Vec<InstanceId>,
}

pub(crate) struct Tree {
    backend: Box<dyn Backend>,
    config: Config,
    wake: Wake,
    entries: HashMap<InstanceId, Entry>,
    doomed: Vec<InstanceId>,
    refs: Vec<(RefCallback, InstanceId)>,
    updated: IndexSet<InstanceId>,
}

impl Tree {
    pub(crate) fn new(backend: Box<dyn Backend>, config: Config, wake: Wake) -> Self {
        Self {
            backend,
            config,
            wake,
            entries: HashMap::new(),
            doomed: Vec::new(),
            refs: Vec::new(),
            updated: IndexSet::new(),
        }
    }

    pub(crate) fn contains(&self, id: InstanceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.entries.get(&id).map(|entry| &entry.instance)
    }

    pub(crate) fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.entries.get(&id).and_then(|entry| entry.parent)
    }

    /// Widgets an instance surfaces to its parent: a host's own widget, or
    /// the depth-first concatenation of a component's subtree.
    pub(crate) fn get_widgets(&self, id: InstanceId) -> Result<Widgets> {
        let mut widgets = Widgets::new();
        self.collect_widgets(id, &mut widgets)?;
        Ok(widgets)
    }

    fn collect_widgets(&self, id: InstanceId, out: &mut Widgets) -> Result<()> {
        match &self.entry(id)?.instance {
            Instance::Host(host) => out.push(host.widget()),
            Instance::Component(component) => {
                for child in component.owned() {
                    self.collect_widgets(child, out)?;
                }
            }
        }
        Ok(())
    }

    fn widgets_of(&self, owned: &[InstanceId]) -> Result<Widgets> {
        let mut widgets = Widgets::new();
        for &id in owned {
            self.collect_widgets(id, &mut widgets)?;
        }
        Ok(widgets)
    }

    /// Reconcile a sibling list, returning the new list bound to instances.
    pub(crate) fn diff_list(
        &mut self,
        old: Vec<Node>,
        new: Vec<Node>,
        parent: Option<InstanceId>,
    ) -> Result<Vec<Node>> {
        let mut old_by_key = index_by_key(old)?;
        let new_keys = derive_keys(&new)?;

        for (key, node) in &old_by_key {
            if !new_keys.contains(key) {
                if let Some(id) = node.instance() {
                    self.doom(id);
                }
            }
        }

        let mut resolved = Vec::with_capacity(new.len());
        for (key, node) in new_keys.iter().zip(new) {
            let previous = old_by_key.swap_remove(key);
            if previous.is_some() {
                trace!(key = %key, "matched sibling");
            }
            resolved.push(self.diff(previous, node, parent)?);
        }
        Ok(resolved)
    }

    /// Reconcile one node against its predecessor.
    pub(crate) fn diff(
        &mut self,
        old: Option<Node>,
        new: Node,
        parent: Option<InstanceId>,
    ) -> Result<Node> {
        self.reconcile(old, new, parent).map(|(_, node)| node)
    }

    pub(crate) fn reconcile(
        &mut self,
        old: Option<Node>,
        new: Node,
        parent: Option<InstanceId>,
    ) -> Result<(InstanceId, Node)> {
        match old {
            Some(old) if old.kind() == new.kind() => {
                match old.instance().filter(|id| self.contains(*id)) {
                    Some(id) => self.patch(id, old, new),
                    None => self.construct(new, parent),
                }
            }
            Some(old) => {
                if let Some(id) = old.instance() {
                    self.doom(id);
                }
                self.construct(new, parent)
            }
            None => self.construct(new, parent),
        }
    }

    fn patch(&mut self, id: InstanceId, old: Node, new: Node) -> Result<(InstanceId, Node)> {
        let (kind, mut props, _) = new.into_parts();
        let (_, mut old_props, _) = old.into_parts();

        match kind.host_spec() {
            Some(spec) => {
                let slots = self.resolve_slots(id, &kind, Some(&mut old_props), &mut props)?;
                let skip = |key: &str| is_reserved(key) || spec.is_slot(key);
                let mut changes = diff_props(&old_props, &props, skip);
                changes.extend(self.slot_changes(id, &slots)?);
                self.update_host(id, &changes, slots)?;
            }
            None => {
                let changes = diff_props(&old_props, &props, is_reserved);
                if !changes.is_empty() {
                    self.update_component(id, &changes)?;
                }
            }
        }

        Ok((id, Node::bound(kind, props, id)))
    }

    fn construct(&mut self, new: Node, parent: Option<InstanceId>) -> Result<(InstanceId, Node)> {
        let (kind, mut props, _) = new.into_parts();
        let id = InstanceId::new();

        match kind.class() {
            KindClass::Host(spec) => {
                let slots = self.resolve_slots(id, &kind, None, &mut props)?;
                let host = HostInstance::create(self.backend.as_mut(), kind.clone())?;
                self.entries.insert(
                    id,
                    Entry {
                        instance: Instance::Host(host),
                        parent,
                    },
                );

                let mut changes = Changeset::new();
                if self.config.default_visible && !props.contains_key("visible") {
                    changes.push(Change::set("visible", true));
                }
                let skip = |key: &str| is_reserved(key) || spec.is_slot(key);
                changes.extend(initial_changes(&props, skip));
                changes.extend(self.slot_changes(id, &slots)?);
                self.update_host(id, &changes, slots)?;
            }
            KindClass::Component(_) => {
                let wake = Rc::clone(&self.wake);
                let listener: Rc<dyn Fn()> = Rc::new(move || wake(id));
                let component = ComponentInstance::new(kind.clone(), listener).ok_or_else(|| {
                    ReconcileError::construction(kind.name(), "not a component kind")
                })?;
                self.entries.insert(
                    id,
                    Entry {
                        instance: Instance::Component(component),
                        parent,
                    },
                );
                self.update_component(id, &initial_changes(&props, is_reserved))?;
            }
        }

        debug!(kind = %kind.name(), id = %id, "created instance");
        if let Some(PropValue::Ref(callback)) = props.get(REF) {
            self.refs.push((callback.clone(), id));
        }
        Ok((id, Node::bound(kind, props, id)))
    }

    /// Diff every structural slot of a host kind, leaving the resolved node
    /// lists in `props`.
    fn resolve_slots(
        &mut self,
        id: InstanceId,
        kind: &Kind,
        mut old: Option<&mut Props>,
        props: &mut Props,
    ) -> Result<Vec<ResolvedSlot>> {
        let Some(spec) = kind.host_spec() else {
            return Ok(Vec::new());
        };
        if let Some(slot) = props
            .iter()
            .find(|(key, value)| matches!(value, PropValue::Nodes(_)) && !spec.is_slot(key))
            .map(|(key, _)| key)
        {
            return Err(StructuralError::UnknownSlot {
                kind: kind.name().to_owned(),
                slot: slot.clone(),
            }
            .into());
        }

        let mut resolved = Vec::new();
        for slot in spec.slots() {
            let new_nodes = match props.get_mut(slot) {
                None => None,
                Some(PropValue::Nodes(nodes)) => Some(std::mem::take(nodes)),
                Some(_) => {
                    return Err(StructuralError::NotANodeList {
                        kind: kind.name().to_owned(),
                        slot: slot.to_owned(),
                    }
                    .into())
                }
            };
            let old_nodes = match old.as_deref_mut().and_then(|props| props.get_mut(slot)) {
                Some(PropValue::Nodes(nodes)) => std::mem::take(nodes),
                _ => Vec::new(),
            };

            let present = new_nodes.is_some();
            let nodes = self.diff_list(old_nodes, new_nodes.unwrap_or_default(), Some(id))?;
            let owned = nodes.iter().filter_map(Node::instance).collect();
            if present {
                props.insert(slot.to_owned(), PropValue::Nodes(nodes));
            }
            resolved.push(ResolvedSlot {
                name: slot.to_owned(),
                owned,
                present,
            });
        }
        Ok(resolved)
    }

    /// Slot changes for the slots whose widgets differ from what is attached.
    fn slot_changes(&self, id: InstanceId, slots: &[ResolvedSlot]) -> Result<Changeset> {
        let host = self.host(id)?;
        let mut changes = Changeset::new();
        for slot in slots {
            let widgets = self.widgets_of(&slot.owned)?;
            if host.attached(&slot.name) != widgets.as_slice() {
                changes.push(Change {
                    key: slot.name.clone(),
                    value: slot.present.then(|| PropValue::Widgets(widgets)),
                });
            }
        }
        Ok(changes)
    }

    fn update_host(
        &mut self,
        id: InstanceId,
        changes: &[Change],
        slots: Vec<ResolvedSlot>,
    ) -> Result<()> {
        let host = self
            .entries
            .get_mut(&id)
            .and_then(|entry| entry.instance.as_host_mut())
            .ok_or(ReconcileError::UnknownInstance(id))?;

        if !changes.is_empty() {
            trace!(kind = %host.kind().name(), id = %id, changes = changes.len(), "updating host");
            host.update(self.backend.as_mut(), changes)?;
            self.updated.insert(id);
        }
        for slot in slots {
            host.set_slot_children(&slot.name, slot.owned);
        }
        Ok(())
    }

    fn update_component(&mut self, id: InstanceId, changes: &[Change]) -> Result<()> {
        let component = self.component_mut(id)?;
        let span = tracing::debug_span!("render", kind = %component.kind().name(), id = %id);
        let _entered = span.enter();

        component.apply_changes(changes);
        let rendered = component.begin_render();
        let old = component.take_subtree();

        let subtree = self.diff_list(old, rendered.into_nodes(), Some(id))?;
        self.component_mut(id)?.finish_render(subtree);
        self.updated.insert(id);
        Ok(())
    }

    /// Re-render a component after one of its observables changed, re-wiring
    /// the nearest host ancestor if the surfaced widgets moved.
    pub(crate) fn rerender(&mut self, id: InstanceId) -> Result<()> {
        if !self.contains(id) {
            trace!(id = %id, "skipping re-render of a destroyed instance");
            return Ok(());
        }

        let before = self.get_widgets(id)?;
        self.update_component(id, &[])?;
        if self.get_widgets(id)? != before {
            self.rewire_ancestors(id)?;
        }
        Ok(())
    }

    fn rewire_ancestors(&mut self, id: InstanceId) -> Result<()> {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            match &self.entry(parent)?.instance {
                Instance::Component(_) => {
                    self.updated.insert(parent);
                    current = parent;
                }
                Instance::Host(host) => {
                    let slots: Vec<ResolvedSlot> = host
                        .slot_names()
                        .map(|name| ResolvedSlot {
                            name: name.to_owned(),
                            owned: host.slot_children(name).to_vec(),
                            present: true,
                        })
                        .collect();
                    let changes = self.slot_changes(parent, &slots)?;
                    debug!(id = %parent, changes = changes.len(), "re-wiring host slots");
                    return self.update_host(parent, &changes, slots);
                }
            }
        }
        Ok(())
    }

    /// Schedule an instance for destruction at commit.
    pub(crate) fn doom(&mut self, id: InstanceId) {
        trace!(id = %id, "dooming instance");
        self.doomed.push(id);
    }

    /// Take the ref callbacks and update notifications of the pass, skipping
    /// instances about to be destroyed.
    pub(crate) fn take_events(&mut self) -> Events {
        let doomed = &self.doomed;
        Events {
            refs: std::mem::take(&mut self.refs),
            updated: self.updated.drain(..).filter(|id| !doomed.contains(id)).collect(),
        }
    }

    pub(crate) fn discard_events(&mut self) {
        self.refs.clear();
        self.updated.clear();
    }

    pub(crate) fn flush_doomed(&mut self) {
        for id in std::mem::take(&mut self.doomed) {
            self.destroy(id);
        }
    }

    fn destroy(&mut self, id: InstanceId) {
        let Some(mut entry) = self.entries.remove(&id) else {
            return;
        };
        let owned = entry.instance.owned();

        if let Instance::Component(component) = &mut entry.instance {
            component.release();
        }
        for child in owned {
            self.destroy(child);
        }
        if let Instance::Host(host) = &mut entry.instance {
            host.destroy(self.backend.as_mut());
        }
        debug!(kind = %entry.instance.kind().name(), id = %id, "destroyed instance");
    }

    /// Destroy every live instance.
    pub(crate) fn teardown(&mut self) {
        self.discard_events();
        self.doomed.clear();

        let mut ids: Vec<InstanceId> = self.entries.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.destroy(id);
        }
    }

    fn entry(&self, id: InstanceId) -> Result<&Entry> {
        self.entries.get(&id).ok_or(ReconcileError::UnknownInstance(id))
    }

    fn host(&self, id: InstanceId) -> Result<&HostInstance> {
        self.entry(id)?
            .instance
            .as_host()
            .ok_or(ReconcileError::UnknownInstance(id))
    }

    fn component_mut(&mut self, id: InstanceId) -> Result<&mut ComponentInstance> {
        self.entries
            .get_mut(&id)
            .and_then(|entry| entry.instance.as_component_mut())
            .ok_or(ReconcileError::UnknownInstance(id))
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOp, Recorder, RecordingBackend};
    use crate::instance::Rendered;
    use crate::tree::{ChildArity, HostSpec};

    fn tree() -> (Tree, Recorder) {
        let backend = RecordingBackend::new();
        let recorder = backend.recorder();
        let config = Config {
            default_visible: false,
            ..Config::default()
        };
        (Tree::new(Box::new(backend), config, Rc::new(|_| {})), recorder)
    }

    fn label() -> Kind {
        Kind::host("Label", HostSpec::leaf())
    }

    fn column() -> Kind {
        Kind::host("Box", HostSpec::container())
    }

    fn commit(tree: &mut Tree) -> Events {
        let events = tree.take_events();
        tree.flush_doomed();
        events
    }

    #[test]
    fn construct_resolves_children_before_parent() {
        let (mut tree, recorder) = tree();
        let (column, label) = (column(), label());
        let node = Node::new(&column).child(Node::new(&label).prop("text", "a"));

        let (id, bound) = tree.reconcile(None, node, None).unwrap();
        commit(&mut tree);

        let ops = recorder.ops();
        assert!(matches!(&ops[0], BackendOp::Create { kind, .. } if kind == "Label"));
        assert!(matches!(&ops[2], BackendOp::Create { kind, .. } if kind == "Box"));
        let parent = tree.host(id).unwrap().widget();
        assert_eq!(recorder.children(parent, "children").len(), 1);
        let attached = tree.host(id).unwrap().slot_children("children").first().copied();
        assert_eq!(bound.slot_nodes("children")[0].instance(), attached);
    }

    #[test]
    fn identical_rediff_is_silent() {
        let (mut tree, recorder) = tree();
        let (column, label) = (column(), label());
        let make = || Node::new(&column).child(Node::new(&label).key("a").prop("text", "a"));

        let bound = tree.diff(None, make(), None).unwrap();
        commit(&mut tree);
        recorder.take();

        tree.diff(Some(bound), make(), None).unwrap();
        commit(&mut tree);
        assert!(recorder.ops().iter().all(|op| !op.is_mutation()));
    }

    #[test]
    fn widgets_of_component_concatenate_subtree() {
        let (mut tree, _recorder) = tree();
        let label = label();
        let inner = label.clone();
        let pair = Kind::component_fn("Pair", move |_, _| {
            Rendered::from(vec![Node::new(&inner).key("x"), Node::new(&inner).key("y")])
        });

        let (id, _) = tree.reconcile(None, Node::new(&pair), None).unwrap();
        commit(&mut tree);

        let widgets = tree.get_widgets(id).unwrap();
        assert_eq!(widgets.len(), 2);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn removed_child_is_detached_then_destroyed() {
        let (mut tree, recorder) = tree();
        let (column, label) = (column(), label());

        let bound = tree
            .diff(
                None,
                Node::new(&column)
                    .children([Node::new(&label).key("a"), Node::new(&label).key("b")]),
                None,
            )
            .unwrap();
        commit(&mut tree);
        recorder.take();

        tree.diff(Some(bound), Node::new(&column).child(Node::new(&label).key("a")), None)
            .unwrap();
        commit(&mut tree);

        let ops = recorder.ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], BackendOp::RemoveChild { .. }));
        assert!(matches!(ops[1], BackendOp::Destroy { .. }));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn wrong_slot_value_is_structural() {
        let (mut tree, _recorder) = tree();
        let node = Node::new(&column()).prop("children", "oops");

        let err = tree.diff(None, node, None).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Structural(StructuralError::NotANodeList { .. })
        ));
    }

    #[test]
    fn undeclared_slot_is_structural() {
        let (mut tree, _recorder) = tree();
        let node = Node::new(&column()).slot("header", [Node::new(&label())]);

        let err = tree.diff(None, node, None).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Structural(StructuralError::UnknownSlot { ref slot, .. })
                if slot == "header"
        ));
    }

    #[test]
    fn inflatable_slot_is_wired_separately() {
        let (mut tree, recorder) = tree();
        let label = label();
        let frame = Kind::host(
            "Frame",
            HostSpec::with_children(ChildArity::Single)
                .inflatable("label_widget", ChildArity::Single),
        );
        let node = Node::new(&frame)
            .child(Node::new(&label).prop("text", "body"))
            .slot("label_widget", [Node::new(&label).prop("text", "title")]);

        let (id, _) = tree.reconcile(None, node, None).unwrap();
        commit(&mut tree);

        let widget = tree.host(id).unwrap().widget();
        assert_eq!(recorder.children(widget, "children").len(), 1);
        assert_eq!(recorder.children(widget, "label_widget").len(), 1);
        assert_ne!(
            recorder.children(widget, "children"),
            recorder.children(widget, "label_widget")
        );
    }

    #[test]
    fn teardown_destroys_everything() {
        let (mut tree, recorder) = tree();
        let node = Node::new(&column()).children([Node::new(&label()), Node::new(&label())]);

        tree.diff(None, node, None).unwrap();
        commit(&mut tree);
        assert_eq!(recorder.live_widgets(), 3);

        tree.teardown();
        assert_eq!(tree.len(), 0);
        assert_eq!(recorder.live_widgets(), 0);
    }
}
