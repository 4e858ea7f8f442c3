//! Host Instances
//!
//! A [`HostInstance`] adapts one backend widget to the changeset protocol.
//! Each change is routed by key:
//!
//! - a structural slot (`children` or an inflatable prop) arrives already
//!   resolved to widget handles; the slot is checked against its arity and
//!   re-wired with the fewest insert/move/remove calls;
//! - `class_names` is diffed as a set;
//! - `on_<signal>` disconnects the previous handler and connects the new one;
//! - anything else is a plain property.

use indexmap::IndexMap;
use smallvec::{smallvec, SmallVec};

use crate::backend::{Backend, HandlerId, WidgetHandle};
use crate::error::{Result, StructuralError};
use crate::instance::InstanceId;
use crate::tree::{Change, ChildArity, Kind, PropValue, Props, CLASS_NAMES, SIGNAL_PREFIX};

#[derive(Debug, Default)]
struct SlotState {
    /// Instances resolved into this slot, in order.
    owned: Vec<InstanceId>,
    /// Widgets currently attached in the backend, in order.
    attached: SmallVec<[WidgetHandle; 4]>,
}

/// A live host widget.
#[derive(Debug)]
pub struct HostInstance {
    kind: Kind,
    widget: WidgetHandle,
    props: Props,
    slots: IndexMap<String, SlotState>,
    handlers: IndexMap<String, HandlerId>,
}

impl HostInstance {
    /// Allocate the backend widget. Props are applied by a following
    /// [`update`](Self::update).
    pub(crate) fn create(backend: &mut dyn Backend, kind: Kind) -> Result<Self> {
        let widget = backend.create_widget(&kind)?;
        Ok(Self {
            kind,
            widget,
            props: Props::new(),
            slots: IndexMap::new(),
            handlers: IndexMap::new(),
        })
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn widget(&self) -> WidgetHandle {
        self.widget
    }

    /// The widgets this instance surfaces to its parent: always its own.
    pub fn get_widgets(&self) -> SmallVec<[WidgetHandle; 1]> {
        smallvec![self.widget]
    }

    /// Last applied non-structural props.
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Widgets currently attached in `slot`.
    pub fn attached(&self, slot: &str) -> &[WidgetHandle] {
        self.slots.get(slot).map(|s| s.attached.as_slice()).unwrap_or(&[])
    }

    /// Instances resolved into `slot`.
    pub fn slot_children(&self, slot: &str) -> &[InstanceId] {
        self.slots.get(slot).map(|s| s.owned.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn set_slot_children(&mut self, slot: &str, owned: Vec<InstanceId>) {
        if owned.is_empty() && !self.slots.contains_key(slot) {
            return;
        }
        self.slots.entry(slot.to_owned()).or_default().owned = owned;
    }

    /// Slot names that have ever held children.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Instances owned through all slots.
    pub fn owned(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.slots.values().flat_map(|slot| slot.owned.iter().copied())
    }

    /// Apply a changeset to the widget.
    pub(crate) fn update(&mut self, backend: &mut dyn Backend, changes: &[Change]) -> Result<()> {
        for change in changes {
            let key = change.key.as_str();
            let value = change.value.as_ref();

            if let Some(arity) = self.kind.host_spec().and_then(|spec| spec.slot_arity(key)) {
                self.apply_slot(backend, key, arity, value)?;
                continue;
            }

            if key == CLASS_NAMES {
                self.apply_classes(backend, value)?;
            } else if let Some(signal) = key.strip_prefix(SIGNAL_PREFIX) {
                self.apply_handler(backend, signal, value)?;
            } else {
                backend.set_property(self.widget, key, value)?;
            }

            match value {
                Some(value) => {
                    self.props.insert(key.to_owned(), value.clone());
                }
                None => {
                    self.props.shift_remove(key);
                }
            }
        }
        Ok(())
    }

    fn apply_slot(
        &mut self,
        backend: &mut dyn Backend,
        slot: &str,
        arity: ChildArity,
        value: Option<&PropValue>,
    ) -> Result<()> {
        let wanted: &[WidgetHandle] = match value {
            None => &[],
            Some(PropValue::Widgets(handles)) => handles,
            Some(_) => {
                return Err(StructuralError::NotANodeList {
                    kind: self.kind.name().to_owned(),
                    slot: slot.to_owned(),
                }
                .into())
            }
        };

        if !arity.admits(wanted.len()) {
            let (kind, slot, count) = (self.kind.name().to_owned(), slot.to_owned(), wanted.len());
            return Err(match arity {
                ChildArity::None => StructuralError::ChildrenNotAllowed { kind, slot, count },
                _ => StructuralError::TooManyChildren { kind, slot, count },
            }
            .into());
        }

        let widget = self.widget;
        let current = &mut self.slots.entry(slot.to_owned()).or_default().attached;

        let stale: SmallVec<[WidgetHandle; 4]> =
            current.iter().copied().filter(|w| !wanted.contains(w)).collect();
        for child in stale {
            backend.remove_child(widget, slot, child)?;
            current.retain(|w| *w != child);
        }

        // Invariant: current[..index] == wanted[..index].
        for (index, &child) in wanted.iter().enumerate() {
            match current.iter().position(|w| *w == child) {
                None => {
                    backend.insert_child(widget, slot, index, child)?;
                    current.insert(index, child);
                }
                Some(position) if position != index => {
                    backend.move_child(widget, slot, child, index)?;
                    current.remove(position);
                    current.insert(index, child);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn apply_classes(
        &mut self,
        backend: &mut dyn Backend,
        value: Option<&PropValue>,
    ) -> Result<()> {
        let old: Vec<String> = self
            .props
            .get(CLASS_NAMES)
            .map(|v| v.string_items().into_iter().map(str::to_owned).collect())
            .unwrap_or_default();
        let new = value.map(PropValue::string_items).unwrap_or_default();

        for class in &old {
            if !new.contains(&class.as_str()) {
                backend.remove_class(self.widget, class)?;
            }
        }
        for class in new {
            if !old.iter().any(|c| c == class) {
                backend.add_class(self.widget, class)?;
            }
        }
        Ok(())
    }

    fn apply_handler(
        &mut self,
        backend: &mut dyn Backend,
        signal: &str,
        value: Option<&PropValue>,
    ) -> Result<()> {
        if let Some(previous) = self.handlers.shift_remove(signal) {
            backend.disconnect(self.widget, previous);
        }

        match value {
            Some(PropValue::Callback(callback)) => {
                let id = backend.connect(self.widget, signal, callback.clone())?;
                self.handlers.insert(signal.to_owned(), id);
            }
            Some(other) => {
                tracing::warn!(
                    kind = %self.kind.name(),
                    signal,
                    value = ?other,
                    "ignoring non-callback handler prop"
                );
            }
            None => {}
        }
        Ok(())
    }

    /// Disconnect handlers and release the widget. Instances owned through
    /// the slots must already be destroyed.
    pub(crate) fn destroy(&mut self, backend: &mut dyn Backend) {
        for (_, handler) in self.handlers.drain(..) {
            backend.disconnect(self.widget, handler);
        }
        self.slots.clear();
        backend.destroy_widget(self.widget);
    }
}
