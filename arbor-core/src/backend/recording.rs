//! Headless recording backend.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::{Backend, HandlerId, WidgetHandle};
use crate::error::{ReconcileError, Result};
use crate::tree::{Callback, Kind, PropValue};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    Create {
        widget: WidgetHandle,
        kind: String,
    },
    SetProperty {
        widget: WidgetHandle,
        name: String,
        value: Option<PropValue>,
    },
    AddClass {
        widget: WidgetHandle,
        class: String,
    },
    RemoveClass {
        widget: WidgetHandle,
        class: String,
    },
    Connect {
        widget: WidgetHandle,
        signal: String,
        handler: HandlerId,
    },
    Disconnect {
        widget: WidgetHandle,
        handler: HandlerId,
    },
    InsertChild {
        parent: WidgetHandle,
        slot: String,
        index: usize,
        child: WidgetHandle,
    },
    RemoveChild {
        parent: WidgetHandle,
        slot: String,
        child: WidgetHandle,
    },
    MoveChild {
        parent: WidgetHandle,
        slot: String,
        child: WidgetHandle,
        index: usize,
    },
    Destroy {
        widget: WidgetHandle,
    },
}

impl BackendOp {
    /// The widget the operation targets (the parent for child operations).
    pub fn widget(&self) -> WidgetHandle {
        match self {
            Self::Create { widget, .. }
            | Self::SetProperty { widget, .. }
            | Self::AddClass { widget, .. }
            | Self::RemoveClass { widget, .. }
            | Self::Connect { widget, .. }
            | Self::Disconnect { widget, .. }
            | Self::Destroy { widget } => *widget,
            Self::InsertChild { parent, .. }
            | Self::RemoveChild { parent, .. }
            | Self::MoveChild { parent, .. } => *parent,
        }
    }

    /// Whether the operation mutates an existing widget (anything but
    /// creation and destruction).
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Create { .. } | Self::Destroy { .. })
    }
}

#[derive(Default)]
struct Recorded {
    ops: Vec<BackendOp>,
    next_widget: u64,
    next_handler: u64,
    known: Option<HashSet<String>>,
    kinds: HashMap<WidgetHandle, String>,
    properties: HashMap<(WidgetHandle, String), PropValue>,
    classes: HashMap<WidgetHandle, Vec<String>>,
    children: HashMap<(WidgetHandle, String), Vec<WidgetHandle>>,
    handlers: HashMap<HandlerId, (WidgetHandle, String, Callback)>,
}

impl Recorded {
    fn live(&self, widget: WidgetHandle) -> Result<()> {
        if self.kinds.contains_key(&widget) {
            Ok(())
        } else {
            Err(ReconcileError::Backend(format!("widget {} is not live", widget.raw())))
        }
    }
}

/// A [`Backend`] that keeps an in-memory widget model and logs every call.
///
/// The backend is moved into the reconciler; keep a [`Recorder`] to inspect
/// it afterwards.
pub struct RecordingBackend {
    state: Rc<RefCell<Recorded>>,
}

impl RecordingBackend {
    /// A backend that can construct any host kind.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(Recorded::default())),
        }
    }

    /// A backend that only constructs the named kinds.
    pub fn with_known_kinds<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        backend.state.borrow_mut().known = Some(names.into_iter().map(Into::into).collect());
        backend
    }

    pub fn recorder(&self) -> Recorder {
        Recorder {
            state: Rc::clone(&self.state),
        }
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RecordingBackend {
    fn create_widget(&mut self, kind: &Kind) -> Result<WidgetHandle> {
        let mut state = self.state.borrow_mut();
        if let Some(known) = &state.known {
            if !known.contains(kind.name()) {
                return Err(ReconcileError::construction(kind.name(), "unknown widget kind"));
            }
        }

        state.next_widget += 1;
        let widget = WidgetHandle::from_raw(state.next_widget);
        state.kinds.insert(widget, kind.name().to_owned());
        state.ops.push(BackendOp::Create {
            widget,
            kind: kind.name().to_owned(),
        });
        Ok(widget)
    }

    fn set_property(
        &mut self,
        widget: WidgetHandle,
        name: &str,
        value: Option<&PropValue>,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.live(widget)?;

        match value {
            Some(value) => state.properties.insert((widget, name.to_owned()), value.clone()),
            None => state.properties.remove(&(widget, name.to_owned())),
        };
        state.ops.push(BackendOp::SetProperty {
            widget,
            name: name.to_owned(),
            value: value.cloned(),
        });
        Ok(())
    }

    fn add_class(&mut self, widget: WidgetHandle, class: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.live(widget)?;

        state.classes.entry(widget).or_default().push(class.to_owned());
        state.ops.push(BackendOp::AddClass {
            widget,
            class: class.to_owned(),
        });
        Ok(())
    }

    fn remove_class(&mut self, widget: WidgetHandle, class: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.live(widget)?;

        if let Some(classes) = state.classes.get_mut(&widget) {
            classes.retain(|c| c != class);
        }
        state.ops.push(BackendOp::RemoveClass {
            widget,
            class: class.to_owned(),
        });
        Ok(())
    }

    fn connect(
        &mut self,
        widget: WidgetHandle,
        signal: &str,
        handler: Callback,
    ) -> Result<HandlerId> {
        let mut state = self.state.borrow_mut();
        state.live(widget)?;

        state.next_handler += 1;
        let id = HandlerId::from_raw(state.next_handler);
        state.handlers.insert(id, (widget, signal.to_owned(), handler));
        state.ops.push(BackendOp::Connect {
            widget,
            signal: signal.to_owned(),
            handler: id,
        });
        Ok(id)
    }

    fn disconnect(&mut self, widget: WidgetHandle, handler: HandlerId) {
        let mut state = self.state.borrow_mut();
        state.handlers.remove(&handler);
        state.ops.push(BackendOp::Disconnect { widget, handler });
    }

    fn insert_child(
        &mut self,
        parent: WidgetHandle,
        slot: &str,
        index: usize,
        child: WidgetHandle,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.live(parent)?;
        state.live(child)?;

        let children = state.children.entry((parent, slot.to_owned())).or_default();
        if children.contains(&child) {
            return Err(ReconcileError::Backend(format!(
                "widget {} already attached to {} `{slot}`",
                child.raw(),
                parent.raw()
            )));
        }
        if index > children.len() {
            return Err(ReconcileError::Backend(format!(
                "index {index} out of range for {} `{slot}`",
                parent.raw()
            )));
        }
        children.insert(index, child);
        state.ops.push(BackendOp::InsertChild {
            parent,
            slot: slot.to_owned(),
            index,
            child,
        });
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: WidgetHandle,
        slot: &str,
        child: WidgetHandle,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let children = state.children.entry((parent, slot.to_owned())).or_default();
        let Some(position) = children.iter().position(|c| *c == child) else {
            return Err(ReconcileError::Backend(format!(
                "widget {} is not attached to {} `{slot}`",
                child.raw(),
                parent.raw()
            )));
        };
        children.remove(position);
        state.ops.push(BackendOp::RemoveChild {
            parent,
            slot: slot.to_owned(),
            child,
        });
        Ok(())
    }

    fn move_child(
        &mut self,
        parent: WidgetHandle,
        slot: &str,
        child: WidgetHandle,
        index: usize,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let children = state.children.entry((parent, slot.to_owned())).or_default();
        let Some(position) = children.iter().position(|c| *c == child) else {
            return Err(ReconcileError::Backend(format!(
                "widget {} is not attached to {} `{slot}`",
                child.raw(),
                parent.raw()
            )));
        };
        if index >= children.len() {
            return Err(ReconcileError::Backend(format!(
                "index {index} out of range for {} `{slot}`",
                parent.raw()
            )));
        }
        children.remove(position);
        children.insert(index, child);
        state.ops.push(BackendOp::MoveChild {
            parent,
            slot: slot.to_owned(),
            child,
            index,
        });
        Ok(())
    }

    fn destroy_widget(&mut self, widget: WidgetHandle) {
        let mut state = self.state.borrow_mut();
        state.kinds.remove(&widget);
        state.classes.remove(&widget);
        state.properties.retain(|(w, _), _| *w != widget);
        state.children.retain(|(parent, _), _| *parent != widget);
        for children in state.children.values_mut() {
            children.retain(|c| *c != widget);
        }
        state.handlers.retain(|_, (w, _, _)| *w != widget);
        state.ops.push(BackendOp::Destroy { widget });
    }
}

/// Inspection handle for a [`RecordingBackend`].
#[derive(Clone)]
pub struct Recorder {
    state: Rc<RefCell<Recorded>>,
}

impl Recorder {
    /// All operations recorded so far.
    pub fn ops(&self) -> Vec<BackendOp> {
        self.state.borrow().ops.clone()
    }

    /// Drain the operation log.
    pub fn take(&self) -> Vec<BackendOp> {
        std::mem::take(&mut self.state.borrow_mut().ops)
    }

    pub fn live_widgets(&self) -> usize {
        self.state.borrow().kinds.len()
    }

    pub fn is_live(&self, widget: WidgetHandle) -> bool {
        self.state.borrow().kinds.contains_key(&widget)
    }

    pub fn kind_of(&self, widget: WidgetHandle) -> Option<String> {
        self.state.borrow().kinds.get(&widget).cloned()
    }

    /// Live widgets of the named kind, oldest first.
    pub fn widgets_of_kind(&self, kind: &str) -> Vec<WidgetHandle> {
        let mut widgets: Vec<_> = self
            .state
            .borrow()
            .kinds
            .iter()
            .filter(|(_, k)| k.as_str() == kind)
            .map(|(w, _)| *w)
            .collect();
        widgets.sort();
        widgets
    }

    pub fn property(&self, widget: WidgetHandle, name: &str) -> Option<PropValue> {
        self.state
            .borrow()
            .properties
            .get(&(widget, name.to_owned()))
            .cloned()
    }

    pub fn classes(&self, widget: WidgetHandle) -> Vec<String> {
        self.state.borrow().classes.get(&widget).cloned().unwrap_or_default()
    }

    pub fn children(&self, parent: WidgetHandle, slot: &str) -> Vec<WidgetHandle> {
        self.state
            .borrow()
            .children
            .get(&(parent, slot.to_owned()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn handler_count(&self, widget: WidgetHandle) -> usize {
        self.state
            .borrow()
            .handlers
            .values()
            .filter(|(w, _, _)| *w == widget)
            .count()
    }

    /// Invoke every handler connected to `signal` on `widget`, as the
    /// toolkit's event loop would. Returns how many ran.
    pub fn emit(&self, widget: WidgetHandle, signal: &str, args: &[PropValue]) -> usize {
        let handlers: Vec<Callback> = self
            .state
            .borrow()
            .handlers
            .values()
            .filter(|(w, s, _)| *w == widget && s == signal)
            .map(|(_, _, callback)| callback.clone())
            .collect();

        for handler in &handlers {
            handler.call(args);
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::HostSpec;

    #[test]
    fn unknown_kinds_fail_construction() {
        let mut backend = RecordingBackend::with_known_kinds(["Label"]);
        let label = Kind::host("Label", HostSpec::leaf());
        let spinner = Kind::host("Spinner", HostSpec::leaf());

        assert!(backend.create_widget(&label).is_ok());
        assert!(matches!(
            backend.create_widget(&spinner),
            Err(ReconcileError::Construction { .. })
        ));
    }

    #[test]
    fn child_operations_track_order() {
        let mut backend = RecordingBackend::new();
        let recorder = backend.recorder();
        let column = Kind::host("Box", HostSpec::container());

        let parent = backend.create_widget(&column).unwrap();
        let a = backend.create_widget(&column).unwrap();
        let b = backend.create_widget(&column).unwrap();

        backend.insert_child(parent, "children", 0, a).unwrap();
        backend.insert_child(parent, "children", 1, b).unwrap();
        backend.move_child(parent, "children", b, 0).unwrap();
        assert_eq!(recorder.children(parent, "children"), vec![b, a]);

        backend.remove_child(parent, "children", b).unwrap();
        assert_eq!(recorder.children(parent, "children"), vec![a]);
        assert!(backend.remove_child(parent, "children", b).is_err());
    }

    #[test]
    fn destroy_detaches_and_forgets() {
        let mut backend = RecordingBackend::new();
        let recorder = backend.recorder();
        let column = Kind::host("Box", HostSpec::container());

        let parent = backend.create_widget(&column).unwrap();
        let child = backend.create_widget(&column).unwrap();
        backend.insert_child(parent, "children", 0, child).unwrap();

        backend.destroy_widget(child);
        assert!(!recorder.is_live(child));
        assert!(recorder.children(parent, "children").is_empty());
        assert!(backend.set_property(child, "visible", None).is_err());
    }

    #[test]
    fn emit_runs_connected_handlers() {
        let mut backend = RecordingBackend::new();
        let recorder = backend.recorder();
        let button = Kind::host("Button", HostSpec::leaf());
        let widget = backend.create_widget(&button).unwrap();

        let clicks = Rc::new(std::cell::Cell::new(0));
        let clicks_clone = clicks.clone();
        let on_click = Callback::new(move |_| clicks_clone.set(clicks_clone.get() + 1));
        let handler = backend.connect(widget, "clicked", on_click).unwrap();

        assert_eq!(recorder.emit(widget, "clicked", &[]), 1);
        assert_eq!(recorder.emit(widget, "hovered", &[]), 0);

        backend.disconnect(widget, handler);
        assert_eq!(recorder.emit(widget, "clicked", &[]), 0);
        assert_eq!(clicks.get(), 1);
    }
}
