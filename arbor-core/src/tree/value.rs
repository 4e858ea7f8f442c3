//! Prop values.
//!
//! Equality is shallow: scalars and lists compare by value, callbacks and
//! observables compare by identity. A prop whose inner state mutated without
//! the outer value being replaced is not a change.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::backend::WidgetHandle;
use crate::instance::InstanceId;
use crate::reactive::{Observable, ObservableRef};
use crate::tree::Node;

/// An event handler attached to a host widget through an `on_<signal>` prop.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&[PropValue])>);

impl Callback {
    pub fn new(f: impl Fn(&[PropValue]) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[PropValue]) {
        (self.0)(args)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(Rc::as_ptr(&self.0) as *const (), Rc::as_ptr(&other.0) as *const ())
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Receives the instance created for a node carrying a `ref` prop.
#[derive(Clone)]
pub struct RefCallback(Rc<dyn Fn(InstanceId)>);

impl RefCallback {
    pub fn new(f: impl Fn(InstanceId) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, id: InstanceId) {
        (self.0)(id)
    }
}

impl PartialEq for RefCallback {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(Rc::as_ptr(&self.0) as *const (), Rc::as_ptr(&other.0) as *const ())
    }
}

impl fmt::Debug for RefCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefCallback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// The value of a single prop.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropValue>),

    /// A node list: `children` or an inflatable slot.
    Nodes(Vec<Node>),

    /// A node list after resolution, as handed to a host widget.
    Widgets(SmallVec<[WidgetHandle; 4]>),

    Callback(Callback),
    Ref(RefCallback),
    Observable(ObservableRef),
}

impl PropValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropValue]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[Node]> {
        match self {
            Self::Nodes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_widgets(&self) -> Option<&[WidgetHandle]> {
        match self {
            Self::Widgets(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Self::Callback(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_observable(&self) -> Option<&ObservableRef> {
        match self {
            Self::Observable(v) => Some(v),
            _ => None,
        }
    }

    /// Typed access to an observable prop.
    pub fn observable<T: 'static>(&self) -> Option<Observable<T>> {
        self.as_observable().and_then(ObservableRef::downcast)
    }

    /// Strings of a `List`, skipping non-string items.
    pub fn string_items(&self) -> Vec<&str> {
        self.as_list()
            .map(|items| items.iter().filter_map(PropValue::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(v: Vec<PropValue>) -> Self {
        Self::List(v)
    }
}

impl From<Vec<&str>> for PropValue {
    fn from(v: Vec<&str>) -> Self {
        Self::List(v.into_iter().map(PropValue::from).collect())
    }
}

impl From<Vec<Node>> for PropValue {
    fn from(v: Vec<Node>) -> Self {
        Self::Nodes(v)
    }
}

impl From<Node> for PropValue {
    fn from(v: Node) -> Self {
        Self::Nodes(vec![v])
    }
}

impl From<Callback> for PropValue {
    fn from(v: Callback) -> Self {
        Self::Callback(v)
    }
}

impl From<ObservableRef> for PropValue {
    fn from(v: ObservableRef) -> Self {
        Self::Observable(v)
    }
}

impl<T: 'static> From<Observable<T>> for PropValue {
    fn from(v: Observable<T>) -> Self {
        Self::Observable(v.into())
    }
}

impl From<serde_json::Value> for PropValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;

        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::List(items.into_iter().map(PropValue::from).collect()),
            // Objects have no prop representation; keep them as key/value pairs.
            Value::Object(map) => Self::List(
                map.into_iter()
                    .map(|(k, v)| Self::List(vec![Self::Str(k), PropValue::from(v)]))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_compare_by_value() {
        assert_eq!(PropValue::from("a"), PropValue::from("a".to_string()));
        assert_ne!(PropValue::from(1), PropValue::from(2));
        assert_ne!(PropValue::from(1), PropValue::from(1.0));
    }

    #[test]
    fn callbacks_compare_by_identity() {
        let first = Callback::new(|_| {});
        let second = Callback::new(|_| {});

        assert_eq!(first, first.clone());
        assert_ne!(first, second);
    }

    #[test]
    fn observables_compare_by_identity() {
        let observable = Observable::new(vec![1]);
        let value = PropValue::from(observable.clone());

        // Mutating the contents does not make the prop differ.
        observable.modify(|v| v.push(2));
        assert_eq!(value, PropValue::from(observable));
        assert_ne!(value, PropValue::from(Observable::new(vec![1])));
    }

    #[test]
    fn typed_observable_access() {
        let value = PropValue::from(Observable::new(3i32));
        assert_eq!(value.observable::<i32>().map(|o| o.get()), Some(3));
        assert!(value.observable::<bool>().is_none());
    }

    #[test]
    fn from_json() {
        let value = PropValue::from(json!({ "label": "Go", "classes": ["a", "b"] }));
        let expected = PropValue::List(vec![
            PropValue::List(vec!["classes".into(), vec!["a", "b"].into()]),
            PropValue::List(vec!["label".into(), "Go".into()]),
        ]);
        assert_eq!(value, expected);

        assert_eq!(PropValue::from(json!(2.5)), PropValue::Float(2.5));
        assert_eq!(PropValue::from(json!(7)), PropValue::Int(7));
    }

    #[test]
    fn accessors_match_their_variant() {
        assert_eq!(PropValue::from(true).as_bool(), Some(true));
        assert_eq!(PropValue::from(1).as_bool(), None);

        assert_eq!(PropValue::from(2.5).as_float(), Some(2.5));
        assert_eq!(PropValue::from(4).as_float(), Some(4.0));
        assert_eq!(PropValue::from("4").as_float(), None);

        let handles = [WidgetHandle::from_raw(1), WidgetHandle::from_raw(2)];
        let widgets = PropValue::Widgets(handles.iter().copied().collect());
        assert_eq!(widgets.as_widgets(), Some(&handles[..]));
        assert!(widgets.as_nodes().is_none());

        let hits = Rc::new(std::cell::Cell::new(0));
        let seen = hits.clone();
        let callback = PropValue::from(Callback::new(move |args| seen.set(args.len())));
        callback
            .as_callback()
            .expect("callback prop")
            .call(&["a".into(), "b".into()]);
        assert_eq!(hits.get(), 2);
        assert!(PropValue::from("x").as_callback().is_none());
    }

    #[test]
    fn string_items_skip_other_values() {
        let value = PropValue::List(vec!["a".into(), 1.into(), "b".into()]);
        assert_eq!(value.string_items(), vec!["a", "b"]);
    }
}
