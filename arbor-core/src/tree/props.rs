//! Prop changesets.

use smallvec::SmallVec;

use crate::tree::{PropValue, Props};

/// One prop change. `value == None` means the prop was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key: String,
    pub value: Option<PropValue>,
}

impl Change {
    pub fn set(key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn unset(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Ordered list of changes applied in one `update` call.
pub type Changeset = SmallVec<[Change; 4]>;

/// Compute the changes turning `old` into `new`, ignoring keys for which
/// `skip` returns true.
///
/// Removals come first, in `old` order, then additions and changes in `new`
/// order. Values are compared with `==`.
pub fn diff_props(old: &Props, new: &Props, skip: impl Fn(&str) -> bool) -> Changeset {
    let mut changes = Changeset::new();

    for key in old.keys() {
        if !skip(key) && !new.contains_key(key) {
            changes.push(Change::unset(key.as_str()));
        }
    }

    for (key, value) in new {
        if skip(key) {
            continue;
        }
        if old.get(key) != Some(value) {
            changes.push(Change {
                key: key.clone(),
                value: Some(value.clone()),
            });
        }
    }

    changes
}

/// Every prop of `props` as a change, for a freshly constructed instance.
pub fn initial_changes(props: &Props, skip: impl Fn(&str) -> bool) -> Changeset {
    props
        .iter()
        .filter(|(key, _)| !skip(key))
        .map(|(key, value)| Change {
            key: key.clone(),
            value: Some(value.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::is_reserved;

    fn props(pairs: &[(&str, PropValue)]) -> Props {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn identical_props_have_no_changes() {
        let a = props(&[("a", 1.into()), ("b", "x".into())]);
        assert!(diff_props(&a, &a.clone(), is_reserved).is_empty());
    }

    #[test]
    fn changed_value_only() {
        let old = props(&[("a", 1.into()), ("b", 2.into())]);
        let new = props(&[("a", 1.into()), ("b", 3.into())]);

        let changes = diff_props(&old, &new, is_reserved);
        assert_eq!(changes.as_slice(), &[Change::set("b", 3)]);
    }

    #[test]
    fn removed_key_is_unset() {
        let old = props(&[("a", 1.into()), ("b", 3.into())]);
        let new = props(&[("a", 1.into())]);

        let changes = diff_props(&old, &new, is_reserved);
        assert_eq!(changes.as_slice(), &[Change::unset("b")]);
    }

    #[test]
    fn removals_come_before_additions() {
        let old = props(&[("gone", true.into())]);
        let new = props(&[("fresh", true.into())]);

        let changes = diff_props(&old, &new, is_reserved);
        assert_eq!(changes.as_slice(), &[Change::unset("gone"), Change::set("fresh", true)]);
    }

    #[test]
    fn reserved_keys_are_ignored() {
        let old = props(&[("key", "a".into())]);
        let new = props(&[("key", "b".into())]);
        assert!(diff_props(&old, &new, is_reserved).is_empty());
    }

    #[test]
    fn initial_changes_skip_reserved() {
        let all = props(&[("key", "a".into()), ("label", "x".into())]);
        let changes = initial_changes(&all, is_reserved);
        assert_eq!(changes.as_slice(), &[Change::set("label", "x")]);
    }
}
