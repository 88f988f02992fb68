//! Change events emitted by asset stores

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation a store performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerEvent {
    Add,
    Remove,
    Change,
    OverrideAdd,
    OverrideRemove,
    OverrideChange,
}

impl ManagerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerEvent::Add => "add",
            ManagerEvent::Remove => "remove",
            ManagerEvent::Change => "change",
            ManagerEvent::OverrideAdd => "override_add",
            ManagerEvent::OverrideRemove => "override_remove",
            ManagerEvent::OverrideChange => "override_change",
        }
    }

    /// True for events that touch the override layer
    pub fn is_override(&self) -> bool {
        matches!(
            self,
            ManagerEvent::OverrideAdd | ManagerEvent::OverrideRemove | ManagerEvent::OverrideChange
        )
    }
}

impl fmt::Display for ManagerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single store notification.
///
/// `asset` is a snapshot taken right after the mutation (absent for
/// removals). `values` is only set for the two change events.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetEvent<A, V> {
    pub kind: ManagerEvent,
    pub name: String,
    pub asset: Option<A>,
    pub values: Option<V>,
}

impl<A, V> AssetEvent<A, V> {
    /// `Add` / `OverrideAdd`
    pub fn added(kind: ManagerEvent, name: &str, asset: A) -> Self {
        Self {
            kind,
            name: name.to_string(),
            asset: Some(asset),
            values: None,
        }
    }

    /// `Remove` / `OverrideRemove`
    pub fn removed(kind: ManagerEvent, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            asset: None,
            values: None,
        }
    }

    /// `Change` / `OverrideChange`
    pub fn changed(kind: ManagerEvent, name: &str, asset: A, values: V) -> Self {
        Self {
            kind,
            name: name.to_string(),
            asset: Some(asset),
            values: Some(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names() {
        assert_eq!(ManagerEvent::Remove.to_string(), "remove");
        assert_eq!(
            serde_json::to_string(&ManagerEvent::OverrideChange).unwrap(),
            "\"override_change\""
        );
        assert!(ManagerEvent::OverrideAdd.is_override());
        assert!(!ManagerEvent::Change.is_override());
    }

    #[test]
    fn test_removed_event_has_no_payload() {
        let event: AssetEvent<u8, u8> = AssetEvent::removed(ManagerEvent::Remove, "play");
        assert_eq!(event.name, "play");
        assert!(event.asset.is_none());
        assert!(event.values.is_none());
    }
}
