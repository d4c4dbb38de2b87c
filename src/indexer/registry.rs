//! Change events and the listener registry.
//!
//! Change delivery itself is external; this module defines the event shape
//! and an explicit registry mapping subscription names to listeners. The
//! registry is constructed at startup and handed to whatever dispatches
//! change events; there is no process-wide mutable state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, TernError};
use crate::record::{RecordId, VTag};

/// A "record changed" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    record_id: RecordId,
    vtag: VTag,
}

impl ChangeEvent {
    /// Create a change event for a record at a vtag.
    pub fn new(record_id: RecordId, vtag: VTag) -> Self {
        ChangeEvent { record_id, vtag }
    }

    /// The changed record.
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// The vtag whose index entry is affected.
    pub fn vtag(&self) -> &VTag {
        &self.vtag
    }
}

/// Consumer of change events for one subscription.
pub trait ChangeListener: Send + Sync {
    /// Handle one delivered event.
    fn on_change(&self, event: &ChangeEvent) -> Result<()>;
}

/// Maps subscription names to their listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<String, Arc<dyn ChangeListener>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        ListenerRegistry {
            listeners: HashMap::new(),
        }
    }

    /// Register a listener under a subscription name.
    pub fn register<S: Into<String>>(
        &mut self,
        subscription: S,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<()> {
        let subscription = subscription.into();
        if self.listeners.contains_key(&subscription) {
            return Err(TernError::other(format!(
                "A listener is already registered for subscription {subscription}"
            )));
        }
        self.listeners.insert(subscription, listener);
        Ok(())
    }

    /// Look up the listener for a subscription.
    pub fn get(&self, subscription: &str) -> Option<&Arc<dyn ChangeListener>> {
        self.listeners.get(subscription)
    }

    /// Deliver an event to the listener of a subscription.
    pub fn dispatch(&self, subscription: &str, event: &ChangeEvent) -> Result<()> {
        let listener = self.get(subscription).ok_or_else(|| {
            TernError::other(format!(
                "No listener registered for subscription {subscription}"
            ))
        })?;
        listener.on_change(event)
    }

    /// The registered subscription names.
    pub fn subscriptions(&self) -> Vec<&str> {
        self.listeners.keys().map(|s| s.as_str()).collect()
    }
}
