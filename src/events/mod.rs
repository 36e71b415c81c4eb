// src/events/mod.rs

//! Publish/subscribe primitives for task notifications.
//!
//! Every task owns an [`EventBus`] on which it publishes [`TaskEvent`]s;
//! watch tasks and the session subscribe to these buses to relay output and
//! consolidate status changes. The bus is deliberately synchronous: delivery
//! happens inline at the publish site, against a snapshot of the subscriber
//! list, so subscribers are free to mutate subscriptions mid-delivery.

pub mod bus;

pub use bus::{EventBus, SubscriberId};

/// Notifications published on a task's own bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// The task appended text to its output buffer.
    OutputUpdated,
    /// The task's status may have changed; query `status()` for the value.
    StatusChanged,
}
