//! Ordered delivery of chain events to observers.
//!
//! Events from every producer go through one FIFO queue drained by one consumer thread, so every
//! observer sees the same global order, which is the order in which the chain lock was held.

pub mod dispatcher;
pub mod events;

pub use dispatcher::{Dispatcher, SubscriptionId};
pub use events::{ChainEvent, ChainObserver};
