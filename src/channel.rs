//! Outbound half of the backend/display message channel.

use tokio::sync::mpsc;

use crate::models::message::Event;

/// Cloneable handle used by every backend task to publish events to the display side.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire and forget. A closed display side is not an error for the sender.
    pub fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            log::debug!("display side closed, event dropped");
        }
    }
}
