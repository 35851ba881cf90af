//! Change notifications and user-facing error reporting.
//!
//! Observers (UI, undo, autosave) call [`subscribe`](crate::GraphController::subscribe)
//! and receive one [`GraphEvent`] per structural or property mutation.
//! User-facing failures go to a [`Notifier`] instead.

use crossbeam_channel::{Receiver, Sender};

/// Event published after the graph changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// Topology or node properties changed.
    Changed {
        /// Monotonic change counter, starting at 1.
        revision: u64,
    },
}

/// Receives user-facing error reports.
pub trait Notifier: Send {
    /// Report a failure the user should see.
    fn report_error(&self, title: &str, message: &str);
}

/// Default notifier: reports through `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn report_error(&self, title: &str, message: &str) {
        tracing::warn!("{title}: {message}");
    }
}

/// Fan-out of [`GraphEvent`]s to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct Broadcaster {
    subscribers: Vec<Sender<GraphEvent>>,
    revision: u64,
}

impl Broadcaster {
    pub(crate) fn subscribe(&mut self) -> Receiver<GraphEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends a change event, dropping subscribers whose receiver is gone.
    pub(crate) fn publish(&mut self) -> u64 {
        self.revision += 1;
        let event = GraphEvent::Changed {
            revision: self.revision,
        };
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        self.revision
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
