//! Single-writer channel from background tasks to the presentation loop.
//!
//! Background work never touches UI state. It sends values through a
//! [`DispatchBridge`]; the presentation loop owns the matching
//! [`DispatchQueue`] and applies each value in arrival order. Values sent
//! by one task keep their relative order.

use tokio::sync::mpsc;
use tracing::debug;

pub fn bridge<T>() -> (DispatchBridge<T>, DispatchQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DispatchBridge { tx }, DispatchQueue { rx })
}

#[derive(Debug)]
pub struct DispatchBridge<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for DispatchBridge<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> DispatchBridge<T> {
    /// Queues `update` for the presentation loop. Returns `false` once the
    /// loop has shut down; callers treat that as a silent drop.
    pub fn dispatch(&self, update: impl Into<T>) -> bool {
        if self.tx.send(update.into()).is_err() {
            debug!("dispatch_dropped: presentation loop closed");
            return false;
        }
        true
    }
}

#[derive(Debug)]
pub struct DispatchQueue<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> DispatchQueue<T> {
    /// Waits for the next update. `None` once every bridge is dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Takes everything already queued without waiting.
    pub fn drain(&mut self) -> Vec<T> {
        let mut updates = Vec::new();
        while let Ok(update) = self.rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}
