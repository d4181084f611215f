use anyhow::Result;
use std::sync::mpsc::Receiver;
use tokio::sync::mpsc;

use crate::dissect::PacketRecord;

/// Notifications from a [`crate::app::Session`] to whoever presents packets.
#[derive(Debug)]
pub enum CoreEvent {
    /// Newly captured packets that pass the active display filter.
    Packets(Vec<PacketRecord>),
    /// Every stored packet matching a newly applied filter. Replaces whatever
    /// was shown before.
    Filtered(Vec<PacketRecord>),
    /// The store was emptied.
    Cleared,
    FilterError(String),
    CaptureFinished,
    CaptureFailed(String),
}

/// Bridges the session's blocking event channel into async code.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<CoreEvent>,
}

impl EventHandler {
    pub fn new(core: Receiver<CoreEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        // A dedicated OS thread, since Receiver::recv blocks and would tie up
        // a tokio worker thread.
        std::thread::spawn(move || {
            for event in core {
                if tx.send(event).is_err() {
                    return;
                }
            }
        });

        Self { rx }
    }

    pub async fn next(&mut self) -> Result<CoreEvent> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Event channel closed"))
    }
}
