//! The single outbound write path.
//!
//! Every frame the session produces, from any task, goes through one lock
//! around the transport, so frames reach the device whole and in the order
//! they were sent.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::codec::{self, Frame};
use crate::transport::HidTransport;

/// First sequence number carried by a session's pings.
pub const PING_SEQ_START: u32 = 0x40;

pub(crate) struct Link {
    transport: Mutex<Option<Box<dyn HidTransport>>>,
    seq: AtomicU32,
}

impl Link {
    pub(crate) fn new() -> Self {
        Self { transport: Mutex::new(None), seq: AtomicU32::new(PING_SEQ_START) }
    }

    pub(crate) fn attach(&self, transport: Box<dyn HidTransport>) {
        self.seq.store(PING_SEQ_START, Ordering::Relaxed);
        *self.transport.lock() = Some(transport);
    }

    /// Detach listeners and close the transport. Returns `false` if there
    /// was nothing to release.
    pub(crate) fn release(&self) -> bool {
        let Some(mut transport) = self.transport.lock().take() else {
            return false;
        };
        transport.unsubscribe();
        transport.close();
        true
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.transport.lock().is_some()
    }

    /// Write one frame. Failures are logged, never raised: the device gives
    /// no acknowledgement, so callers cannot act on them anyway.
    pub(crate) fn send(&self, frame: &Frame) -> bool {
        let mut guard = self.transport.lock();
        let Some(transport) = guard.as_mut() else {
            debug!("Transport released, dropping frame");
            return false;
        };

        match transport.write(&frame.to_report()) {
            Ok(_) => {
                trace!(?frame, "HID OUT");
                true
            }
            Err(e) => {
                warn!(error = %e, ?frame, "HID write failed");
                false
            }
        }
    }

    /// Send a ping with the next sequence byte.
    pub(crate) fn send_ping(&self) -> bool {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.send(&codec::encode_ping(seq.to_le_bytes()[0]))
    }
}
