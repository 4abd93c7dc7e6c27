//! In-memory transport for driver tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::codec::{FRAME_LEN, Frame};
use crate::error::{HidError, HidResult};
use crate::transport::{DeviceInfo, FaultHandler, FrameHandler, HidTransport, MockHidBackend};

#[derive(Default)]
struct WireState {
    writes: Vec<(Instant, Vec<u8>)>,
    attempts: usize,
    closes: usize,
    fail_writes: bool,
    on_frame: Option<FrameHandler>,
    on_fault: Option<FaultHandler>,
}

/// Shared view of what a fake transport saw.
#[derive(Clone)]
pub(crate) struct Wire {
    state: Arc<Mutex<WireState>>,
    started: Instant,
}

impl Wire {
    pub(crate) fn new() -> Self {
        Self { state: Arc::default(), started: Instant::now() }
    }

    pub(crate) fn transport(&self) -> Box<dyn HidTransport> {
        Box::new(FakeTransport { wire: self.clone() })
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub(crate) fn frames(&self) -> Vec<Frame> {
        self.state.lock().writes.iter().map(|(_, report)| Frame::from_slice(&report[..FRAME_LEN])).collect()
    }

    /// Frames with their offset from `origin`.
    pub(crate) fn timeline(&self, origin: Instant) -> Vec<(Duration, Frame)> {
        self.state
            .lock()
            .writes
            .iter()
            .map(|(at, report)| (at.duration_since(origin), Frame::from_slice(&report[..FRAME_LEN])))
            .collect()
    }

    pub(crate) fn reports(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.iter().map(|(_, report)| report.clone()).collect()
    }

    pub(crate) fn clear(&self) {
        self.state.lock().writes.clear();
    }

    pub(crate) fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    pub(crate) fn closes(&self) -> usize {
        self.state.lock().closes
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        self.state.lock().on_frame.is_some()
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    /// Deliver an inbound report as the reader thread would.
    pub(crate) fn inject(&self, raw: &[u8]) {
        if let Some(on_frame) = self.state.lock().on_frame.as_ref() {
            on_frame(raw);
        }
    }

    pub(crate) fn fault(&self, message: &str) {
        if let Some(on_fault) = self.state.lock().on_fault.as_ref() {
            on_fault(message.to_string());
        }
    }
}

struct FakeTransport {
    wire: Wire,
}

impl HidTransport for FakeTransport {
    fn write(&mut self, report: &[u8]) -> HidResult<usize> {
        let mut state = self.wire.state.lock();
        state.attempts += 1;
        if state.fail_writes {
            return Err(HidError::TransportWrite("unplugged".to_string()));
        }
        state.writes.push((Instant::now(), report.to_vec()));
        Ok(report.len())
    }

    fn subscribe(&mut self, on_frame: FrameHandler, on_fault: FaultHandler) -> HidResult<()> {
        let mut state = self.wire.state.lock();
        state.on_frame = Some(on_frame);
        state.on_fault = Some(on_fault);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let mut state = self.wire.state.lock();
        state.on_frame = None;
        state.on_fault = None;
    }

    fn close(&mut self) {
        self.wire.state.lock().closes += 1;
    }
}

pub(crate) fn device(path: &str) -> DeviceInfo {
    DeviceInfo {
        path: path.to_string(),
        vendor_id: crate::device::KX180_VID,
        product_id: crate::device::KX180_PID,
        serial: None,
        product: Some("KX-180".to_string()),
    }
}

/// Backend that finds one mixer wired to `wire`.
pub(crate) fn backend(wire: &Wire) -> MockHidBackend {
    let mut backend = MockHidBackend::new();
    backend.expect_enumerate().returning(|_, _| Ok(vec![device("/dev/hidraw3")]));
    let wire = wire.clone();
    backend.expect_open().returning(move |_| Ok(wire.transport()));
    backend
}
