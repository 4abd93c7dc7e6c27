//! KX-180 detection and the hidapi transport.

use std::ffi::CString;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info, warn};

use crate::codec::REPORT_LEN;
use crate::error::{HidError, HidResult};
use crate::transport::{DeviceInfo, FaultHandler, FrameHandler, HidBackend, HidTransport};

/// KX-180 USB vendor id
pub const KX180_VID: u16 = 0x1210;
/// KX-180 USB product id
pub const KX180_PID: u16 = 0x0042;

/// How long a blocking read waits before re-checking the stop flag.
const READ_TIMEOUT_MS: i32 = 100;

/// Backend over the system HID stack.
#[derive(Debug, Default)]
pub struct HidapiBackend;

impl HidapiBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HidBackend for HidapiBackend {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> HidResult<Vec<DeviceInfo>> {
        let api = HidApi::new()?;
        let devices: Vec<DeviceInfo> = api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(|d| DeviceInfo {
                path: d.path().to_string_lossy().into_owned(),
                vendor_id: d.vendor_id(),
                product_id: d.product_id(),
                serial: d.serial_number().map(str::to_owned),
                product: d.product_string().map(str::to_owned),
            })
            .collect();

        debug!(
            vendor_id = format!("{vendor_id:04x}"),
            product_id = format!("{product_id:04x}"),
            count = devices.len(),
            "Enumerated HID devices"
        );
        Ok(devices)
    }

    fn open(&self, device: &DeviceInfo) -> HidResult<Box<dyn HidTransport>> {
        let path = CString::new(device.path.as_str())
            .map_err(|_| HidError::InvalidPath(device.path.clone()))?;
        let api = HidApi::new()?;

        // The reader thread owns its own handle so writes never wait on a read.
        let writer = api.open_path(&path)?;
        let reader = api.open_path(&path)?;

        info!(
            path = %device.path,
            serial = device.serial.as_deref().unwrap_or("unknown"),
            "KX-180 opened"
        );

        Ok(Box::new(HidapiTransport {
            writer: Some(writer),
            reader: Some(reader),
            stop: Arc::new(AtomicBool::new(false)),
            reader_thread: None,
        }))
    }
}

/// An open KX-180 handle pair.
pub struct HidapiTransport {
    writer: Option<HidDevice>,
    reader: Option<HidDevice>,
    stop: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
}

impl HidTransport for HidapiTransport {
    fn write(&mut self, report: &[u8]) -> HidResult<usize> {
        let device = self.writer.as_ref().ok_or(HidError::NotConnected)?;
        device.write(report).map_err(write_failed)
    }

    fn subscribe(&mut self, on_frame: FrameHandler, on_fault: FaultHandler) -> HidResult<()> {
        let reader = self.reader.take().ok_or(HidError::NotConnected)?;
        self.stop.store(false, Ordering::Release);
        let stop = Arc::clone(&self.stop);

        let handle = std::thread::Builder::new()
            .name("kx180-reader".to_string())
            .spawn(move || read_loop(&reader, &stop, &on_frame, &on_fault))?;
        self.reader_thread = Some(handle);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.reader_thread.take()
            && handle.join().is_err()
        {
            warn!("Reader thread panicked");
        }
    }

    fn close(&mut self) {
        self.unsubscribe();
        if self.writer.take().is_some() {
            debug!("HID handles released");
        }
        self.reader = None;
    }
}

impl Drop for HidapiTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_failed(e: hidapi::HidError) -> HidError {
    HidError::TransportWrite(e.to_string())
}

fn read_loop(device: &HidDevice, stop: &AtomicBool, on_frame: &FrameHandler, on_fault: &FaultHandler) {
    let mut buf = [0u8; REPORT_LEN];
    while !stop.load(Ordering::Acquire) {
        match device.read_timeout(&mut buf, READ_TIMEOUT_MS) {
            Ok(0) => {}
            Ok(n) => on_frame(&buf[..n]),
            Err(e) => {
                on_fault(e.to_string());
                break;
            }
        }
    }
    debug!("Reader thread exiting");
}
