//! Transport seam between the session and the OS HID stack.

use crate::error::HidResult;

/// Callback invoked with every inbound report, on the reader's thread.
pub type FrameHandler = Box<dyn Fn(&[u8]) + Send + 'static>;
/// Callback invoked once when the reader fails.
pub type FaultHandler = Box<dyn Fn(String) + Send + 'static>;

/// A HID device matching the requested vendor and product ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// OS path used to open the device
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: Option<String>,
    pub product: Option<String>,
}

/// Enumerates and opens HID devices.
#[cfg_attr(test, mockall::automock)]
pub trait HidBackend: Send + Sync {
    /// List devices matching the vendor and product id, in OS order.
    ///
    /// # Errors
    /// Returns an error if the HID subsystem cannot be queried.
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> HidResult<Vec<DeviceInfo>>;

    /// Open a device for reading and writing.
    ///
    /// # Errors
    /// Returns an error if the device cannot be opened.
    fn open(&self, device: &DeviceInfo) -> HidResult<Box<dyn HidTransport>>;
}

/// An open device handle.
pub trait HidTransport: Send {
    /// Write one output report.
    ///
    /// # Errors
    /// Returns an error if the OS rejects the write.
    fn write(&mut self, report: &[u8]) -> HidResult<usize>;

    /// Start delivering inbound reports and read faults.
    ///
    /// # Errors
    /// Returns an error if the reader cannot be started.
    fn subscribe(&mut self, on_frame: FrameHandler, on_fault: FaultHandler) -> HidResult<()>;

    /// Stop delivering inbound reports. Safe to call when not subscribed.
    fn unsubscribe(&mut self);

    /// Release the OS handle. Safe to call more than once.
    fn close(&mut self);
}
