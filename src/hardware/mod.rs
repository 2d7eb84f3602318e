//! Hardware passthrough: USB devices and physical disks

pub mod disk;
pub mod usb;

pub use disk::{DiskBridge, PhysicalDisk};
pub use usb::{UsbBridge, UsbDevice, UsbState};
