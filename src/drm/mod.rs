//! Raw DRM kernel interface: ioctl argument layouts and the device wrapper.

pub mod device;
pub mod ioctl;

pub use device::NouveauDevice;
