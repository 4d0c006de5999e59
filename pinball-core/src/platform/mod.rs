//! The platform driver contract.
//!
//! A "platform" is whatever hardware abstraction layer owns the actual
//! boards (WPC, FAST, P-ROC, ...). This crate only needs the slice of that
//! contract the core depends on at startup; everything else about a
//! platform implementation is out of scope here.

use crate::error::Result;

/// What the core expects a hardware platform driver to expose at startup.
pub trait PlatformDriver {
    /// Configures one accelerometer device before any samples are expected
    /// from it.
    fn configure_accelerometer(
        &mut self,
        device: &str,
        number: &str,
        use_high_pass: bool,
    ) -> Result<()>;
}

/// A platform driver that does nothing, for tests and the CLI demo where no
/// real hardware configuration step is needed.
#[derive(Default)]
pub struct NullPlatformDriver;

impl PlatformDriver for NullPlatformDriver {
    fn configure_accelerometer(
        &mut self,
        _device: &str,
        _number: &str,
        _use_high_pass: bool,
    ) -> Result<()> {
        Ok(())
    }
}
