//! Motion sensors that trigger recording episodes.

mod fake;
mod pir;

pub use fake::FakeMotionSensor;
pub use pir::PirSensor;

use crate::error::Result;
use crate::shutdown::Shutdown;

/// Blocking motion trigger.
pub trait MotionSensor: Send {
    /// Block until motion is seen or the wait ends.
    ///
    /// Returns `Ok(false)` when no motion was seen or shutdown was requested.
    fn wait_for_motion(&mut self, shutdown: &Shutdown) -> Result<bool>;
}
