//! PIR sensor read through the sysfs GPIO interface.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::MotionSensor;
use crate::constants::motion::PIR_POLL_MS;
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Passive infrared sensor on a GPIO pin, polled for a high level.
pub struct PirSensor {
    value_path: PathBuf,
    poll: Duration,
    detection_count: u64,
}

impl PirSensor {
    /// Export `pin` as an input and open it.
    pub fn open(pin: u32) -> Result<Self> {
        Self::open_at(Path::new(GPIO_ROOT), pin)
    }

    /// Open `pin` under a custom GPIO root.
    pub fn open_at(root: &Path, pin: u32) -> Result<Self> {
        let pin_dir = root.join(format!("gpio{pin}"));
        if !pin_dir.exists() {
            std::fs::write(root.join("export"), pin.to_string()).map_err(|e| {
                Error::MotionSensor {
                    reason: format!("failed to export GPIO {pin}: {e}"),
                }
            })?;
        }
        let direction = pin_dir.join("direction");
        if direction.exists() {
            std::fs::write(&direction, "in").map_err(|e| Error::MotionSensor {
                reason: format!("failed to set GPIO {pin} as input: {e}"),
            })?;
        }
        info!("PIR sensor initialized on GPIO pin {pin}");
        Ok(Self {
            value_path: pin_dir.join("value"),
            poll: Duration::from_millis(PIR_POLL_MS),
            detection_count: 0,
        })
    }

    fn is_high(&self) -> Result<bool> {
        let value = std::fs::read_to_string(&self.value_path).map_err(|e| Error::MotionSensor {
            reason: format!("failed to read {}: {e}", self.value_path.display()),
        })?;
        Ok(value.trim() == "1")
    }
}

impl MotionSensor for PirSensor {
    fn wait_for_motion(&mut self, shutdown: &Shutdown) -> Result<bool> {
        debug!("Waiting for motion on PIR sensor");
        let started = Instant::now();
        loop {
            if self.is_high()? {
                self.detection_count += 1;
                info!(
                    "Motion detected by PIR sensor (detection #{}, waited {:.1}s)",
                    self.detection_count,
                    started.elapsed().as_secs_f64()
                );
                return Ok(true);
            }
            if !shutdown.sleep(self.poll) {
                return Ok(false);
            }
        }
    }
}
