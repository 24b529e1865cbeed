//! Simulated motion sensor for development without hardware.

use std::time::Duration;

use tracing::{debug, info};

use super::MotionSensor;
use crate::error::Result;
use crate::shutdown::Shutdown;

/// Waits a fixed time, then reports a fixed answer.
pub struct FakeMotionSensor {
    wait: Duration,
    motion: bool,
    detection_count: u64,
}

impl FakeMotionSensor {
    /// Create a sensor that waits `wait` and then reports `motion`.
    pub fn new(wait: Duration, motion: bool) -> Self {
        info!(
            "FakeMotionSensor initialized (wait={}s, motion={motion})",
            wait.as_secs_f64()
        );
        Self {
            wait,
            motion,
            detection_count: 0,
        }
    }
}

impl MotionSensor for FakeMotionSensor {
    fn wait_for_motion(&mut self, shutdown: &Shutdown) -> Result<bool> {
        if !shutdown.sleep(self.wait) {
            return Ok(false);
        }
        self.detection_count += 1;
        if self.motion {
            info!(
                "Motion detected (simulated, detection #{})",
                self.detection_count
            );
        } else {
            debug!("No motion (simulated, check #{})", self.detection_count);
        }
        Ok(self.motion)
    }
}
