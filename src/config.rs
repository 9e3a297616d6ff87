use embassy_time::{Duration, TICK_HZ};
use serde::{Deserialize, Serialize};

/// Per-instance driver configuration.
///
/// Every threshold is a plain value so that differently tuned drivers can
/// share a bus, and so a host can hand these in as data.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// 7-bit I2C address of the device.
    pub address: u8,
    pub timing: Timing,
    /// Abandon a transaction that hasn't completed this long after it was
    /// first polled. `None` waits forever.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// How long to let the sensor settle between commands.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timing {
    /// Wait once after the request, then poll the bus until the whole frame
    /// is available.
    Settle { settle_ms: u64 },
    /// Wait after the request, then again after selecting the data register,
    /// then read the frame unconditionally.
    TwoPhase {
        request_settle_ms: u64,
        read_settle_ms: u64,
    },
}

impl Config {
    pub const fn new(address: u8, timing: Timing) -> Self {
        Self {
            address,
            timing,
            timeout_ms: None,
        }
    }

    pub const fn with_address(self, address: u8) -> Self {
        Self { address, ..self }
    }

    pub const fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        Self {
            timeout_ms: Some(timeout_ms),
            ..self
        }
    }

    pub const fn without_timeout(self) -> Self {
        Self {
            timeout_ms: None,
            ..self
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(millis)
    }
}

impl Timing {
    pub const fn settle(settle_ms: u64) -> Self {
        Self::Settle { settle_ms }
    }

    pub const fn two_phase(request_settle_ms: u64, read_settle_ms: u64) -> Self {
        Self::TwoPhase {
            request_settle_ms,
            read_settle_ms,
        }
    }

    /// Settle time after the request command.
    pub fn request_settle(&self) -> Duration {
        match *self {
            Self::Settle { settle_ms } => millis(settle_ms),
            Self::TwoPhase {
                request_settle_ms, ..
            } => millis(request_settle_ms),
        }
    }

    /// Settle time after the read command, if there is a second phase.
    pub fn read_settle(&self) -> Option<Duration> {
        match *self {
            Self::Settle { .. } => None,
            Self::TwoPhase { read_settle_ms, .. } => Some(millis(read_settle_ms)),
        }
    }
}

/// Converts milliseconds to a [`Duration`], saturating at the largest
/// number of milliseconds the tick counter can represent.
fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms.min(u64::MAX / TICK_HZ))
}
