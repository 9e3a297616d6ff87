use crate::{
    config::{Config, Timing},
    protocol::{Protocol, Reading},
    publish::Channel,
};
use tinovi_leaf::{DATA_LEN, DEFAULT_ADDR, MEASUREMENT_TIME_MS, REG_DATA, REG_READ_START};

/// The Tinovi I2C leaf wetness sensor, which reports leaf wetness and
/// temperature.
#[derive(Copy, Clone, Debug)]
pub struct LeafWetness {
    start: [u8; 1],
    data: [u8; 1],
}

const NAME: &str = "leaf_wetness";

impl LeafWetness {
    pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

    pub const fn new() -> Self {
        Self::with_registers(REG_READ_START, REG_DATA)
    }

    /// Overrides the register map, for firmware revisions that moved it.
    pub const fn with_registers(start: u8, data: u8) -> Self {
        Self {
            start: [start],
            data: [data],
        }
    }
}

impl Default for LeafWetness {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for LeafWetness {
    type Frame = [u8; DATA_LEN];
    type Reading = tinovi_leaf::Reading;

    const NAME: &'static str = NAME;

    // if the register pointer didn't move, the sensor still answers with the
    // data frame.
    const ABORT_ON_READ_COMMAND_ERROR: bool = false;

    fn request_command(&self) -> &[u8] {
        &self.start
    }

    fn read_command(&self) -> &[u8] {
        &self.data
    }

    fn decode(&self, frame: Self::Frame) -> Self::Reading {
        tinovi_leaf::Reading::from_bytes(frame)
    }

    fn default_config(&self) -> Config {
        Config::new(DEFAULT_ADDR, Timing::settle(MEASUREMENT_TIME_MS.into()))
            .with_timeout_ms(Self::DEFAULT_TIMEOUT_MS)
    }
}

impl Reading for tinovi_leaf::Reading {
    fn values(&self) -> impl ExactSizeIterator<Item = (Channel, f32)> {
        [
            (Channel::Wetness, self.wetness),
            (Channel::Temperature, self.temperature),
        ]
        .into_iter()
    }
}
