use crate::{
    config::{Config, Timing},
    protocol::{Protocol, Reading},
    publish::Channel,
};
use sen0590::{Distance, CMD_MEASURE, CMD_READ_DISTANCE, DATA_LEN, DEFAULT_ADDR};

/// The DFRobot SEN0590 laser rangefinder.
///
/// The sensor works with either timing shape: [`Protocol::default_config`]
/// settles once and then polls for the frame, while
/// [`Sen0590::two_phase_config`] also waits out a fixed delay after selecting
/// the distance register, the way the vendor's example does.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sen0590;

const NAME: &str = "sen0590";

impl Sen0590 {
    pub const DEFAULT_TIMEOUT_MS: u64 = 500;

    pub const fn new() -> Self {
        Self
    }

    pub fn two_phase_config() -> Config {
        Config::new(
            DEFAULT_ADDR,
            Timing::two_phase(
                sen0590::MEASUREMENT_TIME_MS.into(),
                sen0590::READ_TIME_MS.into(),
            ),
        )
        .with_timeout_ms(Self::DEFAULT_TIMEOUT_MS)
    }
}

impl Protocol for Sen0590 {
    type Frame = [u8; DATA_LEN];
    type Reading = Distance;

    const NAME: &'static str = NAME;
    const ABORT_ON_READ_COMMAND_ERROR: bool = true;

    fn request_command(&self) -> &[u8] {
        &CMD_MEASURE
    }

    fn read_command(&self) -> &[u8] {
        &CMD_READ_DISTANCE
    }

    fn decode(&self, frame: Self::Frame) -> Distance {
        Distance::from_bytes(frame)
    }

    fn default_config(&self) -> Config {
        Config::new(
            DEFAULT_ADDR,
            Timing::settle(sen0590::MEASUREMENT_TIME_MS.into()),
        )
        .with_timeout_ms(Self::DEFAULT_TIMEOUT_MS)
    }
}

impl Reading for Distance {
    fn values(&self) -> impl ExactSizeIterator<Item = (Channel, f32)> {
        // exact: distances top out at 65545mm
        [(Channel::Distance, self.millimeters as f32)].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configs() {
        let single = Sen0590::new().default_config();
        assert_eq!(single.address, 0x74);
        assert_eq!(single.timing, Timing::Settle { settle_ms: 50 });

        let two_phase = Sen0590::two_phase_config();
        assert_eq!(two_phase.address, 0x74);
        assert_eq!(
            two_phase.timing,
            Timing::TwoPhase {
                request_settle_ms: 50,
                read_settle_ms: 20,
            }
        );
        assert_eq!(two_phase.timeout_ms, Some(500));
    }

    #[test]
    fn publishes_distance() {
        let distance = Sen0590::new().decode([0x01, 0x2C]);
        let values: Vec<_> = distance.values().collect();
        assert_eq!(values, vec![(Channel::Distance, 310.0)]);
    }
}
