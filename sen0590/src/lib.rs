// DFRobot SEN0590 laser ranging sensor (4m).
// based on the vendor's example code:
// https://wiki.dfrobot.com/Laser_Ranging_Sensor_4m_SKU_SEN0590
#![cfg_attr(not(test), no_std)]
use core::fmt;
use embedded_hal::blocking::{delay::DelayMs, i2c};

/// Default I2C address of the sensor.
pub const DEFAULT_ADDR: u8 = 0x74;

/// Starts a new ranging measurement.
pub const CMD_MEASURE: [u8; 2] = [0x10, 0xB0];

/// Selects the distance register for the next read.
pub const CMD_READ_DISTANCE: [u8; 1] = [0x02];

/// Length of a distance frame.
pub const DATA_LEN: usize = 2;

/// Added to every raw distance to account for the housing and lens.
pub const OFFSET_MM: u32 = 10;

/// Time between starting a measurement and asking for the result.
pub const MEASUREMENT_TIME_MS: u16 = 50;

/// Time between selecting the distance register and reading it.
pub const READ_TIME_MS: u16 = 20;

#[derive(Debug)]
pub struct Sen0590<I> {
    i2c: I,
    addr: u8,
}

/// A measured distance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Distance {
    pub millimeters: u32,
}

#[derive(Debug)]
pub enum Error<E> {
    I2c(E),
}

impl<I> Sen0590<I> {
    pub fn new(i2c: I) -> Self {
        Self::with_addr(i2c, DEFAULT_ADDR)
    }

    pub fn with_addr(i2c: I, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Releases the underlying I2C bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I, E> Sen0590<I>
where
    I: i2c::Write<Error = E> + i2c::Read<Error = E>,
{
    /// Measures a distance, blocking for the measurement and read times.
    pub fn read(&mut self, delay: &mut impl DelayMs<u16>) -> Result<Distance, Error<E>> {
        self.i2c.write(self.addr, &CMD_MEASURE).map_err(Error::I2c)?;
        delay.delay_ms(MEASUREMENT_TIME_MS);

        self.i2c
            .write(self.addr, &CMD_READ_DISTANCE)
            .map_err(Error::I2c)?;
        delay.delay_ms(READ_TIME_MS);

        let mut buf = [0; DATA_LEN];
        self.i2c.read(self.addr, &mut buf[..]).map_err(Error::I2c)?;
        Ok(Distance::from_bytes(buf))
    }
}

// === impl Distance ===

impl Distance {
    /// Decodes a big-endian distance frame and applies [`OFFSET_MM`].
    ///
    /// The raw value isn't range checked: a sensor with nothing in front of it
    /// will happily report ~65 meters.
    #[must_use]
    pub fn from_bytes(buf: [u8; DATA_LEN]) -> Self {
        Self {
            millimeters: u32::from(u16::from_be_bytes(buf)) + OFFSET_MM,
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Distance: {:>4} mm", self.millimeters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeI2c {
        writes: Vec<Vec<u8>>,
        data: [u8; DATA_LEN],
        fail: bool,
    }

    impl i2c::Write for FakeI2c {
        type Error = &'static str;

        fn write(&mut self, _addr: u8, bytes: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err("nack");
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }
    }

    impl i2c::Read for FakeI2c {
        type Error = &'static str;

        fn read(&mut self, _addr: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
            buffer.copy_from_slice(&self.data);
            Ok(())
        }
    }

    struct FakeDelay(Vec<u16>);

    impl DelayMs<u16> for FakeDelay {
        fn delay_ms(&mut self, ms: u16) {
            self.0.push(ms);
        }
    }

    #[test]
    fn decodes_big_endian_with_offset() {
        assert_eq!(Distance::from_bytes([0x01, 0x2C]).millimeters, 310);
        assert_eq!(Distance::from_bytes([0x00, 0x00]).millimeters, 10);
        assert_eq!(Distance::from_bytes([0xFF, 0xFF]).millimeters, 65_545);
    }

    #[test]
    fn blocking_read() {
        let mut sensor = Sen0590::new(FakeI2c {
            writes: Vec::new(),
            data: [0x03, 0xE8],
            fail: false,
        });
        let mut delay = FakeDelay(Vec::new());

        let distance = sensor.read(&mut delay).unwrap();
        assert_eq!(distance, Distance { millimeters: 1010 });
        assert_eq!(delay.0, vec![MEASUREMENT_TIME_MS, READ_TIME_MS]);
        assert_eq!(
            sensor.release().writes,
            vec![CMD_MEASURE.to_vec(), CMD_READ_DISTANCE.to_vec()]
        );
    }

    #[test]
    fn blocking_read_propagates_bus_errors() {
        let mut sensor = Sen0590::new(FakeI2c {
            writes: Vec::new(),
            data: [0; DATA_LEN],
            fail: true,
        });
        let mut delay = FakeDelay(Vec::new());

        assert!(matches!(sensor.read(&mut delay), Err(Error::I2c("nack"))));
        assert!(delay.0.is_empty());
    }
}
