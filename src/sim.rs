//! A simulated I2C bus with a leaf wetness sensor and a couple of laser
//! rangefinders on it.
use embedded_hal::blocking::i2c;
use std::time::Instant;

const LEAF_ADDR: u8 = tinovi_leaf::DEFAULT_ADDR;

#[derive(Debug)]
pub struct SimBus {
    started: Instant,
    rangefinders: &'static [u8],
    /// Every `nack_every`th write is NAKed. Zero disables NAK injection.
    nack_every: u64,
    writes: u64,
}

#[derive(Debug)]
pub enum SimError {
    Nack(u8),
}

impl SimBus {
    pub fn new(rangefinders: &'static [u8], nack_every: u64) -> Self {
        Self {
            started: Instant::now(),
            rangefinders,
            nack_every,
            writes: 0,
        }
    }

    fn secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    fn is_present(&self, addr: u8) -> bool {
        addr == LEAF_ADDR || self.rangefinders.contains(&addr)
    }

    fn leaf_frame(&self, buf: &mut [u8]) {
        let t = self.secs();
        let wetness = 40.0 + 20.0 * (t / 5.0).sin();
        let temperature = 18.0 + 3.0 * (t / 7.0).cos();
        let mut frame = [0; tinovi_leaf::DATA_LEN];
        frame[..2].copy_from_slice(&((wetness * 100.0) as i16).to_le_bytes());
        frame[2..].copy_from_slice(&((temperature * 100.0) as i16).to_le_bytes());
        fill(buf, &frame);
    }

    fn distance_frame(&self, addr: u8, buf: &mut [u8]) {
        let t = self.secs() + f32::from(addr);
        let mm = 1200.0 + 300.0 * (t / 3.0).sin();
        let raw = (mm as u32).saturating_sub(sen0590::OFFSET_MM) as u16;
        fill(buf, &raw.to_be_bytes());
    }
}

fn fill(buf: &mut [u8], frame: &[u8]) {
    for (dst, src) in buf.iter_mut().zip(frame.iter().chain(std::iter::repeat(&0xFF))) {
        *dst = *src;
    }
}

impl i2c::Write for SimBus {
    type Error = SimError;

    fn write(&mut self, addr: u8, _bytes: &[u8]) -> Result<(), SimError> {
        self.writes += 1;
        let nack = self.nack_every != 0 && self.writes % self.nack_every == 0;
        if !self.is_present(addr) || nack {
            return Err(SimError::Nack(addr));
        }
        Ok(())
    }
}

impl i2c::Read for SimBus {
    type Error = SimError;

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), SimError> {
        match addr {
            LEAF_ADDR => self.leaf_frame(buf),
            addr if self.rangefinders.contains(&addr) => self.distance_frame(addr, buf),
            addr => return Err(SimError::Nack(addr)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::blocking::i2c::Write;

    #[test]
    fn zero_disables_nacks() {
        let mut bus = SimBus::new(&[sen0590::DEFAULT_ADDR], 0);
        for _ in 0..100 {
            assert!(bus.write(LEAF_ADDR, &[tinovi_leaf::REG_READ_START]).is_ok());
        }
        assert!(bus.write(0x10, &[0x00]).is_err());
    }

    #[test]
    fn nacks_every_nth_write() {
        let mut bus = SimBus::new(&[sen0590::DEFAULT_ADDR], 3);
        let results: Vec<bool> = (0..6)
            .map(|_| bus.write(sen0590::DEFAULT_ADDR, &sen0590::CMD_MEASURE).is_ok())
            .collect();
        assert_eq!(results, vec![true, true, false, true, true, false]);
    }
}
