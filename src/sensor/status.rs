use serde::{Deserialize, Serialize, Serializer};
use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Represents the health of a polled sensor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Status {
    /// No transaction with this sensor has completed yet. It is likely that
    /// the sensor is not connected to the bus, or it hasn't been polled yet.
    Missing,

    /// The most recent transaction completed.
    Up,

    /// The most recent transaction faulted.
    // TODO(eliza): can we distinguish between I2C bus disconnection and a
    // sensor that NAKs the read command?
    Down,
}

impl Status {
    fn from_u8(u: u8) -> Self {
        match u {
            u if u == Status::Missing as u8 => Status::Missing,
            u if u == Status::Up as u8 => Status::Up,
            u if u == Status::Down as u8 => Status::Down,
            // Weird status, assume missing?
            _ => Status::Missing,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(Status::Missing as u8))
    }

    pub fn set_status(&self, status: Status) -> Status {
        let prev = self.0.swap(status as u8, Ordering::AcqRel);
        Status::from_u8(prev)
    }

    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusCell").field(&self.status()).finish()
    }
}

impl Serialize for StatusCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.status().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_status_returns_previous() {
        let cell = StatusCell::new();
        assert_eq!(cell.status(), Status::Missing);
        assert_eq!(cell.set_status(Status::Up), Status::Missing);
        assert_eq!(cell.set_status(Status::Down), Status::Up);
        assert_eq!(cell.status(), Status::Down);
        assert_eq!(serde_json::to_string(&cell).unwrap(), r#""down""#);
    }
}
