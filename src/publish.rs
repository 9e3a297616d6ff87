//! Where decoded values go.
use crate::atomic::{AtomicF32, AtomicUsize, Ordering};
use serde::{Serialize, Serializer};
use std::{fmt, io};

/// A published quantity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Leaf wetness, in percent.
    Wetness,
    /// Temperature, in degrees Celsius.
    Temperature,
    /// Distance, in millimeters.
    Distance,
}

/// Receives every value produced by a completed transaction.
///
/// Values are handed over as soon as they're decoded, with no buffering.
pub trait Publish {
    fn publish(&mut self, channel: Channel, value: f32);
}

impl<F> Publish for F
where
    F: FnMut(Channel, f32),
{
    fn publish(&mut self, channel: Channel, value: f32) {
        self(channel, value)
    }
}

/// The most recent value on each channel.
///
/// This can live in a `static` and be read from anywhere while the polling
/// loop updates it.
#[derive(Debug, Serialize)]
pub struct Latest {
    #[serde(serialize_with = "serialize_value")]
    pub wetness: Value,
    #[serde(serialize_with = "serialize_value")]
    pub temperature: Value,
    #[serde(serialize_with = "serialize_value")]
    pub distance: Value,
}

#[derive(Debug, Default)]
pub struct Value {
    value: AtomicF32,
    updates: AtomicUsize,
}

/// Writes each value as a line of JSON.
#[derive(Debug)]
pub struct JsonLines<W> {
    sensor: &'static str,
    writer: W,
}

#[derive(Serialize)]
struct Line<'a> {
    sensor: &'a str,
    channel: Channel,
    value: f32,
}

// === impl Channel ===

impl Channel {
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Wetness => "%",
            Self::Temperature => "\u{00B0}C",
            Self::Distance => "mm",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wetness => f.write_str("wetness"),
            Self::Temperature => f.write_str("temperature"),
            Self::Distance => f.write_str("distance"),
        }
    }
}

// === impl Latest ===

impl Latest {
    pub const fn new() -> Self {
        Self {
            wetness: Value::new(),
            temperature: Value::new(),
            distance: Value::new(),
        }
    }

    #[must_use]
    pub fn channel(&self, channel: Channel) -> &Value {
        match channel {
            Channel::Wetness => &self.wetness,
            Channel::Temperature => &self.temperature,
            Channel::Distance => &self.distance,
        }
    }
}

impl Default for Latest {
    fn default() -> Self {
        Self::new()
    }
}

impl Publish for &'_ Latest {
    fn publish(&mut self, channel: Channel, value: f32) {
        self.channel(channel).set(value);
    }
}

impl fmt::Display for Latest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for channel in [Channel::Wetness, Channel::Temperature, Channel::Distance] {
            if let Some(value) = self.channel(channel).get() {
                write!(f, "{sep}{channel}: {value:.2}{}", channel.unit())?;
                sep = ", ";
            }
        }
        Ok(())
    }
}

fn serialize_value<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
    value.get().serialize(serializer)
}

// === impl Value ===

impl Value {
    pub const fn new() -> Self {
        Self {
            value: AtomicF32::zero(),
            updates: AtomicUsize::new(0),
        }
    }

    /// Returns the last published value, or `None` if nothing was published
    /// yet.
    #[must_use]
    pub fn get(&self) -> Option<f32> {
        if self.updates() == 0 {
            return None;
        }
        Some(self.value.load(Ordering::Acquire))
    }

    /// Number of values published so far.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::Acquire)
    }

    fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
        self.updates.fetch_add(1, Ordering::AcqRel);
    }
}

// === impl JsonLines ===

impl<W: io::Write> JsonLines<W> {
    pub fn new(sensor: &'static str, writer: W) -> Self {
        Self { sensor, writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Publish for JsonLines<W> {
    fn publish(&mut self, channel: Channel, value: f32) {
        let line = Line {
            sensor: self.sensor,
            channel,
            value,
        };
        let res = serde_json::to_writer(&mut self.writer, &line)
            .map_err(io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(error) = res {
            log::warn!(target: "publish", "failed to write {channel} from {}: {error}", self.sensor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_publish() {
        let mut seen = Vec::new();
        let mut publish = |channel: Channel, value: f32| seen.push((channel, value));
        publish.publish(Channel::Distance, 310.0);
        assert_eq!(seen, vec![(Channel::Distance, 310.0)]);
    }

    #[test]
    fn latest_tracks_each_channel() {
        static LATEST: Latest = Latest::new();
        assert_eq!(LATEST.wetness.get(), None);
        assert_eq!(LATEST.to_string(), "");

        let mut publish = &LATEST;
        publish.publish(Channel::Wetness, 12.5);
        publish.publish(Channel::Wetness, 13.0);
        publish.publish(Channel::Distance, 310.0);

        assert_eq!(LATEST.wetness.get(), Some(13.0));
        assert_eq!(LATEST.wetness.updates(), 2);
        assert_eq!(LATEST.temperature.get(), None);
        assert_eq!(LATEST.channel(Channel::Distance).get(), Some(310.0));
        assert_eq!(LATEST.to_string(), "wetness: 13.00%, distance: 310.00mm");
        assert_eq!(
            serde_json::to_string(&LATEST).unwrap(),
            r#"{"wetness":13.0,"temperature":null,"distance":310.0}"#
        );
    }

    #[test]
    fn json_lines() {
        let mut publish = JsonLines::new("sen0590", Vec::new());
        publish.publish(Channel::Distance, 310.0);
        publish.publish(Channel::Temperature, -5.5);

        let out = String::from_utf8(publish.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"sensor\":\"sen0590\",\"channel\":\"distance\",\"value\":310.0}\n\
             {\"sensor\":\"sen0590\",\"channel\":\"temperature\",\"value\":-5.5}\n"
        );
    }
}
