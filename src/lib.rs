//! Non-blocking, polled request/response drivers for I2C sensors.
//!
//! Each sensor is a [`Transaction`] over a [`Protocol`]: the scheduler
//! triggers it once per polling interval and polls it on every tick, and the
//! transaction works through request, settle and read without ever blocking
//! the loop that's driving it.
#[cfg(test)]
#[macro_use]
mod test_util;

pub mod atomic;
pub mod config;
#[cfg(feature = "sensor-leaf")]
pub mod leaf;
pub mod logger;
pub mod protocol;
pub mod publish;
#[cfg(feature = "sensor-sen0590")]
pub mod rangefinder;
pub mod sensor;
pub mod transaction;
pub mod transport;

pub type I2cRef<'bus, I> = shared_bus::I2cProxy<'bus, SharedI2c<I>>;
pub type I2cBus<I> = shared_bus::BusManager<SharedI2c<I>>;
pub type SharedI2c<I> = std::sync::Mutex<I>;

pub use config::{Config, Timing};
pub use protocol::{Protocol, Reading};
pub use publish::{Channel, Publish};
pub use sensor::{Component, PolledSensor, Status};
pub use transaction::{Fault, State, Step, Transaction};
pub use transport::{I2cTransport, Transport};
