use crate::{
    config::Config,
    protocol::{Protocol, Reading},
    publish::Publish,
    transaction::{Step, Transaction},
    transport::Transport,
};
use anyhow::Context;
use embassy_time::Instant;
use std::num::Wrapping;

pub mod status;
pub use self::status::{Status, StatusCell};

/// Something the scheduler drives: set up once, then `update`d every polling
/// interval and `poll`ed on every tick.
///
/// Only one component per bus may have a transaction in flight at a time.
/// Nothing here enforces that; the scheduler has to.
pub trait Component {
    fn name(&self) -> &'static str;

    /// Where this component runs in the setup order. Higher runs first.
    fn setup_priority(&self) -> SetupPriority {
        SetupPriority::Bus
    }

    /// Called once, before any `update` or `poll`.
    fn setup(&mut self);

    /// Starts a new measurement, abandoning any in flight.
    fn update(&mut self);

    /// Advances the measurement in flight, if any.
    ///
    /// Returns an error if the measurement faulted. Transient bus errors are
    /// retried internally and never returned.
    fn poll(&mut self, now: Instant) -> anyhow::Result<()>;

    fn status(&self) -> Status;
}

/// Setup ordering relative to other components.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum SetupPriority {
    Late,
    Data,
    Hardware,
    /// Set up with the bus itself, before anything that consumes readings.
    Bus,
}

/// A sensor driven by a [`Transaction`], publishing each reading it
/// completes.
#[derive(Debug)]
pub struct PolledSensor<P, B, O> {
    transaction: Transaction<P>,
    bus: B,
    output: O,
    status: StatusCell,
    readings: Wrapping<usize>,
    faults: Wrapping<usize>,
}

impl<P, B, O> PolledSensor<P, B, O>
where
    P: Protocol,
    B: Transport,
    O: Publish,
{
    pub fn new(protocol: P, bus: B, output: O) -> Self {
        Self::from_transaction(Transaction::new(protocol), bus, output)
    }

    pub fn with_config(protocol: P, config: Config, bus: B, output: O) -> Self {
        Self::from_transaction(Transaction::with_config(protocol, config), bus, output)
    }

    fn from_transaction(transaction: Transaction<P>, bus: B, output: O) -> Self {
        Self {
            transaction,
            bus,
            output,
            status: StatusCell::new(),
            readings: Wrapping(0),
            faults: Wrapping(0),
        }
    }

    pub fn transaction(&self) -> &Transaction<P> {
        &self.transaction
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Completed readings so far.
    pub fn readings(&self) -> usize {
        self.readings.0
    }

    /// Faulted transactions so far.
    pub fn faults(&self) -> usize {
        self.faults.0
    }
}

impl<P, B, O> Component for PolledSensor<P, B, O>
where
    P: Protocol,
    B: Transport,
    O: Publish,
{
    fn name(&self) -> &'static str {
        P::NAME
    }

    fn setup(&mut self) {
        let config = self.transaction.config();
        log::info!(
            target: P::NAME,
            "{} at addr={:#x}, timing: {:?}, timeout: {:?}ms",
            P::NAME,
            config.address,
            config.timing,
            config.timeout_ms,
        );
    }

    fn update(&mut self) {
        self.transaction.trigger();
    }

    fn poll(&mut self, now: Instant) -> anyhow::Result<()> {
        let addr = self.transaction.config().address;
        let step = self
            .transaction
            .poll(&mut self.bus, now)
            .map_err(|fault| {
                self.faults += 1;
                self.status.set_status(Status::Down);
                fault
            })
            .with_context(|| format!("polling {} (addr={addr:#x})", P::NAME))?;
        let Step::Complete(reading) = step else {
            return Ok(());
        };

        log::info!(target: P::NAME, "[{}] {reading}", P::NAME);
        for (channel, value) in reading.values() {
            self.output.publish(channel, value);
        }
        self.readings += 1;

        let prev = self.status.set_status(Status::Up);
        if prev != Status::Up {
            log::info!(target: P::NAME, "{} is up (was {prev})", P::NAME);
        }
        Ok(())
    }

    fn status(&self) -> Status {
        self.status.status()
    }
}
