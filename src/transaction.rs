//! A non-blocking request/response transaction.
//!
//! A [`Transaction`] is armed with [`Transaction::trigger`] and then advanced
//! by calling [`Transaction::poll`] as often as the caller likes. Each poll
//! performs at most a couple of short bus operations, or nothing at all if
//! the sensor is still settling. Waiting is just staying in the same state
//! across polls; nothing here ever sleeps.
//!
//! Sensors are driven through one of two timing shapes (see [`Timing`]):
//!
//! ```text
//! settle:    Request -> Waiting -(settle)-> Ready -> Read -(N bytes available)-> Idle
//! two-phase: Request -> Ready -(request settle)-> Read -(read settle)-> Idle
//! ```
//!
//! Triggering again while a transaction is in flight restarts it from
//! [`State::Request`]. A transaction that can't complete within the configured
//! timeout ends in [`State::Faulted`] until it's triggered again.
use crate::{
    config::{Config, Timing},
    protocol::{self, Protocol},
    transport::Transport,
};
use core::fmt;
use embassy_time::{Duration, Instant};

#[derive(Debug)]
pub struct Transaction<P> {
    protocol: P,
    config: Config,
    state: State,
    /// Set by the first poll after a trigger.
    armed_at: Option<Instant>,
    request_started_at: Instant,
    read_started_at: Instant,
    /// Transport failures tolerated during the current transaction.
    transport_errors: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// No transaction in progress.
    Idle,
    /// Armed; the request command hasn't been sent yet.
    Request,
    /// The sensor is measuring.
    Waiting,
    /// Settle time elapsed (or, for two-phase timing, elapsing); the read
    /// command is next.
    Ready,
    /// Waiting for the response frame.
    Read,
    /// The last transaction timed out.
    Faulted,
}

/// The outcome of a single successful [`Transaction::poll`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Step<R> {
    /// Nothing to do.
    Idle,
    /// The transaction is progressing.
    Pending,
    /// A bus operation failed; it will be retried on the next poll.
    Retry,
    Complete(R),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Fault {
    /// The transaction didn't complete in time.
    Timeout {
        /// The state the transaction was stuck in.
        state: State,
        elapsed: Duration,
        /// Transport failures seen along the way.
        transport_errors: usize,
    },
}

impl<P: Protocol> Transaction<P> {
    /// Returns a new transaction using the protocol's default configuration.
    pub fn new(protocol: P) -> Self {
        let config = protocol.default_config();
        Self::with_config(protocol, config)
    }

    pub fn with_config(protocol: P, config: Config) -> Self {
        Self {
            protocol,
            config,
            state: State::Idle,
            armed_at: None,
            request_started_at: Instant::from_ticks(0),
            read_started_at: Instant::from_ticks(0),
            transport_errors: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// When the request command was last accepted.
    #[must_use]
    pub fn request_started_at(&self) -> Instant {
        self.request_started_at
    }

    /// When the read command was last accepted (two-phase timing only).
    #[must_use]
    pub fn read_started_at(&self) -> Instant {
        self.read_started_at
    }

    /// Arms a new transaction, abandoning any that's in flight.
    pub fn trigger(&mut self) {
        if self.state.is_in_flight() {
            log::debug!(
                target: P::NAME,
                "restarting transaction in flight (state={:?})",
                self.state
            );
        }
        self.state = State::Request;
        self.armed_at = None;
        self.transport_errors = 0;
    }

    /// Advances the transaction.
    ///
    /// `now` must come from a monotonic clock. Transport failures are never
    /// returned as errors: the failed step is retried on the next poll. The
    /// only error is a [`Fault`], returned once when the transaction exceeds
    /// its timeout. A frame that completes on the very poll that reaches the
    /// timeout is still returned.
    pub fn poll<T: Transport>(
        &mut self,
        bus: &mut T,
        now: Instant,
    ) -> Result<Step<P::Reading>, Fault> {
        if !self.state.is_in_flight() {
            return Ok(Step::Idle);
        }

        let armed_at = *self.armed_at.get_or_insert(now);
        let step = self.advance(bus, now);
        if matches!(step, Step::Complete(_)) {
            return Ok(step);
        }

        if let Some(timeout) = self.config.timeout() {
            let elapsed = elapsed(now, armed_at);
            if elapsed >= timeout {
                let fault = Fault::Timeout {
                    state: self.state,
                    elapsed,
                    transport_errors: self.transport_errors,
                };
                self.state = State::Faulted;
                return Err(fault);
            }
        }

        Ok(step)
    }

    fn advance<T: Transport>(&mut self, bus: &mut T, now: Instant) -> Step<P::Reading> {
        log::trace!(target: P::NAME, "state: {:?}", self.state);
        let addr = self.config.address;
        match (self.state, self.config.timing) {
            (State::Request, timing) => {
                if let Err(error) = bus.write(addr, self.protocol.request_command()) {
                    return self.retry("request command", error);
                }
                self.request_started_at = now;
                self.state = match timing {
                    Timing::Settle { .. } => State::Waiting,
                    Timing::TwoPhase { .. } => State::Ready,
                };
                Step::Pending
            }

            (State::Waiting, timing) => {
                if elapsed(now, self.request_started_at) >= timing.request_settle() {
                    self.state = State::Ready;
                }
                Step::Pending
            }

            (State::Ready, Timing::Settle { .. }) => {
                if let Some(step) = self.send_read_command(bus) {
                    return step;
                }
                if let Err(error) = bus.request_read(addr, protocol::frame_len::<P>()) {
                    return self.retry("read request", error);
                }
                self.state = State::Read;
                self.read_frame(bus)
            }

            (State::Read, Timing::Settle { .. }) => self.read_frame(bus),

            (State::Ready, timing @ Timing::TwoPhase { .. }) => {
                if elapsed(now, self.request_started_at) < timing.request_settle() {
                    return Step::Pending;
                }
                if let Some(step) = self.send_read_command(bus) {
                    return step;
                }
                self.read_started_at = now;
                self.state = State::Read;
                Step::Pending
            }

            (State::Read, timing @ Timing::TwoPhase { .. }) => {
                let read_settle = timing.read_settle().unwrap_or(Duration::from_ticks(0));
                if elapsed(now, self.read_started_at) < read_settle {
                    return Step::Pending;
                }
                let len = protocol::frame_len::<P>();
                match bus.request_read(addr, len) {
                    Ok(n) if n == len => self.read_frame(bus),
                    Ok(n) => {
                        log::debug!(target: P::NAME, "short read ({n}/{len} bytes); retrying");
                        self.transport_errors += 1;
                        Step::Retry
                    }
                    Err(error) => self.retry("read request", error),
                }
            }

            (State::Idle | State::Faulted, _) => Step::Idle,
        }
    }

    /// Writes the read command. Returns the step to bail out with if the
    /// poll should end here.
    fn send_read_command<T: Transport>(&mut self, bus: &mut T) -> Option<Step<P::Reading>> {
        let error = bus
            .write(self.config.address, self.protocol.read_command())
            .err()?;
        if P::ABORT_ON_READ_COMMAND_ERROR {
            return Some(self.retry("read command", error));
        }
        log::debug!(target: P::NAME, "read command failed: {error:?}; reading anyway");
        self.transport_errors += 1;
        None
    }

    /// Decodes the response frame if all of it has arrived.
    fn read_frame<T: Transport>(&mut self, bus: &mut T) -> Step<P::Reading> {
        let mut frame = P::Frame::default();
        let buf = frame.as_mut();
        if bus.available() != buf.len() {
            return Step::Pending;
        }

        for byte in buf.iter_mut() {
            match bus.read_byte() {
                Some(b) => *byte = b,
                None => return self.retry("read", "buffer drained early"),
            }
        }

        self.state = State::Idle;
        Step::Complete(self.protocol.decode(frame))
    }

    fn retry(&mut self, what: &str, error: impl fmt::Debug) -> Step<P::Reading> {
        self.transport_errors += 1;
        log::debug!(
            target: P::NAME,
            "{what} failed in {:?}: {error:?}; retrying on next poll",
            self.state
        );
        Step::Retry
    }
}

// === impl State ===

impl State {
    /// Returns `true` if a transaction is armed or in progress.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, Self::Idle | Self::Faulted)
    }
}

// === impl Fault ===

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout {
                state,
                elapsed,
                transport_errors,
            } => write!(
                f,
                "transaction timed out in {state:?} after {}ms ({transport_errors} transport errors)",
                elapsed.as_millis()
            ),
        }
    }
}

impl std::error::Error for Fault {}

/// Time since `since`, or zero if the clock hasn't caught up with it.
fn elapsed(now: Instant, since: Instant) -> Duration {
    now.checked_duration_since(since)
        .unwrap_or(Duration::from_ticks(0))
}
