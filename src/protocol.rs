//! What differs between the sensors sharing the polling state machine.
use crate::{config::Config, publish::Channel};
use core::fmt;

/// A request/response register protocol.
///
/// Implementations supply the command bytes, the shape of the response
/// frame and how to decode it; [`Transaction`](crate::Transaction) supplies
/// the timing.
pub trait Protocol {
    /// A raw response frame, e.g. `[u8; 4]`.
    type Frame: AsMut<[u8]> + Default;
    type Reading: Reading;

    const NAME: &'static str;

    /// If `true`, a failed write of the read command ends the current poll
    /// and the command is re-sent on the next one. If `false`, the failure is
    /// logged and the response is requested anyway.
    const ABORT_ON_READ_COMMAND_ERROR: bool;

    /// Bytes written to start a measurement.
    fn request_command(&self) -> &[u8];

    /// Bytes written to select the measurement data for reading.
    fn read_command(&self) -> &[u8];

    fn decode(&self, frame: Self::Frame) -> Self::Reading;

    fn default_config(&self) -> Config;
}

/// A decoded measurement.
pub trait Reading: Copy + fmt::Debug + fmt::Display {
    /// The values in this reading, in publication order.
    fn values(&self) -> impl ExactSizeIterator<Item = (Channel, f32)>;
}

/// Length of a protocol's response frame.
pub(crate) fn frame_len<P: Protocol>() -> usize {
    P::Frame::default().as_mut().len()
}
