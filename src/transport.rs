//! The bus operations a polled transaction is allowed to perform.
//!
//! None of these may block for longer than a single I2C transfer. In
//! particular, there's no "wait for data" operation: waiting is the state
//! machine's job.
use core::fmt;
use embedded_hal::blocking::i2c;
use heapless::Deque;

/// Receive buffer size, in bytes. Matches the Arduino `Wire` buffer.
pub const RX_CAPACITY: usize = 32;

pub trait Transport {
    type Error: fmt::Debug;

    /// Writes `bytes` to the device at `address` as a single transmission.
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Asks the device at `address` for `count` bytes, discarding anything
    /// still buffered from an earlier request.
    ///
    /// Returns the number of bytes that were buffered.
    fn request_read(&mut self, address: u8, count: usize) -> Result<usize, Self::Error>;

    /// Number of buffered bytes ready to be read.
    fn available(&self) -> usize;

    fn read_byte(&mut self) -> Option<u8>;
}

/// A [`Transport`] over any blocking `embedded-hal` I2C bus, including a
/// `shared-bus` proxy.
#[derive(Debug)]
pub struct I2cTransport<I> {
    i2c: I,
    rx: Deque<u8, RX_CAPACITY>,
}

impl<I> I2cTransport<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            rx: Deque::new(),
        }
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I, E> Transport for I2cTransport<I>
where
    I: i2c::Write<Error = E> + i2c::Read<Error = E>,
    E: fmt::Debug,
{
    type Error = E;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), E> {
        self.i2c.write(address, bytes)
    }

    fn request_read(&mut self, address: u8, count: usize) -> Result<usize, E> {
        self.rx.clear();
        let count = count.min(RX_CAPACITY);
        let mut buf = [0u8; RX_CAPACITY];
        self.i2c.read(address, &mut buf[..count])?;
        for &byte in &buf[..count] {
            // can't overflow, the deque was just cleared and `count` is clamped
            let _ = self.rx.push_back(byte);
        }
        Ok(count)
    }

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Transport;
    use std::collections::VecDeque;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Op {
        Write(u8, Vec<u8>),
        RequestRead(u8, usize),
        ReadByte,
    }

    /// A scripted bus that records every operation.
    ///
    /// Bytes staged with [`MockBus::respond_with`] are handed over on the next
    /// `request_read`, unless the bus is holding them back to imitate a slow
    /// device, in which case [`MockBus::deliver`] releases them.
    #[derive(Debug, Default)]
    pub(crate) struct MockBus {
        pub(crate) ops: Vec<Op>,
        pub(crate) failing_writes: usize,
        pub(crate) failing_reads: usize,
        pub(crate) hold: bool,
        staged: Vec<u8>,
        rx: VecDeque<u8>,
    }

    impl MockBus {
        pub(crate) fn respond_with(&mut self, bytes: &[u8]) {
            self.staged = bytes.to_vec();
        }

        pub(crate) fn deliver(&mut self) {
            self.rx.extend(self.staged.drain(..));
        }

        pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Write(_, bytes) => Some(bytes.clone()),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn take_ops(&mut self) -> Vec<Op> {
            std::mem::take(&mut self.ops)
        }
    }

    impl Transport for MockBus {
        type Error = &'static str;

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
            self.ops.push(Op::Write(address, bytes.to_vec()));
            if self.failing_writes > 0 {
                self.failing_writes -= 1;
                return Err("nack");
            }
            Ok(())
        }

        fn request_read(&mut self, address: u8, count: usize) -> Result<usize, Self::Error> {
            self.ops.push(Op::RequestRead(address, count));
            if self.failing_reads > 0 {
                self.failing_reads -= 1;
                return Err("nack");
            }
            self.rx.clear();
            if !self.hold {
                self.deliver();
            }
            Ok(self.rx.len())
        }

        fn available(&self) -> usize {
            self.rx.len()
        }

        fn read_byte(&mut self) -> Option<u8> {
            self.ops.push(Op::ReadByte);
            self.rx.pop_front()
        }
    }
}
