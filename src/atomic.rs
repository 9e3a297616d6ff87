pub use std::sync::atomic::*;
use std::fmt;

/// An `f32` stored as its bit pattern in an `AtomicU32`.
#[derive(Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    /// `f32::to_bits` isn't a `const fn` on our MSRV, so the only const
    /// constructor is zero.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(AtomicU32::new(0))
    }

    #[inline]
    #[must_use]
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    #[inline]
    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order)
    }
}

impl fmt::Debug for AtomicF32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(Ordering::Acquire), f)
    }
}
