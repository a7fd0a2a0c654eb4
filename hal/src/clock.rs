/// Free-running millisecond counter of the board, wrapping at `u32::MAX`.
///
/// Consumers must compare readings with `wrapping_sub`.
pub trait Clock {
    fn millis(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn millis(&self) -> u32 {
        (**self).millis()
    }
}
