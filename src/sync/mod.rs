pub mod cell;

pub use cell::Cell;

pub trait DataWriter<T> {
    fn write(&self, data: T);
}

pub trait DataReader<T> {
    /// Copies the latest value out and clears its freshness, returning
    /// whether it had been written since the previous read.
    fn read(&self) -> (T, bool);
}

impl<T, W: DataWriter<T> + ?Sized> DataWriter<T> for &W {
    fn write(&self, data: T) {
        (**self).write(data)
    }
}

impl<T, R: DataReader<T> + ?Sized> DataReader<T> for &R {
    fn read(&self) -> (T, bool) {
        (**self).read()
    }
}

/// Runs `f` with the receive interrupt excluded.
///
/// Nesting is allowed; the outermost call restores the previous state.
#[inline]
pub fn free<R>(f: impl FnOnce() -> R) -> R {
    critical_section::with(|_cs| f())
}
