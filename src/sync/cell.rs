use core::cell::UnsafeCell;

use super::{free, DataReader, DataWriter};

struct Slot<T> {
    data: T,
    fresh: bool,
}

/// Single-writer, single-reader last-value cell shared between interrupt and
/// poll context. Intermediate writes between two reads are lost.
pub struct Cell<T> {
    slot: UnsafeCell<Slot<T>>,
}

impl<T> Cell<T> {
    pub const fn new(data: T) -> Self {
        Self { slot: UnsafeCell::new(Slot { data, fresh: false }) }
    }
}

impl<T: Copy> Cell<T> {
    /// Copies the latest value without consuming it.
    pub fn peek(&self) -> T {
        free(|| unsafe { (*self.slot.get()).data })
    }
}

impl<T: Copy + Default> Default for Cell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy> DataWriter<T> for Cell<T> {
    fn write(&self, data: T) {
        free(|| {
            let slot = unsafe { &mut *self.slot.get() };
            slot.data = data;
            slot.fresh = true;
        })
    }
}

impl<T: Copy> DataReader<T> for Cell<T> {
    fn read(&self) -> (T, bool) {
        free(|| {
            let slot = unsafe { &mut *self.slot.get() };
            let fresh = slot.fresh;
            slot.fresh = false;
            (slot.data, fresh)
        })
    }
}

// Every access to the slot happens inside a critical section.
unsafe impl<T: Send> Send for Cell<T> {}
unsafe impl<T: Send> Sync for Cell<T> {}

mod test {
    #[test]
    fn test_read_consumes_freshness_once() {
        use super::{Cell, DataReader, DataWriter};

        let cell: Cell<u32> = Cell::new(0);
        assert_eq!(cell.read(), (0, false));

        cell.write(1);
        cell.write(2);
        cell.write(3);
        assert_eq!(cell.read(), (3, true));
        assert_eq!(cell.read(), (3, false));
        assert_eq!(cell.peek(), 3);
    }

    #[test]
    fn test_peek_keeps_freshness() {
        use super::{Cell, DataReader, DataWriter};

        let cell: Cell<u32> = Cell::default();
        cell.write(10086);
        assert_eq!(cell.peek(), 10086);
        assert_eq!(cell.read(), (10086, true));
    }
}
