use core::time;

use hal::clock::Clock;

#[cfg(not(test))]
extern "Rust" {
    fn get_jiffies() -> time::Duration;
}

#[cfg(test)]
static TEST_JIFFIES: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(1000);

#[cfg(test)]
unsafe fn get_jiffies() -> time::Duration {
    time::Duration::from_millis(TEST_JIFFIES.load(core::sync::atomic::Ordering::Relaxed))
}

#[cfg(test)]
pub fn set(millis: u64) {
    TEST_JIFFIES.store(millis, core::sync::atomic::Ordering::Relaxed)
}

/// Board uptime, provided by the board crate as `get_jiffies`.
pub fn get() -> time::Duration {
    unsafe { get_jiffies() }
}

/// Uptime truncated to a wrapping millisecond counter.
pub fn millis() -> u32 {
    get().as_millis() as u32
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Jiffies;

impl Clock for Jiffies {
    fn millis(&self) -> u32 {
        millis()
    }
}
