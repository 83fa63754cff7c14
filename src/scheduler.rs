//! Cooperative call-every timer service and boot clock.
//!
//! Timers fire from [`Scheduler::run_once`], which the host calls at its
//! message boundary (the same loop that feeds inbound bytes). Once
//! [`Scheduler::remove`] returns, the callback is never invoked again by
//! this scheduler; a tick already in flight on another thread completes.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Opaque token for a registered call-every timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

type TimerFn = Box<dyn FnMut() + Send>;

struct Entry {
    id: u64,
    interval: Duration,
    next_due: Instant,
    /// Taken out while the callback runs so the lock can be released.
    cb: Option<TimerFn>,
}

/// Periodic timer service.
pub struct Scheduler {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `f` to be called every `interval`, first at `now + interval`.
    pub fn add_call_every(&self, interval: Duration, f: impl FnMut() + Send + 'static) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock().unwrap();
        entries.push(Entry {
            id,
            interval,
            next_due: Instant::now() + interval,
            cb: Some(Box::new(f)),
        });
        TimerHandle(id)
    }

    /// Deregister a timer. A no-op for handles already removed.
    pub fn remove(&self, handle: TimerHandle) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| e.id != handle.0);
    }

    /// Fire every due timer once, using the monotonic clock.
    pub fn run_once(&self) {
        self.run_at(Instant::now());
    }

    /// Fire every timer due at `now` once. An entry that is more than one
    /// interval behind fires again on the next call rather than bursting.
    pub fn run_at(&self, now: Instant) {
        let due: Vec<u64> = {
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .filter(|e| e.next_due <= now)
                .map(|e| e.id)
                .collect()
        };

        for id in due {
            // Take the callback out so it runs without the lock held; the
            // callback may remove its own timer or add new ones.
            let mut cb = {
                let mut entries = self.entries.lock().unwrap();
                match entries.iter_mut().find(|e| e.id == id) {
                    Some(entry) => {
                        entry.next_due += entry.interval;
                        match entry.cb.take() {
                            Some(cb) => cb,
                            None => continue,
                        }
                    }
                    None => continue, // removed by an earlier tick
                }
            };

            cb();

            let mut entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
                entry.cb = Some(cb);
            }
            // else: removed while running; dropped here and never called again
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic time since component construction, for `time_boot_ms` fields.
pub struct BootClock {
    start: Instant,
}

impl BootClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since boot, saturating at `u32::MAX` (~49 days).
    pub fn elapsed_ms(&self) -> u32 {
        u32::try_from(self.start.elapsed().as_millis()).unwrap_or(u32::MAX)
    }
}

impl Default for BootClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn fires_once_per_interval() {
        let sched = Scheduler::new();
        let (count, f) = counter();
        sched.add_call_every(Duration::from_millis(500), f);
        let t0 = Instant::now();

        sched.run_at(t0 + Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sched.run_at(t0 + Duration::from_millis(600));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // same instant again: deadline already advanced
        sched.run_at(t0 + Duration::from_millis(600));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sched.run_at(t0 + Duration::from_millis(1100));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remove_stops_future_ticks() {
        let sched = Scheduler::new();
        let (count, f) = counter();
        let handle = sched.add_call_every(Duration::from_millis(100), f);
        let t0 = Instant::now();

        sched.run_at(t0 + Duration::from_millis(150));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sched.remove(handle);
        sched.run_at(t0 + Duration::from_millis(1000));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_twice_is_noop() {
        let sched = Scheduler::new();
        let handle = sched.add_call_every(Duration::from_millis(100), || {});
        sched.remove(handle);
        sched.remove(handle);
    }

    #[test]
    fn callback_can_remove_itself() {
        let sched = Arc::new(Scheduler::new());
        let (count, mut f) = counter();
        let slot = Arc::new(Mutex::new(None::<TimerHandle>));

        let inner_sched = Arc::clone(&sched);
        let inner_slot = Arc::clone(&slot);
        let handle = sched.add_call_every(Duration::from_millis(100), move || {
            f();
            if let Some(h) = inner_slot.lock().unwrap().take() {
                inner_sched.remove(h);
            }
        });
        *slot.lock().unwrap() = Some(handle);

        let t0 = Instant::now();
        sched.run_at(t0 + Duration::from_millis(150));
        sched.run_at(t0 + Duration::from_millis(1000));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multiple_timers_independent() {
        let sched = Scheduler::new();
        let (fast_count, f) = counter();
        let (slow_count, g) = counter();
        sched.add_call_every(Duration::from_millis(100), f);
        sched.add_call_every(Duration::from_millis(300), g);
        let t0 = Instant::now();

        for ms in (50..=650).step_by(50) {
            sched.run_at(t0 + Duration::from_millis(ms));
        }
        assert_eq!(fast_count.load(Ordering::SeqCst), 6);
        assert_eq!(slow_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn deadlines_do_not_drift() {
        let sched = Scheduler::new();
        let (count, f) = counter();
        sched.add_call_every(Duration::from_millis(100), f);
        let t0 = Instant::now();

        // A late pass fires once, then the next on-time pass catches up.
        sched.run_at(t0 + Duration::from_millis(250));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        sched.run_at(t0 + Duration::from_millis(260));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        sched.run_at(t0 + Duration::from_millis(310));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn boot_clock_monotonic() {
        let clock = BootClock::new();
        let a = clock.elapsed_ms();
        let b = clock.elapsed_ms();
        assert!(b >= a);
    }
}
