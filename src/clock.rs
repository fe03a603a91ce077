use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::trace;

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Virtual clock: `sleep` returns immediately and moves `now` forward.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<OffsetDateTime>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Cell::new(start),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Sum of every pause requested so far.
    pub fn slept(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

/// Checks once before the first pause. A condition error counts as "not yet".
pub fn wait_until<C, F>(clock: &C, timeout: Duration, poll: Duration, mut condition: F) -> bool
where
    C: Clock + ?Sized,
    F: FnMut() -> Result<bool>,
{
    let poll = if poll.is_zero() {
        Duration::from_millis(1)
    } else {
        poll
    };
    let mut waited = Duration::ZERO;
    loop {
        match condition() {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => trace!("wait condition errored: {err:#}"),
        }
        if waited >= timeout {
            return false;
        }
        let step = poll.min(timeout - waited);
        clock.sleep(step);
        waited += step;
    }
}
