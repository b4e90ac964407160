//! Wall-clock source for result timestamps.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Local, NaiveDateTime};

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Replays a fixed list of instants, then repeats the last one.
#[derive(Debug)]
pub struct SequenceClock {
    instants: Vec<NaiveDateTime>,
    next: AtomicUsize,
}

impl SequenceClock {
    pub fn new<I>(first: NaiveDateTime, rest: I) -> Self
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut instants = vec![first];
        instants.extend(rest);
        Self {
            instants,
            next: AtomicUsize::new(0),
        }
    }

    pub fn fixed(at: NaiveDateTime) -> Self {
        Self::new(at, [])
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> NaiveDateTime {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        self.instants[index.min(self.instants.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn sequence_repeats_last_instant() {
        let clock = SequenceClock::new(at(1), [at(2)]);
        assert_eq!(clock.now(), at(1));
        assert_eq!(clock.now(), at(2));
        assert_eq!(clock.now(), at(2));
    }

    #[test]
    fn fixed_clock_never_moves() {
        let clock = SequenceClock::fixed(at(5));
        assert_eq!(clock.now(), clock.now());
    }
}
