//! Periodic timers evaluated against an injected clock.
//!
//! Nothing here sleeps. A host polls [`Scheduler::take_due`] (from a tokio
//! interval in production, by hand in tests) and runs whatever came due.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Tick,
    Hydration,
}

/// What a timer does when several periods elapsed between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchUp {
    /// Fire once for every missed period.
    Replay,
    /// Fire once and realign to the next future period.
    Coalesce,
}

#[derive(Debug, Clone)]
struct Periodic {
    kind: TimerKind,
    period: Duration,
    next_due: Instant,
    catch_up: CatchUp,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<Periodic>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind` to first fire one `period` after `now`. Re-arming replaces
    /// the previous schedule for that kind.
    pub fn arm(&mut self, kind: TimerKind, period: Duration, now: Instant, catch_up: CatchUp) {
        self.cancel(kind);
        if period.is_zero() {
            return;
        }
        self.timers.push(Periodic {
            kind,
            period,
            next_due: now + period,
            catch_up,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|timer| timer.kind != kind);
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|timer| timer.kind == kind)
    }

    pub fn next_due(&self, kind: TimerKind) -> Option<Instant> {
        self.timers
            .iter()
            .find(|timer| timer.kind == kind)
            .map(|timer| timer.next_due)
    }

    /// Returns every firing due at `now`, oldest first, and advances the
    /// schedules past them.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut fired: Vec<(Instant, TimerKind)> = Vec::new();

        for timer in &mut self.timers {
            match timer.catch_up {
                CatchUp::Replay => {
                    while timer.next_due <= now {
                        fired.push((timer.next_due, timer.kind));
                        timer.next_due += timer.period;
                    }
                }
                CatchUp::Coalesce => {
                    if timer.next_due <= now {
                        fired.push((timer.next_due, timer.kind));
                        while timer.next_due <= now {
                            timer.next_due += timer.period;
                        }
                    }
                }
            }
        }

        fired.sort_by_key(|(due, _)| *due);
        fired.into_iter().map(|(_, kind)| kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn nothing_due_before_first_period() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Tick, SEC, start, CatchUp::Replay);

        assert!(scheduler.take_due(start + Duration::from_millis(999)).is_empty());
        assert_eq!(scheduler.take_due(start + SEC), vec![TimerKind::Tick]);
    }

    #[test]
    fn replay_fires_every_missed_period() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Tick, SEC, start, CatchUp::Replay);

        let due = scheduler.take_due(start + Duration::from_millis(3500));
        assert_eq!(due.len(), 3);
        assert_eq!(scheduler.next_due(TimerKind::Tick), Some(start + 4 * SEC));
    }

    #[test]
    fn coalesce_fires_once_and_realigns() {
        let start = Instant::now();
        let period = Duration::from_secs(60);
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Hydration, period, start, CatchUp::Coalesce);

        let due = scheduler.take_due(start + Duration::from_secs(200));
        assert_eq!(due, vec![TimerKind::Hydration]);
        assert_eq!(
            scheduler.next_due(TimerKind::Hydration),
            Some(start + Duration::from_secs(240))
        );
    }

    #[test]
    fn firings_are_ordered_by_due_time() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Hydration, Duration::from_millis(1500), start, CatchUp::Coalesce);
        scheduler.arm(TimerKind::Tick, SEC, start, CatchUp::Replay);

        let due = scheduler.take_due(start + 2 * SEC);
        assert_eq!(
            due,
            vec![TimerKind::Tick, TimerKind::Hydration, TimerKind::Tick]
        );
    }

    #[test]
    fn cancel_all_disarms_everything() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Tick, SEC, start, CatchUp::Replay);
        scheduler.arm(TimerKind::Hydration, SEC, start, CatchUp::Coalesce);

        scheduler.cancel_all();

        assert!(!scheduler.is_armed(TimerKind::Tick));
        assert!(scheduler.take_due(start + 10 * SEC).is_empty());
    }

    #[test]
    fn zero_period_is_never_armed() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.arm(TimerKind::Hydration, Duration::ZERO, start, CatchUp::Coalesce);
        assert!(!scheduler.is_armed(TimerKind::Hydration));
    }
}
