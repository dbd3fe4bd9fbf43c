//! Debounced recheck scheduling.
//!
//! Every trigger source (navigation, visibility, mutation, manual, and the
//! resume monitor's poll) funnels into `schedule`. Triggers that arrive
//! within the debounce window of a pending recheck collapse into it; the
//! pending recheck fires once the window has been quiet, or once `max_wait`
//! has passed since the first collapsed trigger, whichever comes first.
//!
//! The scheduler holds no timers of its own. The host calls `take_due` with
//! the current time, which keeps execution strictly sequential and makes
//! every timing rule testable with fixed timestamps.

use chrono::{DateTime, Duration, Utc};

use applypilot_contracts::session::{RecheckTrigger, TriggerCategory};

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRecheck {
    category: TriggerCategory,
    first_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    collapsed: u32,
}

/// The page context's single recheck timer plus the resume poll.
#[derive(Debug, Clone)]
pub struct RecheckScheduler {
    debounce: Duration,
    max_wait: Duration,
    settle: Duration,
    resume_poll: Duration,
    pending: Option<PendingRecheck>,
    poll_due: Option<DateTime<Utc>>,
}

impl RecheckScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            debounce: config.debounce(),
            max_wait: config.max_wait(),
            settle: config.settle_delay(),
            resume_poll: config.resume_poll(),
            pending: None,
            poll_due: None,
        }
    }

    /// Request a recheck, collapsing into a pending one if there is one.
    pub fn schedule(&mut self, trigger: RecheckTrigger) {
        let due = trigger.at + self.debounce;
        match self.pending.as_mut() {
            Some(pending) => {
                let cap = pending.first_at + self.max_wait;
                // Never pull a due time forward: a settle delay already in
                // place must survive later triggers.
                pending.due_at = pending.due_at.max(due.min(cap));
                pending.collapsed += 1;
                if priority(trigger.category) > priority(pending.category) {
                    pending.category = trigger.category;
                }
            }
            None => {
                self.pending = Some(PendingRecheck {
                    category: trigger.category,
                    first_at: trigger.at,
                    due_at: due,
                    collapsed: 0,
                });
            }
        }
    }

    /// Request the first recheck after a full page load.
    ///
    /// The pass waits out the settle delay so it does not race asynchronous
    /// rendering.
    pub fn schedule_page_load(&mut self, at: DateTime<Utc>) {
        self.schedule(RecheckTrigger {
            category: TriggerCategory::Navigation,
            at,
        });
        if let Some(pending) = self.pending.as_mut() {
            pending.due_at = pending.due_at.max(at + self.settle);
        }
    }

    /// Return the trigger to execute now, if one is due.
    ///
    /// A due resume poll is first routed through `schedule`, so it is
    /// debounced exactly like any other trigger.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<RecheckTrigger> {
        if let Some(poll_at) = self.poll_due {
            if poll_at <= now {
                self.poll_due = None;
                self.schedule(RecheckTrigger {
                    category: TriggerCategory::Poll,
                    at: poll_at,
                });
            }
        }

        match self.pending {
            Some(pending) if pending.due_at <= now => {
                self.pending = None;
                Some(RecheckTrigger {
                    category: pending.category,
                    at: now,
                })
            }
            _ => None,
        }
    }

    /// Start the resume monitor if it is not already running.
    pub fn arm_resume_poll(&mut self, now: DateTime<Utc>) {
        if self.poll_due.is_none() {
            self.poll_due = Some(now + self.resume_poll);
        }
    }

    pub fn disarm_resume_poll(&mut self) {
        self.poll_due = None;
    }

    /// Drop the pending recheck and the resume poll.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.poll_due = None;
    }

    /// The earliest time `take_due` could return something.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        match (self.pending.map(|p| p.due_at), self.poll_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_polling(&self) -> bool {
        self.poll_due.is_some()
    }

    /// Triggers folded into the pending recheck beyond the first.
    pub fn collapsed_count(&self) -> u32 {
        self.pending.map(|p| p.collapsed).unwrap_or(0)
    }
}

/// When triggers collapse, the recheck reports the most significant category.
fn priority(category: TriggerCategory) -> u8 {
    match category {
        TriggerCategory::Navigation => 4,
        TriggerCategory::Manual => 3,
        TriggerCategory::Visibility => 2,
        TriggerCategory::Mutation => 1,
        TriggerCategory::Poll => 0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use applypilot_contracts::session::{RecheckTrigger, TriggerCategory};

    use super::RecheckScheduler;
    use crate::config::EngineConfig;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    fn trigger(category: TriggerCategory, at: DateTime<Utc>) -> RecheckTrigger {
        RecheckTrigger { category, at }
    }

    #[test]
    fn test_triggers_within_window_collapse() {
        let mut scheduler = RecheckScheduler::new(&EngineConfig::default());
        scheduler.schedule(trigger(TriggerCategory::Mutation, t0()));
        scheduler.schedule(trigger(TriggerCategory::Mutation, t0() + ms(200)));
        scheduler.schedule(trigger(TriggerCategory::Visibility, t0() + ms(400)));
        assert_eq!(scheduler.collapsed_count(), 2);

        // Quiet window measured from the last trigger.
        assert!(scheduler.take_due(t0() + ms(1_000)).is_none());
        let fired = scheduler.take_due(t0() + ms(1_200)).expect("recheck due");
        assert_eq!(fired.category, TriggerCategory::Visibility);

        // Exactly one recheck for the whole burst.
        assert!(scheduler.take_due(t0() + ms(5_000)).is_none());
    }

    #[test]
    fn test_navigation_outranks_mutation() {
        let mut scheduler = RecheckScheduler::new(&EngineConfig::default());
        scheduler.schedule(trigger(TriggerCategory::Navigation, t0()));
        scheduler.schedule(trigger(TriggerCategory::Mutation, t0() + ms(100)));
        let fired = scheduler.take_due(t0() + ms(900)).unwrap();
        assert_eq!(fired.category, TriggerCategory::Navigation);
    }

    #[test]
    fn test_continuous_burst_is_capped_by_max_wait() {
        let mut scheduler = RecheckScheduler::new(&EngineConfig::default());
        let mut at = t0();
        scheduler.schedule(trigger(TriggerCategory::Mutation, at));
        // A mutation every 500ms for ten seconds never leaves a quiet window.
        for _ in 0..20 {
            at += ms(500);
            scheduler.schedule(trigger(TriggerCategory::Mutation, at));
        }
        assert_eq!(scheduler.next_due(), Some(t0() + ms(4_000)));
    }

    #[test]
    fn test_page_load_waits_for_settle_delay() {
        let mut scheduler = RecheckScheduler::new(&EngineConfig::default());
        scheduler.schedule_page_load(t0());
        assert!(scheduler.take_due(t0() + ms(800)).is_none());
        assert!(scheduler.take_due(t0() + ms(1_200)).is_some());
    }

    #[test]
    fn test_resume_poll_is_debounced() {
        let mut scheduler = RecheckScheduler::new(&EngineConfig::default());
        scheduler.arm_resume_poll(t0());
        assert!(scheduler.is_polling());

        // Poll comes due at 2.5s and enters the debounce window.
        assert!(scheduler.take_due(t0() + ms(2_500)).is_none());
        assert!(!scheduler.is_polling());
        let fired = scheduler.take_due(t0() + ms(3_300)).unwrap();
        assert_eq!(fired.category, TriggerCategory::Poll);
    }

    #[test]
    fn test_cancel_drops_pending_and_poll() {
        let mut scheduler = RecheckScheduler::new(&EngineConfig::default());
        scheduler.schedule(trigger(TriggerCategory::Manual, t0()));
        scheduler.arm_resume_poll(t0());
        scheduler.cancel();
        assert!(!scheduler.has_pending());
        assert!(!scheduler.is_polling());
        assert!(scheduler.take_due(t0() + ms(60_000)).is_none());
    }
}
