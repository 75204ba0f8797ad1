// Timer queue - repeating and one-shot tasks on one execution context
//
// Nothing here sleeps or spawns threads. The owner asks for due tasks with
// `pop_due(now)` and dispatches them itself, so a cancelled timer can never
// fire once `cancel` has returned.

use std::time::Duration;

/// Handle to a scheduled task, valid until the task is cancelled or a
/// one-shot task has fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Work items the metronome schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Fire the next beat
    Beat,
    /// Drop stale tap timestamps; `version` is the tap history version the
    /// purge was scheduled for
    PurgeTaps { version: u64 },
}

#[derive(Debug, Clone)]
struct TimerEntry {
    id: TimerId,
    deadline: Duration,
    period: Option<Duration>,
    task: TimerTask,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<TimerEntry>,
    next_id: u64,
}

impl TimerQueue {
    /// Shortest period accepted for repeating timers
    const MIN_PERIOD: Duration = Duration::from_millis(1);

    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a repeating timer whose first deadline is one period after `now`
    pub fn schedule_repeating(&mut self, now: Duration, period: Duration, task: TimerTask) -> TimerId {
        let period = period.max(Self::MIN_PERIOD);
        self.insert(now + period, Some(period), task)
    }

    /// Arm a one-shot timer firing `delay` after `now`
    pub fn schedule_once(&mut self, now: Duration, delay: Duration, task: TimerTask) -> TimerId {
        self.insert(now + delay, None, task)
    }

    fn insert(&mut self, deadline: Duration, period: Option<Duration>, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(TimerEntry {
            id,
            deadline,
            period,
            task,
        });
        id
    }

    /// Remove a task. Returns false if it had already fired or been cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Period of a repeating timer
    pub fn period(&self, id: TimerId) -> Option<Duration> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.period)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|entry| entry.deadline).min()
    }

    /// Take the earliest task whose deadline is at or before `now`.
    ///
    /// Ties go to the task scheduled first. A repeating timer is re-armed one
    /// period later; deadlines already in the past are skipped so a stalled
    /// caller gets one catch-up beat instead of a burst.
    pub fn pop_due(&mut self, now: Duration) -> Option<TimerTask> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline <= now)
            .min_by_key(|(_, entry)| (entry.deadline, entry.id.0))
            .map(|(index, _)| index)?;

        let task = self.entries[index].task;

        match self.entries[index].period {
            Some(period) => {
                let entry = &mut self.entries[index];
                while entry.deadline <= now {
                    entry.deadline += period;
                }
            }
            None => {
                self.entries.swap_remove(index);
            }
        }

        Some(task)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
