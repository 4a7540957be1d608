//! Lifecycle and per-task bookkeeping for the sync manager.
//!
//! Pure state: no timers and no IO. The actor in `actor.rs` owns one
//! [`Scheduler`] and asks it what to do on every message.

use crate::error::OrbitError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Stopped => "stopped",
            SyncState::Running => "running",
            SyncState::Paused => "paused",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Periodic jobs driven by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Position,
    Crew,
    Tle,
    Retention,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Position,
        TaskKind::Crew,
        TaskKind::Tle,
        TaskKind::Retention,
    ];

    fn index(self) -> usize {
        match self {
            TaskKind::Position => 0,
            TaskKind::Crew => 1,
            TaskKind::Tle => 2,
            TaskKind::Retention => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Position => "position",
            TaskKind::Crew => "crew",
            TaskKind::Tle => "tle",
            TaskKind::Retention => "retention",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounters {
    /// Ticks that started work.
    pub fired: u64,
    /// Ticks dropped because the previous run was still in flight.
    pub skipped: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Runs whose result arrived after a pause, stop or restart.
    pub discarded: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Run { epoch: u64 },
    SkipInFlight,
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Succeeded,
    Failed,
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub kind: TaskKind,
    pub in_flight: bool,
    pub counters: TaskCounters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub state: SyncState,
    pub epoch: u64,
    pub tasks: Vec<TaskSnapshot>,
}

impl SyncSnapshot {
    pub fn task(&self, kind: TaskKind) -> Option<&TaskSnapshot> {
        self.tasks.iter().find(|t| t.kind == kind)
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    state: SyncState,
    /// Bumped on every start and stop; a result tagged with an older epoch
    /// belongs to a finished session.
    epoch: u64,
    in_flight: [bool; 4],
    counters: [TaskCounters; 4],
}

impl Scheduler {
    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn start(&mut self) -> Result<u64, OrbitError> {
        self.transition(SyncState::Stopped, SyncState::Running, "start")?;
        self.epoch += 1;
        Ok(self.epoch)
    }

    pub fn pause(&mut self) -> Result<(), OrbitError> {
        self.transition(SyncState::Running, SyncState::Paused, "pause")
    }

    pub fn resume(&mut self) -> Result<(), OrbitError> {
        self.transition(SyncState::Paused, SyncState::Running, "resume")
    }

    /// Legal from any state. Returns the new epoch.
    pub fn stop(&mut self) -> u64 {
        self.state = SyncState::Stopped;
        self.epoch += 1;
        self.in_flight = [false; 4];
        self.epoch
    }

    fn transition(
        &mut self,
        from: SyncState,
        to: SyncState,
        action: &'static str,
    ) -> Result<(), OrbitError> {
        if self.state != from {
            return Err(OrbitError::InvalidTransition {
                from: self.state.as_str(),
                action,
            });
        }
        self.state = to;
        Ok(())
    }

    /// At most one run per task: a tick that finds its task in flight is
    /// skipped, never queued.
    pub fn begin_tick(&mut self, kind: TaskKind) -> TickDecision {
        if self.state != SyncState::Running {
            return TickDecision::NotRunning;
        }
        let i = kind.index();
        if self.in_flight[i] {
            self.counters[i].skipped += 1;
            return TickDecision::SkipInFlight;
        }
        self.in_flight[i] = true;
        self.counters[i].fired += 1;
        TickDecision::Run { epoch: self.epoch }
    }

    pub fn finish_tick(&mut self, kind: TaskKind, epoch: u64, outcome: TickOutcome) {
        let i = kind.index();
        if epoch != self.epoch {
            // The in-flight slot was already cleared by stop().
            self.counters[i].discarded += 1;
            return;
        }
        self.in_flight[i] = false;
        let counters = &mut self.counters[i];
        match outcome {
            TickOutcome::Succeeded => counters.succeeded += 1,
            TickOutcome::Failed => counters.failed += 1,
            TickOutcome::Discarded => counters.discarded += 1,
        }
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            state: self.state,
            epoch: self.epoch,
            tasks: TaskKind::ALL
                .iter()
                .map(|&kind| TaskSnapshot {
                    kind,
                    in_flight: self.in_flight[kind.index()],
                    counters: self.counters[kind.index()],
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let mut s = Scheduler::default();
        assert_eq!(s.state(), SyncState::Stopped);
        assert!(s.pause().is_err());
        assert!(s.resume().is_err());

        assert_eq!(s.start().unwrap(), 1);
        assert!(s.start().is_err());
        s.pause().unwrap();
        assert_eq!(s.state(), SyncState::Paused);
        assert!(s.pause().is_err());
        s.resume().unwrap();
        assert_eq!(s.state(), SyncState::Running);

        assert_eq!(s.stop(), 2);
        assert_eq!(s.state(), SyncState::Stopped);
        assert_eq!(s.stop(), 3);
        assert_eq!(s.start().unwrap(), 4);
    }

    #[test]
    fn invalid_transition_names_the_state() {
        let mut s = Scheduler::default();
        let err = s.resume().unwrap_err();
        assert!(matches!(
            err,
            OrbitError::InvalidTransition {
                from: "stopped",
                action: "resume"
            }
        ));
    }

    #[test]
    fn overlapping_ticks_are_skipped() {
        let mut s = Scheduler::default();
        let epoch = s.start().unwrap();

        assert_eq!(s.begin_tick(TaskKind::Position), TickDecision::Run { epoch });
        assert_eq!(s.begin_tick(TaskKind::Position), TickDecision::SkipInFlight);
        assert_eq!(s.begin_tick(TaskKind::Crew), TickDecision::Run { epoch });

        s.finish_tick(TaskKind::Position, epoch, TickOutcome::Succeeded);
        assert_eq!(s.begin_tick(TaskKind::Position), TickDecision::Run { epoch });

        let snap = s.snapshot();
        let position = snap.task(TaskKind::Position).unwrap();
        assert_eq!(position.counters.fired, 2);
        assert_eq!(position.counters.skipped, 1);
        assert_eq!(position.counters.succeeded, 1);
        assert!(position.in_flight);
    }

    #[test]
    fn ticks_outside_running_do_nothing() {
        let mut s = Scheduler::default();
        assert_eq!(s.begin_tick(TaskKind::Tle), TickDecision::NotRunning);
        s.start().unwrap();
        s.pause().unwrap();
        assert_eq!(s.begin_tick(TaskKind::Tle), TickDecision::NotRunning);
        assert_eq!(s.snapshot().task(TaskKind::Tle).unwrap().counters, TaskCounters::default());
    }

    #[test]
    fn results_from_an_old_session_are_discarded() {
        let mut s = Scheduler::default();
        let old = s.start().unwrap();
        assert_eq!(s.begin_tick(TaskKind::Position), TickDecision::Run { epoch: old });

        s.stop();
        let new = s.start().unwrap();
        assert_eq!(s.begin_tick(TaskKind::Position), TickDecision::Run { epoch: new });

        // Late result from the first session must not free the new run's slot.
        s.finish_tick(TaskKind::Position, old, TickOutcome::Succeeded);
        let position = s.snapshot().task(TaskKind::Position).cloned().unwrap();
        assert!(position.in_flight);
        assert_eq!(position.counters.discarded, 1);
        assert_eq!(position.counters.succeeded, 0);
    }
}
