use super::scheduler::{Scheduler, SyncSnapshot, SyncState, TaskKind, TickDecision, TickOutcome};
use super::tasks::{SessionGate, SyncContext, run_task};
use crate::error::OrbitError;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum SyncMessage {
    Start(RpcReplyPort<Result<(), OrbitError>>),
    Pause(RpcReplyPort<Result<(), OrbitError>>),
    Resume(RpcReplyPort<Result<(), OrbitError>>),
    Stop(RpcReplyPort<()>),
    Snapshot(RpcReplyPort<SyncSnapshot>),

    /// Sent by the interval tasks.
    Tick(TaskKind),
    /// Sent by a spawned run when it completes.
    TaskFinished {
        kind: TaskKind,
        epoch: u64,
        outcome: TickOutcome,
    },
}

/// Handle to the background sync orchestrator.
#[derive(Clone)]
pub struct SyncManager {
    actor: ActorRef<SyncMessage>,
}

fn rpc_error(op: &str, e: impl std::fmt::Display) -> OrbitError {
    OrbitError::Actor(format!("SyncManager {op} RPC failed: {e}"))
}

impl SyncManager {
    /// Spawn in the `Stopped` state.
    pub async fn spawn(ctx: SyncContext) -> Result<Self, OrbitError> {
        let (actor, _jh) = Actor::spawn(None, SyncManagerActor, ctx)
            .await
            .map_err(|e| OrbitError::Actor(format!("SyncManager spawn failed: {e}")))?;
        Ok(Self { actor })
    }

    pub async fn start(&self) -> Result<(), OrbitError> {
        ractor::call!(self.actor, SyncMessage::Start).map_err(|e| rpc_error("Start", e))?
    }

    pub async fn pause(&self) -> Result<(), OrbitError> {
        ractor::call!(self.actor, SyncMessage::Pause).map_err(|e| rpc_error("Pause", e))?
    }

    pub async fn resume(&self) -> Result<(), OrbitError> {
        ractor::call!(self.actor, SyncMessage::Resume).map_err(|e| rpc_error("Resume", e))?
    }

    pub async fn stop(&self) -> Result<(), OrbitError> {
        ractor::call!(self.actor, SyncMessage::Stop).map_err(|e| rpc_error("Stop", e))
    }

    pub async fn snapshot(&self) -> Result<SyncSnapshot, OrbitError> {
        ractor::call!(self.actor, SyncMessage::Snapshot).map_err(|e| rpc_error("Snapshot", e))
    }

    /// Stop syncing and terminate the actor.
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop().await {
            warn!(error = %e, "SyncManager stop during shutdown failed");
        }
        self.actor.stop(None);
    }
}

struct SyncManagerState {
    ctx: Arc<SyncContext>,
    scheduler: Scheduler,
    timers: Vec<JoinHandle<()>>,
    gate_tx: watch::Sender<(SyncState, u64)>,
}

impl SyncManagerState {
    fn publish(&self) {
        self.gate_tx
            .send_replace((self.scheduler.state(), self.scheduler.epoch()));
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    /// Each timer's first firing is one full period away.
    fn arm_timers(&mut self, myself: &ActorRef<SyncMessage>) {
        self.cancel_timers();
        let cfg = &self.ctx.config;
        let periods = [
            (TaskKind::Position, cfg.position_interval()),
            (TaskKind::Crew, cfg.crew_interval()),
            (TaskKind::Tle, cfg.tle_interval()),
            (TaskKind::Retention, self.ctx.retention.config().cleanup_interval()),
        ];
        self.timers = periods
            .into_iter()
            .map(|(kind, period)| spawn_timer(myself.clone(), kind, period))
            .collect();
    }
}

fn spawn_timer(myself: ActorRef<SyncMessage>, kind: TaskKind, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if ractor::cast!(myself, SyncMessage::Tick(kind)).is_err() {
                break;
            }
        }
    })
}

struct SyncManagerActor;

#[ractor::async_trait]
impl Actor for SyncManagerActor {
    type Msg = SyncMessage;
    type State = SyncManagerState;
    type Arguments = SyncContext;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        ctx: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let (gate_tx, _) = watch::channel((SyncState::Stopped, 0));
        info!(
            position_interval_ms = ctx.config.position_interval_ms,
            crew_interval_ms = ctx.config.crew_interval_ms,
            tle_interval_ms = ctx.config.tle_interval_ms,
            cleanup_interval_ms = ctx.retention.config().cleanup_interval_ms,
            "SyncManager ready"
        );
        Ok(SyncManagerState {
            ctx: Arc::new(ctx),
            scheduler: Scheduler::default(),
            timers: Vec::new(),
            gate_tx,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.cancel_timers();
        state.scheduler.stop();
        state.publish();
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SyncMessage::Start(rp) => {
                let result = state.scheduler.start().map(|epoch| {
                    state.publish();
                    state.arm_timers(&myself);
                    if state.ctx.config.fetch_on_start {
                        for kind in [TaskKind::Position, TaskKind::Crew, TaskKind::Tle] {
                            if let Err(e) = ractor::cast!(myself, SyncMessage::Tick(kind)) {
                                warn!(task = %kind, error = %e, "initial fetch not scheduled");
                            }
                        }
                    }
                    info!(epoch, "SyncManager started");
                });
                let _ = rp.send(result);
            }

            SyncMessage::Pause(rp) => {
                let result = state.scheduler.pause().map(|()| {
                    state.cancel_timers();
                    state.publish();
                    info!("SyncManager paused");
                });
                let _ = rp.send(result);
            }

            SyncMessage::Resume(rp) => {
                let result = state.scheduler.resume().map(|()| {
                    state.publish();
                    state.arm_timers(&myself);
                    info!("SyncManager resumed");
                });
                let _ = rp.send(result);
            }

            SyncMessage::Stop(rp) => {
                state.cancel_timers();
                let epoch = state.scheduler.stop();
                state.publish();
                info!(epoch, "SyncManager stopped");
                let _ = rp.send(());
            }

            SyncMessage::Snapshot(rp) => {
                let _ = rp.send(state.scheduler.snapshot());
            }

            SyncMessage::Tick(kind) => match state.scheduler.begin_tick(kind) {
                TickDecision::Run { epoch } => {
                    let ctx = state.ctx.clone();
                    let gate = SessionGate::new(state.gate_tx.subscribe());
                    let myself = myself.clone();
                    tokio::spawn(async move {
                        let outcome = run_task(kind, &ctx, &gate, epoch).await;
                        if let Err(e) = ractor::cast!(
                            myself,
                            SyncMessage::TaskFinished {
                                kind,
                                epoch,
                                outcome
                            }
                        ) {
                            debug!(task = %kind, error = %e, "SyncManager gone; dropping outcome");
                        }
                    });
                }
                TickDecision::SkipInFlight => {
                    debug!(task = %kind, "previous run still in flight; tick skipped");
                }
                TickDecision::NotRunning => {
                    debug!(task = %kind, state = %state.scheduler.state(), "tick ignored");
                }
            },

            SyncMessage::TaskFinished {
                kind,
                epoch,
                outcome,
            } => {
                state.scheduler.finish_tick(kind, epoch, outcome);
            }
        }
        Ok(())
    }
}
