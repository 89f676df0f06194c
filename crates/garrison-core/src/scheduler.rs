//! The autonomous agent scheduler.
//!
//! # State machine
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped
//! ```
//!
//! While running, a background task sleeps a random interval drawn from
//! `[min, max]`, then runs one [`DecisionCycle`]. Entities are processed
//! sequentially and each entity's result is committed before the next one
//! starts. A failure on one entity is logged and skipped; a failure of the
//! whole cycle (the entity list could not be read) is logged and followed
//! by a fixed backoff.
//!
//! `stop()` stops new cycles from starting and waits for the in-flight
//! cycle to finish. It never aborts a cycle midway.
//!
//! Decisions are never cancelled from outside. Liveness against a hung
//! store comes from the per-call deadline inside [`GameService`], so an
//! attack that stalls on the defender still reaches settlement's own
//! failure path and the attacker's decision is still recorded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use garrison_db::StateStore;
use garrison_types::Combatant;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::GameError;
use crate::service::GameService;
use crate::strategy::{Decision, DecisionContext, StrategyRegistry};

/// Errors from scheduler lifecycle calls.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// `start()` was called while already running.
    #[error("agent scheduler is already running")]
    AlreadyRunning,

    /// The background task panicked or was cancelled.
    #[error("agent scheduler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No background task.
    Stopped,
    /// The background task is live.
    Running,
}

/// Counts from one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Entities whose decision committed.
    pub processed: usize,
    /// Entities whose decision failed or timed out.
    pub failed: usize,
}

/// Timing for the background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTiming {
    /// Shortest sleep between cycles.
    pub min_interval: Duration,
    /// Longest sleep between cycles.
    pub max_interval: Duration,
    /// Sleep after a failed cycle.
    pub failure_backoff: Duration,
}

impl SchedulerTiming {
    /// Timing from configuration.
    pub const fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            min_interval: config.min_interval(),
            max_interval: config.max_interval(),
            failure_backoff: config.failure_backoff(),
        }
    }

    fn next_interval(&self, rng: &mut StdRng) -> Duration {
        let min = millis(self.min_interval);
        let max = millis(self.max_interval).max(min);
        Duration::from_millis(rng.random_range(min..=max))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Decision cycle
// ---------------------------------------------------------------------------

/// One pass over every AI entity.
pub struct DecisionCycle<S> {
    service: Arc<GameService<S>>,
    strategies: StrategyRegistry,
}

impl<S: StateStore> DecisionCycle<S> {
    /// Create a cycle runner.
    pub const fn new(service: Arc<GameService<S>>, strategies: StrategyRegistry) -> Self {
        Self {
            service,
            strategies,
        }
    }

    /// Run one decision for every AI entity, in order.
    ///
    /// Only a failure to list entities fails the cycle. Per-entity failures
    /// are logged and counted in the report.
    pub async fn run(&self, rng: &mut StdRng) -> Result<CycleReport, GameError> {
        let agents = self.service.ai_entities().await?;
        let everyone = self.service.entities().await?;
        let mut report = CycleReport::default();

        for agent in &agents {
            let opponents: Vec<Combatant> = everyone
                .iter()
                .filter(|other| other.id != agent.id)
                .cloned()
                .collect();
            let ctx = DecisionContext {
                entity: agent,
                opponents: &opponents,
                catalog: self.service.catalog(),
            };
            let strategy = self.strategies.for_personality(agent.personality);
            let decision = strategy.decide(&ctx, rng);

            if let Err(source) = self.act(agent, &decision).await {
                let err = GameError::TransientAgent {
                    entity_id: agent.id,
                    reason: source.to_string(),
                };
                warn!(entity_id = %agent.id, name = %agent.name, error = %err, "Agent decision failed");
                report.failed = report.failed.saturating_add(1);
            } else {
                debug!(
                    entity_id = %agent.id,
                    personality = strategy.personality().as_str(),
                    decision = %decision.describe(),
                    "Agent decision applied"
                );
                report.processed = report.processed.saturating_add(1);
            }
        }
        Ok(report)
    }

    /// Apply a decision and record it on the entity.
    async fn act(&self, agent: &Combatant, decision: &Decision) -> Result<(), GameError> {
        let now = Utc::now();
        let description = decision.describe();
        match decision {
            Decision::Attack {
                target, committed, ..
            } => {
                let result = self
                    .service
                    .launch_attack(agent.id, *target, committed.clone(), None, now)
                    .await;
                let summary = match &result {
                    Ok(record) => format!("{description}: {}", record.tier.as_str()),
                    Err(_) => format!("{description}: aborted"),
                };
                self.service.record_action(agent.id, summary, now).await?;
                result.map(|_| ())
            }
            Decision::Reinforce {
                category,
                unit,
                amount,
            } => {
                self.service
                    .mutate(agent.id, |entity| {
                        entity.roster.add(*category, unit, *amount);
                        entity.record_action(description, now);
                        Ok(())
                    })
                    .await?;
                Ok(())
            }
            Decision::Research => {
                self.service
                    .mutate(agent.id, |entity| {
                        entity.set_tech_level(entity.tech_level.saturating_add(1));
                        entity.record_action(description, now);
                        Ok(())
                    })
                    .await?;
                Ok(())
            }
            Decision::ProposeAlliance | Decision::Negotiate | Decision::StatusCheck => {
                self.service.record_action(agent.id, description, now).await?;
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

/// Background driver for AI decisions.
pub struct AgentScheduler<S> {
    cycle: Arc<DecisionCycle<S>>,
    timing: SchedulerTiming,
    seed: Option<u64>,
    running: Option<(Arc<StopSignal>, JoinHandle<()>)>,
}

impl<S: StateStore> AgentScheduler<S> {
    /// Create a stopped scheduler.
    pub fn new(
        service: Arc<GameService<S>>,
        strategies: StrategyRegistry,
        config: &SchedulerConfig,
    ) -> Self {
        let timing = SchedulerTiming::from_config(config);
        Self {
            cycle: Arc::new(DecisionCycle::new(service, strategies)),
            timing,
            seed: config.seed,
            running: None,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SchedulerState {
        if self.running.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Spawn the background loop.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] if already started.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.running.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let signal = Arc::new(StopSignal::default());
        let rng = self
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let task = LoopTask {
            cycle: Arc::clone(&self.cycle),
            timing: self.timing,
            signal: Arc::clone(&signal),
            rng,
        };
        let handle = tokio::spawn(task.run());
        self.running = Some((signal, handle));
        info!(
            min_interval_secs = self.timing.min_interval.as_secs(),
            max_interval_secs = self.timing.max_interval.as_secs(),
            "Agent scheduler started"
        );
        Ok(())
    }

    /// Stop the loop and wait for the in-flight cycle to finish. A no-op
    /// when already stopped.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Task`] if the background task panicked.
    pub async fn stop(&mut self) -> Result<(), SchedulerError> {
        let Some((signal, handle)) = self.running.take() else {
            return Ok(());
        };
        signal.requested.store(true, Ordering::Release);
        signal.notify.notify_one();
        handle.await?;
        info!("Agent scheduler stopped");
        Ok(())
    }

    /// Run one cycle on the caller's task, outside the background loop.
    pub async fn run_cycle(&self, rng: &mut StdRng) -> Result<CycleReport, GameError> {
        self.cycle.run(rng).await
    }
}

/// State owned by the spawned background task.
struct LoopTask<S> {
    cycle: Arc<DecisionCycle<S>>,
    timing: SchedulerTiming,
    signal: Arc<StopSignal>,
    rng: StdRng,
}

impl<S: StateStore> LoopTask<S> {
    async fn run(mut self) {
        let mut delay = self.timing.next_interval(&mut self.rng);
        loop {
            if self.signal.requested.load(Ordering::Acquire) {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.signal.notify.notified() => {}
            }
            if self.signal.requested.load(Ordering::Acquire) {
                break;
            }

            match self.cycle.run(&mut self.rng).await {
                Ok(report) => {
                    info!(
                        processed = report.processed,
                        failed = report.failed,
                        "Agent cycle complete"
                    );
                    delay = self.timing.next_interval(&mut self.rng);
                }
                Err(err) => {
                    error!(
                        error = %err,
                        backoff_secs = self.timing.failure_backoff.as_secs(),
                        "Agent cycle failed, backing off"
                    );
                    delay = self.timing.failure_backoff;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use garrison_db::InMemoryStore;
    use garrison_types::{ControllerKind, LootKind, Personality, Roster, UnitCategory};
    use rust_decimal::Decimal;
    use tokio::time::Instant;

    use super::*;
    use crate::config::GameConfig;
    use crate::service::tests::epoch;
    use crate::strategy::Strategy;
    use crate::testing::FaultyStore;

    /// Always sends twenty soldiers at the first opponent.
    struct AlwaysAttack;

    impl Strategy for AlwaysAttack {
        fn personality(&self) -> Personality {
            Personality::Aggressive
        }

        fn decide(&self, ctx: &DecisionContext<'_>, _rng: &mut StdRng) -> Decision {
            ctx.opponents.first().map_or(Decision::StatusCheck, |target| Decision::Attack {
                target: target.id,
                target_name: target.name.clone(),
                committed: Roster::new().with(UnitCategory::Ground, "soldier", 20),
            })
        }
    }

    fn always_attack() -> StrategyRegistry {
        StrategyRegistry::empty().with(Box::new(AlwaysAttack))
    }

    async fn duel<S: StateStore>(service: &GameService<S>) -> (Combatant, Combatant) {
        let hawk = service
            .register("Hawk", ControllerKind::Ai, Some(Personality::Aggressive), epoch())
            .await
            .unwrap();
        let player = service
            .register("Player", ControllerKind::User, None, epoch())
            .await
            .unwrap();
        (hawk, player)
    }

    fn config(interval_secs: u64) -> GameConfig {
        let mut config = GameConfig::default();
        config.scheduler.min_interval_secs = interval_secs;
        config.scheduler.max_interval_secs = interval_secs;
        config.scheduler.failure_backoff_secs = 1;
        config.scheduler.seed = Some(5);
        config
    }

    async fn populate<S: StateStore>(service: &GameService<S>) -> Vec<Combatant> {
        let mut all = Vec::new();
        for (name, personality) in [
            ("Hawk", Personality::Aggressive),
            ("Wall", Personality::Defensive),
            ("Envoy", Personality::Diplomatic),
        ] {
            all.push(
                service
                    .register(name, ControllerKind::Ai, Some(personality), epoch())
                    .await
                    .unwrap(),
            );
        }
        all.push(
            service
                .register("Player", ControllerKind::User, None, epoch())
                .await
                .unwrap(),
        );
        all
    }

    #[tokio::test]
    async fn cycle_records_every_ai_decision() {
        let config = config(60);
        let service = Arc::new(GameService::new(Arc::new(InMemoryStore::new()), &config));
        let entities = populate(&service).await;
        let scheduler = AgentScheduler::new(Arc::clone(&service), StrategyRegistry::default(), &config.scheduler);

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..5 {
            let report = scheduler.run_cycle(&mut rng).await.unwrap();
            assert_eq!(report.processed + report.failed, 3);
        }

        for entity in &entities {
            let stored = service.entity(entity.id).await.unwrap();
            if entity.is_ai() {
                assert!(stored.last_action_at.is_some(), "{}", entity.name);
                assert!(stored.last_decision.is_some());
                assert!((1..=10).contains(&stored.tech_level));
            } else {
                assert!(stored.last_action_at.is_none());
            }
        }
    }

    #[tokio::test]
    async fn one_failing_entity_does_not_stop_the_cycle() {
        let config = config(60);
        let store = Arc::new(FaultyStore::new());
        let service = Arc::new(GameService::new(Arc::clone(&store), &config));
        // Neither personality attacks, so the failure stays with one entity.
        let wall = service
            .register("Wall", ControllerKind::Ai, Some(Personality::Defensive), epoch())
            .await
            .unwrap();
        let envoy = service
            .register("Envoy", ControllerKind::Ai, Some(Personality::Diplomatic), epoch())
            .await
            .unwrap();
        store.fail_saves_for(wall.id);

        let scheduler = AgentScheduler::new(Arc::clone(&service), StrategyRegistry::default(), &config.scheduler);
        let mut rng = StdRng::seed_from_u64(2);
        let report = scheduler.run_cycle(&mut rng).await.unwrap();
        assert_eq!(report, CycleReport { processed: 1, failed: 1 });

        let envoy = service.entity(envoy.id).await.unwrap();
        assert!(envoy.last_action_at.is_some());
        let wall = service.entity(wall.id).await.unwrap();
        assert!(wall.last_action_at.is_none());
    }

    #[tokio::test]
    async fn unreadable_store_fails_the_cycle() {
        let config = config(60);
        let store = Arc::new(FaultyStore::new());
        let service = Arc::new(GameService::new(Arc::clone(&store), &config));
        store.fail_lists(true);

        let scheduler = AgentScheduler::new(service, StrategyRegistry::default(), &config.scheduler);
        let mut rng = StdRng::seed_from_u64(3);
        let err = scheduler.run_cycle(&mut rng).await.unwrap_err();
        assert!(matches!(err, GameError::Persistence(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_runs_cycles_until_stopped() {
        let config = config(60);
        let service = Arc::new(GameService::new(Arc::new(InMemoryStore::new()), &config));
        let entities = populate(&service).await;
        let mut scheduler =
            AgentScheduler::new(Arc::clone(&service), StrategyRegistry::default(), &config.scheduler);

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        scheduler.start().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyRunning)));

        tokio::time::sleep(Duration::from_secs(61)).await;
        scheduler.stop().await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        let hawk = service.entity(entities[0].id).await.unwrap();
        assert!(hawk.last_action_at.is_some());

        // Stopped means stopped: no further decisions.
        let version = service.entity(entities[2].id).await.unwrap().version;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(service.entity(entities[2].id).await.unwrap().version, version);

        scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycles_back_off_and_recover() {
        let config = config(3600);
        let store = Arc::new(FaultyStore::new());
        let service = Arc::new(GameService::new(Arc::clone(&store), &config));
        let entities = populate(&service).await;
        let mut scheduler =
            AgentScheduler::new(Arc::clone(&service), StrategyRegistry::default(), &config.scheduler);

        store.fail_lists(true);
        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_secs(3601)).await;
        // The first wake failed; the retry comes after the one-second backoff.
        store.fail_lists(false);
        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.stop().await.unwrap();

        let envoy = service.entity(entities[2].id).await.unwrap();
        assert!(envoy.last_action_at.is_some());
    }

    #[tokio::test]
    async fn scheduled_attacks_settle_and_record_battles() {
        let config = config(60);
        let service = Arc::new(GameService::new(Arc::new(InMemoryStore::new()), &config));
        let (hawk, player) = duel(&service).await;
        let scheduler = AgentScheduler::new(Arc::clone(&service), always_attack(), &config.scheduler);

        let mut rng = StdRng::seed_from_u64(4);
        let report = scheduler.run_cycle(&mut rng).await.unwrap();
        assert_eq!(report, CycleReport { processed: 1, failed: 0 });

        let history = service.battle_history(hawk.id).await.unwrap();
        assert_eq!(history.len(), 1);
        let record = &history[0];
        assert_eq!(record.attacker_id, hawk.id);
        assert_eq!(record.defender_id, player.id);
        assert_eq!(record.attacker_role, ControllerKind::Ai);
        assert_eq!(record.defender_role, ControllerKind::User);
        assert_eq!(service.battle_history(player.id).await.unwrap(), history);

        let mut expected_hawk = hawk.roster.clone();
        expected_hawk.apply_losses(&record.attacker_losses);
        let mut expected_player = player.roster.clone();
        expected_player.apply_losses(&record.defender_losses);
        let stolen = record
            .resources_stolen
            .get(&LootKind::Money)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let hawk_after = service.entity(hawk.id).await.unwrap();
        let player_after = service.entity(player.id).await.unwrap();
        assert_eq!(hawk_after.roster, expected_hawk);
        assert_eq!(player_after.roster, expected_player);
        assert_eq!(hawk_after.money, hawk.money + stolen);
        assert_eq!(player_after.money, player.money - stolen);
        let decision = hawk_after.last_decision.unwrap();
        assert!(decision.starts_with("attack Player with 20 units: "), "{decision}");
        assert!(decision.ends_with(record.tier.as_str()), "{decision}");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_defender_aborts_the_attack_but_records_the_decision() {
        let mut config = config(60);
        config.infrastructure.store_timeout_ms = 100;
        let store = Arc::new(FaultyStore::new());
        let service = Arc::new(GameService::new(Arc::clone(&store), &config));
        let (hawk, player) = duel(&service).await;
        store.stall_saves_for(player.id, Duration::from_secs(3600));
        let scheduler = AgentScheduler::new(Arc::clone(&service), always_attack(), &config.scheduler);

        let mut rng = StdRng::seed_from_u64(6);
        let report = scheduler.run_cycle(&mut rng).await.unwrap();
        assert_eq!(report, CycleReport { processed: 0, failed: 1 });

        let hawk = service.entity(hawk.id).await.unwrap();
        let decision = hawk.last_decision.unwrap();
        assert!(decision.ends_with(": aborted"), "{decision}");
        // Attack commit plus the recorded decision.
        assert_eq!(hawk.version, 2);
        assert_eq!(service.entity(player.id).await.unwrap().version, 0);
        assert!(service.battle_history(hawk.id).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_the_in_flight_cycle() {
        let mut config = config(60);
        config.infrastructure.store_timeout_ms = 60_000;
        let store = Arc::new(FaultyStore::new());
        let service = Arc::new(GameService::new(Arc::clone(&store), &config));
        let mut agents = Vec::new();
        for (name, personality) in [("Wall", Personality::Defensive), ("Envoy", Personality::Diplomatic)] {
            let agent = service
                .register(name, ControllerKind::Ai, Some(personality), epoch())
                .await
                .unwrap();
            store.stall_saves_for(agent.id, Duration::from_secs(30));
            agents.push(agent);
        }
        let mut scheduler =
            AgentScheduler::new(Arc::clone(&service), StrategyRegistry::default(), &config.scheduler);

        let started = Instant::now();
        scheduler.start().unwrap();
        // The cycle starts at 60s and its first save is still pending at 61s.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(service.entity(agents[0].id).await.unwrap().last_action_at.is_none());
        scheduler.stop().await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(120));
        for agent in &agents {
            let stored = service.entity(agent.id).await.unwrap();
            assert!(stored.last_action_at.is_some(), "{}", agent.name);
            assert_eq!(stored.version, 1);
        }
    }

    #[test]
    fn intervals_stay_within_bounds() {
        let timing = SchedulerTiming {
            min_interval: Duration::from_secs(600),
            max_interval: Duration::from_secs(1800),
            failure_backoff: Duration::from_secs(60),
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let interval = timing.next_interval(&mut rng);
            assert!(interval >= timing.min_interval && interval <= timing.max_interval);
        }
    }
}
