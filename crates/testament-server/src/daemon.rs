//! The daemon loop: periodically evaluates the dead-man's switch and fires
//! it once it has expired.

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use std::time::Duration;
use testament_core::{
    Clock, HeartbeatAction, HeartbeatStatus, Principal, SystemClock, Timestamp,
};
use testament_store::EstateStore;

/// What a single check cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No estate in the database yet.
    NotInitialized,
    /// Switch evaluated; nothing to do.
    Checked(HeartbeatAction),
    /// Switch had expired and was fired by this keeper.
    ConfirmedDead,
}

/// Run the daemon loop. Blocks forever (until shutdown signal).
pub async fn run(config: ServerConfig) -> Result<()> {
    log::info!("Testament keeper starting…");
    log::info!(
        "  Interval:   {} seconds ({:.1} hours)",
        config.server.check_interval_secs,
        config.server.check_interval_secs as f64 / 3600.0
    );
    log::info!("  Data dir:   {}", config.server.data_dir.display());
    log::info!("  Auto-fire:  {}", config.keeper.auto_confirm_dead);

    let interval = Duration::from_secs(config.server.check_interval_secs);

    // Run first check immediately, then loop
    let mut first = true;
    loop {
        if !first {
            log::info!(
                "Sleeping {} seconds until next check…",
                config.server.check_interval_secs
            );
            tokio::time::sleep(interval).await;
        }
        first = false;

        match run_check_cycle(&config).await {
            Ok(CycleOutcome::ConfirmedDead) => {
                log::warn!("Estate settled. Keeper has nothing further to watch.");
                return Ok(());
            }
            Ok(outcome) => log::info!("Check cycle completed: {:?}", outcome),
            Err(e) => log::error!("Check cycle failed: {:#}", e),
        }
    }
}

/// Execute a single check cycle against the configured database.
pub async fn run_check_cycle(config: &ServerConfig) -> Result<CycleOutcome> {
    let mut store = open_store(config)?;
    check_estate(&mut store, SystemClock, config)
}

/// Create the estate in the configured database with `owner` as sole Owner.
pub fn initialize_estate(config: &ServerConfig, owner: Principal) -> Result<()> {
    let mut store = open_store(config)?;
    store
        .initialize(owner)
        .with_context(|| format!("Failed to initialize estate in {}", config.db_path().display()))?;
    Ok(())
}

fn open_store(config: &ServerConfig) -> Result<EstateStore> {
    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data dir: {}",
            config.server.data_dir.display()
        )
    })?;

    let db_path = config.db_path();
    EstateStore::open(&db_path)
        .with_context(|| format!("Failed to open estate database {}", db_path.display()))
}

/// Evaluate the switch and fire it if expired. Clock-agnostic for testing.
pub fn check_estate<C: Clock>(
    store: &mut EstateStore,
    clock: C,
    config: &ServerConfig,
) -> Result<CycleOutcome> {
    if !store.is_initialized()? {
        log::warn!("No estate initialized in the database, nothing to watch.");
        return Ok(CycleOutcome::NotInitialized);
    }

    let keeper = config.keeper_identity()?;
    let mut estate = store.load_estate(clock).context("Failed to load estate")?;
    let status = estate.heartbeat(&config.heartbeat);
    log_status(&status);

    if status.action != HeartbeatAction::Expired {
        return Ok(CycleOutcome::Checked(status.action));
    }
    if !config.keeper.auto_confirm_dead {
        log::warn!("Switch expired but auto_confirm_dead is off; leaving it to others.");
        return Ok(CycleOutcome::Checked(status.action));
    }

    estate
        .confirm_dead(&keeper)
        .context("confirm_dead rejected")?;
    let written = store
        .persist(&mut estate)
        .context("Failed to persist estate after confirm_dead")?;
    log::warn!(
        "🔴 Dead-man's switch fired by {} ({} event(s) recorded)",
        keeper.short(),
        written
    );
    Ok(CycleOutcome::ConfirmedDead)
}

fn log_status(status: &HeartbeatStatus) {
    let deadline = format_timestamp(status.deadline);
    let days_remaining = status.seconds_remaining as f64 / 86_400.0;
    match status.action {
        HeartbeatAction::Disabled => {
            log::info!("Dead-man's switch disabled (owner {}).", status.state)
        }
        HeartbeatAction::Healthy => log::info!(
            "Switch healthy: {:.0}% elapsed, deadline {} (~{:.1} days)",
            status.elapsed_fraction * 100.0,
            deadline,
            days_remaining
        ),
        HeartbeatAction::CheckinRecommended => log::warn!(
            "Check-in recommended: {:.0}% elapsed, deadline {} (~{:.1} days)",
            status.elapsed_fraction * 100.0,
            deadline,
            days_remaining
        ),
        HeartbeatAction::CheckinRequired => log::warn!(
            "⚠️  Check-in required: deadline {} (~{:.1} days)",
            deadline,
            days_remaining
        ),
        HeartbeatAction::Expired => log::warn!("Switch expired at {}", deadline),
        HeartbeatAction::Settled => log::info!("Owner already {}.", status.state),
    }
}

fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeeperSection, ServerSection};
    use testament_core::test_utils::principal;
    use testament_core::{EstateEvent, HeartbeatConfig, LivenessState, ManualClock};

    fn test_config(auto_confirm_dead: bool) -> ServerConfig {
        ServerConfig {
            server: ServerSection::default(),
            keeper: KeeperSection {
                identity: principal(4).to_string(),
                auto_confirm_dead,
            },
            heartbeat: HeartbeatConfig::default(),
        }
    }

    fn armed_store(interval: u64, clock: &ManualClock) -> EstateStore {
        let owner = principal(1);
        let mut store = EstateStore::open_in_memory().unwrap();
        store.initialize(owner).unwrap();
        let mut estate = store.load_estate(clock.clone()).unwrap();
        estate.enable_dead_mans_switch(&owner, interval).unwrap();
        store.persist(&mut estate).unwrap();
        store
    }

    #[test]
    fn test_uninitialized_database() {
        let mut store = EstateStore::open_in_memory().unwrap();
        let outcome = check_estate(&mut store, ManualClock::new(0), &test_config(true)).unwrap();
        assert_eq!(outcome, CycleOutcome::NotInitialized);
    }

    #[test]
    fn test_healthy_switch_left_alone() {
        let clock = ManualClock::new(1_000);
        let mut store = armed_store(1_000, &clock);
        clock.advance(100);

        let outcome = check_estate(&mut store, clock.clone(), &test_config(true)).unwrap();
        assert_eq!(outcome, CycleOutcome::Checked(HeartbeatAction::Healthy));
        assert_eq!(
            store.load_state().unwrap().liveness.state(),
            LivenessState::Alive
        );
    }

    #[test]
    fn test_expired_switch_fired_and_persisted() {
        let clock = ManualClock::new(1_000);
        let mut store = armed_store(1_000, &clock);
        clock.advance(1_001);

        let outcome = check_estate(&mut store, clock.clone(), &test_config(true)).unwrap();
        assert_eq!(outcome, CycleOutcome::ConfirmedDead);
        assert_eq!(
            store.load_state().unwrap().liveness.state(),
            LivenessState::Dead
        );
        assert_eq!(
            store.recent_events(1).unwrap()[0].event,
            EstateEvent::ConfirmationOfDeath { by: principal(4) }
        );

        // Next cycle sees a settled estate.
        let outcome = check_estate(&mut store, clock, &test_config(true)).unwrap();
        assert_eq!(outcome, CycleOutcome::Checked(HeartbeatAction::Settled));
    }

    #[test]
    fn test_auto_confirm_disabled() {
        let clock = ManualClock::new(0);
        let mut store = armed_store(10, &clock);
        clock.advance(11);

        let outcome = check_estate(&mut store, clock, &test_config(false)).unwrap();
        assert_eq!(outcome, CycleOutcome::Checked(HeartbeatAction::Expired));
        assert_eq!(
            store.load_state().unwrap().liveness.state(),
            LivenessState::Alive
        );
    }

    #[test]
    fn test_initialize_estate_creates_database_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(true);
        config.server.data_dir = dir.path().join("data");

        initialize_estate(&config, principal(1)).unwrap();
        assert!(initialize_estate(&config, principal(2)).is_err());

        let store = EstateStore::open(&config.db_path()).unwrap();
        let state = store.load_state().unwrap();
        assert_eq!(state.roles.members(testament_core::Role::Owner), &[principal(1)]);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_timestamp(u64::MAX), u64::MAX.to_string());
    }
}
