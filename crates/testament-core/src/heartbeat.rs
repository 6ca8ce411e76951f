//! Dead-man's switch heartbeat evaluation.
//!
//! Pure logic: no I/O, no clock reads. Takes the liveness state and the
//! current time, returns a recommendation. The caller (keeper daemon, UI)
//! decides whether to act on it.
//!
//! ```text
//! |--- Healthy ---|--- CheckinRecommended ---|--- CheckinRequired ---|--- Expired
//! 0%             50%                        90%                    100%
//! ```
//!
//! `Expired` is reported exactly when `confirm_dead` would succeed.

use crate::clock::Timestamp;
use crate::liveness::{Liveness, LivenessState};
use serde::{Deserialize, Serialize};

/// Heartbeat configuration: when to recommend check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Fraction of the interval elapsed before recommending check-in (0.0–1.0).
    /// Default: 0.5 (halfway point).
    pub checkin_threshold: f64,

    /// Fraction of the interval elapsed before check-in is critical (0.0–1.0).
    /// Default: 0.9.
    pub critical_threshold: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            checkin_threshold: 0.5,
            critical_threshold: 0.9,
        }
    }
}

impl HeartbeatConfig {
    /// Validate that thresholds are sensible.
    pub fn validate(&self) -> Result<(), HeartbeatError> {
        if self.checkin_threshold <= 0.0 || self.checkin_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "checkin_threshold must be between 0.0 and 1.0 exclusive".into(),
            ));
        }
        if self.critical_threshold <= self.checkin_threshold || self.critical_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "critical_threshold must be between checkin_threshold and 1.0 exclusive".into(),
            ));
        }
        Ok(())
    }
}

/// What the heartbeat recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatAction {
    /// Switch is off. Nothing will ever fire.
    Disabled,
    /// Far from the deadline.
    Healthy,
    /// Passed the check-in threshold. Should check in soon.
    CheckinRecommended,
    /// Passed the critical threshold. Must check in now.
    CheckinRequired,
    /// Deadline passed. Anyone may call `confirm_dead`.
    Expired,
    /// Owner already confirmed dead (or playing dead).
    Settled,
}

/// Full heartbeat status for an estate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    pub state: LivenessState,
    /// When the switch may fire (last check-in + interval).
    pub deadline: Timestamp,
    /// Seconds until the switch may fire; negative once past.
    pub seconds_remaining: i64,
    /// Fraction of the interval elapsed (0.0–1.0+).
    pub elapsed_fraction: f64,
    pub action: HeartbeatAction,
}

/// Errors from heartbeat evaluation.
#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}

/// Evaluate the dead-man's switch at time `now`.
pub fn evaluate_heartbeat(
    liveness: &Liveness,
    now: Timestamp,
    config: &HeartbeatConfig,
) -> HeartbeatStatus {
    let switch = liveness.switch();
    let deadline = switch.deadline();
    let elapsed = now.saturating_sub(switch.last_checkin_timestamp);
    let seconds_remaining = (deadline as i128 - now as i128)
        .clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    let elapsed_fraction = if switch.checkin_interval_secs == 0 {
        0.0
    } else {
        elapsed as f64 / switch.checkin_interval_secs as f64
    };

    let action = match liveness.state() {
        LivenessState::Dead | LivenessState::PlayingDead => HeartbeatAction::Settled,
        _ if !switch.enabled => HeartbeatAction::Disabled,
        _ if switch.has_expired(now) => HeartbeatAction::Expired,
        _ if elapsed_fraction >= config.critical_threshold => HeartbeatAction::CheckinRequired,
        _ if elapsed_fraction >= config.checkin_threshold => HeartbeatAction::CheckinRecommended,
        _ => HeartbeatAction::Healthy,
    };

    HeartbeatStatus {
        state: liveness.state(),
        deadline,
        seconds_remaining,
        elapsed_fraction,
        action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(interval: u64, t0: Timestamp) -> Liveness {
        let mut liveness = Liveness::new();
        liveness.enable_switch(interval, t0).unwrap();
        liveness
    }

    #[test]
    fn test_disabled_switch() {
        let status = evaluate_heartbeat(&Liveness::new(), 1_000, &HeartbeatConfig::default());
        assert_eq!(status.action, HeartbeatAction::Disabled);
    }

    #[test]
    fn test_healthy_status() {
        let status = evaluate_heartbeat(&armed(1000, 100), 200, &HeartbeatConfig::default());
        assert_eq!(status.action, HeartbeatAction::Healthy);
        assert!((status.elapsed_fraction - 0.1).abs() < 0.001);
        assert_eq!(status.seconds_remaining, 900);
    }

    #[test]
    fn test_checkin_recommended() {
        // 600 of 1000 seconds elapsed = 0.6
        let status = evaluate_heartbeat(&armed(1000, 100), 700, &HeartbeatConfig::default());
        assert_eq!(status.action, HeartbeatAction::CheckinRecommended);
    }

    #[test]
    fn test_checkin_required() {
        let status = evaluate_heartbeat(&armed(1000, 100), 1050, &HeartbeatConfig::default());
        assert_eq!(status.action, HeartbeatAction::CheckinRequired);
    }

    #[test]
    fn test_expired_matches_confirm_dead() {
        let config = HeartbeatConfig::default();
        let mut liveness = armed(1000, 100);

        // At the deadline: still CheckinRequired, confirm_dead refused.
        let status = evaluate_heartbeat(&liveness, 1100, &config);
        assert_eq!(status.action, HeartbeatAction::CheckinRequired);
        assert_eq!(status.seconds_remaining, 0);
        assert!(liveness.clone().confirm_dead(1100).is_err());

        let status = evaluate_heartbeat(&liveness, 1101, &config);
        assert_eq!(status.action, HeartbeatAction::Expired);
        assert!(status.seconds_remaining < 0);
        liveness.confirm_dead(1101).unwrap();

        let status = evaluate_heartbeat(&liveness, 1200, &config);
        assert_eq!(status.action, HeartbeatAction::Settled);
        assert_eq!(status.state, LivenessState::Dead);
    }

    #[test]
    fn test_uncertain_owner_still_tracked() {
        let mut liveness = armed(1000, 0);
        liveness.report_uncertain().unwrap();
        let status = evaluate_heartbeat(&liveness, 600, &HeartbeatConfig::default());
        assert_eq!(status.state, LivenessState::Uncertain);
        assert_eq!(status.action, HeartbeatAction::CheckinRecommended);
    }

    #[test]
    fn test_exactly_at_thresholds() {
        let config = HeartbeatConfig::default();
        let liveness = armed(1000, 0);
        assert_eq!(
            evaluate_heartbeat(&liveness, 500, &config).action,
            HeartbeatAction::CheckinRecommended
        );
        assert_eq!(
            evaluate_heartbeat(&liveness, 900, &config).action,
            HeartbeatAction::CheckinRequired
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let config = HeartbeatConfig {
            checkin_threshold: 0.3,
            critical_threshold: 0.7,
        };
        let liveness = armed(1000, 0);
        assert_eq!(
            evaluate_heartbeat(&liveness, 350, &config).action,
            HeartbeatAction::CheckinRecommended
        );
        assert_eq!(
            evaluate_heartbeat(&liveness, 750, &config).action,
            HeartbeatAction::CheckinRequired
        );
    }

    #[test]
    fn test_config_validation() {
        let bad1 = HeartbeatConfig {
            checkin_threshold: 0.0,
            critical_threshold: 0.9,
        };
        assert!(bad1.validate().is_err());

        let bad2 = HeartbeatConfig {
            checkin_threshold: 0.5,
            critical_threshold: 0.4, // less than checkin
        };
        assert!(bad2.validate().is_err());

        let bad3 = HeartbeatConfig {
            checkin_threshold: 0.5,
            critical_threshold: 1.0, // not exclusive
        };
        assert!(bad3.validate().is_err());

        assert!(HeartbeatConfig::default().validate().is_ok());
    }
}
