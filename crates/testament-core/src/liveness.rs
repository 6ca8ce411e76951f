//! Owner liveness state machine and dead-man's switch.
//!
//! Pure logic: callers pass the current time in, nothing here reads a clock.
//!
//! ```text
//!            report_uncertain            confirm_dead (switch expired)
//!   Alive ─────────────────────> Uncertain        Alive/Uncertain ──> Dead
//!     ^                              │
//!     └────── confirm_alive ─────────┘            (Dead is terminal)
//! ```
//!
//! `PlayingDead` is representable and passes the `onlyDead` guard, but no
//! transition enters it yet.

use crate::clock::Timestamp;
use crate::error::EstateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner's presumed life status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LivenessState {
    #[default]
    Alive,
    Uncertain,
    Dead,
    PlayingDead,
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LivenessState::Alive => "Alive",
            LivenessState::Uncertain => "Uncertain",
            LivenessState::Dead => "Dead",
            LivenessState::PlayingDead => "PlayingDead",
        };
        f.write_str(name)
    }
}

/// Dead-man's switch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeadManSwitchConfig {
    pub enabled: bool,
    pub checkin_interval_secs: u64,
    /// Only moves forward, and only while the owner is Alive.
    pub last_checkin_timestamp: Timestamp,
}

impl DeadManSwitchConfig {
    /// Time after which the switch may fire, if enabled.
    pub fn deadline(&self) -> Timestamp {
        self.last_checkin_timestamp
            .saturating_add(self.checkin_interval_secs)
    }

    /// True when enabled and `now` is strictly past the deadline.
    pub fn has_expired(&self, now: Timestamp) -> bool {
        self.enabled && now > self.deadline()
    }
}

/// Liveness state plus switch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Liveness {
    state: LivenessState,
    switch: DeadManSwitchConfig,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn switch(&self) -> &DeadManSwitchConfig {
        &self.switch
    }

    /// `notDead` guard.
    pub fn ensure_not_dead(&self, operation: &'static str) -> Result<(), EstateError> {
        if self.state == LivenessState::Dead {
            log::debug!("notDead guard rejected {}", operation);
            return Err(EstateError::InvalidState {
                state: self.state,
                operation,
            });
        }
        Ok(())
    }

    /// `onlyDead` guard: Dead or PlayingDead.
    pub fn ensure_dead(&self, operation: &'static str) -> Result<(), EstateError> {
        match self.state {
            LivenessState::Dead | LivenessState::PlayingDead => Ok(()),
            state => {
                log::debug!("onlyDead guard rejected {}", operation);
                Err(EstateError::InvalidState { state, operation })
            }
        }
    }

    /// Alive or PlayingDead -> Uncertain.
    ///
    /// Repeating the report while already Uncertain is accepted.
    pub fn report_uncertain(&mut self) -> Result<(), EstateError> {
        self.ensure_not_dead("report_uncertain")?;
        self.state = LivenessState::Uncertain;
        Ok(())
    }

    /// Any non-Dead state -> Alive. Doubles as the switch check-in.
    pub fn confirm_alive(&mut self, now: Timestamp) -> Result<(), EstateError> {
        self.ensure_not_dead("confirm_alive")?;
        self.state = LivenessState::Alive;
        if self.switch.enabled {
            self.checkin(now);
        }
        Ok(())
    }

    /// Permissionless: -> Dead once the enabled switch has expired.
    pub fn confirm_dead(&mut self, now: Timestamp) -> Result<(), EstateError> {
        self.ensure_not_dead("confirm_dead")?;
        if !self.switch.enabled {
            return Err(EstateError::ConditionsNotMet(
                "dead-man's switch is disabled".into(),
            ));
        }
        if !self.switch.has_expired(now) {
            return Err(EstateError::ConditionsNotMet(format!(
                "check-in interval has not elapsed (deadline {}, now {})",
                self.switch.deadline(),
                now
            )));
        }
        self.state = LivenessState::Dead;
        Ok(())
    }

    /// Enable the switch and stamp a check-in. Owner must be Alive.
    pub fn enable_switch(&mut self, interval_secs: u64, now: Timestamp) -> Result<(), EstateError> {
        self.ensure_not_dead("enable_dead_mans_switch")?;
        if self.state != LivenessState::Alive {
            return Err(EstateError::InvalidState {
                state: self.state,
                operation: "enable_dead_mans_switch",
            });
        }
        if interval_secs == 0 {
            return Err(EstateError::InvalidInterval);
        }
        self.switch.enabled = true;
        self.switch.checkin_interval_secs = interval_secs;
        self.checkin(now);
        Ok(())
    }

    pub fn disable_switch(&mut self) -> Result<(), EstateError> {
        self.ensure_not_dead("disable_dead_mans_switch")?;
        self.switch.enabled = false;
        Ok(())
    }

    /// Check a restored switch: an enabled switch needs a positive interval.
    pub fn validate(&self) -> Result<(), EstateError> {
        if self.switch.enabled && self.switch.checkin_interval_secs == 0 {
            return Err(EstateError::InvalidSnapshot(
                "switch enabled with zero interval".into(),
            ));
        }
        Ok(())
    }

    fn checkin(&mut self, now: Timestamp) {
        debug_assert_eq!(self.state, LivenessState::Alive);
        self.switch.last_checkin_timestamp = self.switch.last_checkin_timestamp.max(now);
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
    fn test_initial_state() {
        let liveness = Liveness::new();
        assert_eq!(liveness.state(), LivenessState::Alive);
        assert!(!liveness.switch().enabled);
    }

    #[test]
    fn test_confirm_dead_requires_enabled_switch() {
        let mut liveness = Liveness::new();
        let err = liveness.confirm_dead(u64::MAX).unwrap_err();
        assert!(matches!(err, EstateError::ConditionsNotMet(_)));
        assert_eq!(liveness.state(), LivenessState::Alive);
    }

    #[test]
    fn test_confirm_dead_boundary() {
        let mut liveness = armed(1000, 10_000);

        // Exactly at the deadline is not enough.
        assert!(matches!(
            liveness.confirm_dead(11_000),
            Err(EstateError::ConditionsNotMet(_))
        ));
        assert_eq!(liveness.state(), LivenessState::Alive);

        liveness.confirm_dead(11_001).unwrap();
        assert_eq!(liveness.state(), LivenessState::Dead);
    }

    #[test]
    fn test_dead_is_terminal() {
        let mut liveness = armed(10, 0);
        liveness.confirm_dead(11).unwrap();

        for result in [
            liveness.confirm_dead(100),
            liveness.confirm_alive(100),
            liveness.report_uncertain(),
            liveness.enable_switch(10, 100),
            liveness.disable_switch(),
        ] {
            assert!(matches!(
                result,
                Err(EstateError::InvalidState {
                    state: LivenessState::Dead,
                    ..
                })
            ));
        }
        assert_eq!(liveness.state(), LivenessState::Dead);
    }

    #[test]
    fn test_uncertain_and_back() {
        let mut liveness = armed(1000, 0);
        liveness.report_uncertain().unwrap();
        assert_eq!(liveness.state(), LivenessState::Uncertain);
        // Reporting again is harmless.
        liveness.report_uncertain().unwrap();

        liveness.confirm_alive(500).unwrap();
        assert_eq!(liveness.state(), LivenessState::Alive);
        assert_eq!(liveness.switch().last_checkin_timestamp, 500);
    }

    #[test]
    fn test_uncertain_owner_can_still_be_declared_dead() {
        let mut liveness = armed(100, 0);
        liveness.report_uncertain().unwrap();
        liveness.confirm_dead(101).unwrap();
        assert_eq!(liveness.state(), LivenessState::Dead);
    }

    #[test]
    fn test_checkin_only_when_enabled() {
        let mut liveness = Liveness::new();
        liveness.confirm_alive(5_000).unwrap();
        assert_eq!(liveness.switch().last_checkin_timestamp, 0);

        liveness.enable_switch(60, 6_000).unwrap();
        liveness.confirm_alive(7_000).unwrap();
        assert_eq!(liveness.switch().last_checkin_timestamp, 7_000);

        liveness.disable_switch().unwrap();
        liveness.confirm_alive(8_000).unwrap();
        assert_eq!(liveness.switch().last_checkin_timestamp, 7_000);
    }

    #[test]
    fn test_checkin_never_moves_backwards() {
        let mut liveness = armed(60, 9_000);
        liveness.confirm_alive(8_000).unwrap();
        assert_eq!(liveness.switch().last_checkin_timestamp, 9_000);
    }

    #[test]
    fn test_enable_requires_alive_and_positive_interval() {
        let mut liveness = Liveness::new();
        assert_eq!(
            liveness.enable_switch(0, 1),
            Err(EstateError::InvalidInterval)
        );

        liveness.report_uncertain().unwrap();
        assert!(matches!(
            liveness.enable_switch(60, 1),
            Err(EstateError::InvalidState {
                state: LivenessState::Uncertain,
                ..
            })
        ));
        assert!(!liveness.switch().enabled);
    }

    #[test]
    fn test_guards() {
        let mut liveness = armed(1, 0);
        assert!(liveness.ensure_not_dead("op").is_ok());
        assert!(liveness.ensure_dead("op").is_err());

        liveness.confirm_dead(2).unwrap();
        assert!(liveness.ensure_not_dead("op").is_err());
        assert!(liveness.ensure_dead("op").is_ok());
    }

    #[test]
    fn test_deadline_saturates() {
        let switch = DeadManSwitchConfig {
            enabled: true,
            checkin_interval_secs: u64::MAX,
            last_checkin_timestamp: 10,
        };
        assert_eq!(switch.deadline(), u64::MAX);
        assert!(!switch.has_expired(u64::MAX));
    }

    #[test]
    fn test_validate_rejects_zero_interval_switch() {
        assert_eq!(armed(60, 0).validate(), Ok(()));

        let mut liveness = armed(60, 0);
        liveness.switch.checkin_interval_secs = 0;
        assert!(matches!(
            liveness.validate(),
            Err(EstateError::InvalidSnapshot(_))
        ));
    }
}
