//! Testament Core
//!
//! Custody of an estate on behalf of an absent owner. Control passes to
//! designated parties only once a dead-man's switch has objectively expired.
//!
//! # Concepts
//!
//! - **Roles**: Owner (self-administering), Executor, Beneficiary, CoOwner
//! - **Liveness**: Alive, Uncertain, Dead (terminal), PlayingDead
//! - **Dead-man's switch**: anyone may confirm death once
//!   `now > last_checkin + interval`; the owner checks in via `confirm_alive`
//! - **Custody**: Owner-gated, best-effort native and token transfers
//!
//! # Example
//!
//! ```
//! use testament_core::{Estate, ManualClock, Role};
//! use testament_core::test_utils::principal;
//!
//! let clock = ManualClock::new(1_700_000_000);
//! let owner = principal(1);
//! let mut estate = Estate::initialize(owner, clock.clone());
//!
//! estate.grant_role(&owner, Role::Executor, principal(2)).unwrap();
//! estate.enable_dead_mans_switch(&owner, 30 * 86_400).unwrap();
//!
//! clock.advance(31 * 86_400);
//! estate.confirm_dead(&principal(3)).unwrap();
//! ```

pub mod clock;
pub mod co_owner;
pub mod custody;
pub mod error;
pub mod estate;
pub mod events;
pub mod heartbeat;
pub mod liveness;
pub mod principal;
pub mod role;
pub mod shared;
pub mod test_utils;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use custody::{InMemoryLedger, InMemoryToken, NativeLedger, TokenService};
pub use error::EstateError;
pub use estate::{Estate, EstateState};
pub use events::{EstateEvent, EventRecord};
pub use heartbeat::{evaluate_heartbeat, HeartbeatAction, HeartbeatConfig, HeartbeatStatus};
pub use liveness::{DeadManSwitchConfig, Liveness, LivenessState};
pub use principal::Principal;
pub use role::{Role, RoleRegistry};
pub use shared::SharedEstate;
