//! Shared test utilities.
//!
//! Deterministic principals and estate construction helpers used across
//! unit and integration tests.

use crate::clock::{ManualClock, Timestamp};
use crate::estate::Estate;
use crate::principal::Principal;

/// Deterministic principal from a seed byte.
///
/// The identity is `[0x01, 0x00, ..., 0x00, seed]`. Different seeds give
/// different principals.
pub fn principal(seed: u8) -> Principal {
    let mut bytes = [0u8; 32];
    bytes[0] = 0x01;
    bytes[31] = seed;
    Principal::from_bytes(bytes)
}

/// An estate owned by `owner` on a manual clock starting at `start`.
///
/// The returned clock shares time with the estate's clock.
pub fn new_test_estate(owner: Principal, start: Timestamp) -> (Estate<ManualClock>, ManualClock) {
    let clock = ManualClock::new(start);
    (Estate::initialize(owner, clock.clone()), clock)
}
