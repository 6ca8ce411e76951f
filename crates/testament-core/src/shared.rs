//! Thread-safe estate handle.
//!
//! Every state-mutating operation reads then writes roles and liveness, so
//! each call runs inside a single critical section on the estate.

use crate::clock::Clock;
use crate::error::EstateError;
use crate::estate::Estate;
use std::sync::{Arc, Mutex};

pub struct SharedEstate<C: Clock> {
    inner: Arc<Mutex<Estate<C>>>,
}

impl<C: Clock> Clone for SharedEstate<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> SharedEstate<C> {
    pub fn new(estate: Estate<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(estate)),
        }
    }

    /// Run `op` with exclusive access to the estate.
    pub fn with<R>(
        &self,
        op: impl FnOnce(&mut Estate<C>) -> Result<R, EstateError>,
    ) -> Result<R, EstateError> {
        let mut estate = self.inner.lock().map_err(|_| EstateError::LockPoisoned)?;
        op(&mut estate)
    }

    /// Read-only access under the same lock.
    pub fn read<R>(&self, op: impl FnOnce(&Estate<C>) -> R) -> Result<R, EstateError> {
        let estate = self.inner.lock().map_err(|_| EstateError::LockPoisoned)?;
        Ok(op(&estate))
    }
}
