//! Single-flight reentrancy guard.
//!
//! The substrate runs each operation to completion, but a value transfer
//! can synchronously invoke recipient-controlled code that attempts to
//! re-enter the engine before the original call returns. Every entry point
//! that performs an external transfer takes this lock on entry and releases
//! it on exit; a reentrant call while the lock is held fails with
//! `Reentrant`.

use crate::error::{EngineError, Result};

/// Single boolean execution lock.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Take the lock before any external transfer.
    pub fn enter(&mut self) -> Result<()> {
        if self.locked {
            return Err(EngineError::Reentrant);
        }
        self.locked = true;
        Ok(())
    }

    /// Release the lock once the transfer-performing operation finished.
    pub fn exit(&mut self) {
        self.locked = false;
    }
}
