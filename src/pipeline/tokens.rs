// src/pipeline/tokens.rs
// =============================================================================
// The pool of download slots.
//
// A TokenPool hands out at most `capacity` tokens at a time. A token is an
// owned guard: moving it into a spawned task and letting it drop when the
// task ends gives the slot back, whether the download succeeded, failed or
// panicked.
//
// A capacity of 0 means "no limit": acquire() returns immediately with an
// empty token.
//
// Rust concepts:
// - Semaphore: A counter of available permits with an async acquire
// - Drop: Releasing a resource when its owner goes out of scope
// =============================================================================

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::CrawlError;

#[derive(Debug, Clone)]
pub struct TokenPool {
    // None when the pool is unbounded
    slots: Option<Arc<Semaphore>>,
}

/// Proof that a download slot is held. Dropping it frees the slot.
#[derive(Debug)]
pub struct Token {
    _permit: Option<OwnedSemaphorePermit>,
}

impl TokenPool {
    /// Creates a pool of `capacity` slots; 0 disables the limit.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (capacity > 0).then(|| Arc::new(Semaphore::new(capacity))),
        }
    }

    /// Waits until a slot is free and takes it.
    pub async fn acquire(&self) -> Result<Token, CrawlError> {
        let permit = match &self.slots {
            Some(slots) => Some(
                Arc::clone(slots)
                    .acquire_owned()
                    .await
                    .map_err(|_| CrawlError::TokenPoolClosed)?,
            ),
            None => None,
        };
        Ok(Token { _permit: permit })
    }

    /// Free slots right now, or None for an unbounded pool.
    pub fn available(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }
}
