//! Cancellation tokens for running broadcasts.
//!
//! At most one token is live per broadcast ID. Two broadcasts may share an
//! ID (for example two concurrent sends to the same group); the later one
//! replaces the earlier one's entry, and each only removes its own entry
//! when it finishes.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::BroadcastId;

#[derive(Debug, Default)]
struct Entries {
    tokens: HashMap<BroadcastId, (u64, CancellationToken)>,
    next_generation: u64,
}

/// Table of cancellation tokens keyed by broadcast ID.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    inner: Mutex<Entries>,
}

impl CancellationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token under `id`.
    ///
    /// The entry is removed when the returned guard is dropped, unless a
    /// newer registration has replaced it in the meantime.
    pub fn register(&self, id: BroadcastId) -> Registration<'_> {
        let token = CancellationToken::new();
        let generation = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.next_generation += 1;
            let generation = inner.next_generation;
            inner
                .tokens
                .insert(id.clone(), (generation, token.clone()));
            generation
        };
        Registration {
            registry: self,
            id,
            generation,
            token,
        }
    }

    /// Signal the token registered under `id`.
    ///
    /// Returns `false` if nothing is registered. Cancelling twice is
    /// harmless.
    pub fn cancel(&self, id: &BroadcastId) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.tokens.get(id) {
            Some((_, token)) => {
                debug!(broadcast_id = %id, "Cancelling broadcast");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Check if a token is registered under `id`.
    #[must_use]
    pub fn is_running(&self, id: &BroadcastId) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.tokens.contains_key(id)
    }

    /// Number of registered tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.tokens.len()
    }

    /// Check if no broadcast is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn deregister(&self, id: &BroadcastId, generation: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner
            .tokens
            .get(id)
            .is_some_and(|(current, _)| *current == generation)
        {
            inner.tokens.remove(id);
        }
    }
}

/// A live entry in a [`CancellationRegistry`].
#[derive(Debug)]
pub struct Registration<'a> {
    registry: &'a CancellationRegistry,
    id: BroadcastId,
    generation: u64,
    token: CancellationToken,
}

impl Registration<'_> {
    /// The token units should watch.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The broadcast ID this registration is for.
    #[must_use]
    pub const fn id(&self) -> &BroadcastId {
        &self.id
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.deregister(&self.id, self.generation);
    }
}
