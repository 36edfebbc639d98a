//! Token Cache
//!
//! Process-local cache of access tokens keyed by store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::types::{AccessToken, StoreKey};

/// Per-store access token cache.
#[derive(Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<StoreKey, AccessToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token for a store.
    pub fn get(&self, store: &StoreKey) -> Option<AccessToken> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(store)
            .cloned()
    }

    /// Cache a token for a store, replacing any previous one.
    pub fn put(&self, store: &StoreKey, token: AccessToken) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(store.clone(), token);
    }

    /// Drop one store's token, or every token when `store` is `None`.
    pub fn invalidate(&self, store: Option<&StoreKey>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match store {
            Some(store) => {
                entries.remove(store);
            }
            None => entries.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_invalidate() {
        let cache = TokenCache::new();
        let a = StoreKey::new("proteloja");
        let b = StoreKey::new("vendolandia");

        cache.put(&a, AccessToken::new("token-a"));
        cache.put(&b, AccessToken::new("token-b"));
        assert_eq!(cache.get(&a).unwrap().secret(), "token-a");

        cache.invalidate(Some(&a));
        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());

        cache.invalidate(None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_replaces() {
        let cache = TokenCache::new();
        let store = StoreKey::new("proteloja");
        cache.put(&store, AccessToken::new("old"));
        cache.put(&store, AccessToken::new("new"));
        assert_eq!(cache.get(&store).unwrap().secret(), "new");
        assert_eq!(cache.len(), 1);
    }
}
