//! Persisted bearer token storage.
//!
//! The auth token lives in one well-known place: an in-memory slot,
//! optionally mirrored to a file so a restarted process comes back
//! authenticated. Reads happen on every request (the token can be cleared
//! behind the client's back by a 401), so the slot sits behind a cheap
//! `RwLock` and the store itself is clone-shared.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// Shared token store, cheap to clone.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<TokenStoreInner>,
}

struct TokenStoreInner {
    path: Option<PathBuf>,
    token: RwLock<Option<SecretString>>,
}

impl TokenStore {
    /// Create a token store, seeding from `path` when a token file exists.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        let token = path.as_deref().and_then(|p| {
            let raw = std::fs::read_to_string(p).ok()?;
            let cleaned = clean_token(&raw);
            (!cleaned.is_empty()).then(|| SecretString::from(cleaned))
        });

        Self {
            inner: Arc::new(TokenStoreInner {
                path,
                token: RwLock::new(token),
            }),
        }
    }

    /// Create a purely in-memory store (nothing survives the process).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Whether a token is currently held.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.read_slot().is_some()
    }

    /// The `Authorization` header value, if a token is held.
    ///
    /// Always produces exactly one `Bearer ` prefix regardless of how the
    /// token was stored.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.read_slot()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    /// Store a token, stripping any `Bearer ` prefix, and persist it.
    ///
    /// Persistence is best-effort: an unwritable token file degrades to
    /// in-memory behavior with a warning.
    pub fn set(&self, raw: &str) {
        let cleaned = clean_token(raw);
        if cleaned.is_empty() {
            self.clear();
            return;
        }

        if let Some(path) = &self.inner.path
            && let Err(error) = std::fs::write(path, &cleaned)
        {
            warn!(%error, path = %path.display(), "failed to persist auth token");
        }

        if let Ok(mut slot) = self.inner.token.write() {
            *slot = Some(SecretString::from(cleaned));
        }
    }

    /// Drop the token from memory and disk.
    pub fn clear(&self) {
        if let Ok(mut slot) = self.inner.token.write() {
            *slot = None;
        }

        if let Some(path) = &self.inner.path
            && path.exists()
            && let Err(error) = std::fs::remove_file(path)
        {
            warn!(%error, path = %path.display(), "failed to remove auth token file");
        }
    }

    fn read_slot(&self) -> Option<SecretString> {
        self.inner.token.read().ok().and_then(|slot| slot.clone())
    }
}

/// Trim whitespace and strip a `Bearer ` prefix if present.
fn clean_token(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("Bearer ")
        .unwrap_or(trimmed)
        .to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_token_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fernmart-token-test-{}-{tag}", std::process::id()))
    }

    #[test]
    fn test_clean_token() {
        assert_eq!(clean_token("abc"), "abc");
        assert_eq!(clean_token("Bearer abc"), "abc");
        assert_eq!(clean_token("  Bearer abc\n"), "abc");
        assert_eq!(clean_token("   "), "");
    }

    #[test]
    fn test_in_memory_set_and_clear() {
        let store = TokenStore::in_memory();
        assert!(!store.is_present());

        store.set("tok-1");
        assert_eq!(store.bearer().unwrap(), "Bearer tok-1");

        store.clear();
        assert!(store.bearer().is_none());
    }

    #[test]
    fn test_bearer_prefix_is_never_doubled() {
        let store = TokenStore::in_memory();
        store.set("Bearer tok-2");
        assert_eq!(store.bearer().unwrap(), "Bearer tok-2");
    }

    #[test]
    fn test_setting_empty_clears() {
        let store = TokenStore::in_memory();
        store.set("tok-3");
        store.set("   ");
        assert!(!store.is_present());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let path = temp_token_path("roundtrip");
        let _ = std::fs::remove_file(&path);

        let store = TokenStore::new(Some(path.clone()));
        store.set("tok-4");

        // A fresh store at the same path picks the token up at startup.
        let revived = TokenStore::new(Some(path.clone()));
        assert_eq!(revived.bearer().unwrap(), "Bearer tok-4");

        revived.clear();
        assert!(!path.exists());

        let empty = TokenStore::new(Some(path));
        assert!(!empty.is_present());
    }
}
