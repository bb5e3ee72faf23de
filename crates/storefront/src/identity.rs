//! Authenticated identity state.
//!
//! Identity is two half-independent pieces: the bearer token (held by the
//! shared [`TokenStore`], persisted across restarts) and the user profile,
//! fetched separately and possibly missing even when a token is present,
//! since login endpoints hand the token back before the profile exists
//! locally.
//! An identity is *usable* for order submission only when both pieces are
//! in place and the profile carries a stable id.
//!
//! Profile refresh is single-flight: one refresh runs at a time and
//! concurrent callers share its outcome instead of stacking requests.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use fernmart_core::UserStableId;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cart::identity::coerce_id;
use crate::error::{Result, StoreError};
use crate::token::TokenStore;

/// Login credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration details.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// The user record as the profile endpoint describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// Stable identifier, resolved from `_id` falling back to `id`.
    pub stable_id: Option<UserStableId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl UserProfile {
    /// Parse a profile payload. Returns `None` when the payload is not an
    /// object at all.
    #[must_use]
    pub fn from_value(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;

        let stable_id = object
            .get("_id")
            .or_else(|| object.get("id"))
            .and_then(coerce_id)
            .map(UserStableId::from);

        Some(Self {
            stable_id,
            name: object.get("name").and_then(Value::as_str).map(str::to_owned),
            email: object
                .get("email")
                .and_then(Value::as_str)
                .map(str::to_owned),
            is_admin: object
                .get("role")
                .and_then(Value::as_str)
                .is_some_and(|role| role.eq_ignore_ascii_case("admin")),
        })
    }
}

/// A point-in-time view of identity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Whether a bearer token is currently held.
    pub authenticated: bool,
    /// The user profile, when fetched.
    pub user: Option<UserProfile>,
}

impl Identity {
    /// Usable for order submission: token present, profile present, stable
    /// id resolved.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.authenticated
            && self
                .user
                .as_ref()
                .is_some_and(|user| user.stable_id.is_some())
    }
}

/// Auth endpoints, as exposed by the transport.
///
/// `login`/`register` return the raw response payload; when the API puts
/// the token in a response header instead of the body, the transport is
/// expected to fold it into the payload under `token`.
#[allow(async_fn_in_trait)]
pub trait AuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Value>;
    async fn register(&self, registration: &Registration) -> Result<Value>;
    async fn logout(&self) -> Result<()>;
    async fn fetch_profile(&self) -> Result<Value>;
}

/// The owning store for identity state.
pub struct IdentityStore<B> {
    backend: B,
    tokens: TokenStore,
    user: RwLock<Option<UserProfile>>,
    refresh_gate: Mutex<()>,
    generation: AtomicU64,
}

impl<B: AuthBackend> IdentityStore<B> {
    /// Create a store over the given backend and shared token store.
    ///
    /// The token store was seeded from disk at startup, so `authenticated`
    /// can be true before any profile has been fetched.
    pub fn new(backend: B, tokens: TokenStore) -> Self {
        Self {
            backend,
            tokens,
            user: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current identity.
    pub fn identity(&self) -> Identity {
        Identity {
            authenticated: self.tokens.is_present(),
            user: self.read_user(),
        }
    }

    /// The stable user id, when identity is currently usable.
    pub fn usable_id(&self) -> Option<UserStableId> {
        if !self.tokens.is_present() {
            return None;
        }
        self.read_user().and_then(|user| user.stable_id)
    }

    /// Log in, persist the token, and fetch the profile.
    ///
    /// The profile fetch is best-effort: a login whose profile endpoint
    /// hiccups still leaves a valid token behind, and the next
    /// [`ensure_usable`](Self::ensure_usable) repairs the rest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when no token can be found in
    /// the response.
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity> {
        let payload = self.backend.login(credentials).await?;
        self.adopt_session(&payload).await
    }

    /// Register a new account; otherwise identical to [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when no token can be found in
    /// the response.
    pub async fn register(&self, registration: &Registration) -> Result<Identity> {
        let payload = self.backend.register(registration).await?;
        self.adopt_session(&payload).await
    }

    /// Log out.
    ///
    /// Local state is cleared even when the server call fails; a dead
    /// session on our side must not keep a stale token alive.
    pub async fn logout(&self) {
        if let Err(error) = self.backend.logout().await {
            warn!(%error, "logout request failed; clearing local session anyway");
        }
        self.teardown();
    }

    /// Clear token and profile. Also invoked by transport-level 401
    /// handling through the shared token store.
    pub fn teardown(&self) {
        self.tokens.clear();
        self.write_user(None);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Re-fetch the user profile, single-flight.
    ///
    /// A caller that arrives while a refresh is in flight waits for it and
    /// shares its outcome rather than issuing a second request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when no token is held or the
    /// refresh came back unauthenticated; other transport errors pass
    /// through.
    pub async fn refresh(&self) -> Result<()> {
        let observed = self.generation.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            // A refresh completed while we waited on the gate; share it.
            debug!("profile refresh coalesced with an in-flight one");
            return if self.usable_id().is_some() {
                Ok(())
            } else {
                Err(StoreError::AuthRequired)
            };
        }

        if !self.tokens.is_present() {
            return Err(StoreError::AuthRequired);
        }

        let outcome = self.backend.fetch_profile().await;
        self.generation.fetch_add(1, Ordering::AcqRel);

        match outcome {
            Ok(payload) => {
                let profile = UserProfile::from_value(&payload).ok_or_else(|| {
                    StoreError::MalformedResponse("profile payload is not an object".to_owned())
                })?;
                debug!(stable_id = ?profile.stable_id, "profile refreshed");
                self.write_user(Some(profile));
                Ok(())
            }
            Err(StoreError::AuthRequired) => {
                warn!("profile refresh rejected; clearing session");
                self.write_user(None);
                self.tokens.clear();
                Err(StoreError::AuthRequired)
            }
            Err(error) => Err(error),
        }
    }

    /// Make identity usable, refreshing the profile at most once.
    ///
    /// This is the awaited repair step checkout performs before touching
    /// money.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when identity is still not
    /// usable after the single refresh attempt.
    pub async fn ensure_usable(&self) -> Result<UserStableId> {
        if let Some(id) = self.usable_id() {
            return Ok(id);
        }

        self.refresh().await?;
        self.usable_id().ok_or(StoreError::AuthRequired)
    }

    async fn adopt_session(&self, payload: &Value) -> Result<Identity> {
        let Some(token) = extract_token(payload) else {
            warn!("auth response carried no token");
            return Err(StoreError::AuthRequired);
        };
        self.tokens.set(&token);

        // Some API versions inline the user, some nest it, some omit it.
        let inline_user = payload
            .get("user")
            .and_then(UserProfile::from_value)
            .or_else(|| UserProfile::from_value(payload))
            .filter(|profile| profile.stable_id.is_some());

        match inline_user {
            Some(profile) => self.write_user(Some(profile)),
            None => {
                if let Err(error) = self.refresh().await {
                    warn!(%error, "post-login profile fetch failed");
                }
            }
        }

        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(self.identity())
    }

    fn read_user(&self) -> Option<UserProfile> {
        self.user.read().ok().and_then(|slot| slot.clone())
    }

    fn write_user(&self, profile: Option<UserProfile>) {
        if let Ok(mut slot) = self.user.write() {
            *slot = profile;
        }
    }
}

/// Pull the bearer token out of an auth response payload.
///
/// The API has shipped it as `token` and as `accessToken`; header delivery
/// is folded into `token` by the transport before we get here.
#[must_use]
pub fn extract_token(payload: &Value) -> Option<String> {
    let raw = payload
        .get("token")
        .or_else(|| payload.get("accessToken"))
        .and_then(Value::as_str)?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
