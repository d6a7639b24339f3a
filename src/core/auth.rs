//! Tracker authentication services and structs.
//!
//! Clients of a private tracker attach an `auth_token` to every request. The
//! token is an opaque string issued out-of-band by the user store; the
//! [`Authenticator`] resolves it to the owning user through the
//! [`UserRepository`](crate::core::repositories::UserRepository) port.
//!
//! Token lookups sit on the hot announce path, so resolved profiles are kept
//! in a small TTL cache. Ban status is part of the cached profile; the cache
//! TTL bounds how long a freshly banned user can keep announcing.
//!
//! The token value is a credential. Its [`std::fmt::Display`] implementation
//! redacts everything but a short prefix so a full token can never end up in
//! the logs.
use std::collections::HashMap;
use std::panic::Location;
use std::time::Duration;

use reef_tracker_clock::clock::Time;
use reef_tracker_located_error::LocatedError;
use reef_tracker_primitives::DurationSinceUnixEpoch;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::repositories::{RepositoryError, UserProfile, UserRepository};
use crate::CurrentClock;

/// How long a resolved profile is served from cache before the user store is
/// asked again.
const PROFILE_CACHE_TTL: Duration = Duration::from_secs(60);

/// An opaque authentication token issued by the user store.
#[derive(Debug, Eq, PartialEq, Clone, Hash, serde::Serialize, serde::Deserialize)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AuthToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AuthToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "{prefix}...")
    }
}

/// Resolves `auth_token`s to user profiles, with caching.
pub struct Authenticator {
    user_repository: std::sync::Arc<dyn UserRepository>,
    cache: RwLock<HashMap<AuthToken, CachedProfile>>,
}

struct CachedProfile {
    profile: UserProfile,
    resolved_at: DurationSinceUnixEpoch,
}

impl Authenticator {
    #[must_use]
    pub fn new(user_repository: std::sync::Arc<dyn UserRepository>) -> Self {
        Self {
            user_repository,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves the token and checks that the user may use the tracker.
    ///
    /// # Errors
    ///
    /// Will return an error if the token is unknown, the user is banned or
    /// the user store cannot be reached.
    pub async fn authenticate(&self, token: &AuthToken) -> Result<UserProfile, Error> {
        let profile = match self.cached_profile(token).await {
            Some(profile) => profile,
            None => self.resolve_and_cache(token).await?,
        };

        if profile.is_banned {
            return Err(Error::UserBanned {
                location: Location::caller(),
            });
        }

        Ok(profile)
    }

    async fn cached_profile(&self, token: &AuthToken) -> Option<UserProfile> {
        let cache = self.cache.read().await;
        let entry = cache.get(token)?;

        let now = CurrentClock::now();
        if now.saturating_sub(entry.resolved_at) > PROFILE_CACHE_TTL {
            return None;
        }

        Some(entry.profile.clone())
    }

    async fn resolve_and_cache(&self, token: &AuthToken) -> Result<UserProfile, Error> {
        let profile = self
            .user_repository
            .resolve_token(token)
            .await
            .map_err(|source| Error::BackendUnavailable {
                source: reef_tracker_located_error::Located(source).into(),
            })?
            .ok_or_else(|| Error::UnknownToken {
                token: token.to_string(),
                location: Location::caller(),
            })?;

        self.cache.write().await.insert(
            token.clone(),
            CachedProfile {
                profile: profile.clone(),
                resolved_at: CurrentClock::now(),
            },
        );

        Ok(profile)
    }
}

/// Verification error returned by the [`Authenticator`].
#[derive(Debug, Error)]
pub enum Error {
    /// The token does not resolve to any user. The message carries only the
    /// redacted token.
    #[error("unknown authentication token {token}, {location}")]
    UnknownToken {
        token: String,
        location: &'static Location<'static>,
    },

    #[error("user is banned, {location}")]
    UserBanned { location: &'static Location<'static> },

    #[error("missing authentication token for private tracker, {location}")]
    MissingToken { location: &'static Location<'static> },

    #[error("could not verify authentication token: {source}")]
    BackendUnavailable {
        source: LocatedError<'static, RepositoryError>,
    },
}

#[cfg(test)]
mod tests {

    mod auth_token {
        use crate::core::auth::AuthToken;

        #[test]
        fn display_should_redact_everything_but_a_short_prefix() {
            let token = AuthToken::from("YZSl4lMZupRuOpSRC3krIKR5BPB14nrJ");

            assert_eq!(token.to_string(), "YZSl4l...");
        }

        #[test]
        fn the_raw_value_should_still_be_reachable_for_lookups() {
            let token = AuthToken::from("YZSl4lMZupRuOpSRC3krIKR5BPB14nrJ");

            assert_eq!(token.value(), "YZSl4lMZupRuOpSRC3krIKR5BPB14nrJ");
        }
    }

    mod the_authenticator {
        use std::sync::Arc;

        use crate::core::auth::{AuthToken, Authenticator, Error};
        use crate::core::repositories::in_memory::InMemoryUserRepository;
        use crate::core::repositories::{UserClass, UserProfile};

        fn sample_profile(is_banned: bool) -> UserProfile {
            UserProfile {
                user_id: 42,
                class: UserClass::Member,
                download_multiplier: 1.0,
                is_banned,
            }
        }

        #[tokio::test]
        async fn it_should_resolve_a_registered_token() {
            let repository = Arc::new(InMemoryUserRepository::default());
            repository.insert(AuthToken::from("token-value-0000000000000000000A"), sample_profile(false));

            let authenticator = Authenticator::new(repository);

            let profile = authenticator
                .authenticate(&AuthToken::from("token-value-0000000000000000000A"))
                .await
                .unwrap();

            assert_eq!(profile.user_id, 42);
        }

        #[tokio::test]
        async fn it_should_reject_an_unknown_token() {
            let authenticator = Authenticator::new(Arc::new(InMemoryUserRepository::default()));

            let error = authenticator
                .authenticate(&AuthToken::from("token-value-0000000000000000000A"))
                .await
                .unwrap_err();

            assert!(matches!(error, Error::UnknownToken { .. }));
        }

        #[tokio::test]
        async fn it_should_reject_a_banned_user() {
            let repository = Arc::new(InMemoryUserRepository::default());
            repository.insert(AuthToken::from("token-value-0000000000000000000A"), sample_profile(true));

            let authenticator = Authenticator::new(repository);

            let error = authenticator
                .authenticate(&AuthToken::from("token-value-0000000000000000000A"))
                .await
                .unwrap_err();

            assert!(matches!(error, Error::UserBanned { .. }));
        }

        #[tokio::test]
        async fn the_error_for_an_unknown_token_should_not_leak_the_full_value() {
            let authenticator = Authenticator::new(Arc::new(InMemoryUserRepository::default()));

            let error = authenticator
                .authenticate(&AuthToken::from("secret-value-000000000000000000A"))
                .await
                .unwrap_err();

            let message = error.to_string();

            assert!(message.contains("secret..."));
            assert!(!message.contains("secret-value-000000000000000000A"));
        }
    }
}
