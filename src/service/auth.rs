use crate::config::SessionConfig;
use crate::database::error::StoreError;
use crate::database::session::SessionRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::models::session::{IssuedSession, NewSession};
use crate::models::user::{NewUser, Role, UserResponse};
use crate::service::password::PasswordHasher;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use password_hash::rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

const TOKEN_BYTES: usize = 32;

/// Opaque bearer token: 32 bytes from the OS RNG, URL-safe base64.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hex digest. The only form in which tokens are stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn expiry_after(now: DateTime<Utc>, ttl_seconds: i64) -> Result<DateTime<Utc>, AppError> {
    TimeDelta::try_seconds(ttl_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Configuration(format!("token lifetime out of range: {}s", ttl_seconds)))
}

/// Session lifecycle: registration, login, access validation, rotation and revocation.
///
/// Holds no state of its own; build one per request.
pub struct AuthService<'a, R: ?Sized> {
    repository: &'a R,
    config: &'a SessionConfig,
    hasher: &'a PasswordHasher,
}

impl<'a, R> AuthService<'a, R>
where
    R: UserRepository + SessionRepository + Sync + ?Sized,
{
    pub fn new(repository: &'a R, config: &'a SessionConfig, hasher: &'a PasswordHasher) -> Self {
        AuthService { repository, config, hasher }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<UserResponse, AppError> {
        if self.repository.get_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email in use".to_string()));
        }

        let password_hash = self.hasher.hash(password).await?;
        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::default(),
        };

        // A concurrent registration can still win the race past the check above.
        let user = self.repository.create_user(&new_user).await.map_err(|e| match e {
            StoreError::DuplicateKey { .. } => AppError::Conflict("Email in use".to_string()),
            other => AppError::from(other),
        })?;

        info!(user_id = %user.id, "user registered");
        Ok(UserResponse::from(&user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(IssuedSession, UserResponse), AppError> {
        let Some(user) = self.repository.get_user_by_email(email).await? else {
            self.hasher.dummy_verify(password).await;
            warn!("login rejected: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if let Err(e) = self.hasher.verify(&user.password_hash, password).await {
            if matches!(e, AppError::InvalidCredentials) {
                warn!(user_id = %user.id, "login rejected: wrong password");
            }
            return Err(e);
        }

        let revoked = self.repository.delete_sessions_for_user(&user.id).await?;
        let issued = self.issue_session(&user.id).await?;

        info!(user_id = %user.id, session_id = %issued.session.id, revoked_sessions = revoked, "user logged in");
        Ok((issued, UserResponse::from(&user)))
    }

    /// Resolves an access token to its user. Read-only.
    pub async fn validate_access(&self, access_token: &str) -> Result<UserResponse, AppError> {
        let session = self
            .repository
            .find_session_by_access_token(&hash_token(access_token))
            .await?
            .ok_or(AppError::Unauthorized)?;

        if session.is_access_token_expired(Utc::now()) {
            return Err(AppError::Unauthorized);
        }

        let user = self.repository.get_user_by_id(&session.user_id).await?.ok_or(AppError::Unauthorized)?;
        Ok(UserResponse::from(&user))
    }

    /// Exchanges a refresh token for a brand new session. The old session is
    /// consumed; only the caller whose delete removed it gets a replacement.
    pub async fn refresh(&self, session_id: &Uuid, refresh_token: &str) -> Result<IssuedSession, AppError> {
        let Some(session) = self.repository.find_session_for_refresh(session_id, &hash_token(refresh_token)).await? else {
            warn!(session_id = %session_id, "refresh rejected: no matching session");
            return Err(AppError::Unauthorized);
        };

        if session.is_refresh_token_expired(Utc::now()) {
            warn!(session_id = %session.id, user_id = %session.user_id, "refresh rejected: refresh token expired");
            return Err(AppError::Unauthorized);
        }

        if !self.repository.delete_session(&session.id).await? {
            warn!(session_id = %session.id, user_id = %session.user_id, "refresh rejected: session already consumed");
            return Err(AppError::Unauthorized);
        }

        let issued = self.issue_session(&session.user_id).await?;
        info!(user_id = %session.user_id, old_session_id = %session.id, session_id = %issued.session.id, "session refreshed");
        Ok(issued)
    }

    pub async fn logout(&self, session_id: &Uuid) -> Result<(), AppError> {
        if !self.repository.delete_session(session_id).await? {
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        info!(session_id = %session_id, "session logged out");
        Ok(())
    }

    async fn issue_session(&self, user_id: &Uuid) -> Result<IssuedSession, AppError> {
        let now = Utc::now();
        let access_token = generate_token();
        let refresh_token = generate_token();

        let new_session = NewSession {
            user_id: *user_id,
            access_token_hash: hash_token(&access_token),
            refresh_token_hash: hash_token(&refresh_token),
            access_token_expires_at: expiry_after(now, self.config.access_token_ttl_seconds)?,
            refresh_token_expires_at: expiry_after(now, self.config.refresh_token_ttl_seconds)?,
        };
        let session = self.repository.create_session(&new_session).await?;

        Ok(IssuedSession {
            session,
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockRepository, test_config, test_hasher};
    use proptest::prelude::*;

    struct Fixture {
        repository: MockRepository,
        config: SessionConfig,
        hasher: PasswordHasher,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                repository: MockRepository::default(),
                config: test_config().session,
                hasher: test_hasher(),
            }
        }

        fn service(&self) -> AuthService<'_, MockRepository> {
            AuthService::new(&self.repository, &self.config, &self.hasher)
        }
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let fixture = Fixture::new();
        let user = fixture.service().register("Ann", "ann@example.com", "secret123").await.unwrap();

        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.role, Role::Member);
        let stored = fixture.repository.stored_user("ann@example.com").unwrap();
        assert_ne!(stored.password_hash, "secret123");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn register_does_not_create_a_session() {
        let fixture = Fixture::new();
        let user = fixture.service().register("Ann", "ann@example.com", "secret123").await.unwrap();
        assert_eq!(fixture.repository.session_count_for_user(&user.id), 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();

        let result = service.register("Ann Two", "ann@example.com", "other-password").await;
        assert!(matches!(result, Err(AppError::Conflict(message)) if message == "Email in use"));
    }

    #[tokio::test]
    async fn duplicate_rejected_by_store_is_conflict() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();

        fixture.repository.set_stale_email_lookups(true);
        let result = service.register("Ann Two", "ann@example.com", "other-password").await;
        assert!(matches!(result, Err(AppError::Conflict(message)) if message == "Email in use"));
        assert_eq!(fixture.repository.stored_user("ann@example.com").unwrap().name, "Ann");
    }

    #[tokio::test]
    async fn email_uniqueness_is_case_sensitive() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        assert!(service.register("Ann", "Ann@example.com", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn login_then_validate_returns_same_user() {
        let fixture = Fixture::new();
        let service = fixture.service();
        let registered = service.register("Ann", "ann@example.com", "secret123").await.unwrap();

        let (issued, user) = service.login("ann@example.com", "secret123").await.unwrap();
        assert_eq!(user, registered);

        let validated = service.validate_access(&issued.access_token).await.unwrap();
        assert_eq!(validated, registered);
        let json = serde_json::to_value(&validated).unwrap();
        assert!(json.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn login_sets_expiries_from_config() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();

        let before = Utc::now();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();
        let after = Utc::now();

        let access = TimeDelta::seconds(fixture.config.access_token_ttl_seconds);
        let refresh = TimeDelta::seconds(fixture.config.refresh_token_ttl_seconds);
        assert!(issued.session.access_token_expires_at >= before + access);
        assert!(issued.session.access_token_expires_at <= after + access);
        assert!(issued.session.refresh_token_expires_at >= before + refresh);
        assert!(issued.session.refresh_token_expires_at <= after + refresh);
    }

    #[tokio::test]
    async fn stored_session_holds_only_token_digests() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        assert_eq!(issued.session.access_token_hash, hash_token(&issued.access_token));
        assert_eq!(issued.session.refresh_token_hash, hash_token(&issued.refresh_token));
        assert_ne!(issued.session.access_token_hash, issued.access_token);
        assert_ne!(issued.access_token, issued.refresh_token);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();

        let wrong_password = service.login("ann@example.com", "secret124").await.unwrap_err();
        let unknown_email = service.login("bob@example.com", "secret123").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn repeated_logins_leave_exactly_one_session() {
        let fixture = Fixture::new();
        let service = fixture.service();
        let user = service.register("Ann", "ann@example.com", "secret123").await.unwrap();

        for _ in 0..4 {
            service.login("ann@example.com", "secret123").await.unwrap();
        }

        assert_eq!(fixture.repository.session_count_for_user(&user.id), 1);
    }

    #[tokio::test]
    async fn second_login_revokes_first_session() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();

        let (first, _) = service.login("ann@example.com", "secret123").await.unwrap();
        let (second, _) = service.login("ann@example.com", "secret123").await.unwrap();

        assert!(matches!(service.validate_access(&first.access_token).await, Err(AppError::Unauthorized)));
        assert!(matches!(
            service.refresh(&first.session.id, &first.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
        assert!(service.validate_access(&second.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected_while_row_remains() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        fixture.repository.expire_session(&issued.session.id, true, false);

        assert!(matches!(service.validate_access(&issued.access_token).await, Err(AppError::Unauthorized)));
        assert!(fixture.repository.session_exists(&issued.session.id));
    }

    #[tokio::test]
    async fn expired_access_token_can_still_be_refreshed() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        fixture.repository.expire_session(&issued.session.id, true, false);

        let refreshed = service.refresh(&issued.session.id, &issued.refresh_token).await.unwrap();
        assert!(service.validate_access(&refreshed.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_access_token_is_rejected() {
        let fixture = Fixture::new();
        assert!(matches!(fixture.service().validate_access(&generate_token()).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn access_token_of_deleted_user_is_rejected() {
        let fixture = Fixture::new();
        let service = fixture.service();
        let user = service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        fixture.repository.remove_user(&user.id);

        assert!(matches!(service.validate_access(&issued.access_token).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn refresh_rotates_the_whole_session() {
        let fixture = Fixture::new();
        let service = fixture.service();
        let user = service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        let refreshed = service.refresh(&issued.session.id, &issued.refresh_token).await.unwrap();

        assert_ne!(refreshed.session.id, issued.session.id);
        assert_ne!(refreshed.access_token, issued.access_token);
        assert_ne!(refreshed.refresh_token, issued.refresh_token);
        assert_eq!(refreshed.session.user_id, user.id);
        assert!(!fixture.repository.session_exists(&issued.session.id));
        assert!(matches!(service.validate_access(&issued.access_token).await, Err(AppError::Unauthorized)));
        assert_eq!(fixture.repository.session_count_for_user(&user.id), 1);
    }

    #[tokio::test]
    async fn refresh_token_is_single_use() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        assert!(service.refresh(&issued.session.id, &issued.refresh_token).await.is_ok());
        assert!(matches!(
            service.refresh(&issued.session.id, &issued.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        fixture.repository.expire_session(&issued.session.id, true, true);

        assert!(matches!(
            service.refresh(&issued.session.id, &issued.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn refresh_requires_matching_id_and_token() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        service.register("Bob", "bob@example.com", "secret123").await.unwrap();
        let (ann, _) = service.login("ann@example.com", "secret123").await.unwrap();
        let (bob, _) = service.login("bob@example.com", "secret123").await.unwrap();

        assert!(matches!(service.refresh(&ann.session.id, &bob.refresh_token).await, Err(AppError::Unauthorized)));
        assert!(matches!(service.refresh(&ann.session.id, &ann.access_token).await, Err(AppError::Unauthorized)));
        assert!(matches!(service.refresh(&Uuid::new_v4(), &ann.refresh_token).await, Err(AppError::Unauthorized)));
        assert!(fixture.repository.session_exists(&ann.session.id));
    }

    #[tokio::test]
    async fn logout_revokes_session_once() {
        let fixture = Fixture::new();
        let service = fixture.service();
        service.register("Ann", "ann@example.com", "secret123").await.unwrap();
        let (issued, _) = service.login("ann@example.com", "secret123").await.unwrap();

        service.logout(&issued.session.id).await.unwrap();
        assert!(matches!(service.validate_access(&issued.access_token).await, Err(AppError::Unauthorized)));

        let second = service.logout(&issued.session.id).await;
        assert!(matches!(second, Err(AppError::NotFound(message)) if message == "Session not found"));
    }

    #[test]
    fn out_of_range_ttl_is_a_configuration_error() {
        assert!(matches!(expiry_after(Utc::now(), i64::MAX), Err(AppError::Configuration(_))));
    }

    #[test]
    fn token_digest_is_sha256_hex() {
        let digest = hash_token("token");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, hash_token("token"));
    }

    proptest! {
        #[test]
        fn generated_tokens_are_url_safe_and_carry_32_bytes(_seed in 0u8..16) {
            let token = generate_token();
            prop_assert_eq!(token.len(), 43);
            prop_assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            prop_assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), TOKEN_BYTES);
        }

        #[test]
        fn distinct_tokens_have_distinct_digests(a in "[A-Za-z0-9_-]{43}", b in "[A-Za-z0-9_-]{43}") {
            prop_assume!(a != b);
            prop_assert_ne!(hash_token(&a), hash_token(&b));
        }
    }
}
