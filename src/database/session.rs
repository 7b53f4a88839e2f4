use crate::database::error::StoreError;
use crate::database::postgres_repository::PostgresRepository;
use crate::models::session::{NewSession, Session};
use uuid::Uuid;

/// Session store. Tokens only ever reach it as SHA-256 digests.
#[async_trait::async_trait]
pub trait SessionRepository {
    async fn create_session(&self, session: &NewSession) -> Result<Session, StoreError>;
    async fn find_session_by_access_token(&self, access_token_hash: &str) -> Result<Option<Session>, StoreError>;
    /// Looks up a session matching both the id and the refresh token digest.
    async fn find_session_for_refresh(&self, session_id: &Uuid, refresh_token_hash: &str) -> Result<Option<Session>, StoreError>;
    /// Returns whether a row was removed.
    async fn delete_session(&self, session_id: &Uuid) -> Result<bool, StoreError>;
    async fn delete_sessions_for_user(&self, user_id: &Uuid) -> Result<u64, StoreError>;
}

#[async_trait::async_trait]
impl SessionRepository for PostgresRepository {
    async fn create_session(&self, session: &NewSession) -> Result<Session, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO user_session (user_id, access_token_hash, refresh_token_hash, access_token_expires_at, refresh_token_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, access_token_hash, refresh_token_hash, access_token_expires_at, refresh_token_expires_at, created_at
            "#,
        )
        .bind(session.user_id)
        .bind(&session.access_token_hash)
        .bind(&session.refresh_token_hash)
        .bind(session.access_token_expires_at)
        .bind(session.refresh_token_expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_session_by_access_token(&self, access_token_hash: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, access_token_hash, refresh_token_hash, access_token_expires_at, refresh_token_expires_at, created_at
            FROM user_session
            WHERE access_token_hash = $1
            "#,
        )
        .bind(access_token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_session_for_refresh(&self, session_id: &Uuid, refresh_token_hash: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, access_token_hash, refresh_token_hash, access_token_expires_at, refresh_token_expires_at, created_at
            FROM user_session
            WHERE id = $1
              AND refresh_token_hash = $2
            "#,
        )
        .bind(session_id)
        .bind(refresh_token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_session(&self, session_id: &Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_session WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_sessions_for_user(&self, user_id: &Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM user_session WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
