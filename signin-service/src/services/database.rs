//! PostgreSQL identity store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use super::identity_store::IdentityStore;
use super::StoreError;
use crate::models::{AuxiliaryFields, Identity, NewIdentity, Ticket, TicketValue};

const SELECT_IDENTITY: &str = r#"
    SELECT id, email, display_name, avatar_url, locale, default_role, roles, disabled,
           email_verified, password_hash, ticket, ticket_expires_at, metadata,
           phone_number, phone_number_verified, new_email, otp_method_last_used, otp_hash,
           otp_hash_expires_at, totp_secret, active_mfa_type, webauthn_current_challenge,
           is_anonymous, last_seen, created_at, updated_at
    FROM users
"#;

#[derive(Debug, FromRow)]
struct IdentityRow {
    id: Uuid,
    email: Option<String>,
    display_name: String,
    avatar_url: String,
    locale: String,
    default_role: String,
    roles: Vec<String>,
    disabled: bool,
    email_verified: bool,
    password_hash: Option<String>,
    ticket: Option<String>,
    ticket_expires_at: Option<DateTime<Utc>>,
    metadata: Option<serde_json::Value>,
    phone_number: Option<String>,
    phone_number_verified: bool,
    new_email: Option<String>,
    otp_method_last_used: Option<String>,
    otp_hash: Option<String>,
    otp_hash_expires_at: Option<DateTime<Utc>>,
    totp_secret: Option<String>,
    active_mfa_type: Option<String>,
    webauthn_current_challenge: Option<String>,
    is_anonymous: bool,
    last_seen: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        // The ticket column is shared with other flows; a value this service
        // cannot read is treated as no pending ticket and gets overwritten.
        let ticket = match (row.ticket, row.ticket_expires_at) {
            (Some(raw), Some(expires_at)) => match raw.parse::<TicketValue>() {
                Ok(value) => Some(Ticket { value, expires_at }),
                Err(e) => {
                    tracing::warn!(user_id = %row.id, error = %e, "Ignoring unreadable stored ticket");
                    None
                }
            },
            _ => None,
        };

        Identity {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            locale: row.locale,
            default_role: row.default_role,
            roles: row.roles,
            disabled: row.disabled,
            email_verified: row.email_verified,
            password_hash: row.password_hash,
            ticket,
            metadata: row.metadata.unwrap_or(serde_json::Value::Null),
            auxiliary: AuxiliaryFields {
                phone_number: row.phone_number,
                phone_number_verified: row.phone_number_verified,
                new_email: row.new_email,
                otp_method_last_used: row.otp_method_last_used,
                otp_hash: row.otp_hash,
                otp_hash_expires_at: row.otp_hash_expires_at,
                totp_secret: row.totp_secret,
                active_mfa_type: row.active_mfa_type,
                webauthn_current_challenge: row.webauthn_current_challenge,
                is_anonymous: row.is_anonymous,
                last_seen: row.last_seen,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Identity store backed by the `users` table.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    #[tracing::instrument(skip_all)]
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "{} WHERE LOWER(email) = LOWER($1)",
            SELECT_IDENTITY
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Identity::from))
    }

    #[tracing::instrument(skip_all)]
    async fn create(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            INSERT INTO users (id, email, display_name, avatar_url, locale, default_role, roles,
                               disabled, email_verified, password_hash, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, email, display_name, avatar_url, locale, default_role, roles, disabled,
                      email_verified, password_hash, ticket, ticket_expires_at, metadata,
                      phone_number, phone_number_verified, new_email, otp_method_last_used,
                      otp_hash, otp_hash_expires_at, totp_secret, active_mfa_type,
                      webauthn_current_challenge, is_anonymous, last_seen, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.display_name)
        .bind(&new.avatar_url)
        .bind(&new.locale)
        .bind(&new.default_role)
        .bind(&new.roles)
        .bind(new.disabled)
        .bind(new.email_verified)
        .bind(&new.password_hash)
        .bind(&new.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(Identity::from(row))
    }

    #[tracing::instrument(skip_all, fields(user_id = %id))]
    async fn set_pending_ticket(&self, id: Uuid, ticket: &Ticket) -> Result<Uuid, StoreError> {
        let updated: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET ticket = $2, ticket_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(ticket.render())
        .bind(ticket.expires_at)
        .fetch_optional(&self.pool)
        .await?;

        updated.map(|(id,)| id).ok_or(StoreError::NotFound)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            StoreError::Database(e)
        })?;
        Ok(())
    }
}
