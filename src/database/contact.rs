use crate::database::error::StoreError;
use crate::database::postgres_repository::PostgresRepository;
use crate::models::contact::{Contact, ContactFilter, ContactPatchRequest, ContactQuery, ContactRequest, ContactType};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

const CONTACT_COLUMNS: &str = "id, user_id, name, phone_number, email, is_favourite, contact_type, created_at, updated_at";

// Intermediate struct for sqlx query results with contact_type as text
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    phone_number: String,
    email: String,
    is_favourite: bool,
    contact_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = StoreError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        Ok(Contact {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            phone_number: row.phone_number,
            email: row.email,
            is_favourite: row.is_favourite,
            contact_type: row.contact_type.parse::<ContactType>().map_err(StoreError::Decode)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Contact store. Every method is scoped by the owning user's id.
#[async_trait::async_trait]
pub trait ContactRepository {
    async fn create_contact(&self, request: &ContactRequest, user_id: &Uuid) -> Result<Contact, StoreError>;
    async fn get_contact_by_id(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<Contact>, StoreError>;
    async fn list_contacts(&self, query: &ContactQuery, user_id: &Uuid) -> Result<(Vec<Contact>, i64), StoreError>;
    async fn update_contact(&self, id: &Uuid, request: &ContactRequest, user_id: &Uuid) -> Result<Option<Contact>, StoreError>;
    async fn patch_contact(&self, id: &Uuid, patch: &ContactPatchRequest, user_id: &Uuid) -> Result<Option<Contact>, StoreError>;
    /// Returns whether a row was removed.
    async fn delete_contact(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, StoreError>;
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, user_id: &Uuid, filter: &ContactFilter) {
    builder.push(" WHERE user_id = ").push_bind(*user_id);

    if let Some(contact_type) = filter.contact_type {
        builder.push(" AND contact_type = ").push_bind(contact_type.as_db());
    }
    if let Some(is_favourite) = filter.is_favourite {
        builder.push(" AND is_favourite = ").push_bind(is_favourite);
    }
    if let Some(phone_number) = &filter.phone_number {
        builder.push(" AND phone_number = ").push_bind(phone_number.clone());
    }
    if let Some(name) = &filter.name {
        builder.push(" AND name ILIKE ").push_bind(format!("%{}%", escape_like(name)));
    }
}

#[async_trait::async_trait]
impl ContactRepository for PostgresRepository {
    async fn create_contact(&self, request: &ContactRequest, user_id: &Uuid) -> Result<Contact, StoreError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            INSERT INTO contacts (user_id, name, phone_number, email, is_favourite, contact_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&request.name)
        .bind(&request.phone_number)
        .bind(&request.email)
        .bind(request.is_favourite)
        .bind(request.contact_type.as_db())
        .fetch_one(&self.pool)
        .await?;

        Contact::try_from(row)
    }

    async fn get_contact_by_id(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<Contact>, StoreError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            SELECT {CONTACT_COLUMNS}
            FROM contacts
            WHERE id = $1
              AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Contact::try_from).transpose()
    }

    async fn list_contacts(&self, query: &ContactQuery, user_id: &Uuid) -> Result<(Vec<Contact>, i64), StoreError> {
        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM contacts");
        push_scope(&mut count_builder, user_id, &query.filter);
        let (total,): (i64,) = count_builder.build_query_as().fetch_one(&self.pool).await?;

        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {CONTACT_COLUMNS} FROM contacts"));
        push_scope(&mut builder, user_id, &query.filter);

        // Safe from SQL injection: column and direction come from controlled enums
        let direction = query.sort_order.as_sql();
        builder.push(format!(" ORDER BY {} {}, id {}", query.sort_by.column(), direction, direction));
        builder.push(" LIMIT ").push_bind(query.pagination.limit());
        builder.push(" OFFSET ").push_bind(query.pagination.offset());

        let rows = builder.build_query_as::<ContactRow>().fetch_all(&self.pool).await?;
        let contacts = rows.into_iter().map(Contact::try_from).collect::<Result<Vec<_>, _>>()?;

        Ok((contacts, total))
    }

    async fn update_contact(&self, id: &Uuid, request: &ContactRequest, user_id: &Uuid) -> Result<Option<Contact>, StoreError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            UPDATE contacts
            SET name = $1, phone_number = $2, email = $3, is_favourite = $4, contact_type = $5, updated_at = now()
            WHERE id = $6
              AND user_id = $7
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(&request.phone_number)
        .bind(&request.email)
        .bind(request.is_favourite)
        .bind(request.contact_type.as_db())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Contact::try_from).transpose()
    }

    async fn patch_contact(&self, id: &Uuid, patch: &ContactPatchRequest, user_id: &Uuid) -> Result<Option<Contact>, StoreError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r#"
            UPDATE contacts
            SET name = COALESCE($1, name),
                phone_number = COALESCE($2, phone_number),
                email = COALESCE($3, email),
                is_favourite = COALESCE($4, is_favourite),
                contact_type = COALESCE($5, contact_type),
                updated_at = now()
            WHERE id = $6
              AND user_id = $7
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(&patch.name)
        .bind(&patch.phone_number)
        .bind(&patch.email)
        .bind(patch.is_favourite)
        .bind(patch.contact_type.map(|contact_type| contact_type.as_db()))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Contact::try_from).transpose()
    }

    async fn delete_contact(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
