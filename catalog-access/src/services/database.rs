//! Data store collaborator: the trait the access core reads through, and its
//! PostgreSQL implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use super::ServiceError;
use crate::models::{FileId, Group, GroupId, IdentityId, KeywordId, RecordId, Role, TagId};

/// Every query the access core issues. Implementations bind values only;
/// "not found" is an empty or `None` result, never an error.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn lookup_identity_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<IdentityId>, ServiceError>;

    async fn lookup_shared_secret(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<SecretString>, ServiceError>;

    /// Missing identities resolve to [`Role::Normal`].
    async fn lookup_role(&self, identity_id: IdentityId) -> Result<Role, ServiceError>;

    async fn lookup_groups_of_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<GroupId>, ServiceError>;

    async fn lookup_groups_of_record(&self, record_id: RecordId)
        -> Result<Vec<GroupId>, ServiceError>;

    /// Tag-keyword links under `tag_id` whose keyword matches `pattern`:
    /// case-sensitive prefix, or case-insensitive equality when `exact`.
    async fn lookup_keyword_matches(
        &self,
        tag_id: TagId,
        pattern: &str,
        exact: bool,
    ) -> Result<Vec<KeywordId>, ServiceError>;

    async fn lookup_records_by_keyword_ids(
        &self,
        keyword_ids: &[KeywordId],
    ) -> Result<Vec<RecordId>, ServiceError>;

    /// All records tagged under `tag_id`, at most `limit` of them.
    async fn lookup_records_by_tag(
        &self,
        tag_id: TagId,
        limit: Option<i64>,
    ) -> Result<Vec<RecordId>, ServiceError>;

    async fn lookup_ip_allow_list(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<String>, ServiceError>;

    async fn lookup_records_of_file(&self, file_id: FileId) -> Result<Vec<RecordId>, ServiceError>;

    /// Groups ordered by name; `None` lists every group.
    async fn lookup_groups(&self, ids: Option<&[GroupId]>) -> Result<Vec<Group>, ServiceError>;

    async fn record_login_attempt(
        &self,
        identity_id: IdentityId,
        remote_ip: &str,
        success: bool,
    ) -> Result<(), ServiceError>;
}

/// Escape `LIKE` metacharacters so user text is always matched literally.
pub(crate) fn like_prefix(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 1);
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// PostgreSQL-backed data store.
#[derive(Clone)]
pub struct PgDataStore {
    pool: PgPool,
}

impl PgDataStore {
    #[instrument(skip(database_url))]
    pub async fn connect(
        database_url: &SecretString,
        max_connections: u32,
    ) -> Result<Self, ServiceError> {
        info!(max_connections = max_connections, "Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url.expose_secret())
            .await?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DataStore for PgDataStore {
    #[instrument(skip(self, api_key))]
    async fn lookup_identity_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<IdentityId>, ServiceError> {
        let id = sqlx::query_scalar::<_, IdentityId>(
            "SELECT persons.id FROM persons WHERE persons.public_uuid = $1",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn lookup_shared_secret(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<SecretString>, ServiceError> {
        let secret = sqlx::query_scalar::<_, Option<String>>(
            "SELECT persons.api_key FROM persons WHERE persons.id = $1",
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        Ok(secret.map(SecretString::new))
    }

    #[instrument(skip(self))]
    async fn lookup_role(&self, identity_id: IdentityId) -> Result<Role, ServiceError> {
        let type_id = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT persons.user_type_id FROM persons WHERE persons.id = $1",
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        Ok(type_id.map(Role::from_type_id).unwrap_or(Role::Normal))
    }

    #[instrument(skip(self))]
    async fn lookup_groups_of_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<GroupId>, ServiceError> {
        let ids = sqlx::query_scalar::<_, GroupId>(
            "SELECT groups_persons.group_id FROM groups_persons WHERE groups_persons.person_id = $1",
        )
        .bind(identity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn lookup_groups_of_record(
        &self,
        record_id: RecordId,
    ) -> Result<Vec<GroupId>, ServiceError> {
        let ids = sqlx::query_scalar::<_, GroupId>(
            "SELECT groups_samples.group_id FROM groups_samples WHERE groups_samples.sample_id = $1",
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn lookup_keyword_matches(
        &self,
        tag_id: TagId,
        pattern: &str,
        exact: bool,
    ) -> Result<Vec<KeywordId>, ServiceError> {
        let (sql, bound) = if exact {
            (
                r#"
                SELECT DISTINCT tags_keywords_search.id
                FROM tags_keywords_search, keywords
                WHERE tags_keywords_search.keyword_id = keywords.id
                  AND tags_keywords_search.tag_id = $1
                  AND LOWER(keywords.name) = $2
                "#,
                pattern.to_lowercase(),
            )
        } else {
            (
                r#"
                SELECT DISTINCT tags_keywords_search.id
                FROM tags_keywords_search, keywords
                WHERE tags_keywords_search.keyword_id = keywords.id
                  AND tags_keywords_search.tag_id = $1
                  AND keywords.name LIKE $2 ESCAPE '\'
                "#,
                like_prefix(pattern),
            )
        };

        let ids = sqlx::query_scalar::<_, KeywordId>(sql)
            .bind(tag_id)
            .bind(bound)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    #[instrument(skip(self, keyword_ids), fields(keywords = keyword_ids.len()))]
    async fn lookup_records_by_keyword_ids(
        &self,
        keyword_ids: &[KeywordId],
    ) -> Result<Vec<RecordId>, ServiceError> {
        if keyword_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = sqlx::query_scalar::<_, RecordId>(
            r#"
            SELECT DISTINCT tags_samples_search.sample_id
            FROM tags_samples_search
            WHERE tags_samples_search.tag_keyword_search_id = ANY($1)
            "#,
        )
        .bind(keyword_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn lookup_records_by_tag(
        &self,
        tag_id: TagId,
        limit: Option<i64>,
    ) -> Result<Vec<RecordId>, ServiceError> {
        // LIMIT NULL is no limit.
        let ids = sqlx::query_scalar::<_, RecordId>(
            r#"
            SELECT DISTINCT tags_samples_search.sample_id
            FROM tags_samples_search, tags_keywords_search
            WHERE tags_samples_search.tag_keyword_search_id = tags_keywords_search.id
              AND tags_keywords_search.tag_id = $1
            ORDER BY tags_samples_search.sample_id
            LIMIT $2
            "#,
        )
        .bind(tag_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn lookup_ip_allow_list(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<String>, ServiceError> {
        let entries = sqlx::query_scalar::<_, String>(
            "SELECT login_ip_address.ip_address FROM login_ip_address WHERE login_ip_address.person_id = $1",
        )
        .bind(identity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn lookup_records_of_file(&self, file_id: FileId) -> Result<Vec<RecordId>, ServiceError> {
        let ids = sqlx::query_scalar::<_, RecordId>(
            "SELECT sample_files.sample_id FROM sample_files WHERE sample_files.vfs_id = $1",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn lookup_groups(&self, ids: Option<&[GroupId]>) -> Result<Vec<Group>, ServiceError> {
        let groups = match ids {
            Some(ids) => {
                sqlx::query_as::<_, Group>(
                    r#"
                    SELECT groups.id, groups.name, groups.color
                    FROM groups
                    WHERE groups.id = ANY($1)
                    ORDER BY groups.name
                    "#,
                )
                .bind(ids)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Group>(
                    "SELECT groups.id, groups.name, groups.color FROM groups ORDER BY groups.name",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(groups)
    }

    #[instrument(skip(self))]
    async fn record_login_attempt(
        &self,
        identity_id: IdentityId,
        remote_ip: &str,
        success: bool,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO login_attempts (person_id, ip_address, success) VALUES ($1, $2, $3)",
        )
        .bind(identity_id)
        .bind(remote_ip)
        .bind(success)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
