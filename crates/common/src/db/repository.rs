//! Repository pattern for database operations
//!
//! The PostgreSQL adapter behind the `PaperStore` contract, plus the
//! portal's user and comment operations. Equality filters go through the
//! query builder; the substring term match drops to raw SQL so it can
//! ILIKE over the JSONB authors column server-side.

use crate::catalog::PageRequest;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::moderation::{ModerationTransition, PaperStatus};
use crate::store::{NewPaper, PaperFilter, PaperRecord, PaperStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait, Value,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment joined with its author's display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub body: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields stored when a user account is first seen
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Subject id assigned by the external auth provider
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub university: String,
    pub department: String,
}

/// One row of the admin dashboard status breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: PaperStatus,
    pub count: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Create a new paper in `pending` status
    pub async fn create_paper(&self, new: NewPaper) -> Result<PaperRecord> {
        let now = Utc::now();

        let paper = PaperActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(new.title),
            abstract_text: Set(new.abstract_text),
            category: Set(new.category.as_str().to_string()),
            status: Set(PaperStatus::Pending.as_str().to_string()),
            university: Set(new.university),
            field_of_study: Set(new.field_of_study),
            authors: Set(serde_json::json!(new.authors)),
            author_id: Set(new.author_id),
            keywords: Set(serde_json::json!(new.keywords)),
            pdf_url: Set(new.pdf_url),
            doi: Set(new.doi),
            published_at: Set(new.published_at),
            like_count: Set(0),
            download_count: Set(0),
            submission_key: Set(new.submission_key),
            submitted_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        paper.insert(self.write_conn()).await?.into_record()
    }

    /// Find a paper by its submission fingerprint
    pub async fn find_by_submission_key(&self, key: &str) -> Result<Option<PaperRecord>> {
        PaperEntity::find()
            .filter(PaperColumn::SubmissionKey.eq(key))
            .one(self.read_conn())
            .await?
            .map(Paper::into_record)
            .transpose()
    }

    /// Delete a paper (explicit admin action)
    pub async fn delete_paper(&self, id: Uuid) -> Result<bool> {
        let result = PaperEntity::delete_by_id(id).exec(self.write_conn()).await?;

        Ok(result.rows_affected > 0)
    }

    /// Bump the like counter, returning the new value
    pub async fn increment_likes(&self, id: Uuid) -> Result<u64> {
        self.increment_counter(id, "like_count").await
    }

    /// Bump the download counter, returning the new value
    pub async fn increment_downloads(&self, id: Uuid) -> Result<u64> {
        self.increment_counter(id, "download_count").await
    }

    async fn increment_counter(&self, id: Uuid, column: &str) -> Result<u64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "UPDATE papers SET {column} = {column} + 1, updated_at = NOW() \
                 WHERE id = $1 RETURNING {column}"
            ),
            vec![id.into()],
        );

        let row = self
            .write_conn()
            .query_one(stmt)
            .await?
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;

        let count: i64 = row.try_get_by_index(0).map_err(|e| AppError::Internal {
            message: format!("Failed to read counter: {}", e),
        })?;
        Ok(count.max(0) as u64)
    }

    /// Paper counts grouped by status, for the admin dashboard
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            "SELECT status, COUNT(*) FROM papers GROUP BY status",
        );

        let mut counts = Vec::new();
        for row in self.read_conn().query_all(stmt).await? {
            let status: String = row.try_get_by_index(0).map_err(|e| AppError::Internal {
                message: format!("Failed to read status: {}", e),
            })?;
            let count: i64 = row.try_get_by_index(1).map_err(|e| AppError::Internal {
                message: format!("Failed to read count: {}", e),
            })?;

            counts.push(StatusCount {
                status: status.parse().map_err(|_| AppError::Internal {
                    message: format!("stored status '{}' is invalid", status),
                })?,
                count: count.max(0) as u64,
            });
        }

        Ok(counts)
    }

    async fn find_papers_with_term(
        &self,
        term: &str,
        filter: &PaperFilter,
        page: PageRequest,
    ) -> Result<(Vec<PaperRecord>, u64)> {
        let mut clauses =
            vec!["(p.title ILIKE $1 OR p.university ILIKE $1 OR p.authors::text ILIKE $1)"
                .to_string()];
        let mut values: Vec<Value> = vec![like_pattern(term).into()];

        if let Some(category) = filter.category {
            values.push(category.as_str().into());
            clauses.push(format!("p.category = ${}", values.len()));
        }
        if let Some(status) = filter.status {
            values.push(status.as_str().into());
            clauses.push(format!("p.status = ${}", values.len()));
        }
        if let Some(author_id) = filter.author_id {
            values.push(author_id.into());
            clauses.push(format!("p.author_id = ${}", values.len()));
        }

        let where_clause = clauses.join(" AND ");

        let count_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!("SELECT COUNT(*) FROM papers p WHERE {}", where_clause),
            values.clone(),
        );
        let total: i64 = self
            .read_conn()
            .query_one(count_stmt)
            .await?
            .and_then(|row| row.try_get_by_index(0).ok())
            .unwrap_or(0);

        let limit_param = values.len() + 1;
        let offset_param = values.len() + 2;
        values.push(i64::from(page.page_size).into());
        values.push((page.offset() as i64).into());

        let select_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "SELECT p.* FROM papers p WHERE {} \
                 ORDER BY p.submitted_at ASC, p.id ASC LIMIT ${} OFFSET ${}",
                where_clause, limit_param, offset_param
            ),
            values,
        );

        let records = PaperEntity::find()
            .from_raw_sql(select_stmt)
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(Paper::into_record)
            .collect::<Result<Vec<_>>>()?;

        Ok((records, total.max(0) as u64))
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// Comments on a paper with author names, oldest first
    pub async fn list_comments(&self, paper_id: Uuid) -> Result<Vec<CommentView>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                c.id,
                c.paper_id,
                c.user_id,
                u.name AS user_name,
                c.body,
                c.like_count,
                c.created_at
            FROM comments c
            JOIN users u ON c.user_id = u.id
            WHERE c.paper_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
            vec![paper_id.into()],
        );

        let results = self
            .read_conn()
            .query_all(stmt)
            .await?
            .into_iter()
            .filter_map(|row| {
                Some(CommentView {
                    id: row.try_get_by_index::<Uuid>(0).ok()?,
                    paper_id: row.try_get_by_index::<Uuid>(1).ok()?,
                    user_id: row.try_get_by_index::<Uuid>(2).ok()?,
                    user_name: row.try_get_by_index::<String>(3).ok()?,
                    body: row.try_get_by_index::<String>(4).ok()?,
                    like_count: row.try_get_by_index::<i64>(5).ok()?,
                    created_at: row
                        .try_get_by_index::<chrono::DateTime<chrono::FixedOffset>>(6)
                        .ok()?
                        .into(),
                })
            })
            .collect();

        Ok(results)
    }

    /// Add a comment to a paper
    pub async fn add_comment(&self, paper_id: Uuid, user_id: Uuid, body: String) -> Result<Comment> {
        let comment = CommentActiveModel {
            id: Set(Uuid::new_v4()),
            paper_id: Set(paper_id),
            user_id: Set(user_id),
            body: Set(body),
            like_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        comment.insert(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a user profile row for an account the auth provider has
    /// just registered
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let user = UserActiveModel {
            id: Set(new.id),
            name: Set(new.name),
            email: Set(new.email),
            university: Set(new.university),
            department: Set(new.department),
            role: Set("user".to_string()),
            is_active: Set(true),
            joined_at: Set(Utc::now().into()),
        };

        user.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Admin user listing with optional term (name/email/university) and
    /// active-flag filters
    pub async fn list_users(
        &self,
        term: Option<&str>,
        active: Option<bool>,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64)> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            values.push(like_pattern(term).into());
            clauses.push(format!(
                "(u.name ILIKE ${n} OR u.email ILIKE ${n} OR u.university ILIKE ${n})",
                n = values.len()
            ));
        }
        if let Some(active) = active {
            values.push(active.into());
            clauses.push(format!("u.is_active = ${}", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            "TRUE".to_string()
        } else {
            clauses.join(" AND ")
        };

        let count_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!("SELECT COUNT(*) FROM users u WHERE {}", where_clause),
            values.clone(),
        );
        let total: i64 = self
            .read_conn()
            .query_one(count_stmt)
            .await?
            .and_then(|row| row.try_get_by_index(0).ok())
            .unwrap_or(0);

        let limit_param = values.len() + 1;
        let offset_param = values.len() + 2;
        values.push(i64::from(page.page_size).into());
        values.push((page.offset() as i64).into());

        let select_stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "SELECT u.* FROM users u WHERE {} \
                 ORDER BY u.joined_at ASC, u.id ASC LIMIT ${} OFFSET ${}",
                where_clause, limit_param, offset_param
            ),
            values,
        );

        let users = UserEntity::find()
            .from_raw_sql(select_stmt)
            .all(self.read_conn())
            .await?;

        Ok((users, total.max(0) as u64))
    }

    /// Activate or deactivate a user account
    pub async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User> {
        let mut user: UserActiveModel = UserEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::UserNotFound { id: id.to_string() })?
            .into();

        user.is_active = Set(active);
        user.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Total registered users, for the admin dashboard
    pub async fn count_users(&self) -> Result<u64> {
        UserEntity::find()
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Papers submitted by one user (any status)
    pub async fn count_papers_by_author(&self, author_id: Uuid) -> Result<u64> {
        PaperEntity::find()
            .filter(PaperColumn::AuthorId.eq(author_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

// ============================================================================
// PaperStore contract
// ============================================================================

#[async_trait]
impl PaperStore for Repository {
    async fn find_paper(&self, id: Uuid) -> Result<Option<PaperRecord>> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .map(Paper::into_record)
            .transpose()
    }

    async fn find_papers(
        &self,
        filter: &PaperFilter,
        page: PageRequest,
    ) -> Result<(Vec<PaperRecord>, u64)> {
        // The substring term needs raw SQL; everything else stays in the
        // query builder.
        if let Some(ref term) = filter.term {
            return self.find_papers_with_term(term, filter, page).await;
        }

        let mut query = PaperEntity::find();
        if let Some(category) = filter.category {
            query = query.filter(PaperColumn::Category.eq(category.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(PaperColumn::Status.eq(status.as_str()));
        }
        if let Some(author_id) = filter.author_id {
            query = query.filter(PaperColumn::AuthorId.eq(author_id));
        }

        let paginator = query
            .order_by_asc(PaperColumn::SubmittedAt)
            .order_by_asc(PaperColumn::Id)
            .paginate(self.read_conn(), u64::from(page.page_size));

        let total = paginator.num_items().await?;
        let records = paginator
            .fetch_page(u64::from(page.page - 1))
            .await?
            .into_iter()
            .map(Paper::into_record)
            .collect::<Result<Vec<_>>>()?;

        Ok((records, total))
    }

    async fn count_papers(&self, filter: &PaperFilter) -> Result<u64> {
        if filter.term.is_some() {
            let (_, total) = self.find_papers(filter, PageRequest::first()).await?;
            return Ok(total);
        }

        let mut query = PaperEntity::find();
        if let Some(category) = filter.category {
            query = query.filter(PaperColumn::Category.eq(category.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(PaperColumn::Status.eq(status.as_str()));
        }
        if let Some(author_id) = filter.author_id {
            query = query.filter(PaperColumn::AuthorId.eq(author_id));
        }

        query.count(self.read_conn()).await.map_err(Into::into)
    }

    async fn apply_transition(&self, transition: &ModerationTransition) -> Result<PaperRecord> {
        // Status update and audit insert commit together or not at all.
        let txn = self.write_conn().begin().await?;

        let paper = PaperEntity::find_by_id(transition.paper_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                id: transition.paper_id.to_string(),
            })?;

        let mut paper: PaperActiveModel = paper.into();
        paper.status = Set(transition.to_status.as_str().to_string());
        paper.updated_at = Set(Utc::now().into());
        let updated = paper.update(&txn).await?;

        let event = ModerationEventActiveModel {
            id: Set(transition.id),
            paper_id: Set(transition.paper_id),
            from_status: Set(transition.from_status.as_str().to_string()),
            to_status: Set(transition.to_status.as_str().to_string()),
            actor: Set(transition.actor.clone()),
            occurred_at: Set(transition.occurred_at.into()),
        };
        event.insert(&txn).await?;

        txn.commit().await?;

        updated.into_record()
    }

    async fn transitions_for(&self, paper_id: Uuid) -> Result<Vec<ModerationTransition>> {
        ModerationEventEntity::find()
            .filter(ModerationEventColumn::PaperId.eq(paper_id))
            .order_by_asc(ModerationEventColumn::OccurredAt)
            .order_by_asc(ModerationEventColumn::Id)
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(ModerationEvent::into_transition)
            .collect()
    }
}

/// Escape LIKE wildcards in user input and wrap for substring match
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ai"), "%ai%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c\\d"), "%c\\\\d%");
    }
}
