//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::PaperCategory;
use crate::errors::AppError;
use crate::moderation::PaperStatus;
use crate::store::PaperRecord;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub abstract_text: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text")]
    pub university: String,

    #[sea_orm(column_type = "Text")]
    pub field_of_study: String,

    /// Ordered author names as a JSONB array
    #[sea_orm(column_type = "JsonBinary")]
    pub authors: Json,

    pub author_id: Option<Uuid>,

    /// Keywords as a JSONB array
    #[sea_orm(column_type = "JsonBinary")]
    pub keywords: Json,

    /// Opaque blob-store reference
    #[sea_orm(column_type = "Text")]
    pub pdf_url: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    pub published_at: Option<Date>,

    pub like_count: i64,

    pub download_count: i64,

    /// Content fingerprint for resubmission dedupe
    #[sea_orm(column_type = "Text", nullable)]
    pub submission_key: Option<String>,

    pub submitted_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Convert into the domain record handed to the services
    pub fn into_record(self) -> crate::errors::Result<PaperRecord> {
        let category: PaperCategory =
            self.category.parse().map_err(|_| AppError::Internal {
                message: format!("stored category '{}' is invalid", self.category),
            })?;
        let status: PaperStatus = self.status.parse().map_err(|_| AppError::Internal {
            message: format!("stored status '{}' is invalid", self.status),
        })?;

        Ok(PaperRecord {
            id: self.id,
            title: self.title,
            abstract_text: self.abstract_text,
            category,
            status,
            university: self.university,
            field_of_study: self.field_of_study,
            authors: string_list(&self.authors),
            author_id: self.author_id,
            keywords: string_list(&self.keywords),
            pdf_url: self.pdf_url,
            doi: self.doi,
            published_at: self.published_at,
            like_count: self.like_count.max(0) as u64,
            download_count: self.download_count.max(0) as u64,
            submitted_at: self.submitted_at.into(),
        })
    }
}

/// Decode a JSONB array of strings, dropping anything else
fn string_list(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::moderation_event::Entity")]
    ModerationEvents,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::moderation_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModerationEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
