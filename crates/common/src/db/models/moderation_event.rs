//! Moderation audit entity
//!
//! Append-only: rows are inserted in the same transaction as the status
//! update they record, and never updated afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::moderation::ModerationTransition;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub paper_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub from_status: String,

    #[sea_orm(column_type = "Text")]
    pub to_status: String,

    /// Admin identifier the action is attributed to
    #[sea_orm(column_type = "Text")]
    pub actor: String,

    pub occurred_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn into_transition(self) -> crate::errors::Result<ModerationTransition> {
        let from_status = self.from_status.parse().map_err(|_| AppError::Internal {
            message: format!("stored status '{}' is invalid", self.from_status),
        })?;
        let to_status = self.to_status.parse().map_err(|_| AppError::Internal {
            message: format!("stored status '{}' is invalid", self.to_status),
        })?;

        Ok(ModerationTransition {
            id: self.id,
            paper_id: self.paper_id,
            from_status,
            to_status,
            actor: self.actor,
            occurred_at: self.occurred_at.into(),
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id"
    )]
    Paper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
