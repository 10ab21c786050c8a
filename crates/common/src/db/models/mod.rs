//! SeaORM entity models
//!
//! Database entities for the Scholarport portal

mod comment;
mod moderation_event;
mod paper;
mod user;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use comment::{
    Entity as CommentEntity,
    Model as Comment,
    ActiveModel as CommentActiveModel,
    Column as CommentColumn,
};

pub use moderation_event::{
    Entity as ModerationEventEntity,
    Model as ModerationEvent,
    ActiveModel as ModerationEventActiveModel,
    Column as ModerationEventColumn,
};
