//! Request handlers for the gateway

pub mod catalog;
pub mod comments;
pub mod health;
pub mod moderation;
pub mod papers;
pub mod users;
