//! Server-side database queries
//!
//! Schema, models and settings live in `resumo_common::db`; this module
//! holds the queries behind each endpoint and maintenance command.

pub mod access;
pub mod audit;
pub mod events;
pub mod gamification;
pub mod items;
pub mod preferences;
pub mod progress;
pub mod quiz;
pub mod recommendations;
pub mod sessions;
pub mod sync_maps;
pub mod users;
