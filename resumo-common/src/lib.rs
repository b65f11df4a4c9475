//! # Resumo Common Library
//!
//! Shared code for the Resumo reading service and its admin tooling:
//! - Database initialization, migrations, models and settings
//! - Configuration resolution
//! - Password and session-token hashing
//! - Domain rules (access decisions, sync maps, gamification,
//!   recommendation ranking, media file names, validation errors)

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gamification;
pub mod media;
pub mod recommend;
pub mod sync_map;
pub mod time;
pub mod uuid_utils;
pub mod validation;

pub use error::{Error, Result};
