//! Database models and queries

pub mod init;
pub mod migrations;
pub mod models;
pub mod settings;

pub use init::{init_database, init_in_memory, prepare_database, TABLES};
pub use migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
pub use models::*;
