//! HTTP API handlers for resumo-server

pub mod access;
pub mod auth;
pub mod events;
pub mod gamification;
pub mod health;
pub mod items;
pub mod media;
pub mod preferences;
pub mod progress;
pub mod quiz;
pub mod recommendations;
pub mod sync_map;

pub use health::health_routes;
