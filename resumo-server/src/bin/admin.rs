//! resumo-admin - maintenance commands for the resumo database

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resumo_common::config::{ConfigOverrides, ServerConfig};
use resumo_common::db::{get_schema_version, init_database, SubscriptionPlan, UserRole, UserStatus};
use resumo_server::maintenance;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "resumo-admin")]
#[command(about = "Maintenance commands for the resumo database")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (replaces the platform config lookup)
    #[arg(short, long, global = true, env = "RESUMO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the database and print its schema version
    Migrate,
    /// Insert or replace an item from a JSON file
    ImportItem { file: PathBuf },
    /// Delete an item and everything attached to it
    DeleteItem { slug: String },
    /// Remove expired sessions, orphaned rows and stale sync maps
    Cleanup {
        /// Report without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate audio/text sync maps for items with audio
    GenerateSyncMaps {
        /// Regenerate maps that are already current
        #[arg(long)]
        force: bool,
    },
    /// Change a user's subscription plan
    SetSubscription {
        email: String,
        plan: SubscriptionPlan,
        /// Premium expiry in days from now (default: no expiry)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Change a user's role
    SetRole { email: String, role: UserRole },
    /// Activate or block a user
    SetStatus { email: String, status: UserStatus },
    /// Rebuild gamification counters and badges from stored activity
    RecomputeGamification,
    /// Print row counts per table
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resumo_server=info,resumo_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ServerConfig::resolve(&ConfigOverrides {
        root_folder: args.root_folder,
        config_file: args.config,
        ..Default::default()
    })
    .context("Failed to resolve configuration")?;

    info!("Database: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Migrate => {
            let version = get_schema_version(&pool).await?;
            println!("Schema version: {}", version);
        }
        Command::ImportItem { file } => {
            let report = maintenance::import_item_file(&pool, &file)
                .await
                .with_context(|| format!("Failed to import {}", file.display()))?;
            println!(
                "{} item {} ({} sections, {} questions, audio: {})",
                if report.created { "Created" } else { "Replaced" },
                report.item_id,
                report.sections,
                report.questions,
                if report.has_audio { "yes" } else { "no" }
            );
        }
        Command::DeleteItem { slug } => {
            maintenance::delete_item(&pool, &slug).await?;
            println!("Deleted item '{}'", slug);
        }
        Command::Cleanup { dry_run } => {
            let report = maintenance::cleanup(&pool, dry_run).await?;
            println!("{}", if dry_run { "Would remove:" } else { "Removed:" });
            println!("  expired sessions:  {}", report.expired_sessions);
            println!("  orphaned progress: {}", report.orphaned_progress);
            println!("  orphaned events:   {}", report.orphaned_events);
            println!("  orphaned unlocks:  {}", report.orphaned_unlocks);
            println!("  orphaned answers:  {}", report.orphaned_answers);
            println!("  stale sync maps:   {}", report.stale_sync_maps);
        }
        Command::GenerateSyncMaps { force } => {
            let report = maintenance::generate_sync_maps(&pool, force).await?;
            println!("Generated {} sync maps, {} already current", report.generated, report.skipped);
        }
        Command::SetSubscription { email, plan, days } => {
            maintenance::set_subscription(&pool, &email, plan, days).await?;
            println!("Subscription of {} set to {}", email, plan);
        }
        Command::SetRole { email, role } => {
            maintenance::set_role(&pool, &email, role).await?;
            println!("Role of {} set to {}", email, role);
        }
        Command::SetStatus { email, status } => {
            maintenance::set_status(&pool, &email, status).await?;
            println!("Status of {} set to {}", email, status);
        }
        Command::RecomputeGamification => {
            let users = maintenance::recompute_gamification(&pool).await?;
            println!("Recomputed gamification for {} users", users);
        }
        Command::Stats => {
            for (table, count) in maintenance::stats(&pool).await? {
                println!("{:<20} {}", table, count);
            }
        }
    }

    pool.close().await;
    Ok(())
}
