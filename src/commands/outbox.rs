//! Outbox command - Inspect and repair the outbox table.
//!
//! ## Usage
//!
//! ```bash
//! # Entry counts per status
//! message-service outbox status
//!
//! # Give dead entries another full retry budget
//! message-service outbox requeue
//!
//! # Delete entries published more than a week ago
//! message-service outbox purge --older-than-hours 168
//! ```

use chrono::{Duration, Utc};

use crate::cli::args::{OutboxAction, OutboxArgs};
use crate::config::Config;
use crate::domain::OutboxStatus;
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, OutboxRepository, OutboxStore};

/// Execute the outbox command
pub async fn execute(args: OutboxArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    run(args.action, &OutboxStore::new(db.get_connection())).await
}

async fn run(action: OutboxAction, outbox: &dyn OutboxRepository) -> AppResult<()> {
    match action {
        OutboxAction::Status => {
            let counts = outbox.count_by_status().await?;
            println!("\n=== Outbox Status ===");
            for status in [OutboxStatus::Pending, OutboxStatus::Published, OutboxStatus::Dead] {
                let count = counts.get(status.as_str()).copied().unwrap_or(0);
                println!("{:<10} {}", status.as_str(), count);
            }
            println!("=====================\n");
        }
        OutboxAction::Requeue => {
            let requeued = outbox.requeue_dead().await?;
            tracing::info!(requeued, "Dead outbox entries moved back to pending");
        }
        OutboxAction::Purge { older_than_hours } => {
            let cutoff = Utc::now() - Duration::hours(i64::from(older_than_hours));
            let purged = outbox.purge_published_before(cutoff).await?;
            tracing::info!(purged, %cutoff, "Published outbox entries purged");
        }
    }

    Ok(())
}
