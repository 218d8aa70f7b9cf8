//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

use crate::config::DeliveryMode;

/// Message Service - HTTP intake with outbox delivery to Kafka
#[derive(Parser, Debug)]
#[command(name = "message-service")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run the outbox relay without the HTTP server
    Relay,

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Inspect and repair the outbox
    Outbox(OutboxArgs),
}

/// Arguments for the serve command.
///
/// Flags override the corresponding environment settings.
#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Delivery mode: `outbox` or `direct`
    #[arg(short, long)]
    pub mode: Option<DeliveryMode>,

    /// Do not start the in-process relay (outbox mode)
    #[arg(long)]
    pub no_relay: bool,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the outbox command
#[derive(Parser, Debug)]
pub struct OutboxArgs {
    #[command(subcommand)]
    pub action: OutboxAction,
}

/// Outbox maintenance actions
#[derive(Subcommand, Debug)]
pub enum OutboxAction {
    /// Show entry counts per status
    Status,
    /// Move dead entries back to pending with a fresh retry budget
    Requeue,
    /// Delete published entries
    Purge {
        /// Only entries published more than this many hours ago
        #[arg(long, default_value_t = 24)]
        older_than_hours: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from([
            "message-service",
            "serve",
            "--port",
            "9000",
            "--mode",
            "direct",
            "--no-relay",
        ]);

        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.mode, Some(DeliveryMode::Direct));
        assert!(args.no_relay);
        assert!(args.host.is_none());
    }

    #[test]
    fn test_parse_outbox_purge() {
        let cli = Cli::parse_from(["message-service", "outbox", "purge", "--older-than-hours", "6"]);
        assert!(matches!(
            cli.command,
            Commands::Outbox(OutboxArgs {
                action: OutboxAction::Purge { older_than_hours: 6 }
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["message-service", "serve", "--mode", "fire-and-forget"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
