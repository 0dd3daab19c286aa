use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use partmaster_api::{config, db, migrator::Migrator};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Parser)]
#[command(name = "migration", about = "Manage the part master database schema", version)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Print applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = config::load_config().context("failed to load configuration")?;
    config::init_tracing(app_config.log_level(), app_config.log_json);

    let mut db_config: db::DbConfig = (&app_config).into();
    if let Some(url) = cli.database_url {
        db_config.url = url;
    }
    db_config.max_connections = 2;
    db_config.min_connections = 1;

    info!("Connecting to database for migrations");
    let pool = db::establish_connection_with_config(&db_config)
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or(Commands::Up) {
        Commands::Up => {
            db::run_migrations(&pool).await?;
        }
        Commands::Down { steps } => {
            info!(steps, "Rolling back migrations");
            Migrator::down(&pool, Some(steps)).await?;
        }
        Commands::Status => {
            Migrator::status(&pool).await?;
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
