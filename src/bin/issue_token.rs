use anyhow::{Context, Result};
use clap::Parser;
use partmaster_api::{
    auth::{all_permissions, consts::ADMIN_ROLE, AuthConfig, AuthService},
    config,
};

/// Mints a bearer token for the registry API using the configured secret.
#[derive(Parser)]
#[command(name = "issue-token", about = "Mint a bearer token for the part master API", version)]
struct Cli {
    /// Subject recorded in the token (user or service name)
    #[arg(long)]
    subject: String,
    /// Grant the admin role instead of explicit permissions
    #[arg(long)]
    admin: bool,
    /// Comma separated permissions, e.g. `items:read,boms:read`
    #[arg(long, value_delimiter = ',')]
    permissions: Vec<String>,
    /// Token lifetime in seconds
    #[arg(long, default_value_t = 3600)]
    ttl_secs: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = config::load_config().context("failed to load configuration")?;

    if app_config.jwt_secret.is_empty() {
        anyhow::bail!("APP__JWT_SECRET is not set");
    }

    let known = all_permissions();
    if let Some(unknown) = cli.permissions.iter().find(|p| !known.contains(p)) {
        anyhow::bail!("unknown permission '{}', expected one of {}", unknown, known.join(", "));
    }

    let mut auth_config = AuthConfig::from(&app_config);
    auth_config.access_token_expiration = std::time::Duration::from_secs(cli.ttl_secs);
    let service = AuthService::new(auth_config);

    let roles = if cli.admin {
        vec![ADMIN_ROLE.to_string()]
    } else {
        Vec::new()
    };
    let token = service
        .issue_token(&cli.subject, roles, cli.permissions)
        .context("failed to sign token")?;

    println!("{}", token);
    Ok(())
}
