use clap::Parser;
use std::path::PathBuf;

/// Agent registry backend - REST API for AI assistant configurations
#[derive(Parser, Debug, Clone)]
#[command(name = "agent-backend", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "AGENT_BACKEND_CONFIG", default_value = "agent-backend.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "AGENT_BACKEND_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "AGENT_BACKEND_PORT")]
    pub port: Option<u16>,

    /// Database connection URL (sqlite://, postgres://, mysql://)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log filter, e.g. "info" or "agent_backend=debug,sqlx=warn"
    #[arg(long, env = "AGENT_BACKEND_LOG")]
    pub log_level: Option<String>,

    /// Skip running migrations on startup
    #[arg(long)]
    pub no_migrate: bool,
}
