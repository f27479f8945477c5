use std::net::SocketAddr;

use clap::Parser;

use crate::error::ErrorVerbosity;

#[derive(Debug, Parser)]
#[command(author, about, version)]
pub struct CliArgs {
    /// Address to listen on.
    #[clap(long, env = "BOOKS_SOCKET_ADDRESS", default_value = "127.0.0.1:5000")]
    pub socket_address: SocketAddr,

    /// How much detail error responses carry.
    #[clap(long, env = "BOOKS_ERROR_VERBOSITY", value_enum, default_value_t = ErrorVerbosity::Message)]
    pub error_verbosity: ErrorVerbosity,

    /// Full connection url. Takes precedence over the `DB_*` settings.
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[clap(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    #[clap(long, env = "DB_PASSWORD", default_value = "yourpassword", hide_env_values = true)]
    pub db_password: String,

    #[clap(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    #[clap(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[clap(long, env = "DB_NAME", default_value = "books")]
    pub db_name: String,

    #[clap(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub db_max_connections: u32,

    #[clap(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 10)]
    pub db_acquire_timeout_secs: u64,

    /// Do not run the embedded migrations at start up.
    #[clap(long, env = "BOOKS_SKIP_MIGRATIONS")]
    pub skip_migrations: bool,

    /// Keep books in memory instead of PostgreSQL.
    #[clap(long, env = "BOOKS_IN_MEMORY")]
    pub in_memory: bool,

    /// Log every response body. Expensive.
    #[clap(long, env = "BOOKS_TRACE_RESPONSE_BODY")]
    pub trace_response_body: bool,
}
