pub mod repl;

use clap::{ Args as ClapArgs, Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Optional JSON rule table replacing the built-in rules.
    #[arg(long, env = "RULES_PATH", global = true)]
    pub rules_path: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false", global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP chat API.
    Serve(ServeArgs),
    /// Start an interactive chat session in the terminal.
    Chat(ChatArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    /// Comma-separated origins allowed by CORS. Empty allows any origin.
    #[arg(long, env = "CORS_ORIGINS", default_value = "")]
    pub cors_origins: String,

    /// Maximum chat requests per second across all clients. 0 disables the limit.
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value = "10")]
    pub rate_limit_per_second: u32,

    /// Lower bound of the simulated typing delay, in milliseconds.
    #[arg(long, env = "RESPONSE_DELAY_MIN_MS", default_value = "500")]
    pub response_delay_min_ms: u64,

    /// Upper bound of the simulated typing delay, in milliseconds.
    #[arg(long, env = "RESPONSE_DELAY_MAX_MS", default_value = "1500")]
    pub response_delay_max_ms: u64,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    /// Base URL of the chat API. Bare hosts get a scheme added.
    #[arg(long, env = "API_URL", default_value = crate::remote::DEFAULT_API_URL)]
    pub api_url: String,

    /// Skip the remote API and answer with the local rules only.
    #[arg(long, env = "OFFLINE", default_value = "false")]
    pub offline: bool,

    /// Timeout for remote chat requests, in seconds.
    #[arg(long, env = "REMOTE_TIMEOUT_SECS", default_value = "10")]
    pub remote_timeout_secs: u64,

    /// Minimum time the assistant appears to think before replying, in milliseconds.
    #[arg(long, env = "THINKING_FLOOR_MS", default_value = "800")]
    pub thinking_floor_ms: u64,

    /// Minimum wait before a locally computed or error reply when the remote call failed, in milliseconds.
    #[arg(long, env = "FAILURE_PAUSE_MS", default_value = "600")]
    pub failure_pause_ms: u64,

    /// Conversation to resume. A fresh one is created when nothing is stored.
    #[arg(long, env = "SESSION_ID", default_value = crate::conversation::DEFAULT_SESSION_ID)]
    pub session_id: String,

    // --- History Store Args ---
    /// History chat store type (file, redis, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    /// Directory for the file history store.
    #[arg(long, env = "HISTORY_DIR", default_value = ".chat-history")]
    pub history_dir: String,

    /// History chat store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis history keys.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "history:")]
    pub history_redis_prefix: String,
}
