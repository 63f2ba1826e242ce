pub mod cli;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod history;
pub mod models;
pub mod remote;
pub mod server;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use config::rules::{ load_rules, resolve_rules };
use conversation::{ ControllerConfig, ConversationController };
use engine::ResponseDispatcher;
use history::initialize_history_store;
use log::{ info, warn };
use remote::{ HttpRemoteResponder, RemoteResponder };
use server::api::{ AppState, DelayRange };
use server::Server;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve) => serve_api(serve, args.rules_path).await,
        Command::Chat(chat) => chat_session(chat, args.rules_path).await,
    }
}

async fn serve_api(
    args: ServeArgs,
    rules_path: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Rules Path: {}", rules_path.as_deref().unwrap_or("built-in"));
    info!("Rate Limit (req/s): {}", args.rate_limit_per_second);
    info!(
        "Response Delay: {}-{} ms",
        args.response_delay_min_ms,
        args.response_delay_max_ms
    );
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let delay = DelayRange::from_millis(args.response_delay_min_ms, args.response_delay_max_ms);
    let state = match rules_path.filter(|p| !p.trim().is_empty()) {
        Some(path) => {
            let loaded = load_rules(&path)?;
            let dispatcher = ResponseDispatcher::with_table(loaded.table.clone());
            AppState::new(dispatcher, args.rate_limit_per_second, delay).with_rule_file(path, loaded)
        }
        None => AppState::new(ResponseDispatcher::default(), args.rate_limit_per_second, delay),
    };

    let server = Server::new(args, state);
    server.run().await
}

async fn chat_session(
    args: ChatArgs,
    rules_path: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("API URL: {}", if args.offline { "offline" } else { args.api_url.as_str() });
    info!("Session: {}", args.session_id);
    info!("History Store Type: {}", args.history_type);
    info!("Thinking Floor: {} ms", args.thinking_floor_ms);
    info!("-------------------------");

    let dispatcher = ResponseDispatcher::with_table(resolve_rules(rules_path.as_deref())?);
    let history = initialize_history_store(&args)?;

    let remote: Option<Arc<dyn RemoteResponder>> = if args.offline {
        None
    } else {
        let client = HttpRemoteResponder::new(
            &args.api_url,
            Duration::from_secs(args.remote_timeout_secs)
        )?;
        match client.health().await {
            Ok(health) => info!("Remote responder at {}: {}", args.api_url, health.message),
            Err(e) => warn!("Remote responder unavailable ({}); local rules will answer until it returns", e),
        }
        Some(Arc::new(client) as Arc<dyn RemoteResponder>)
    };

    let config = ControllerConfig {
        session_id: args.session_id.clone(),
        thinking_floor: Duration::from_millis(args.thinking_floor_ms),
        failure_pause: Duration::from_millis(args.failure_pause_ms),
    };
    let mut controller = ConversationController::open(config, dispatcher, remote, history).await;
    cli::repl::run_session(&mut controller, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("Chat session '{}' closed", controller.session_id());
    Ok(())
}
