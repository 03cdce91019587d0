mod common;
mod config;
mod network;
mod storage;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use dotenvy::dotenv;
use network::{Connection, HttpHistory};
use reqwest::Url;
use ui::ChatApp;

#[derive(Parser)]
#[command(name = "team_chat", version, about = "Company team chat client")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: PathBuf,
    /// Session record left by the login flow
    #[arg(long, env = "TEAM_CHAT_SESSION", value_name = "FILE")]
    session: Option<PathBuf>,
    /// Realtime server, e.g. http://localhost:5000
    #[arg(long, env = "TEAM_CHAT_SERVER_URL", value_name = "URL")]
    server_url: Option<String>,
    /// Base URL of the room history endpoint
    #[arg(long, env = "TEAM_CHAT_HISTORY_ENDPOINT", value_name = "URL")]
    history_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    if let Some(server_url) = cli.server_url {
        app_config.server_url = server_url;
    }
    if let Some(history_endpoint) = cli.history_endpoint {
        app_config.history_endpoint = history_endpoint;
    }
    if let Some(session) = cli.session {
        app_config.session_file = session;
    }

    let session = storage::load_session(&app_config.session_file);
    let user = session.identity();
    let room_id = session.room_id();

    let runtime = tokio::runtime::Handle::current();

    // One connection for the whole process, opened before any view exists.
    let endpoint = network::socket_endpoint(&app_config.server_url)?;
    let connection = Connection::open(
        endpoint,
        app_config.reconnect_policy(),
        app_config.event_buffer,
        &runtime,
    );

    let history = HttpHistory::new(
        Url::parse(&app_config.history_endpoint)?,
        session.token.clone(),
        app_config.request_timeout(),
    )?;

    log::info!(
        "Starting team chat for {} in room {}",
        user.as_ref().map_or("<anonymous>", |user| user.name.as_str()),
        room_id.as_deref().unwrap_or("<none>")
    );

    let options = eframe::NativeOptions::default();
    let mut parts = Some((connection, history, user, room_id, runtime));

    eframe::run_native(
        "Team Chat",
        options,
        Box::new(move |cc| {
            let (connection, history, user, room_id, runtime) = parts
                .take()
                .expect("ChatApp should only be initialized once");

            Ok(Box::new(ChatApp::new(
                cc, connection, history, user, room_id, runtime,
            )))
        }),
    )
    .map_err(|err| err.to_string())?;

    Ok(())
}
