use std::time::Duration;

use clap::Parser;
use mpn_netplay::lobby::to_lobby_server;
use mpn_netplay::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "lobby-browser", about = "List NetPlay lobby sessions and optionally join one")]
struct Cli {
    /// Session directory to query.
    #[arg(long, env = "MPN_LOBBY_URL")]
    url: Option<String>,

    /// Protocol tag sessions must advertise.
    #[arg(long, default_value = "MPN")]
    tag: String,

    /// Only show sessions from this region code (US, EU, JP, ...).
    #[arg(long)]
    region: Option<String>,

    /// Also list sessions whose game already started.
    #[arg(long)]
    show_in_game: bool,

    /// Join the session at this index over the loopback core.
    #[arg(long)]
    join: Option<usize>,

    #[arg(long, env = "MPN_USERNAME", default_value = "Player")]
    username: String,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut lobby_config = LobbyConfig {
        protocol_tag: cli.tag.clone(),
        ..Default::default()
    };
    if let Some(url) = &cli.url {
        lobby_config.directory_url = url.clone();
    }
    let max_players = lobby_config.default_max_players;

    // No real emulator core is linked into the demo.
    let native = LoopbackNative::new();
    let coordinator = NetplayCoordinator::builder()
        .native(native)
        .settings(NetplaySettings {
            username: cli.username.clone(),
            ..Default::default()
        })
        .lobby_config(lobby_config)
        .build()
        .await?;

    let filters = FilterSet {
        region: cli.region.clone(),
        hide_in_game: !cli.show_in_game,
        ..Default::default()
    };
    let browser = coordinator.browse(BrowserConfig {
        filters,
        auto_refresh: false,
    });

    let shown = browser.refresh().await?;
    let sessions = browser.sessions().await?;
    browser.shutdown().await?;

    println!("{shown} session(s)");
    for (i, s) in sessions.iter().enumerate() {
        println!(
            "[{i:>2}] {:<32} {:<14} {:<10} {}{}",
            s.display_name(),
            s.region_display_name(),
            s.method_display_name(),
            s.game_id,
            if s.has_password { " (password)" } else { "" },
        );
    }

    if let Some(index) = cli.join {
        let Some(session) = sessions.get(index) else {
            eprintln!("no session at index {index}");
            coordinator.shutdown().await;
            return Ok(());
        };
        join(&coordinator, &to_lobby_server(session, None, max_players)).await?;
    }

    coordinator.shutdown().await;
    Ok(())
}

async fn join(
    coordinator: &NetplayCoordinator,
    server: &LobbyServer,
) -> Result<(), NetplayError> {
    coordinator.subscribe(
        &[EventTopic::Connection, EventTopic::Player, EventTopic::Chat],
        |event| match event {
            SessionEvent::StatusChanged { status, role } => println!("* {status} ({role})"),
            SessionEvent::RosterUpdated(roster) => {
                println!("* {} player(s) in session", roster.player_count);
            }
            SessionEvent::Chat(m) => println!("[{}] <{}> {}", m.timestamp, m.sender, m.text),
            other => tracing::debug!(?other, "session event"),
        },
    );

    println!("joining {} ({})", server.name, server.game_name);
    coordinator.connect_to_lobby_server(server).await?;
    coordinator.send_chat("hello from lobby-browser").await?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    coordinator.disconnect().await;
    Ok(())
}
