use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ogonline_core::{ModInfo, Online, OnlineConfig};
use ogonline_netd::{Headless, TcpTransport};

/// Headless multiplayer host and client
#[derive(Parser, Debug)]
#[command(name = "ogonline-netd")]
#[command(about = "Host or join a multiplayer session without a game attached", long_about = None)]
struct Args {
    /// Address to host on
    #[arg(short, long, default_value = "0.0.0.0:9501", conflicts_with = "connect")]
    bind: String,

    /// Join the host at this address instead of hosting
    #[arg(short, long)]
    connect: Option<String>,

    /// Player name shown to others
    #[arg(short, long, default_value = "Unknown Rabbit")]
    name: String,

    /// Build id used in the version check (-1 for a development build)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    build_id: i32,

    /// Active mod ids, comma separated
    #[arg(long, value_delimiter = ',')]
    mods: Vec<String>,

    /// Maximum number of players including the host
    #[arg(long, default_value_t = 8)]
    player_limit: usize,

    /// Level to host
    #[arg(long, default_value = "Data/Levels/Project60/22_grass_beach.xml")]
    level: String,

    #[arg(long, default_value = "")]
    campaign: String,

    /// Characters waiting for joining players
    #[arg(long, default_value_t = 4)]
    avatars: usize,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Milliseconds between session steps
    #[arg(long, default_value_t = 30)]
    tick_ms: u64,

    /// Stop after this many steps
    #[arg(long)]
    ticks: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let tick = Duration::from_millis(args.tick_ms);
    let config = OnlineConfig {
        build_id: args.build_id,
        player_name: args.name.clone(),
        mods: args.mods.iter().map(ModInfo::new).collect(),
        player_limit: args.player_limit,
        tick_period: tick,
        ..OnlineConfig::default()
    };

    let transport = Arc::new(TcpTransport::new()?);
    let mut node = Headless::new(Online::new(config, transport), tick);

    match &args.connect {
        Some(address) => {
            node.join(address)?;
            info!("Joining {}", address);
        }
        None => {
            node.host(&args.bind, &args.level, &args.campaign, args.avatars)?;
            info!("Hosting {} on {}", args.level, args.bind);
        }
    }

    node.run(args.ticks)
}
