//! talkwire Peer Binary
//!
//! Runs the loopback peer so the client can be tried without the speech
//! application.

use clap::Parser;
use talkwire::peer::{Peer, PeerConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// talkwire loopback peer
#[derive(Parser, Debug)]
#[command(name = "talkwire-peer")]
#[command(about = "Stand-in for the speech application's command port")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:50001")]
    listen: String,

    /// Delay before answering each query, in milliseconds
    #[arg(short, long, default_value = "0")]
    reply_delay_ms: u64,

    /// Accept queries but never answer them
    #[arg(short, long)]
    silent: bool,

    /// Finish one queued line every N milliseconds (0 = keep lines queued)
    #[arg(short, long, default_value = "1500")]
    playback_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,talkwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("talkwire peer v{}", talkwire::VERSION);

    let config = PeerConfig::builder()
        .listen_addr(&args.listen)
        .reply_delay_ms(args.reply_delay_ms)
        .silent(args.silent)
        .playback_ms(args.playback_ms)
        .build();

    let peer = match Peer::bind(config) {
        Ok(peer) => peer,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = peer.run() {
        tracing::error!("Peer error: {}", e);
        std::process::exit(1);
    }
}
