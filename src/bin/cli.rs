//! talkwire CLI Client
//!
//! Command-line interface for driving the speech application.

use std::io::BufRead;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use talkwire::protocol::VoiceSettings;
use talkwire::{Client, Config, PendingRequest};
use tracing_subscriber::{fmt, EnvFilter};

/// talkwire CLI
#[derive(Parser, Debug)]
#[command(name = "talkwire-cli")]
#[command(about = "Send commands to a text-to-speech application")]
#[command(version)]
struct Args {
    /// JSON config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Peer host, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Peer port, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Speak a line
    Talk {
        /// Words to speak (joined with spaces)
        #[arg(required = true)]
        text: Vec<String>,

        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// Speak every line read from stdin
    Read {
        #[command(flatten)]
        voice: VoiceArgs,
    },

    /// Pause speaking
    Pause,

    /// Resume speaking
    Resume,

    /// Skip the current line
    Skip,

    /// Drop every queued line
    Clear,

    /// Print 1 if paused, 0 otherwise
    GetPause,

    /// Print 1 if speaking, 0 otherwise
    NowPlaying,

    /// Print the number of queued lines
    TaskCount,

    /// Write the effective configuration to a file
    InitConfig {
        /// Where to write the JSON config
        path: PathBuf,
    },
}

/// Per-call overrides of the configured voice settings
#[derive(ClapArgs, Debug)]
struct VoiceArgs {
    /// Voice id
    #[arg(long, allow_negative_numbers = true)]
    voice: Option<i16>,

    /// Volume (-1 = peer default)
    #[arg(long, allow_negative_numbers = true)]
    volume: Option<i16>,

    /// Speed (-1 = peer default)
    #[arg(long, allow_negative_numbers = true)]
    speed: Option<i16>,

    /// Tone (-1 = peer default)
    #[arg(long, allow_negative_numbers = true)]
    tone: Option<i16>,
}

impl VoiceArgs {
    fn apply(&self, mut settings: VoiceSettings) -> VoiceSettings {
        settings.voice = self.voice.unwrap_or(settings.voice);
        settings.volume = self.volume.unwrap_or(settings.volume);
        settings.speed = self.speed.unwrap_or(settings.speed);
        settings.tone = self.tone.unwrap_or(settings.tone);
        settings
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,talkwire=info"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> talkwire::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    let client = Client::from_config(&config);

    match args.command {
        Commands::Talk { text, voice } => {
            let settings = voice.apply(*client.settings());
            client.talk_with(&text.join(" "), settings)
        }
        Commands::Read { voice } => {
            let settings = voice.apply(*client.settings());
            for line in std::io::stdin().lock().lines() {
                let line = line?;
                // Keep reading after a failed send
                if let Err(e) = client.talk_with(line.trim(), settings) {
                    tracing::warn!("Dropped line: {}", e);
                }
            }
            Ok(())
        }
        Commands::Pause => client.pause(),
        Commands::Resume => client.resume(),
        Commands::Skip => client.skip(),
        Commands::Clear => client.clear(),
        Commands::GetPause => print_result(client.get_pause()),
        Commands::NowPlaying => print_result(client.get_now_playing()),
        Commands::TaskCount => print_result(client.get_task_count()),
        Commands::InitConfig { path } => {
            config.save(&path)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn print_result(pending: PendingRequest) -> talkwire::Result<()> {
    let value = pending.result()?;
    println!("{}", value);
    Ok(())
}
