use std::{error::Error, time::Duration};

use clap::Parser;
use log::{error, info, LevelFilter, Metadata, Record};
use srcds_rcon::{chat::ChatParsing, Client, ClientConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // stdout is reserved for command output
            eprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

/// Run rcon commands against a Source engine server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(short, long, default_value_t = ClientConfig::DEFAULT_PORT)]
    port: u16,
    #[arg(long, env = "RCON_PASSWORD", hide_env_values = true)]
    password: String,
    /// For servers that don't support multi-packet responses (e.g. Factorio)
    #[arg(long)]
    single_packet: bool,
    /// Give up on connecting or on a single command after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Print chat received during the session, grouped by player
    #[arg(long)]
    chat: bool,
    /// Skip chat messages without a steam id instead of failing
    #[arg(long, requires = "chat")]
    lenient_chat: bool,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Commands to run. Read from stdin, one per line, if none are given.
    command: Vec<String>,
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level_filter(args.verbose)));

    let mut config = ClientConfig::new(args.host, args.password)
        .port(args.port)
        .single_packet_mode(args.single_packet);
    if let Some(secs) = args.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    if args.lenient_chat {
        config = config.chat_parsing(ChatParsing::Lenient);
    }

    let mut client = Client::connect(&config).await?;
    info!("connected to {}", config.address());

    if args.command.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            run(&mut client, line).await?;
        }
    } else {
        for command in &args.command {
            run(&mut client, command).await?;
        }
    }

    if args.chat {
        for (steam_id, messages) in client.parsed_chat()?.players() {
            for message in messages {
                println!("{}\t{}", steam_id, message);
            }
        }
    }

    client.close().await?;
    info!("bye");
    Ok(())
}

async fn run(client: &mut Client, command: &str) -> Result<(), Box<dyn Error>> {
    match client.command(command).await {
        Ok(response) => {
            println!("{}", response.body());
            Ok(())
        }
        Err(err) if !err.is_fatal() => {
            error!("{}: {}", command, err);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
