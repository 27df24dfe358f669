//! Watch who is talking through the local ClientQuery plug-in.
//!
//! Connects to the plug-in, optionally pushes a participant number into the
//! local nickname, and prints the current talker whenever it changes.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kikoe -- --apikey XXXX-XXXX --number 12
//! KIKOE_APIKEY=XXXX-XXXX cargo run --bin kikoe -- --name "Officer Bob" --push-name
//! ```

use std::time::Duration;

use clap::Parser;

use kikoe_client::{QueryClient, Settings, Talker};
use kikoe_shared::{logger::setup_logger, time::timestamp_to_rfc3339};

#[derive(Parser, Debug)]
#[command(name = "kikoe")]
#[command(about = "Track the current talker via the ClientQuery plug-in", long_about = None)]
struct Args {
    /// Host running the voice-chat client
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// ClientQuery API key (empty disables authentication)
    #[arg(short = 'k', long, env = "KIKOE_APIKEY", default_value = "", hide_env_values = true)]
    apikey: String,

    /// Participant number to embed into the nickname
    #[arg(short = 'n', long, default_value = "")]
    number: String,

    /// Display name to use with --push-name
    #[arg(long, default_value = "")]
    name: String,

    /// Do not touch the nickname
    #[arg(long)]
    no_push_number: bool,

    /// Replace the nickname with --name
    #[arg(long)]
    push_name: bool,

    /// How often to check the talker (milliseconds)
    #[arg(short = 'i', long, default_value = "250")]
    interval_ms: u64,

    /// Print the roster as JSON whenever the talker changes
    #[arg(long)]
    roster: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&[env!("CARGO_BIN_NAME"), "kikoe_client"], "info");

    let args = Args::parse();

    let settings = Settings {
        host: args.host,
        api_key: args.apikey,
        push_number: !args.no_push_number,
        push_name: args.push_name,
        ..Settings::default()
    };
    match serde_json::to_string(&settings) {
        Ok(json) => tracing::debug!("Settings: {}", json),
        Err(e) => tracing::debug!("Failed to serialize settings: {}", e),
    }

    let client = QueryClient::new(settings);
    client.update(&args.number, &args.name);
    client.start();

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(10)));
    let mut last = Talker::nobody();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let talker = client.current_talker();
                if talker != last {
                    println!("{}", describe(&talker));
                    if args.roster {
                        print_roster(&client);
                    }
                    last = talker;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    client.disconnect();
}

fn describe(talker: &Talker) -> String {
    match (talker.talking, talker.whispering) {
        (false, _) => "-- silence --".to_string(),
        (true, false) => format!("talking:    {}", talker.nickname),
        (true, true) => format!("whispering: {}", talker.nickname),
    }
}

fn print_roster(client: &QueryClient) {
    for participant in client.roster() {
        let seen = timestamp_to_rfc3339(participant.last_activity).unwrap_or_default();
        match serde_json::to_string(&participant) {
            Ok(json) => println!("  [{}] {}", seen, json),
            Err(e) => tracing::warn!("Failed to serialize participant: {}", e),
        }
    }
}
