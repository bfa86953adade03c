//! Calculator Bot Example
//!
//! A console demonstration of Lathe command routing. Every line typed on
//! stdin becomes a `message_new` event; replies are printed by a console API
//! client instead of being sent over the network.
//!
//! # Commands
//!
//! ```text
//! /add 2 3            !plus 2 3
//! /sum 1.5, 2, 3      /sum 1 2 3
//! /calc 6 * 7
//! /greet [id1|Pavel] Good morning
//! /greet vk.com/durov Hey
//! /roll               /roll 20
//! /help
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package calc-bot
//! cargo run --package calc-bot -- --peer-id 2000000001 --config demos/calc_bot/lathe.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use lathe::core::{ApiError, ApiResult, next_random_id};
use lathe::framework::{ArgumentOptions, CommandBuilder};
use lathe::prelude::*;
use lathe::runtime::ConfigLoader;
use serde_json::{Value as Json, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(about = "Console calculator bot")]
struct Cli {
    /// Configuration file (defaults to ./lathe.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Peer id the typed messages are sent from.
    #[arg(long, default_value_t = 1)]
    peer_id: i64,
}

// ============================================================================
// Console API client
// ============================================================================

/// Prints sent messages and invents profiles for lookups.
struct ConsoleApi;

#[async_trait]
impl ApiClient for ConsoleApi {
    async fn call(&self, method: &str, params: Json) -> ApiResult<Json> {
        match method {
            "messages.send" => {
                println!("bot> {}", params["message"].as_str().unwrap_or_default());
                Ok(json!(next_random_id()))
            }
            "users.get" => {
                let key = params["user_ids"].as_str().unwrap_or_default();
                Ok(json!([match key.parse::<i64>() {
                    Ok(id) => json!({"id": id, "first_name": "User", "last_name": id.to_string()}),
                    Err(_) => json!({"id": 100, "first_name": key, "screen_name": key}),
                }]))
            }
            "groups.getById" => {
                let key = params["group_id"].as_str().unwrap_or_default();
                Ok(json!([match key.parse::<i64>() {
                    Ok(id) => json!({"id": id, "name": format!("Community {id}")}),
                    Err(_) => json!({"id": 200, "name": key, "screen_name": key}),
                }]))
            }
            other => Err(ApiError::Api {
                code: 3,
                message: format!("Unknown method passed: {other}"),
            }),
        }
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// Logs every message; registered first and never blocks.
async fn log_message(event: Event) {
    info!(peer_id = event.peer_id, from_id = event.from_id, "{}", event.text);
}

async fn add(args: Arguments) -> Result<String> {
    let a: i64 = args.get("a")?;
    let b: i64 = args.get("b")?;
    Ok(a.checked_add(b)
        .map_or_else(|| "Overflow!".to_string(), |sum| sum.to_string()))
}

async fn sum(args: Arguments) -> Result<String> {
    let numbers: Vec<f64> = args.get("numbers")?;
    Ok(format!(
        "{} numbers, total {}",
        numbers.len(),
        numbers.iter().sum::<f64>()
    ))
}

async fn calc(args: Arguments) -> Result<String> {
    let a: f64 = args.get("a")?;
    let op: String = args.get("op")?;
    let b: f64 = args.get("b")?;

    let result = match op.as_str() {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b == 0.0 => return Ok("Cannot divide by zero".to_string()),
        "/" => a / b,
        other => anyhow::bail!("unsupported operator {other}"),
    };
    Ok(format!("{a} {op} {b} = {result}"))
}

async fn greet(args: Arguments) -> Result<String> {
    let who: User = args.get("who")?;
    let greeting: String = args.get("greeting")?;
    Ok(format!("{greeting}, {}!", who.mention()))
}

async fn roll(args: Arguments, name: CommandName) -> Result<String> {
    let sides: i64 = args.get("sides")?;
    let value = i64::from(next_random_id()) % sides + 1;
    Ok(format!("{} d{sides}: {value}", &*name))
}

// ============================================================================
// Command Specs
// ============================================================================

const PREFIXES: [&str; 2] = ["/", "!"];

fn command(names: &[&str]) -> CommandBuilder {
    CommandSpec::builder()
        .prefixes(PREFIXES)
        .names(names.iter().copied())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let config = loader.load()?;

    let add_spec = command(&["add", "plus"])
        .arg("a", TypeTag::Int)
        .arg("b", TypeTag::Int)
        .build()?;
    let sum_spec = command(&["sum"])
        .arg("numbers", TypeTag::list(TypeTag::Float))
        .build()?;
    let calc_spec = command(&["calc"])
        .arg("a", TypeTag::Float)
        .arg("op", TypeTag::literal([r"\+", "-", r"\*", "/"]))
        .arg("b", TypeTag::Float)
        .build()?;
    let greet_spec = command(&["greet", "hi"])
        .arg("who", TypeTag::User)
        .arg_with(
            "greeting",
            TypeTag::Str,
            ArgumentOptions::new().rest().default("Hello"),
        )
        .build()?;
    let roll_spec = command(&["roll"])
        .arg_with(
            "sides",
            TypeTag::Int,
            ArgumentOptions::new().min(2).max(100).default(6_i64),
        )
        .build()?;
    let help_spec = command(&["help", "start"]).build()?;

    let help = [&add_spec, &sum_spec, &calc_spec, &greet_spec, &roll_spec]
        .iter()
        .map(|spec| format!("  {}", spec.usage()))
        .fold(String::from("Commands:"), |acc, line| acc + "\n" + &line);

    // Logging runs for every message, then the commands in order.
    let runtime = LatheRuntime::builder()
        .config(config)
        .api(Arc::new(ConsoleApi))
        .service(ServiceBuilder::new().handler(log_message))
        .service(on_command(add_spec).handler(add))
        .service(on_command(sum_spec).handler(sum))
        .service(on_command(calc_spec).handler(calc))
        .service(on_command(greet_spec).handler(greet))
        .service(on_command(roll_spec).handler(roll))
        .service(on_command(help_spec).handler(move || {
            let help = help.clone();
            async move { help }
        }))
        .service(ServiceBuilder::new().handler(|| async { "Unknown command, try /help" }))
        .build()?;

    let (tx, source) = ChannelEventSource::new(16);
    let peer_id = cli.peer_id;
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let payload = json!({
                        "type": "message_new",
                        "object": {
                            "message": { "peer_id": peer_id, "from_id": peer_id, "text": line }
                        }
                    });
                    if tx.send(payload).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    });

    println!("Type a command, e.g. /add 2 3 or /help. Ctrl+D to quit.");
    let stats = runtime.run(source).await?;
    info!(?stats, "Bye");

    Ok(())
}
