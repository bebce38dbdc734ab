use anyhow::Result;
use clap::{Parser, Subcommand};
use slated_application::Assistant;
use slated_infrastructure::load_config;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slated")]
#[command(about = "Slated - Conversational Calendar Scheduling Assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive scheduling conversation
    Chat {
        /// Session id to converse under
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Send a single message and print the reply
    Message {
        /// Session id to converse under
        #[arg(long, default_value = "local")]
        user: String,
        /// The message text
        text: Vec<String>,
    },
    /// Probe the calendar connection and report status
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config()?;
    let assistant = Assistant::from_config(&config)?;

    match cli.command {
        Commands::Chat { user } => chat(&assistant, &user).await?,
        Commands::Message { user, text } => {
            let reply = assistant.submit_message(&user, &text.join(" ")).await?;
            println!("{reply}");
        }
        Commands::Health => {
            let report = assistant.health().await;
            println!(
                "calendar: {}",
                if report.calendar_reachable {
                    "reachable"
                } else {
                    "unreachable"
                }
            );
            println!("active sessions: {}", report.active_sessions);
            if !report.calendar_reachable {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn chat(assistant: &Assistant, user: &str) -> Result<()> {
    println!("Slated scheduling assistant. Type /quit to leave, /clear to forget this session.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            "/quit" | "/exit" => break,
            "/clear" => {
                assistant.clear_session(user).await;
                println!("Session cleared.");
            }
            "/sessions" => {
                for summary in assistant.list_sessions().await {
                    let pending = if summary.pending_clarification {
                        ", awaiting details"
                    } else {
                        ""
                    };
                    println!(
                        "{}  {} message(s), last active {}{}",
                        summary.user_id, summary.message_count, summary.last_active, pending
                    );
                }
            }
            _ => match assistant.submit_message(user, input).await {
                Ok(reply) => println!("slated> {reply}"),
                Err(err) => eprintln!("error: {err}"),
            },
        }
    }
    Ok(())
}
