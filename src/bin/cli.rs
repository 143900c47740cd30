// Quizzy live CLI
// Drives a running session server by hand: host a quiz, join it, advance questions.

use clap::{Parser, Subcommand};
use colored::*;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::io::{self, Write};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Parser)]
#[command(name = "quizzy-cli")]
#[command(about = "Quizzy live session CLI", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:8080)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Route prefix the server is mounted under
    #[arg(short, long, default_value = "quizzy")]
    base_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Host a session for a join code and print everything the room emits
    Host {
        /// Join code bound to a quiz
        #[arg(short, long)]
        code: String,

        /// Keep the session open until Ctrl+C
        #[arg(short, long)]
        keep_alive: bool,
    },

    /// Join a live session as a participant
    Join {
        #[arg(short, long)]
        code: String,
    },

    /// Advance a live session to its next question
    Next {
        #[arg(short, long)]
        code: String,

        /// How many questions to advance
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Interactive mode - send raw event envelopes
    Interactive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let ws_url = format!("ws://{}/{}/ws", cli.server, cli.base_path);

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server, &cli.base_path).await;
        }
        Commands::Host { code, keep_alive } => {
            host_session(&ws_url, code, *keep_alive).await;
        }
        Commands::Join { code } => {
            join_session(&ws_url, code).await;
        }
        Commands::Next { code, count } => {
            next_question(&ws_url, code, *count).await;
        }
        Commands::Interactive => {
            interactive_mode(&ws_url).await;
        }
    }
}

async fn check_health(server: &str, base_path: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/{}/health", server, base_path);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                    println!("  Live rooms: {}", body["rooms"]);
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

fn envelope(name: &str, code: &str) -> Message {
    Message::Text(
        json!({
            "name": name,
            "data": { "executionId": code }
        })
        .to_string(),
    )
}

async fn connect(url: &str) -> Option<(SplitSink<WsStream, Message>, SplitStream<WsStream>)> {
    match connect_async(url).await {
        Ok((ws_stream, _)) => Some(ws_stream.split()),
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            None
        }
    }
}

/// Print one server event. Returns false once the session is over.
fn print_event(text: &str) -> bool {
    let Ok(event) = serde_json::from_str::<serde_json::Value>(text) else {
        println!("{} {}", "◀".yellow(), text);
        return true;
    };

    let data = &event["data"];
    match event["name"].as_str() {
        Some("hostDetails") => {
            println!("{} Hosting {}", "✓".green(), data["quiz"]["title"].to_string().bold());
        }
        Some("joinDetails") => {
            println!("{} Joined {}", "✓".green(), data["quizTitle"].to_string().bold());
        }
        Some("status") => {
            println!(
                "{} status: {} ({} participants)",
                "◀".green(),
                data["status"].as_str().unwrap_or("?").cyan(),
                data["participants"]
            );
        }
        Some("newQuestion") => {
            println!("\n{}", data["question"].as_str().unwrap_or("?").bold());
            if let Some(answers) = data["answers"].as_array() {
                for (i, answer) in answers.iter().enumerate() {
                    println!("  {}. {}", i + 1, answer.as_str().unwrap_or("?"));
                }
            }
        }
        Some("sessionEnded") => {
            println!("{} Session ended: {}", "✗".yellow(), data["reason"]);
            return false;
        }
        Some("error") => {
            println!("{} {}: {}", "✗".red(), data["kind"], data["message"]);
        }
        _ => println!("{} {}", "◀".green(), text.bright_white()),
    }
    true
}

/// Print events until the connection closes or nothing arrives for `idle`
async fn follow(read: &mut SplitStream<WsStream>, idle: Option<Duration>) {
    loop {
        let next = match idle {
            Some(limit) => match timeout(limit, read.next()).await {
                Ok(next) => next,
                Err(_) => break,
            },
            None => read.next().await,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                if !print_event(&text) {
                    break;
                }
            }
            Some(Ok(Message::Close(_))) => {
                println!("{} Server closed the connection", "✗".yellow());
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                println!("{} Connection error: {}", "✗".red(), e);
                break;
            }
            None => {
                println!("{} Connection closed", "✗".yellow());
                break;
            }
        }
    }
}

async fn host_session(url: &str, code: &str, keep_alive: bool) {
    println!("{}", "Hosting session...".cyan());
    println!("  Join code: {}", code.bold());

    let Some((mut write, mut read)) = connect(url).await else {
        return;
    };

    if write.send(envelope("host", code)).await.is_err() {
        println!("{} Failed to send host event", "✗".red());
        return;
    }

    if keep_alive {
        println!("Participants can now join with code {}", code.green().bold());
        println!("Press {} to disconnect and end the session.", "Ctrl+C".bold());
        follow(&mut read, None).await;
    } else {
        follow(&mut read, Some(Duration::from_secs(2))).await;
        println!("\n{}", "⚠ Note: Connection closed. Session will end.".yellow());
        println!("Use {} to keep the session active.", "--keep-alive".cyan());
    }
}

async fn join_session(url: &str, code: &str) {
    println!("{}", "Joining session...".cyan());
    println!("  Join code: {}", code.bold());

    let Some((mut write, mut read)) = connect(url).await else {
        return;
    };

    if write.send(envelope("join", code)).await.is_err() {
        println!("{} Failed to send join event", "✗".red());
        return;
    }

    follow(&mut read, None).await;
}

async fn next_question(url: &str, code: &str, count: usize) {
    let Some((mut write, mut read)) = connect(url).await else {
        return;
    };

    for _ in 0..count {
        if write.send(envelope("nextQuestion", code)).await.is_err() {
            println!("{} Failed to send nextQuestion event", "✗".red());
            return;
        }
    }

    println!("{} Sent {} nextQuestion event(s)", "✓".green(), count);
    follow(&mut read, Some(Duration::from_secs(1))).await;
}

async fn interactive_mode(url: &str) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let Some((mut write, mut read)) = connect(url).await else {
        return;
    };
    println!("{} Connected to server", "✓".green());

    // Spawn task to receive messages
    let receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = read.next().await {
            if let Message::Text(text) = msg {
                println!("\n{} {}", "◀".green(), text.bright_white());
            }
        }
    });

    loop {
        print!("{} ", "►".cyan());
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }

        if input == "help" {
            print_interactive_help();
            continue;
        }

        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input) {
            if write.send(Message::Text(parsed.to_string())).await.is_ok() {
                println!("{} Message sent", "✓".green());
            } else {
                println!("{} Failed to send message", "✗".red());
                break;
            }
        } else {
            println!("{} Invalid JSON. Type 'help' for examples.", "✗".yellow());
        }
    }

    receive_task.abort();
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("Send event envelopes directly to the server.\n");

    println!("{}", "Example Messages:".bold());
    println!("\n{}:", "Host".cyan());
    println!(r#"  {{"name":"host","data":{{"executionId":"ABC123"}}}}"#);

    println!("\n{}:", "Join".cyan());
    println!(r#"  {{"name":"join","data":{{"executionId":"ABC123"}}}}"#);

    println!("\n{}:", "Next Question".cyan());
    println!(r#"  {{"name":"nextQuestion","data":{{"executionId":"ABC123"}}}}"#);

    println!("\n{}: quit, exit", "Commands".bold());
    println!();
}
