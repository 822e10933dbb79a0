use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use chat_web::{AppState, router};
use chatbot::clients::{Client, gemini};
use chatbot::config::Config;
use chatbot::responder::StreamingResponder;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Serve a single-page chat backed by a Gemini model.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "CHAT_WEB_LISTEN", default_value = "127.0.0.1:8501")]
    listen: SocketAddr,

    /// Model to use instead of the default.
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Environment file to load instead of searching for `.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Send the earlier turns of the conversation with each prompt.
    #[arg(long)]
    with_history: bool,

    /// System instruction sent with every request.
    #[arg(long, env = "GEMINI_SYSTEM_INSTRUCTION")]
    system: Option<String>,

    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    max_output_tokens: Option<u32>,

    /// Increase log verbosity (-v, -vv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> chatbot::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // A configuration error does not stop the server: the page shows it and
    // every chat action is refused.
    let state = AppState::from_startup(build_responder(&args));
    if let AppState::Misconfigured(message) = &state {
        eprintln!("{message}");
    }

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving chat");
    println!("Chat available at http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_responder(args: &Args) -> chatbot::Result<StreamingResponder> {
    let config = match &args.env_file {
        Some(path) => Config::from_env_file(path)?,
        None => Config::from_env()?,
    };
    let model = args.model.clone().unwrap_or_else(|| config.model.clone());
    let client: Box<dyn Client> = Box::new(gemini::Client::from_config(&config)?);

    let mut responder = StreamingResponder::new(client, model).with_history(args.with_history);
    if let Some(system) = &args.system {
        responder = responder.with_system_instruction(system.as_str());
    }
    if let Some(temperature) = args.temperature {
        responder = responder.with_temperature(temperature);
    }
    if let Some(max_output_tokens) = args.max_output_tokens {
        responder = responder.with_max_output_tokens(max_output_tokens);
    }
    Ok(responder)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,chat_web=info",
        1 => "info,chatbot=debug,chat_web=debug,tower_http=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
