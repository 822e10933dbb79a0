use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chatbot::clients::{Client, gemini};
use chatbot::config::Config;
use chatbot::responder::StreamingResponder;
use chatbot::session::Session;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Chat with a Gemini model from the terminal. Type `exit` to quit.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
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
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_configuration() => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> chatbot::Result<()> {
    // A missing credential stops here, before any input is read.
    let config = match &args.env_file {
        Some(path) => Config::from_env_file(path)?,
        None => Config::from_env()?,
    };
    let model = args.model.unwrap_or_else(|| config.model.clone());
    let client: Box<dyn Client> = Box::new(gemini::Client::from_config(&config)?);

    let mut responder = StreamingResponder::new(client, model).with_history(args.with_history);
    if let Some(system) = args.system {
        responder = responder.with_system_instruction(system);
    }
    if let Some(temperature) = args.temperature {
        responder = responder.with_temperature(temperature);
    }
    if let Some(max_output_tokens) = args.max_output_tokens {
        responder = responder.with_max_output_tokens(max_output_tokens);
    }
    tracing::info!(
        model = responder.model(),
        history = responder.includes_history(),
        "chat initialized"
    );

    let mut session = Session::new();
    chatbot::console::run(&responder, &mut session, io::stdin().lock(), io::stdout()).await
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info,chatbot=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
