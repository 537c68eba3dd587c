use ci_exercise::{
    calculator::format_number,
    config::EvaluatorConfig,
    string_utils::{
        capitalize_words, count_vowels, is_palindrome, load_string_from_file, reverse_string,
        truncate_string, DEFAULT_SUFFIX,
    },
    Evaluator, InternalResult,
};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to an evaluator config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an arithmetic expression; arguments are joined with spaces
    Eval {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        expression: Vec<String>,
    },
    /// Reverse a string
    Reverse { text: String },
    /// Check whether a string is a palindrome
    Palindrome { text: String },
    /// Count the vowels in a string
    Vowels { text: String },
    /// Capitalize every word of a string
    Capitalize { text: String },
    /// Truncate a string, appending a suffix when it is cut
    Truncate {
        text: String,
        #[arg(short, long)]
        max_length: usize,
        #[arg(short, long, default_value = DEFAULT_SUFFIX)]
        suffix: String,
    },
    /// Load a JSON-encoded string from a file
    LoadJson { path: PathBuf },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Eval { .. } => "eval",
            Command::Reverse { .. } => "reverse",
            Command::Palindrome { .. } => "palindrome",
            Command::Vowels { .. } => "vowels",
            Command::Capitalize { .. } => "capitalize",
            Command::Truncate { .. } => "truncate",
            Command::LoadJson { .. } => "load-json",
        }
    }
}

fn load_config(cli: &Cli) -> InternalResult<EvaluatorConfig> {
    match &cli.config {
        Some(path) => {
            let config = EvaluatorConfig::from_file(path)?;
            info!("config loaded from {}", path.display());
            Ok(config)
        }
        None => Ok(EvaluatorConfig::default()),
    }
}

fn run(cli: &Cli) -> InternalResult<()> {
    let config = load_config(cli)?;
    debug!("config: {:?}", config);

    let (text, value): (String, Value) = match &cli.command {
        Command::Eval { expression } => {
            let expression = expression.join(" ");
            let result = Evaluator::with_config(config).evaluate(expression.trim())?;
            (format_number(result), json!(result))
        }
        Command::Reverse { text } => {
            let reversed = reverse_string(text);
            (reversed.clone(), json!(reversed))
        }
        Command::Palindrome { text } => {
            let result = is_palindrome(text);
            (result.to_string(), json!(result))
        }
        Command::Vowels { text } => {
            let count = count_vowels(text);
            (count.to_string(), json!(count))
        }
        Command::Capitalize { text } => {
            let capitalized = capitalize_words(text);
            (capitalized.clone(), json!(capitalized))
        }
        Command::Truncate {
            text,
            max_length,
            suffix,
        } => {
            let truncated = truncate_string(text, *max_length, suffix)?;
            (truncated.clone(), json!(truncated))
        }
        Command::LoadJson { path } => {
            let data = std::fs::read(path)?;
            let loaded = load_string_from_file(&data)?;
            (loaded.clone(), json!(loaded))
        }
    };

    if cli.json {
        println!(
            "{}",
            json!({ "command": cli.command.name(), "result": value })
        );
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
