use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use sift_core::{
    BackendError, OutputFormat, SearchError, SearchResults, SiftConfig, SiftError,
    CONFIG_FILE_NAME,
};
use sift_search::llm::{Backend, LlmClient};
use sift_search::search::Searcher;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sift",
    version,
    about = "Semantic search over text, judged by an LLM",
    long_about = "Sift finds the passages of a text that are relevant to a natural-language query.\n\n\
                   The text is read from stdin and sent to an LLM together with the query; the\n\
                   reply is validated into ranked matches with relevance scores, character\n\
                   offsets, and a short reasoning per match.\n\n\
                   Examples:\n  \
                     cat terms.txt | sift \"refund policy\"          Search a document\n  \
                     pbpaste | sift \"mentions of AI\" --format json  Machine-readable output\n  \
                     sift init                                     Create a .sift.toml\n  \
                     sift mcp                                      Serve search over MCP",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// What to look for in the text read from stdin
    query: Option<String>,

    /// Path to configuration file (default: .sift.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for search results.\n\n\
                       Formats:\n  \
                         text      Human-readable summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys; errors are\n            \
                                   printed as {\"error\": \"...\"}\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Model to use (overrides [llm] model)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create a default .sift.toml configuration file
    #[command(long_about = "Create a default .sift.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .sift.toml already exists.")]
    Init,
    /// Start the MCP server for IDE and agent integration
    #[command(
        long_about = "Start the MCP (Model Context Protocol) server.\n\n\
        Exposes the semantic_search tool over stdio transport for use by AI\n\
        coding agents and IDE extensions.\n\n\
        Example:\n  sift mcp --model gpt-4o"
    )]
    Mcp,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const CONFIG_TEMPLATE: &str = r#"# Sift configuration
# See: sift --help

[llm]
# provider = "openai"          # openai | anthropic | gemini | ollama
# model = "gpt-4o-mini"
# api_key = "..."              # or set OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
# base_url = "https://api.openai.com"
# timeout_secs = 120
# temperature = 0.1
# json_mode = true             # ask the provider for a JSON-only reply

[search]
# score_tolerance = 0.0001     # scores this far outside [0, 1] are clamped, not rejected
# check_offsets = true         # reject matches that point past the end of the text
"#;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "sift_cli=debug,sift_core=debug,sift_search=debug,sift_mcp=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_init(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        miette::bail!(miette::miette!(
            help = "Edit the existing file or remove it first",
            "{CONFIG_FILE_NAME} already exists"
        ));
    }
    std::fs::write(&path, CONFIG_TEMPLATE)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("writing {}", path.display())))?;
    println!("Created {CONFIG_FILE_NAME}");
    Ok(())
}

fn build_backend(config: &SiftConfig) -> std::result::Result<Arc<dyn Backend>, SiftError> {
    let client = LlmClient::new(&config.llm).map_err(SearchError::from)?;
    Ok(Arc::new(client))
}

fn missing_key_report(err: &SiftError) -> Option<miette::Report> {
    match err {
        SiftError::Search(SearchError::Backend(BackendError::MissingApiKey {
            provider,
            env_var,
        })) => Some(miette::miette!(
            help = "Set {env_var} or add api_key in your .sift.toml under [llm]",
            "No API key configured for LLM provider '{provider}'"
        )),
        _ => None,
    }
}

fn spinner() -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message("Searching...");
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn load_config(
    explicit: Option<&Path>,
    model: Option<String>,
    cwd: &Path,
) -> std::result::Result<SiftConfig, SiftError> {
    let mut config = SiftConfig::discover(explicit, cwd)?;
    if let Some(model) = model {
        config.llm.model = model;
    }
    debug!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        "configuration loaded"
    );
    Ok(config)
}

async fn serve_mcp(config: SiftConfig) -> std::result::Result<(), SiftError> {
    let searcher = Searcher::new(build_backend(&config)?, config.search);
    sift_mcp::server::run_server(searcher).await
}

async fn execute_search(
    config: SiftConfig,
    query: &str,
) -> std::result::Result<SearchResults, SiftError> {
    let body = sift_search::input::read_body()?;
    let searcher = Searcher::new(build_backend(&config)?, config.search);
    debug!(
        model = searcher.backend().model(),
        body_chars = body.chars().count(),
        "running search"
    );

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let pb = spinner();
    let outcome = searcher.search_with_cancel(query, &body, &cancel).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    ctrl_c.abort();

    Ok(outcome?)
}

fn render(results: &SearchResults, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(results).into_diagnostic()?;
            println!("{json}");
        }
        OutputFormat::Markdown => print!("{}", results.to_markdown()),
        OutputFormat::Text => {
            print!("{results}");
            if results.is_truncated() {
                eprintln!(
                    "note: the model reported {} matches but returned {}",
                    results.total_matches(),
                    results.len()
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().into_diagnostic()?;

    match cli.command {
        Some(Command::Init) => return run_init(&cwd),
        Some(Command::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "sift", &mut std::io::stdout());
            return Ok(());
        }
        Some(Command::Mcp) | None => {}
    }

    // All failures below share one reporting path.
    let outcome = if matches!(cli.command, Some(Command::Mcp)) {
        match load_config(cli.config.as_deref(), cli.model, &cwd) {
            Ok(config) => serve_mcp(config).await.map(|()| None),
            Err(err) => Err(err),
        }
    } else {
        let Some(query) = cli.query else {
            Cli::command().print_help().into_diagnostic()?;
            return Ok(());
        };
        match load_config(cli.config.as_deref(), cli.model, &cwd) {
            Ok(config) => execute_search(config, &query).await.map(Some),
            Err(err) => Err(err),
        }
    };

    match outcome {
        Ok(Some(results)) => render(&results, cli.format),
        Ok(None) => Ok(()),
        Err(err) if cli.format == OutputFormat::Json => {
            let payload = serde_json::json!({ "error": err.to_string() });
            println!("{payload}");
            std::process::exit(1);
        }
        Err(err) => match missing_key_report(&err) {
            Some(report) => Err(report),
            None => Err(err.into()),
        },
    }
}
