//! StatusCake CLI — issue authenticated requests against the StatusCake API from the terminal.

mod output;

use clap::{Parser, Subcommand, ValueEnum};
use statuscake_lib::helpers::append_query;
use statuscake_lib::{Client, ConfigurationManager, Method, ParamValue, Params, Timeout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "statuscake")]
#[command(about = "StatusCake CLI — query and update the StatusCake API", long_about = None)]
struct Cli {
    /// Output format: plain (one `path: value` line per field) or json.
    #[arg(short, long, default_value = "plain", value_enum, global = true)]
    output: OutputFormatArg,

    /// Account endpoint; selects the config section holding the API key.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// API key. Prefer STATUSCAKE_API_KEY or a config file.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Read this config file instead of /etc, ~ and ./statuscake.conf.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (default 180).
    #[arg(long, global = true, conflicts_with_all = ["connect_timeout", "read_timeout"])]
    timeout: Option<u64>,

    /// Connect timeout in seconds; use together with --read-timeout.
    #[arg(long, global = true, requires = "read_timeout")]
    connect_timeout: Option<u64>,

    /// Read timeout in seconds; use together with --connect-timeout.
    #[arg(long, global = true, requires = "connect_timeout")]
    read_timeout: Option<u64>,

    /// Print status and body as received, without JSON decoding or status checks.
    #[arg(long, global = true)]
    raw: bool,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path with optional query parameters
    Get {
        /// Path relative to the API base URL, or an absolute URL
        path: String,
        /// Query parameters as key=value
        #[arg(value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,
    },
    /// POST form fields to a path
    Post {
        path: String,
        #[arg(value_parser = parse_param)]
        fields: Vec<(String, ParamValue)>,
    },
    /// PUT form fields to a path
    Put {
        path: String,
        #[arg(value_parser = parse_param)]
        fields: Vec<(String, ParamValue)>,
    },
    /// DELETE a path
    Delete { path: String },
    /// Print a resolved configuration value
    Config { section: String, key: String },
    /// Show version
    Version,
}

/// Parse `key=value`; the value is typed as bool, integer, float or string.
fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in `{}`", s));
    }
    Ok((key.to_string(), ParamValue::infer(value)))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn timeout_from(cli: &Cli) -> Option<Timeout> {
    match (cli.timeout, cli.connect_timeout, cli.read_timeout) {
        (Some(t), _, _) => Some(Timeout::Total(Duration::from_secs(t))),
        (None, Some(c), Some(r)) => Some(Timeout::Split {
            connect: Duration::from_secs(c),
            read: Duration::from_secs(r),
        }),
        _ => None,
    }
}

fn build_client(cli: &Cli) -> Result<Client, String> {
    let mut builder = Client::builder();
    if let Some(endpoint) = &cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(api_key) = &cli.api_key {
        builder = builder.api_key(api_key);
    }
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(timeout) = timeout_from(cli) {
        builder = builder.timeout(timeout);
    }
    tracing::debug!(config = ?cli.config, explicit_key = cli.api_key.is_some(), "building client");
    builder.build().map_err(|e| e.to_string())
}

async fn run(cli: Cli) -> Result<(), String> {
    let format = match cli.output {
        OutputFormatArg::Plain => output::OutputFormat::Plain,
        OutputFormatArg::Json => output::OutputFormat::Json,
    };
    let print_value = |v: &serde_json::Value| -> Result<(), String> {
        match format {
            output::OutputFormat::Plain => println!("{}", output::format_plain(v)),
            output::OutputFormat::Json => {
                println!("{}", output::format_json(v).map_err(|e| e.to_string())?)
            }
        }
        Ok(())
    };

    match &cli.command {
        Commands::Version => {
            println!("statuscake {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Config { section, key } => {
            let config = match &cli.config {
                Some(path) => ConfigurationManager::with_config_file(path),
                None => ConfigurationManager::new(),
            }
            .map_err(|e| e.to_string())?;
            return match config.get(section, key) {
                Some(value) => {
                    println!("{}", value);
                    Ok(())
                }
                None => Err(format!("{}.{} is not set", section, key)),
            };
        }
        _ => {}
    }

    let client = build_client(&cli)?;
    if cli.raw {
        let (method, path, data) = match &cli.command {
            Commands::Get { path, params } => (
                Method::GET,
                append_query(path, &to_params(params).canonicalize()),
                None,
            ),
            Commands::Delete { path } => (Method::DELETE, path.clone(), None),
            Commands::Post { path, fields } => {
                (Method::POST, path.clone(), Some(to_params(fields).canonicalize()))
            }
            Commands::Put { path, fields } => {
                (Method::PUT, path.clone(), Some(to_params(fields).canonicalize()))
            }
            Commands::Version | Commands::Config { .. } => return Ok(()),
        };
        let res = client
            .raw_call(method, &path, data)
            .await
            .map_err(|e| e.to_string())?;
        println!("HTTP {}", res.status_code);
        println!("{}", res.text());
        return Ok(());
    }
    let value = send(&client, &cli.command).await?;
    print_value(&value)
}

/// Issue a request command through the client's verb wrappers.
async fn send(client: &Client, command: &Commands) -> Result<serde_json::Value, String> {
    let result = match command {
        Commands::Get { path, params } => client.get(path, to_params(params)).await,
        Commands::Delete { path } => client.delete(path).await,
        Commands::Post { path, fields } => client.post(path, to_params(fields)).await,
        Commands::Put { path, fields } => client.put(path, to_params(fields)).await,
        Commands::Version | Commands::Config { .. } => return Ok(serde_json::Value::Null),
    };
    result.map_err(|e| e.to_string())
}

fn to_params(pairs: &[(String, ParamValue)]) -> Params {
    pairs.iter().cloned().collect()
}
