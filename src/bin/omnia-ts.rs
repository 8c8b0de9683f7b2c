use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use omnia_timeseries::client::{Client, ContentType, QueryParams, ResponseBody};
use omnia_timeseries::credentials::CredentialProvider;
use omnia_timeseries::observability::metrics;
use omnia_timeseries::utils::config_loader;
use omnia_timeseries::utils::logging::{self, LogLevel};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML client config; defaults apply when absent
    #[arg(short, long, env = "CONFIG")]
    config: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved scope, API root and credential kind
    Scope,
    /// GET a path relative to the API root and print the JSON response
    Get {
        path: String,
        /// query parameter as key=value, repeat for lists
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
    /// GET a path, then print the client metrics
    Metrics { path: String },
}

fn parse_key_value(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{raw}'"))?;
    Ok((key.to_owned(), value.to_owned()))
}

fn to_params(pairs: &[(String, String)]) -> QueryParams {
    let mut keys: Vec<&str> = Vec::new();
    for (key, _) in pairs {
        if !keys.contains(&key.as_str()) {
            keys.push(key);
        }
    }
    keys.into_iter().fold(QueryParams::new(), |params, key| {
        let values: Vec<&str> = pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect();
        match values.as_slice() {
            [single] => params.scalar(key, single),
            many => params.list(key, many.iter()),
        }
    })
}

async fn get(client: &Client, path: &str, params: &QueryParams) -> Result<ResponseBody> {
    let url = format!("{}/{}", client.base_url(), path.trim_start_matches('/'));
    let params = (!params.is_empty()).then_some(params);
    client
        .request(Method::GET, &url, ContentType::Json, None, params)
        .await
        .with_context(|| format!("GET {url} failed"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config and start logging
    // -------------------------------

    let args = Args::parse();
    let client_config = config_loader::run(args.config.as_deref()).await?;
    logging::run(&client_config, args.log_level);

    // -------------------------------
    // 2. Build the client: environment, credential, transport
    // -------------------------------

    let client = Client::from_config(&client_config)?;
    info!("client ready");

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    match args.command {
        Command::Scope => {
            println!("scope:      {}", client.scope());
            println!("api root:   {}", client.base_url());
            println!("credential: {}", client.tokens().provider().kind());
        }
        Command::Get { path, query } => {
            if let ResponseBody::Json(value) = get(&client, &path, &to_params(&query)).await? {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        }
        Command::Metrics { path } => {
            get(&client, &path, &QueryParams::new()).await?;
            print!("{}", metrics::render().await);
        }
    }

    Ok(())
}
