use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use diamond_price::{
    api,
    client::{ClientError, PriceClient},
    config::{AppConfig, FormConfig},
    form,
    pipeline::{FormInput, PriceService},
};

#[derive(Parser)]
#[command(name = "diamond-price")]
#[command(about = "Estimate diamond prices with a pre-trained regression pipeline")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true, env = "DIAMOND_PRICE_CONFIG")]
    config: Option<PathBuf>,

    /// Server address used when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, PartialEq)]
struct ServeArgs {
    /// Port for HTTP API
    #[arg(short, long, default_value = "3000", env = "DIAMOND_PRICE_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "DIAMOND_PRICE_HOST")]
    host: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP prediction server (the default)
    Serve(ServeArgs),
    /// Predict the price of one diamond
    Predict {
        #[command(flatten)]
        input: PredictArgs,

        /// Send the request to a running server instead of loading the model.
        /// Without a URL, `DIAMOND_PRICE_URL` or the local default is used.
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        remote: Option<String>,
    },
    /// Fill in the form interactively
    Form,
    /// Print the form's choices and bounds
    Schema {
        /// Ask a running server instead of reading local config
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        remote: Option<String>,
    },
}

/// Raw field values, passed through as typed so they are validated the same
/// way as form input.
#[derive(Args)]
struct PredictArgs {
    #[arg(long, default_value = "")]
    carat: String,
    #[arg(long, default_value = "")]
    cut: String,
    #[arg(long, default_value = "")]
    color: String,
    #[arg(long, default_value = "")]
    clarity: String,
    #[arg(long, default_value = "")]
    depth: String,
    #[arg(long, default_value = "")]
    table: String,
    #[arg(long, default_value = "")]
    x: String,
    #[arg(long, default_value = "")]
    y: String,
    #[arg(long, default_value = "")]
    z: String,
}

impl From<PredictArgs> for FormInput {
    fn from(args: PredictArgs) -> Self {
        Self {
            carat: args.carat,
            cut: args.cut,
            color: args.color,
            clarity: args.clarity,
            depth: args.depth,
            table: args.table,
            x: args.x,
            y: args.y,
            z: args.z,
        }
    }
}

/// Initialize tracing with output to stderr (interactive modes) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "diamond_price=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Keep stdout for the form and printed results
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(service: PriceService, args: &ServeArgs) -> anyhow::Result<()> {
    let app = api::create_router(service);

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    tracing::info!(
        "Diamond price server listening on http://{}:{}",
        args.host,
        args.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn remote_client(url: String) -> PriceClient {
    if url.is_empty() {
        PriceClient::from_env()
    } else {
        PriceClient::new(url)
    }
}

fn print_form(form: &FormConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(form)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        config,
        serve: default_serve,
        command,
    } = Cli::parse();
    let command = command.unwrap_or(Commands::Serve(default_serve));

    let use_stderr = !matches!(command, Commands::Serve(_));
    init_tracing(use_stderr);

    let config = AppConfig::load(config.as_deref())?;

    match command {
        Commands::Serve(args) => {
            tracing::info!("Starting diamond price server on {}:{}", args.host, args.port);
            let service = PriceService::from_config(&config)?;
            serve(service, &args).await?;
        }
        Commands::Predict {
            input,
            remote: Some(url),
        } => {
            let client = remote_client(url);
            let response = match client.predict(&input.into()).await {
                Ok(response) => response,
                Err(ClientError::Rejected(body)) => {
                    for warning in &body.warnings {
                        eprintln!("warning: {}", warning.message);
                    }
                    anyhow::bail!("{}", body.error);
                }
                Err(e) => return Err(e.into()),
            };
            for warning in &response.warnings {
                eprintln!("warning: {}", warning.message);
            }
            println!("Estimated price: {}", response.result.formatted);
        }
        Commands::Predict {
            input,
            remote: None,
        } => {
            let service = PriceService::from_config(&config)?;
            let submission = service.submit(&input.into());
            for warning in &submission.warnings {
                eprintln!("warning: {}", warning);
            }
            match submission.outcome {
                Ok(result) => println!("Estimated price: {}", result.formatted),
                Err(e) => anyhow::bail!("{}", e),
            }
        }
        Commands::Form => {
            let service = PriceService::from_config(&config)?;
            let stdin = std::io::stdin();
            form::run(&service, stdin.lock(), std::io::stdout())?;
        }
        Commands::Schema { remote: Some(url) } => {
            let form = remote_client(url).form().await?;
            print_form(&form)?;
        }
        Commands::Schema { remote: None } => {
            print_form(&config.form)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("diamond-price").chain(args.iter().copied()))
            .expect("Failed to parse arguments")
    }

    #[test]
    fn no_subcommand_serves_with_flags() {
        let cli = parse(&["--port", "8080", "--host", "0.0.0.0"]);
        assert!(cli.command.is_none());
        assert_eq!(
            cli.serve,
            ServeArgs {
                port: 8080,
                host: "0.0.0.0".to_string()
            }
        );
    }

    #[test]
    fn serve_address_falls_back_to_env() {
        // The only test that reads these variables.
        std::env::set_var("DIAMOND_PRICE_PORT", "8181");
        std::env::set_var("DIAMOND_PRICE_HOST", "0.0.0.0");

        let default = parse(&[]).serve;
        let explicit = match parse(&["serve"]).command {
            Some(Commands::Serve(args)) => args,
            _ => panic!("expected serve"),
        };

        std::env::remove_var("DIAMOND_PRICE_PORT");
        std::env::remove_var("DIAMOND_PRICE_HOST");

        assert_eq!(default.port, 8181);
        assert_eq!(default.host, "0.0.0.0");
        assert_eq!(explicit, default);
    }

    #[test]
    fn predict_remote_url_is_optional() {
        match parse(&["predict", "--carat", "1.0", "--remote"]).command {
            Some(Commands::Predict { input, remote }) => {
                assert_eq!(input.carat, "1.0");
                assert_eq!(remote.as_deref(), Some(""));
            }
            _ => panic!("expected predict"),
        }
        match parse(&["predict", "--remote", "http://example.test/api/v1"]).command {
            Some(Commands::Predict { remote, .. }) => {
                assert_eq!(remote.as_deref(), Some("http://example.test/api/v1"));
            }
            _ => panic!("expected predict"),
        }
    }
}
