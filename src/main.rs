//! Flight Agent CLI entry point

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use flight_agent::config::Config;
use flight_agent::search::{CabinClass, FlightSearchService, ProviderId, TripQuery};
use flight_agent::ui;

#[derive(Parser)]
#[command(name = "flight-agent")]
#[command(about = "✈️ Flight Agent - compare flights across Sky Scrapper and Google Flights")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write API keys and model settings to ~/.flight-agent/config.json
    Onboard,

    /// Chat with the flight agent
    Agent {
        /// Message to send to the agent
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Search flights directly, without the model
    Search {
        /// Origin airport code or city
        #[arg(long)]
        from: String,

        /// Destination airport code or city
        #[arg(long)]
        to: String,

        /// Departure date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Return date (YYYY-MM-DD) for round trips
        #[arg(long = "return")]
        return_date: Option<String>,

        #[arg(long, default_value_t = 1)]
        adults: u32,

        /// economy, premium_economy, business or first
        #[arg(long, default_value = "economy")]
        cabin: String,

        /// Currency code (defaults to the configured currency)
        #[arg(long)]
        currency: Option<String>,

        /// Market locale, e.g. de-DE
        #[arg(long)]
        market: Option<String>,

        /// Two-letter country of the searcher, e.g. DE
        #[arg(long)]
        country: Option<String>,

        /// Language for result text, e.g. de
        #[arg(long)]
        language: Option<String>,

        /// Which providers to query
        #[arg(long, value_enum, default_value_t = Source::All)]
        source: Source,

        /// Maximum offers to print
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Print the raw comparison as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the tool schemas exposed to the model
    Tools,

    /// Show configuration status
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    All,
    SkyScrapper,
    GoogleFlights,
}

impl Source {
    fn providers(self) -> &'static [ProviderId] {
        match self {
            Source::All => &ProviderId::ALL,
            Source::SkyScrapper => &[ProviderId::SkyScrapper],
            Source::GoogleFlights => &[ProviderId::GoogleFlights],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Setup Global Ctrl+C handler
    let exit_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let r = exit_flag.clone();

    ctrlc::set_handler(move || {
        if r.load(std::sync::atomic::Ordering::SeqCst) {
            println!("\n👋 Bye!");
            std::process::exit(0);
        } else {
            println!("\n⚠️  Press Ctrl+C again to exit");
            r.store(true, std::sync::atomic::Ordering::SeqCst);

            // Reset flag after 3 seconds
            let r2 = r.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_secs(3));
                r2.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
    }).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            flight_agent::config::onboard()?;
        }

        Commands::Agent { message } => {
            let config = flight_agent::config::load()?;
            config.validate()?;
            run_agent(&config, message).await?;
        }

        Commands::Search {
            from,
            to,
            date,
            return_date,
            adults,
            cabin,
            currency,
            market,
            country,
            language,
            source,
            limit,
            json,
        } => {
            let config = flight_agent::config::load()?;
            config.validate_sources(source.providers())?;

            let mut builder = TripQuery::builder(from, to, date)
                .return_date(return_date)
                .adults(adults)
                .cabin_class(cabin.parse::<CabinClass>()?)
                .currency(currency.unwrap_or_else(|| config.default_currency.clone()));
            if let Some(market) = market {
                builder = builder.market(market);
            }
            if let Some(country) = country {
                builder = builder.country_code(country);
            }
            if let Some(language) = language {
                builder = builder.language(language);
            }
            let query = builder.build()?;

            run_search(&config, &query, source, limit, json).await?;
        }

        Commands::Tools => {
            let service = FlightSearchService::new(vec![], Duration::from_secs(1));
            let runner = flight_agent::tools::ToolRunner::new_with_flight_tools(service, "USD");
            println!("{}", serde_json::to_string_pretty(&runner.definitions())?);
        }

        Commands::Status => {
            let config = flight_agent::config::load()?;
            print_status(&config);
        }
    }

    Ok(())
}

async fn run_agent(config: &Config, message: Option<String>) -> Result<()> {
    use flight_agent::adapters::{cli::print_response, CliChannel};
    use flight_agent::agent::{AgentLoop, Context, ProviderRegistry};

    let ctx = Context::new(config)?;
    let client = ProviderRegistry::create(config)?;
    let agent = AgentLoop::new(client, config.max_iterations);
    let mut channel = CliChannel::new(agent, ctx);

    match message {
        Some(msg) => {
            // Single message mode
            let response = channel.run_once(&msg).await?;
            print_response(&response);
        }
        None => {
            ui::print_header(&config.model, &config.llm_provider);
            println!("  Ask for flights, e.g. \"JFK to LHR on 2025-06-10\". Type 'exit' to leave.");
            channel.run_interactive().await?;
        }
    }

    Ok(())
}

async fn run_search(config: &Config, query: &TripQuery, source: Source, limit: usize, json: bool) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let providers = flight_agent::providers::ProviderRegistry::from_config(config)?;
    let service = FlightSearchService::new(providers, config.provider_timeout());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("  {spinner:.cyan} {msg}")?);
    spinner.set_message(format!("Searching {}", query));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = match source.providers() {
        [only] => service.search_provider(*only, query).await,
        _ => service.search(query).await,
    };
    spinner.finish_and_clear();

    match outcome {
        Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
        Ok(result) => ui::print_comparison(&result, limit),
        Err(flight_agent::Error::NoResults { failures }) => {
            ui::print_error(&format!("No flights found for {}", query));
            for failure in &failures {
                ui::print_warning(&failure.to_string());
            }
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn print_status(config: &Config) {
    let mark = |value: &str| if value.is_empty() { "not set" } else { "✓" };

    println!("✈️ Flight Agent Status\n");
    println!("Config file: {:?}", flight_agent::config::config_path());
    println!("LLM provider: {}", config.llm_provider);
    println!("Model: {}", config.model);

    match config.llm_provider.as_str() {
        "vertex" => {
            println!("Project: {}", if config.google_cloud_project.is_empty() { "not set" } else { &config.google_cloud_project });
            println!("Location: {}", config.google_cloud_location);
            println!("Access token: {}", mark(&config.vertex_access_token));
        }
        "gemini" => {
            println!("Gemini API: {}", mark(&config.gemini_api_key));
        }
        other => {
            println!("Unknown LLM provider: {}", other);
        }
    }

    println!("LLM providers: {}", flight_agent::agent::ProviderRegistry::available().join(", "));
    println!("Flight providers: {}", flight_agent::providers::ProviderRegistry::available().join(", "));
    println!("Sky Scrapper key: {}", mark(&config.sky_scrapper_api_key));
    println!("SerpApi key: {}", mark(&config.serpapi_api_key));
    println!("Provider timeout: {}s", config.provider_timeout_secs);

    match config.validate() {
        Ok(()) => ui::print_success("Ready"),
        Err(e) => ui::print_warning(&e.to_string()),
    }
}
