use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use offer_scout::api::{OfferApi, OfferClient};
use offer_scout::config::{Settings, SettingsOverrides};
use offer_scout::models::{format_cents, Address, FilterOptions, Offer, SortOption};
use offer_scout::route::Route;
use offer_scout::state::{SearchController, StateStore, StreamOutcome};
use offer_scout::view::{ResultsView, ShareDialog};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "offer-scout", version, about = "Compare internet offers for an address")]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true, env = "OFFER_SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the offers backend
    #[arg(long, global = true, env = "OFFER_SCOUT_API_URL")]
    api_url: Option<String>,

    #[arg(long, global = true, env = "OFFER_SCOUT_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream offers for an address
    Search {
        #[command(flatten)]
        address: AddressArgs,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Load the offers behind a share id
    Shared {
        share_id: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Search, then create a share link with the given filters
    Share {
        #[command(flatten)]
        address: AddressArgs,
        #[command(flatten)]
        view: ViewArgs,
        /// Public origin the link points at
        #[arg(long, default_value = "http://localhost:4200")]
        origin: String,
    },
    /// Resolve a client path such as /offers/shared/<id>
    Open {
        path: String,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
struct AddressArgs {
    #[arg(long)]
    street: String,
    #[arg(long)]
    house_number: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    zip_code: String,
}

impl From<AddressArgs> for Address {
    fn from(args: AddressArgs) -> Self {
        Address::new(args.street, args.house_number, args.city, args.zip_code)
    }
}

#[derive(Args)]
struct ViewArgs {
    #[arg(long)]
    provider: Option<String>,
    /// Require (true) or exclude (false) installation service
    #[arg(long)]
    installation: Option<bool>,
    /// Minimum speed in Mbps
    #[arg(long)]
    speed_min: Option<u32>,
    #[arg(long)]
    age: Option<u32>,
    /// Maximum monthly cost in euros
    #[arg(long)]
    cost_max: Option<i64>,
    #[arg(long)]
    connection_type: Option<String>,
    /// price-asc, price-desc, speed-asc or speed-desc
    #[arg(long, value_parser = parse_sort)]
    sort: Option<&'static SortOption>,
    /// Save the listed offers as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ViewArgs {
    fn filter(&self) -> FilterOptions {
        FilterOptions {
            provider: self.provider.clone(),
            installation: self.installation,
            speed_min: self.speed_min,
            age: self.age,
            cost_max: self.cost_max,
            connection_type: self.connection_type.clone(),
        }
    }
}

fn parse_sort(key: &str) -> Result<&'static SortOption, String> {
    SortOption::from_key(key).ok_or_else(|| format!("unknown sort option: {key}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(
        cli.config.as_deref(),
        SettingsOverrides {
            api_url: cli.api_url.clone(),
            debug: cli.debug.then_some(true),
            ..Default::default()
        },
    )
    .context("Failed to load settings")?;

    init_tracing(&settings);

    info!("🌐 Offer Scout");
    info!("Backend: {}", settings.api_url);

    let api: Arc<dyn OfferApi> =
        Arc::new(OfferClient::new(&settings).context("Failed to create HTTP client")?);
    let store = StateStore::new();
    let mut controller = SearchController::new(Arc::clone(&api), store.clone());

    match cli.command {
        Command::Search { address, view } => {
            controller.start_search(address.into()).await?;
            show_results(&mut controller, &view).await?;
        }
        Command::Shared { share_id, view } => {
            controller.load_shared(&share_id).await?;
            show_results(&mut controller, &view).await?;
        }
        Command::Share {
            address,
            view,
            origin,
        } => {
            controller.start_search(address.into()).await?;
            show_results(&mut controller, &view).await?;

            let Some(query) = store.query() else {
                bail!("No query to share");
            };
            let filters = view.filter();
            let mut dialog = ShareDialog::new(api, origin);
            let link = dialog
                .open(query.address_hash.clone(), store.session_id(), Some(filters))
                .await
                .map(str::to_string);
            match link {
                Some(link) => println!("🔗 {}", link),
                None => bail!(dialog
                    .error()
                    .unwrap_or("No share link was created")
                    .to_string()),
            }
        }
        Command::Open { path, view } => match Route::parse(&path) {
            Route::Landing => {
                warn!("{} has no results page, redirecting to landing page", path);
                println!("{}", Route::Landing.path());
            }
            Route::Results(address) => {
                controller.start_search(address).await?;
                show_results(&mut controller, &view).await?;
            }
            Route::Shared(share_id) => {
                controller.load_shared(&share_id).await?;
                show_results(&mut controller, &view).await?;
            }
        },
    }

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!settings.production)
        .with_writer(std::io::stderr)
        .init();
}

/// Wait for the active stream, then print the filtered and sorted offers
async fn show_results(controller: &mut SearchController, args: &ViewArgs) -> Result<()> {
    let store = controller.store().clone();

    // Progress while the stream is open
    let mut updates = store.subscribe();
    let progress = tokio::spawn(async move {
        let mut last = 0;
        while updates.changed().await.is_ok() {
            let count = updates.borrow_and_update().offer_count();
            if count != last {
                debug!("📦 {} offers so far", count);
                last = count;
            }
        }
    });

    let outcome = controller.wait().await;
    progress.abort();

    if let Some(StreamOutcome::Failed(e)) = &outcome {
        warn!("Stream ended early: {}", e);
        if !store.has_offers() {
            bail!(store.error().unwrap_or_else(|| e.to_string()));
        }
    }

    let mut view = ResultsView::new();
    view.sync(&store);
    view.set_filter(args.filter());
    view.set_sort(args.sort);

    if let Some(query) = view.query() {
        info!("\n✅ {} offers for {}\n", query.offers.len(), query.address);
    }
    if let Some(error) = store.error() {
        println!("⚠️  {}", error);
    }

    let offers = view.filtered_offers();
    print_offers(&offers);

    println!("Providers: {}", view.available_providers().join(", "));
    println!("Connection types: {}", view.available_connection_types().join(", "));
    for chip in view.active_filters() {
        println!("Filter: {}", chip.label);
    }
    if let Some(sort) = view.sort() {
        println!("Sorted by: {}", sort.label);
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&offers)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("💾 Saved {} offers to {}", offers.len(), path.display());
    }

    Ok(())
}

fn print_offers(offers: &[Offer]) {
    for (i, offer) in offers.iter().enumerate() {
        println!(
            "{}. {} {} ({}/month)",
            i + 1,
            offer.provider,
            offer.product_name,
            format_cents(offer.monthly_cost_in_cent)
        );
        println!(
            "   {} Mbps {}, {} months",
            offer.speed, offer.connection_type, offer.contract_duration_in_months
        );
        if let Some(voucher_price) = offer.monthly_cost_in_cent_with_voucher {
            println!("   With voucher: {}", format_cents(voucher_price));
        }
        if let Some(after) = offer.after_two_years_monthly_cost {
            println!("   After two years: {}", format_cents(after));
        }
        if let Some(tv) = &offer.tv {
            println!("   TV: {}", tv);
        }
        if offer.installation_service {
            println!("   Installation service included");
        }
        if offer.is_preliminary {
            println!("   (preliminary)");
        }
        println!();
    }
}
