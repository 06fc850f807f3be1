//! Bazaar CLI - drive the marketplace client from a terminal.
//!
//! The signed-in user and checkout progress live in `BAZAAR_STATE_DIR`, so
//! consecutive invocations behave like one browser session.
//!
//! # Usage
//!
//! ```bash
//! bazaar login -e jane@example.com -p secret
//! bazaar products list
//! bazaar cart add 3 --quantity 2
//! bazaar checkout address --shipping 7
//! bazaar checkout payment --method CASH_ON_DELIVERY
//! bazaar checkout confirm --place
//! bazaar orders list
//! ```
//!
//! # Commands
//!
//! - `login`, `logout`, `whoami`, `register`, `profile` - Account
//! - `products`, `reviews` - Catalogue
//! - `cart` - Shopping cart
//! - `addresses` - Address book
//! - `checkout` - Address, payment, confirmation and success steps
//! - `orders` - Order history
//! - `seller` - Seller products and fulfilment
//! - `admin` - User management

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_client::models::RegisterRequest;
use bazaar_client::{Marketplace, Navigator, SessionStore};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::{
    AddressAction, AdminAction, CartAction, CheckoutAction, OrderAction, ProductAction,
    ProfileAction, ReviewAction, SellerAction,
};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Sign out and forget checkout progress
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// View or edit the signed-in user's profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Browse the catalogue
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Write product reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Manage saved addresses
    Addresses {
        #[command(subcommand)]
        action: Option<AddressAction>,
    },
    /// Walk through checkout
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: Option<OrderAction>,
    },
    /// Seller dashboard
    Seller {
        #[command(subcommand)]
        action: SellerAction,
    },
    /// Admin dashboard
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CliConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Errors and warnings become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_client=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SessionStore::in_dir(&config.state_dir);
    let market = Marketplace::new(config.client, store, Navigator::new());

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&market, &email, &password).await?;
        }
        Commands::Logout => commands::account::logout(&market)?,
        Commands::Whoami => commands::account::whoami(&market),
        Commands::Register {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                first_name,
                last_name,
                ..RegisterRequest::default()
            };
            commands::account::register(&market, request).await?;
        }
        Commands::Profile { action } => commands::account::profile(&market, action).await?,
        Commands::Products { action } => commands::catalog::products(&market, action).await?,
        Commands::Reviews { action } => commands::catalog::reviews(&market, action).await?,
        Commands::Cart { action } => commands::cart::run(&market, action).await?,
        Commands::Addresses { action } => commands::addresses::run(&market, action).await?,
        Commands::Checkout { action } => commands::checkout::run(&market, action).await?,
        Commands::Orders { action } => commands::orders::run(&market, action).await?,
        Commands::Seller { action } => commands::seller::run(&market, action).await?,
        Commands::Admin { action } => commands::admin::run(&market, action).await?,
    }
    Ok(())
}
