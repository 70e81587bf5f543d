use std::sync::Arc;

use clap::Parser;
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

use redfish_authz::authz::registry::load_registry;
use redfish_authz::authz::resolver::ResourceTypeResolver;
use redfish_authz::authz::{web, AuthzState};
use redfish_authz::settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "redfish-authz",
    version,
    about = "Redfish privilege-registry authorization service"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    let registry = load_registry(&settings.registry.path)?;
    let routes = settings.route_table()?;
    tracing::info!(routes = routes.len(), "Declared resource routes");

    let resolver = ResourceTypeResolver::new(
        Arc::new(routes),
        Arc::new(settings.resource_type_cache()),
    );
    let state = AuthzState::new(registry, resolver)
        .with_service_root(settings.authz.service_root.clone())
        .with_unknown_resource(settings.authz.unknown_resource);

    web::serve(&settings, Arc::new(state)).await
}
