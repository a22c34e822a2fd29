//! climap - US climate normals pipeline and map-data server
//!
//! This is the main entry point for the climap application.

use std::sync::Arc;
use tracing::{error, info};

use climap::config::require;
use climap::data_loader::load_store;
use climap::pipeline::{extract_boundaries, preprocess_rasters, select_cities};
use climap::server::serve;
use climap::{init_tracing, ClimapError, Command, Config, Result};

fn main() -> Result<()> {
    let (config, command) = Config::load()?;

    init_tracing(&config.log_level);
    info!("Starting climap v{}", env!("CARGO_PKG_VERSION"));

    config
        .validate()
        .and_then(|_| config.validate_for(&command))
        .map_err(|e| {
            error!("Invalid configuration: {}", e);
            e
        })?;

    run(config, command).map_err(|e| {
        error!("climap failed: {}", e);
        e
    })
}

fn run(config: Config, command: Command) -> Result<()> {
    match command {
        Command::PreprocessRasters(_) => {
            let manifest = preprocess_rasters(&config.pipeline)?;
            info!(
                variant = %manifest.variant,
                fields = manifest.fields.len(),
                "Store written"
            );
        }
        Command::ExtractBoundaries(_) => {
            let input = require(&config.pipeline.boundaries_input, "pipeline.boundaries_input")?;
            let output_dir = require(&config.pipeline.output_dir, "pipeline.output_dir")?;
            let points = extract_boundaries(input, output_dir)?;
            info!(points = points, "Boundary bundle written");
        }
        Command::SelectCities(_) => {
            let input = require(&config.pipeline.cities_input, "pipeline.cities_input")?;
            let output_dir = require(&config.pipeline.output_dir, "pipeline.output_dir")?;
            let count = select_cities(input, output_dir, &config.cities)?;
            info!(cities = count, "City markers written");
        }
        Command::Serve(_) => {
            let store_dir = require(&config.server.store_dir, "server.store_dir")?.to_path_buf();
            info!("Loading store: {}", store_dir.display());

            let app_state = load_store(&store_dir, config.clone())?;
            info!(
                fields = app_state.fields().len(),
                grid = ?app_state.normals.grid.shape(),
                "Store loaded"
            );

            let mut builder = tokio::runtime::Builder::new_multi_thread();
            builder.enable_all();
            if let Some(workers) = config.server.workers {
                builder.worker_threads(workers);
            }
            let runtime = builder.build().map_err(|e| ClimapError::Server {
                message: format!("Failed to start runtime: {}", e),
            })?;

            runtime.block_on(serve(
                Arc::new(app_state),
                &config.server.host,
                config.server.port,
            ))?;
        }
    }
    Ok(())
}
