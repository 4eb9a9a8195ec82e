//! The binary entry point for the strata voxel batch server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use strata_config::{CliArgs, Config};
use strata_server::{BatchProcessor, FrameConfig, ServerConfig, VoxelServer, WorldRegistry};
use strata_world::{ApplyOptions, MaterialFallback, MaterialRegistry};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    strata_log::init_logging(None, cfg!(debug_assertions), Some(&config));

    let bind_addr = match format!("{}:{}", config.network.bind_address, config.network.port).parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!(
                "Invalid bind address {}:{}: {e}",
                config.network.bind_address, config.network.port
            );
            std::process::exit(1);
        }
    };

    let materials = MaterialRegistry::with_defaults();
    let fallback = MaterialFallback::with_overrides(&materials, &config.apply.material_fallback);
    let worlds = Arc::new(WorldRegistry::with_worlds(config.worlds.names.iter().cloned()));
    tracing::info!(worlds = worlds.len(), materials = materials.len(), "registries ready");

    let processor = Arc::new(BatchProcessor::new(
        worlds,
        materials,
        fallback,
        ApplyOptions {
            skip_air: config.apply.skip_air,
        },
    ));

    spawn_config_reload(Arc::clone(&processor), config.clone(), config_dir);

    let server = VoxelServer::new(
        ServerConfig {
            bind_addr,
            max_connections: config.network.max_connections,
            frame: FrameConfig {
                max_payload_size: config.network.max_frame_bytes,
            },
        },
        processor,
    );

    if let Err(e) = server.run().await {
        tracing::error!("Server terminated: {e}");
        std::process::exit(1);
    }
}

/// Poll `config.ron` and push apply-option changes into the running
/// processor. Network and world changes still require a restart.
fn spawn_config_reload(processor: Arc<BatchProcessor>, mut current: Config, config_dir: PathBuf) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            match current.reload(&config_dir) {
                Ok(Some(new_config)) => {
                    processor.update_options(ApplyOptions {
                        skip_air: new_config.apply.skip_air,
                    });
                    if new_config.network != current.network
                        || new_config.worlds != current.worlds
                    {
                        tracing::warn!(
                            "network/world config changes require a restart to take effect"
                        );
                    }
                    current = new_config;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("config reload failed: {e}"),
            }
        }
    });
}
