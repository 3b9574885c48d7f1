// src/main.rs
use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use naip_ndvi::batch;
use naip_ndvi::cli::{Cli, Commands};
use naip_ndvi::io::writer::OutputOptions;
use naip_ndvi::pipeline::{self, NdviParams};

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Ndvi {
            imagery,
            study_area,
            output,
            red_band,
            nir_band,
        } => {
            let params = NdviParams {
                imagery: imagery.clone(),
                study_area: study_area.clone(),
                output: output.clone(),
                red_band: *red_band,
                nir_band: *nir_band,
                options: OutputOptions {
                    fixed_point: cli.fixed,
                    scale_factor: cli.scale_factor,
                    compress: cli.compress.clone(),
                    compress_level: cli.compress_level,
                    tiled: cli.tiled,
                },
            };

            pipeline::run(&params)?;
            println!("Processing complete: {}", output.display());
        }
        Commands::Batch { config } => {
            batch::process_batch(config)?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}
