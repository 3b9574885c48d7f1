// src/batch.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::io::writer::OutputOptions;
use crate::pipeline::{self, NdviParams};

#[derive(Deserialize, Serialize, Debug)]
pub struct BatchConfig {
    #[serde(default)]
    pub global: GlobalParams,
    pub operations: Vec<Operation>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GlobalParams {
    #[serde(default = "default_compress")]
    pub compress: String,
    #[serde(default = "default_compress_level")]
    pub compress_level: u8,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: i32,
    #[serde(default)]
    pub tiled: bool,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            compress: default_compress(),
            compress_level: default_compress_level(),
            fixed: false,
            scale_factor: default_scale_factor(),
            tiled: false,
        }
    }
}

fn default_compress() -> String {
    "DEFLATE".to_string()
}

fn default_compress_level() -> u8 {
    6
}

fn default_scale_factor() -> i32 {
    10000
}

fn default_red_band() -> usize {
    1
}

fn default_nir_band() -> usize {
    4
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Operation {
    pub imagery: String,
    pub study_area: String,
    pub output: String,
    #[serde(default = "default_red_band")]
    pub red_band: usize,
    #[serde(default = "default_nir_band")]
    pub nir_band: usize,
    pub fixed: Option<bool>,
    pub scale_factor: Option<i32>,
    pub compress: Option<String>,
    pub compress_level: Option<u8>,
    pub tiled: Option<bool>,
}

pub fn process_batch(config_path: &Path) -> Result<()> {
    // Read and parse configuration file
    let config_content = fs::read_to_string(config_path)?;
    let config: BatchConfig = serde_json::from_str(&config_content)?;

    info!(
        "Starting batch processing with {} operations",
        config.operations.len()
    );

    // Process each operation with operation-specific overrides
    for (i, op) in config.operations.iter().enumerate() {
        info!(
            "[{}/{}] {} -> {}",
            i + 1,
            config.operations.len(),
            op.imagery,
            op.output
        );

        let options = OutputOptions {
            fixed_point: op.fixed.unwrap_or(config.global.fixed),
            scale_factor: op.scale_factor.unwrap_or(config.global.scale_factor),
            compress: op
                .compress
                .clone()
                .unwrap_or_else(|| config.global.compress.clone()),
            compress_level: op.compress_level.unwrap_or(config.global.compress_level),
            tiled: op.tiled.unwrap_or(config.global.tiled),
        };

        let params = NdviParams {
            imagery: PathBuf::from(&op.imagery),
            study_area: PathBuf::from(&op.study_area),
            output: PathBuf::from(&op.output),
            red_band: op.red_band,
            nir_band: op.nir_band,
            options,
        };

        pipeline::run(&params)?;
    }

    info!("Batch processing complete");
    Ok(())
}
