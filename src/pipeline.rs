// src/pipeline.rs
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::errors::NdviError;
use crate::io::reader;
use crate::io::writer::{self, OutputOptions};
use crate::processing::clip::{self, ClippedRaster};
use crate::processing::indices::NDVI;
use crate::processing::IndexCalculator;

/// Stages of the linear pipeline, in execution order. Each failure is
/// reported with the stage it originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Clip,
    ExtractBands,
    ComputeIndex,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "parameter validation",
            Stage::Clip => "clip",
            Stage::ExtractBands => "band extraction",
            Stage::ComputeIndex => "index computation",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// Parameters for one NDVI run.
pub struct NdviParams {
    pub imagery: PathBuf,
    pub study_area: PathBuf,
    pub output: PathBuf,
    /// 1-based Red band index (NAIP Plus: 1)
    pub red_band: usize,
    /// 1-based NIR band index (NAIP Plus: 4)
    pub nir_band: usize,
    pub options: OutputOptions,
}

/// Run the full pipeline: validate, clip, extract bands, compute, write.
/// A failure in any stage halts the run and leaves no partial output file.
pub fn run(params: &NdviParams) -> Result<()> {
    let start = Instant::now();

    validate(params).with_context(|| format!("{} stage failed", Stage::Validate))?;

    info!(
        "Clipping {} to study area {}",
        params.imagery.display(),
        params.study_area.display()
    );
    let clipped = clip_stage(params).with_context(|| format!("{} stage failed", Stage::Clip))?;
    info!(
        "Clipped extent: {} x {} pixels, {} bands",
        clipped.geo().width,
        clipped.geo().height,
        clipped.band_count()
    );

    let red = clipped
        .band(params.red_band)
        .with_context(|| format!("{} stage failed", Stage::ExtractBands))?
        .clone();
    let nir = clipped
        .band(params.nir_band)
        .with_context(|| format!("{} stage failed", Stage::ExtractBands))?
        .clone();

    let calculator = NDVI::new(0, 1, None);
    info!("Computing {}", calculator.name());
    let result = calculator
        .calculate(&[red, nir])
        .with_context(|| format!("{} stage failed", Stage::ComputeIndex))?;

    info!("Writing {}", params.output.display());
    let written = writer::write_raster(
        &result,
        clipped.geo(),
        calculator.name(),
        &params.output,
        &params.options,
    )
    .with_context(|| format!("{} stage failed", Stage::Write));
    if written.is_err() {
        remove_partial_output(&params.output);
    }
    written?;

    info!("Finished in {:.2?}", start.elapsed());
    Ok(())
}

fn clip_stage(params: &NdviParams) -> crate::errors::Result<ClippedRaster> {
    let dataset = reader::open_raster(&params.imagery)?;
    let geometries = clip::load_study_area(&params.study_area)?;
    clip::clip(&dataset, &geometries)
}

fn validate(params: &NdviParams) -> crate::errors::Result<()> {
    for (label, path) in [
        ("input imagery", &params.imagery),
        ("study area", &params.study_area),
    ] {
        if path.as_os_str().is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{label} path is empty"),
            )
            .into());
        }
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{label} not found: {}", path.display()),
            )
            .into());
        }
    }

    if params.output.as_os_str().is_empty() {
        return Err(NdviError::PathUnwritable {
            path: params.output.clone(),
            reason: "output path is empty".to_string(),
        });
    }

    if params.red_band == params.nir_band {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "red and NIR band indices must differ",
        )
        .into());
    }

    Ok(())
}

fn remove_partial_output(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("could not remove partial output {}: {e}", path.display());
        }
    }
}
