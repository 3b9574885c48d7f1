// src/errors.rs
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the NDVI pipeline. Each variant is terminal for the
/// run; nothing is retried.
#[derive(Debug, Error)]
pub enum NdviError {
    #[error("band index {index} out of range, raster has {count} bands")]
    InvalidBandIndex { index: usize, count: usize },

    #[error("cannot decode raster: {0}")]
    UnsupportedFormat(String),

    #[error("study area does not intersect the raster extent")]
    NoIntersection,

    #[error("cannot reproject study area into the raster spatial reference: {0}")]
    Reprojection(String),

    #[error("band dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("output path {path} is not writable: {reason}")]
    PathUnwritable { path: PathBuf, reason: String },

    #[error("invalid study area: {0}")]
    InvalidStudyArea(String),

    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NdviError>;
