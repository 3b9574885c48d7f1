// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "naip-ndvi")]
#[command(about = "NDVI from four-band NAIP imagery, clipped to a study area")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use int16 fixed-point output instead of float32
    #[arg(long, global = true)]
    pub fixed: bool,

    /// Scaling factor for fixed-point output
    #[arg(long, default_value = "10000", global = true)]
    pub scale_factor: i32,

    /// Compression: DEFLATE, ZSTD, LZW, NONE
    #[arg(long, default_value = "DEFLATE", global = true)]
    pub compress: String,

    /// Compression level for DEFLATE/ZSTD
    #[arg(long, default_value = "6", global = true)]
    pub compress_level: u8,

    /// Create a tiled GeoTIFF
    #[arg(long, global = true)]
    pub tiled: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalized Difference Vegetation Index: (NIR-Red)/(NIR+Red)
    Ndvi {
        /// Four-band input imagery (.jp2, GeoTIFF, any GDAL raster)
        imagery: PathBuf,

        /// Study area polygons (shapefile, GeoJSON, any OGR vector)
        study_area: PathBuf,

        /// Output GeoTIFF path
        #[arg(short, long, default_value = "ndvi.tif")]
        output: PathBuf,

        /// Red band index (NAIP Plus: 1)
        #[arg(long, default_value = "1")]
        red_band: usize,

        /// NIR band index (NAIP Plus: 4)
        #[arg(long, default_value = "4")]
        nir_band: usize,
    },

    /// Run several NDVI operations from a JSON configuration file
    Batch {
        /// Batch configuration file
        config: PathBuf,
    },
}
