// src/io/writer.rs
use std::path::Path;

use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{DriverManager, Metadata};

use crate::errors::{NdviError, Result};
use crate::io::reader::{Band, GeoInfo};
use crate::utils::fixed_point::to_fixed_point;

// Sentinel for the int16 fixed-point encoding
const NODATA_VALUE_INT: i16 = -10000;

/// Output encoding and GeoTIFF creation settings.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Encode as int16 fixed-point instead of float32
    pub fixed_point: bool,
    /// Scaling factor for fixed-point encoding
    pub scale_factor: i32,
    /// Compression: DEFLATE, ZSTD, LZW, NONE
    pub compress: String,
    /// Compression level for DEFLATE/ZSTD
    pub compress_level: u8,
    /// Create a tiled GeoTIFF
    pub tiled: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            fixed_point: false,
            scale_factor: 10000,
            compress: "DEFLATE".to_string(),
            compress_level: 6,
            tiled: false,
        }
    }
}

/// Persist a single band as a GeoTIFF, carrying the spatial reference and
/// geotransform through unchanged.
pub fn write_raster(
    band: &Band,
    geo: &GeoInfo,
    name: &str,
    output_path: &Path,
    options: &OutputOptions,
) -> Result<()> {
    check_writable(output_path)?;

    let (width, height) = band.shape();
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let creation_options = creation_options(options);

    if options.fixed_point {
        let mut out_ds = driver
            .create_with_band_type_with_options::<i16, _>(
                output_path,
                width,
                height,
                1,
                &creation_options,
            )
            .map_err(|e| NdviError::PathUnwritable {
                path: output_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        out_ds.set_projection(&geo.projection)?;
        out_ds.set_geo_transform(&geo.geo_transform)?;

        let mut out_band = out_ds.rasterband(1)?;
        out_band.set_no_data_value(Some(NODATA_VALUE_INT as f64))?;
        out_band.set_metadata_item("SCALE", &format!("{}", 1.0 / options.scale_factor as f64), "")?;
        out_band.set_metadata_item("OFFSET", "0", "")?;
        out_band.set_description(&format!("{} (scaled by {})", name, options.scale_factor))?;

        let fixed = to_fixed_point(band.data(), options.scale_factor, band.nodata(), NODATA_VALUE_INT);
        let mut buffer = Buffer::new((width, height), fixed);
        out_band.write((0, 0), (width, height), &mut buffer)?;

        out_ds.flush_cache()?;
    } else {
        let mut out_ds = driver
            .create_with_band_type_with_options::<f32, _>(
                output_path,
                width,
                height,
                1,
                &creation_options,
            )
            .map_err(|e| NdviError::PathUnwritable {
                path: output_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        out_ds.set_projection(&geo.projection)?;
        out_ds.set_geo_transform(&geo.geo_transform)?;

        let mut out_band = out_ds.rasterband(1)?;
        if let Some(nodata) = band.nodata() {
            out_band.set_no_data_value(Some(nodata as f64))?;
        }
        out_band.set_description(name)?;

        let mut buffer = Buffer::new((width, height), band.data().to_vec());
        out_band.write((0, 0), (width, height), &mut buffer)?;

        out_ds.flush_cache()?;
    }

    Ok(())
}

fn creation_options(options: &OutputOptions) -> RasterCreationOptions {
    let mut opts = Vec::new();

    let compress = options.compress.to_uppercase();
    if compress != "NONE" {
        opts.push(format!("COMPRESS={compress}"));

        match compress.as_str() {
            "DEFLATE" => opts.push(format!("ZLEVEL={}", options.compress_level.min(9))),
            "ZSTD" => opts.push(format!("ZSTD_LEVEL={}", options.compress_level.min(22))),
            _ => {}
        }
    }

    if options.tiled {
        opts.push("TILED=YES".to_string());
    }

    opts.push("NUM_THREADS=ALL_CPUS".to_string());

    RasterCreationOptions::from_iter(opts)
}

fn check_writable(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if !parent.is_dir() {
        return Err(NdviError::PathUnwritable {
            path: path.to_path_buf(),
            reason: "parent directory does not exist".to_string(),
        });
    }

    Ok(())
}
