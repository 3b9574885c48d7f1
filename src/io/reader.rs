// src/io/reader.rs
use std::path::Path;

use gdal::raster::Buffer;
use gdal::{Dataset, DatasetOptions, GdalOpenFlags};

use crate::errors::{NdviError, Result};

/// Georeferencing metadata carried from the clipped input to the output
/// unchanged.
pub struct GeoInfo {
    pub projection: String,
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

/// A pixel-space read window into a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub x_off: isize,
    pub y_off: isize,
    pub width: usize,
    pub height: usize,
}

impl GeoInfo {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let (width, height) = dataset.raster_size();
        let geo_transform = dataset.geo_transform()?;

        // The window math below assumes an axis-aligned grid
        if geo_transform[2] != 0.0 || geo_transform[4] != 0.0 {
            return Err(NdviError::UnsupportedFormat(
                "rotated geotransforms are not supported".to_string(),
            ));
        }

        Ok(Self {
            projection: dataset.projection(),
            geo_transform,
            width,
            height,
        })
    }

    /// Georeferenced extent as (min_x, min_y, max_x, max_y).
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let gt = &self.geo_transform;
        let x0 = gt[0];
        let x1 = gt[0] + self.width as f64 * gt[1];
        let y0 = gt[3];
        let y1 = gt[3] + self.height as f64 * gt[5];
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Pixel window covering the intersection of the given bounding box with
    /// this raster's extent, or None when they do not overlap.
    pub fn window(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<PixelWindow> {
        let gt = &self.geo_transform;

        let c0 = (min_x - gt[0]) / gt[1];
        let c1 = (max_x - gt[0]) / gt[1];
        let r0 = (min_y - gt[3]) / gt[5];
        let r1 = (max_y - gt[3]) / gt[5];

        // Snap to the pixel grid before rounding so a coordinate that is a
        // float ulp away from a pixel edge does not bleed into the neighbor
        const GRID_EPS: f64 = 1e-6;

        let col0 = (c0.min(c1) + GRID_EPS).floor().max(0.0) as isize;
        let col1 = ((c0.max(c1) - GRID_EPS).ceil().min(self.width as f64)) as isize;
        let row0 = (r0.min(r1) + GRID_EPS).floor().max(0.0) as isize;
        let row1 = ((r0.max(r1) - GRID_EPS).ceil().min(self.height as f64)) as isize;

        if col1 <= col0 || row1 <= row0 {
            return None;
        }

        Some(PixelWindow {
            x_off: col0,
            y_off: row0,
            width: (col1 - col0) as usize,
            height: (row1 - row0) as usize,
        })
    }

    /// GeoInfo for a window of this raster, with the origin shifted onto the
    /// window's top-left corner.
    pub fn window_geo(&self, window: &PixelWindow) -> GeoInfo {
        let mut gt = self.geo_transform;
        gt[0] += window.x_off as f64 * gt[1];
        gt[3] += window.y_off as f64 * gt[5];

        GeoInfo {
            projection: self.projection.clone(),
            geo_transform: gt,
            width: window.width,
            height: window.height,
        }
    }
}

/// One spectral band held in memory as f32 samples plus the nodata sentinel
/// the validity of each pixel is judged against.
#[derive(Clone)]
pub struct Band {
    buffer: Buffer<f32>,
    nodata: Option<f32>,
}

impl Band {
    pub fn new(buffer: Buffer<f32>, nodata: Option<f32>) -> Self {
        Self { buffer, nodata }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.buffer.shape()
    }

    pub fn data(&self) -> &[f32] {
        self.buffer.data()
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        self.buffer.data_mut()
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<f32>) {
        self.nodata = nodata;
    }

    pub fn is_nodata(&self, value: f32) -> bool {
        self.nodata == Some(value)
    }
}

/// Open a multi-band raster for reading.
pub fn open_raster(path: &Path) -> Result<Dataset> {
    let options = DatasetOptions {
        open_flags: GdalOpenFlags::GDAL_OF_RASTER,
        ..Default::default()
    };
    Dataset::open_ex(path, options)
        .map_err(|e| NdviError::UnsupportedFormat(format!("{}: {e}", path.display())))
}

/// Read one band of a dataset, windowed, as f32 samples. Band indices are
/// 1-based as in the underlying formats.
pub fn read_band(
    dataset: &Dataset,
    band_index: usize,
    window: (isize, isize),
    size: (usize, usize),
) -> Result<Band> {
    let count = dataset.raster_count();
    if band_index < 1 || band_index > count {
        return Err(NdviError::InvalidBandIndex {
            index: band_index,
            count,
        });
    }

    let band = dataset.rasterband(band_index)?;
    let buffer = band.read_as::<f32>(window, size, size, None)?;
    let nodata = band.no_data_value().map(|v| v as f32);

    Ok(Band::new(buffer, nodata))
}
