// src/processing/clip.rs
use std::path::Path;

use gdal::raster::rasterize;
use gdal::vector::{Geometry, LayerAccess};
use gdal::{Dataset, DatasetOptions, DriverManager, GdalOpenFlags};
use gdal_sys::OGRwkbGeometryType;
use itertools::izip;
use tracing::{debug, warn};

use crate::errors::{NdviError, Result};
use crate::io::reader::{self, Band, GeoInfo};
use crate::processing::NODATA_F32;

/// A raster restricted to the study-area extent, with pixels outside the
/// polygons set to nodata.
pub struct ClippedRaster {
    bands: Vec<Band>,
    geo: GeoInfo,
}

impl ClippedRaster {
    /// Access one band, 1-based as in the underlying formats.
    pub fn band(&self, index: usize) -> Result<&Band> {
        if index < 1 || index > self.bands.len() {
            return Err(NdviError::InvalidBandIndex {
                index,
                count: self.bands.len(),
            });
        }
        Ok(&self.bands[index - 1])
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn geo(&self) -> &GeoInfo {
        &self.geo
    }
}

/// Load the polygon features of a study area from any OGR-readable vector
/// source. The layer's spatial reference, when present, is attached to each
/// geometry so the clip can reproject them.
pub fn load_study_area(path: &Path) -> Result<Vec<Geometry>> {
    let options = DatasetOptions {
        open_flags: GdalOpenFlags::GDAL_OF_VECTOR,
        ..Default::default()
    };
    let dataset = Dataset::open_ex(path, options)
        .map_err(|e| NdviError::InvalidStudyArea(format!("{}: {e}", path.display())))?;

    let mut layer = dataset
        .layer(0)
        .map_err(|_| NdviError::InvalidStudyArea("study area has no layers".to_string()))?;

    let layer_srs = layer.spatial_ref();
    if layer_srs.is_none() {
        warn!("study area has no spatial reference, assuming the raster's");
    }

    let mut geometries = Vec::new();
    for feature in layer.features() {
        let Some(geometry) = feature.geometry() else {
            continue;
        };

        match geometry.geometry_type() {
            OGRwkbGeometryType::wkbPolygon | OGRwkbGeometryType::wkbMultiPolygon => {
                let mut geometry = geometry.clone();
                if let Some(srs) = &layer_srs {
                    geometry.set_spatial_ref(srs.clone());
                }
                geometries.push(geometry);
            }
            _ => debug!("skipping non-polygon feature"),
        }
    }

    if geometries.is_empty() {
        return Err(NdviError::InvalidStudyArea(
            "no polygon features in study area".to_string(),
        ));
    }

    Ok(geometries)
}

/// Clip a raster to the study-area polygons.
///
/// The returned raster covers the intersection of the polygons' bounding box
/// with the source extent; pixels whose center falls outside every polygon
/// are set to nodata.
pub fn clip(dataset: &Dataset, geometries: &[Geometry]) -> Result<ClippedRaster> {
    let geo = GeoInfo::from_dataset(dataset)?;

    let raster_srs = dataset.spatial_ref().map_err(|e| {
        NdviError::Reprojection(format!("raster has no usable spatial reference: {e}"))
    })?;

    // Bring every polygon into the raster's spatial reference. Geometries
    // without one are taken to be in raster coordinates already.
    let mut projected = Vec::with_capacity(geometries.len());
    for geometry in geometries {
        if geometry.spatial_ref().is_some() {
            let transformed = geometry
                .transform_to(&raster_srs)
                .map_err(|e| NdviError::Reprojection(e.to_string()))?;
            projected.push(transformed);
        } else {
            projected.push(geometry.clone());
        }
    }

    let (min_x, min_y, max_x, max_y) = match union_envelope(&projected) {
        Some(envelope) => envelope,
        None => {
            return Err(NdviError::InvalidStudyArea(
                "no polygon features in study area".to_string(),
            ))
        }
    };

    let (raster_min_x, raster_min_y, raster_max_x, raster_max_y) = geo.extent();
    if max_x < raster_min_x || min_x > raster_max_x || max_y < raster_min_y || min_y > raster_max_y
    {
        return Err(NdviError::NoIntersection);
    }

    let window = geo
        .window(min_x, min_y, max_x, max_y)
        .ok_or(NdviError::NoIntersection)?;
    let window_geo = geo.window_geo(&window);
    debug!(
        "clip window: {}x{} pixels at ({}, {})",
        window.width, window.height, window.x_off, window.y_off
    );

    let mask = rasterize_mask(&projected, &window_geo)?;

    let band_count = dataset.raster_count();
    let mut bands = Vec::with_capacity(band_count);
    for index in 1..=band_count {
        let mut band = reader::read_band(
            dataset,
            index,
            (window.x_off, window.y_off),
            (window.width, window.height),
        )?;
        apply_mask(&mut band, &mask);
        bands.push(band);
    }

    Ok(ClippedRaster {
        bands,
        geo: window_geo,
    })
}

/// Bounding box over all geometries, as (min_x, min_y, max_x, max_y).
fn union_envelope(geometries: &[Geometry]) -> Option<(f64, f64, f64, f64)> {
    let mut envelope: Option<(f64, f64, f64, f64)> = None;
    for geometry in geometries {
        let e = geometry.envelope();
        envelope = Some(match envelope {
            None => (e.MinX, e.MinY, e.MaxX, e.MaxY),
            Some((min_x, min_y, max_x, max_y)) => (
                min_x.min(e.MinX),
                min_y.min(e.MinY),
                max_x.max(e.MaxX),
                max_y.max(e.MaxY),
            ),
        });
    }
    envelope
}

/// Burn the polygons into an in-memory byte mask sharing the window's grid.
/// GDAL's default pixel-center test decides membership.
fn rasterize_mask(geometries: &[Geometry], geo: &GeoInfo) -> Result<Vec<u8>> {
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut mask_ds = driver.create_with_band_type::<u8, _>("", geo.width, geo.height, 1)?;
    mask_ds.set_projection(&geo.projection)?;
    mask_ds.set_geo_transform(&geo.geo_transform)?;

    for geometry in geometries {
        rasterize(
            &mut mask_ds,
            &[1],
            std::slice::from_ref(geometry),
            &[1.0],
            None,
        )?;
    }

    let buffer = mask_ds.rasterband(1)?.read_as::<u8>(
        (0, 0),
        (geo.width, geo.height),
        (geo.width, geo.height),
        None,
    )?;

    Ok(buffer.data().to_vec())
}

/// Set pixels outside the polygons to the output sentinel, and fold the
/// source nodata value into the same sentinel.
fn apply_mask(band: &mut Band, mask: &[u8]) {
    let input_nodata = band.nodata();

    for (value, &inside) in izip!(band.data_mut(), mask) {
        if inside == 0 || input_nodata == Some(*value) {
            *value = NODATA_F32;
        }
    }

    band.set_nodata(Some(NODATA_F32));
}
