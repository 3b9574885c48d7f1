// tests/pipeline_tests.rs
use std::fs;
use std::path::{Path, PathBuf};

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use tempfile::TempDir;

use naip_ndvi::errors::NdviError;
use naip_ndvi::io::writer::OutputOptions;
use naip_ndvi::pipeline::{self, NdviParams};
use naip_ndvi::processing::NODATA_F32;

const WIDTH: usize = 8;
const HEIGHT: usize = 8;

/// 8x8 four-band imagery over lon [10.0, 10.08], lat [49.92, 50.0] in
/// EPSG:4326, band fills Red=50, Green=80, Blue=90, NIR=200.
fn write_test_imagery(dir: &Path) -> PathBuf {
    let path = dir.join("imagery.tif");
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut ds = driver
        .create_with_band_type::<u8, _>(&path, WIDTH, HEIGHT, 4)
        .unwrap();

    ds.set_geo_transform(&[10.0, 0.01, 0.0, 50.0, 0.0, -0.01])
        .unwrap();
    let srs = SpatialRef::from_epsg(4326).unwrap();
    ds.set_projection(&srs.to_wkt().unwrap()).unwrap();

    let fills: [u8; 4] = [50, 80, 90, 200];
    for (i, fill) in fills.iter().enumerate() {
        let mut band = ds.rasterband(i + 1).unwrap();
        let mut buffer = Buffer::new((WIDTH, HEIGHT), vec![*fill; WIDTH * HEIGHT]);
        band.write((0, 0), (WIDTH, HEIGHT), &mut buffer).unwrap();
    }

    ds.flush_cache().unwrap();
    path
}

fn write_study_area(dir: &Path, name: &str, geojson: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, geojson).unwrap();
    path
}

fn polygon_geojson(coordinates: &str) -> String {
    format!(
        r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},"geometry":{{"type":"Polygon","coordinates":{coordinates}}}}}]}}"#
    )
}

fn params(imagery: PathBuf, study_area: PathBuf, output: PathBuf) -> NdviParams {
    NdviParams {
        imagery,
        study_area,
        output,
        red_band: 1,
        nir_band: 4,
        options: OutputOptions::default(),
    }
}

fn read_output(path: &Path) -> ((usize, usize), Vec<f32>, Option<f64>) {
    let ds = Dataset::open(path).unwrap();
    assert_eq!(ds.raster_count(), 1);
    let (width, height) = ds.raster_size();
    let band = ds.rasterband(1).unwrap();
    let buffer = band
        .read_as::<f32>((0, 0), (width, height), (width, height), None)
        .unwrap();
    ((width, height), buffer.data().to_vec(), band.no_data_value())
}

fn is_ndvi_error(err: &anyhow::Error, pred: impl Fn(&NdviError) -> bool) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<NdviError>().map_or(false, &pred))
}

/// Red 50 / NIR 200 everywhere inside the study area must come out as 0.6
#[test]
fn test_pipeline_end_to_end() {
    let dir = TempDir::new().unwrap();
    let imagery = write_test_imagery(dir.path());

    // Left half of the raster: lon [10.0, 10.04], full height
    let study_area = write_study_area(
        dir.path(),
        "study.geojson",
        &polygon_geojson("[[[10.0,49.92],[10.04,49.92],[10.04,50.0],[10.0,50.0],[10.0,49.92]]]"),
    );
    let output = dir.path().join("ndvi.tif");

    pipeline::run(&params(imagery, study_area, output.clone())).unwrap();

    let ((width, height), data, nodata) = read_output(&output);
    assert_eq!((width, height), (4, 8));
    assert_eq!(nodata, Some(NODATA_F32 as f64));
    for &value in &data {
        assert!((value - 0.6).abs() < 1e-6, "expected 0.6, got {value}");
    }
}

/// Pixels inside the clip window but outside the polygon must be nodata
#[test]
fn test_pipeline_masks_outside_polygon() {
    let dir = TempDir::new().unwrap();
    let imagery = write_test_imagery(dir.path());

    // Triangle over the top-left corner; its bounding box is 4x4 pixels but
    // the lower-right half of that box is outside the polygon
    let study_area = write_study_area(
        dir.path(),
        "study.geojson",
        &polygon_geojson("[[[10.0,50.0],[10.04,50.0],[10.0,49.96],[10.0,50.0]]]"),
    );
    let output = dir.path().join("ndvi.tif");

    pipeline::run(&params(imagery, study_area, output.clone())).unwrap();

    let ((width, height), data, _) = read_output(&output);
    assert_eq!((width, height), (4, 4));

    // Top-left pixel center is inside the triangle
    assert!((data[0] - 0.6).abs() < 1e-6);
    // Bottom-right pixel center is outside
    assert_eq!(data[3 * width + 3], NODATA_F32);
    // Every pixel is either the index value or the sentinel
    for &value in &data {
        assert!(
            value == NODATA_F32 || (value - 0.6).abs() < 1e-6,
            "unexpected value {value}"
        );
    }
}

/// Two identical runs must produce identical rasters
#[test]
fn test_pipeline_idempotent() {
    let dir = TempDir::new().unwrap();
    let imagery = write_test_imagery(dir.path());
    let study_area = write_study_area(
        dir.path(),
        "study.geojson",
        &polygon_geojson("[[[10.0,49.92],[10.04,49.92],[10.04,50.0],[10.0,50.0],[10.0,49.92]]]"),
    );

    let first = dir.path().join("first.tif");
    let second = dir.path().join("second.tif");
    pipeline::run(&params(imagery.clone(), study_area.clone(), first.clone())).unwrap();
    pipeline::run(&params(imagery, study_area, second.clone())).unwrap();

    let (shape_a, data_a, _) = read_output(&first);
    let (shape_b, data_b, _) = read_output(&second);
    assert_eq!(shape_a, shape_b);
    assert_eq!(data_a, data_b);
}

/// A study area entirely outside the raster fails with NoIntersection and
/// leaves no output file behind
#[test]
fn test_pipeline_no_intersection() {
    let dir = TempDir::new().unwrap();
    let imagery = write_test_imagery(dir.path());
    let study_area = write_study_area(
        dir.path(),
        "study.geojson",
        &polygon_geojson("[[[20.0,40.0],[21.0,40.0],[21.0,41.0],[20.0,41.0],[20.0,40.0]]]"),
    );
    let output = dir.path().join("ndvi.tif");

    let err = pipeline::run(&params(imagery, study_area, output.clone())).unwrap_err();
    assert!(is_ndvi_error(&err, |e| matches!(e, NdviError::NoIntersection)));
    assert!(!output.exists());
}

/// A band index beyond the raster's band count fails in band extraction
#[test]
fn test_pipeline_invalid_band_index() {
    let dir = TempDir::new().unwrap();
    let imagery = write_test_imagery(dir.path());
    let study_area = write_study_area(
        dir.path(),
        "study.geojson",
        &polygon_geojson("[[[10.0,49.92],[10.04,49.92],[10.04,50.0],[10.0,50.0],[10.0,49.92]]]"),
    );
    let output = dir.path().join("ndvi.tif");

    let mut params = params(imagery, study_area, output.clone());
    params.nir_band = 7;

    let err = pipeline::run(&params).unwrap_err();
    assert!(is_ndvi_error(&err, |e| matches!(
        e,
        NdviError::InvalidBandIndex { index: 7, count: 4 }
    )));
    assert!(!output.exists());
}

/// A missing output directory fails with PathUnwritable before any write
#[test]
fn test_pipeline_unwritable_output() {
    let dir = TempDir::new().unwrap();
    let imagery = write_test_imagery(dir.path());
    let study_area = write_study_area(
        dir.path(),
        "study.geojson",
        &polygon_geojson("[[[10.0,49.92],[10.04,49.92],[10.04,50.0],[10.0,50.0],[10.0,49.92]]]"),
    );
    let output = dir.path().join("missing").join("ndvi.tif");

    let err = pipeline::run(&params(imagery, study_area, output.clone())).unwrap_err();
    assert!(is_ndvi_error(&err, |e| matches!(
        e,
        NdviError::PathUnwritable { .. }
    )));
    assert!(!output.exists());
}

/// Fixed-point output carries the scaled values and the int16 sentinel
#[test]
fn test_pipeline_fixed_point_output() {
    let dir = TempDir::new().unwrap();
    let imagery = write_test_imagery(dir.path());
    let study_area = write_study_area(
        dir.path(),
        "study.geojson",
        &polygon_geojson("[[[10.0,49.92],[10.04,49.92],[10.04,50.0],[10.0,50.0],[10.0,49.92]]]"),
    );
    let output = dir.path().join("ndvi_fixed.tif");

    let mut params = params(imagery, study_area, output.clone());
    params.options.fixed_point = true;

    pipeline::run(&params).unwrap();

    let ds = Dataset::open(&output).unwrap();
    let band = ds.rasterband(1).unwrap();
    assert_eq!(band.no_data_value(), Some(-10000.0));

    let (width, height) = ds.raster_size();
    let buffer = band
        .read_as::<i16>((0, 0), (width, height), (width, height), None)
        .unwrap();
    for &value in buffer.data() {
        assert_eq!(value, 6000); // 0.6 * 10000
    }
}
