// src/processing/indices/ndvi.rs
use gdal::raster::Buffer;
use rayon::prelude::*;

use crate::errors::{NdviError, Result};
use crate::io::reader::Band;
use crate::processing::{IndexCalculator, NODATA_F32};

/// Normalized Difference Vegetation Index (NDVI) calculator
pub struct NDVI {
    red_index: usize,
    nir_index: usize,
    name: String,
}

impl NDVI {
    pub fn new(red_index: usize, nir_index: usize, name: Option<String>) -> Self {
        Self {
            red_index,
            nir_index,
            name: name.unwrap_or_else(|| "NDVI".to_string()),
        }
    }
}

impl IndexCalculator for NDVI {
    fn calculate(&self, inputs: &[Band]) -> Result<Band> {
        let needed = self.red_index.max(self.nir_index) + 1;
        if inputs.len() < needed {
            return Err(NdviError::InvalidBandIndex {
                index: needed,
                count: inputs.len(),
            });
        }

        // Extract input bands
        let red = &inputs[self.red_index];
        let nir = &inputs[self.nir_index];

        let shape = red.shape();
        if shape != nir.shape() {
            return Err(NdviError::DimensionMismatch {
                left: shape,
                right: nir.shape(),
            });
        }

        let red_data = red.data();
        let nir_data = nir.data();

        // Preallocate result buffer
        let mut result_data = vec![0.0f32; shape.0 * shape.1];

        // Calculate NDVI in parallel
        result_data.par_iter_mut().enumerate().for_each(|(i, result)| {
            let red_val = red_data[i];
            let nir_val = nir_data[i];

            *result = if red.is_nodata(red_val) || nir.is_nodata(nir_val) {
                NODATA_F32
            } else {
                let denom = nir_val + red_val;
                if denom == 0.0 {
                    NODATA_F32
                } else {
                    // Already within [-1, 1] for non-negative reflectance
                    ((nir_val - red_val) / denom).max(-1.0).min(1.0)
                }
            };
        });

        Ok(Band::new(Buffer::new(shape, result_data), Some(NODATA_F32)))
    }

    fn required_bands(&self) -> usize {
        2 // NDVI requires exactly 2 bands (Red, NIR)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
