//! Spectral vegetation and moisture indices
//!
//! Per-pixel indices computed from single-band reflectance rasters.
//! Invalid pixels are NaN: any input band missing, negative or saturated,
//! a vanishing denominator, or a result outside the physical range [-1, 1].
//! Values are never clamped.

use ndarray::Array2;
use clearcut_core::raster::Raster;
use clearcut_core::{Algorithm, Band, DetectionConfig, Error, ImageEpoch, IndexKind, Result};
use tracing::debug;

use crate::maybe_rayon::*;

/// Denominators smaller than this make an index invalid
const MIN_DENOMINATOR: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Parameters for EVI
#[derive(Debug, Clone, PartialEq)]
pub struct EviParams {
    /// Gain factor (default: 2.5)
    pub g: f64,
    /// Aerosol coefficient for red band (default: 6.0)
    pub c1: f64,
    /// Aerosol coefficient for blue band (default: 7.5)
    pub c2: f64,
    /// Canopy background adjustment (default: 1.0)
    pub l: f64,
}

impl Default for EviParams {
    fn default() -> Self {
        Self {
            g: 2.5,
            c1: 6.0,
            c2: 7.5,
            l: 1.0,
        }
    }
}

/// Parameters shared by all index computations
#[derive(Debug, Clone, PartialEq)]
pub struct IndexParams {
    /// Reflectance at or above this is treated as saturated
    pub saturation_reflectance: f64,
    pub evi: EviParams,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            saturation_reflectance: 1.0,
            evi: EviParams::default(),
        }
    }
}

impl From<&DetectionConfig> for IndexParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            saturation_reflectance: config.saturation_reflectance,
            evi: EviParams::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Dense canopy sits around 0.6 to 0.9, bare soil around 0.1 to 0.2.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>, params: &IndexParams) -> Result<Raster<f64>> {
    per_pixel([nir, red], params, |[n, r]| bounded_ratio(n - r, n + r))
}

// ---------------------------------------------------------------------------
// EVI
// ---------------------------------------------------------------------------

/// Enhanced Vegetation Index (Huete et al., 2002)
///
/// `EVI = G * (NIR - Red) / (NIR + C1 * Red - C2 * Blue + L)`
///
/// Less prone than NDVI to saturate over dense canopy.
pub fn evi(
    nir: &Raster<f64>,
    red: &Raster<f64>,
    blue: &Raster<f64>,
    params: &IndexParams,
) -> Result<Raster<f64>> {
    let p = &params.evi;
    per_pixel([nir, red, blue], params, |[n, r, b]| {
        bounded_ratio(p.g * (n - r), n + p.c1 * r - p.c2 * b + p.l)
    })
}

// ---------------------------------------------------------------------------
// Moisture
// ---------------------------------------------------------------------------

/// Moisture-stress index
///
/// `MSI = (SWIR1 - NIR) / (SWIR1 + NIR)`
///
/// Rises as canopy water content drops, so clearing shows up as an increase.
pub fn moisture_index(
    swir1: &Raster<f64>,
    nir: &Raster<f64>,
    params: &IndexParams,
) -> Result<Raster<f64>> {
    per_pixel([swir1, nir], params, |[s, n]| bounded_ratio(s - n, s + n))
}

// ---------------------------------------------------------------------------
// Per-epoch index set
// ---------------------------------------------------------------------------

/// The three index grids of one epoch
#[derive(Debug, Clone)]
pub struct SpectralIndices {
    pub ndvi: Raster<f64>,
    pub evi: Raster<f64>,
    pub moisture: Raster<f64>,
}

impl SpectralIndices {
    pub fn get(&self, kind: IndexKind) -> &Raster<f64> {
        match kind {
            IndexKind::Ndvi => &self.ndvi,
            IndexKind::Evi => &self.evi,
            IndexKind::Moisture => &self.moisture,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.ndvi.shape()
    }
}

/// Compute NDVI, EVI and moisture for one epoch.
///
/// Fails with `MissingBand` if blue, red, nir or swir1 is absent.
pub fn compute_indices(epoch: &ImageEpoch, params: &IndexParams) -> Result<SpectralIndices> {
    let blue = epoch.band(Band::Blue)?;
    let red = epoch.band(Band::Red)?;
    let nir = epoch.band(Band::Nir)?;
    let swir1 = epoch.band(Band::Swir1)?;

    let (ndvi_grid, (evi_grid, moisture_grid)) = join(
        || ndvi(nir, red, params),
        || {
            join(
                || evi(nir, red, blue, params),
                || moisture_index(swir1, nir, params),
            )
        },
    );

    let indices = SpectralIndices {
        ndvi: ndvi_grid?,
        evi: evi_grid?,
        moisture: moisture_grid?,
    };
    debug!(
        epoch = epoch.name(),
        ndvi_valid = indices.ndvi.valid_count(),
        evi_valid = indices.evi.valid_count(),
        moisture_valid = indices.moisture.valid_count(),
        "computed spectral indices"
    );
    Ok(indices)
}

/// Compute the six index grids of a before/after pair in one fan-out.
pub fn compute_epoch_pair(
    before: &ImageEpoch,
    after: &ImageEpoch,
    params: &IndexParams,
) -> Result<(SpectralIndices, SpectralIndices)> {
    let (b, a) = join(
        || compute_indices(before, params),
        || compute_indices(after, params),
    );
    Ok((b?, a?))
}

/// Index computation as a pipeline stage
#[derive(Debug, Clone, Default)]
pub struct ComputeIndices;

impl Algorithm for ComputeIndices {
    type Input = ImageEpoch;
    type Output = SpectralIndices;
    type Params = IndexParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ComputeIndices"
    }

    fn description(&self) -> &'static str {
        "NDVI, EVI and moisture index grids for one epoch"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        compute_indices(&input, &params)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Evaluate `formula` on every pixel where all `bands` hold usable reflectance.
///
/// The output inherits the first band's transform and uses NaN as no-data.
fn per_pixel<const N: usize, F>(
    bands: [&Raster<f64>; N],
    params: &IndexParams,
    formula: F,
) -> Result<Raster<f64>>
where
    F: Fn([f64; N]) -> f64 + Sync,
{
    let first = bands[0];
    for other in &bands[1..] {
        check_dimensions(first, other)?;
    }

    let (rows, cols) = first.shape();
    let sat = params.saturation_reflectance;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            'pixels: for (col, out) in row_data.iter_mut().enumerate() {
                let mut values = [0.0; N];
                for (value, band) in values.iter_mut().zip(bands) {
                    // SAFETY: every band has the shape checked above
                    let v = unsafe { band.get_unchecked(row, col) };
                    if band.is_nodata(v) || v < 0.0 || v >= sat {
                        continue 'pixels;
                    }
                    *value = v;
                }
                *out = formula(values);
            }
            row_data
        })
        .collect();

    let mut output = first.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[inline]
fn bounded_ratio(num: f64, denom: f64) -> f64 {
    if denom.abs() < MIN_DENOMINATOR {
        return f64::NAN;
    }
    let v = num / denom;
    if (-1.0..=1.0).contains(&v) {
        v
    } else {
        f64::NAN
    }
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
