//! Imagery sources
//!
//! The detection core never fetches imagery itself. Whatever sits behind an
//! [`ImagerySource`] is expected to have resampled, reprojected and cloud-masked
//! the bands already; the core only checks that what it receives is aligned.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::epoch::{Band, ImageEpoch, RasterBand};
use crate::error::{Error, Result};
use crate::io::{read_geotiff_samples, SampleKind};

/// Scale applied to integer-coded reflectance when the request names none
///
/// Surface-reflectance products ship reflectance as `DN = ρ · 10 000` in
/// unsigned 16-bit bands.
pub const INTEGER_REFLECTANCE_SCALE: f64 = 1e-4;

/// What to fetch: a region, a date range and a band list
#[derive(Debug, Clone, PartialEq)]
pub struct EpochRequest {
    /// Label carried into the epoch (e.g. "before")
    pub name: String,
    /// Region of interest as `[min_x, min_y, max_x, max_y]`
    pub region: Option<[f64; 4]>,
    /// Inclusive ISO 8601 date range
    pub start_date: String,
    pub end_date: String,
    pub bands: Vec<Band>,
    /// Multiplier turning stored samples into reflectance. `None` picks
    /// [`INTEGER_REFLECTANCE_SCALE`] for integer bands and 1 for float bands.
    pub reflectance_scale: Option<f64>,
}

impl EpochRequest {
    /// Request the bands the detector needs, with no region filter
    pub fn new(
        name: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            region: None,
            start_date: start_date.into(),
            end_date: end_date.into(),
            bands: Band::REQUIRED.to_vec(),
            reflectance_scale: None,
        }
    }

    pub fn with_region(mut self, region: [f64; 4]) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_bands(mut self, bands: &[Band]) -> Self {
        self.bands = bands.to_vec();
        self
    }

    pub fn with_reflectance_scale(mut self, scale: f64) -> Self {
        self.reflectance_scale = Some(scale);
        self
    }

    /// Scale for a band stored as `kind`
    pub fn scale_for(&self, kind: SampleKind) -> Result<f64> {
        match self.reflectance_scale {
            Some(scale) if !(scale.is_finite() && scale > 0.0) => Err(Error::InvalidParameter {
                name: "reflectance_scale",
                value: scale.to_string(),
                reason: "must be a positive finite number".into(),
            }),
            Some(scale) => Ok(scale),
            None => Ok(match kind {
                SampleKind::Integer => INTEGER_REFLECTANCE_SCALE,
                SampleKind::Float => 1.0,
            }),
        }
    }
}

/// Supplies an epoch for a request
pub trait ImagerySource {
    fn fetch(&self, request: &EpochRequest) -> Result<ImageEpoch>;
}

/// A directory holding one single-band GeoTIFF per band (`nir.tif`, `red.tif`, ...)
///
/// The directory is treated as an already composited capture, so the request's
/// date range only labels the epoch. A requested region must overlap the
/// raster extent. Samples are multiplied by the request's reflectance scale on
/// load, so integer DN bands arrive as reflectance.
#[derive(Debug, Clone)]
pub struct GeoTiffDirectory {
    root: PathBuf,
}

impl GeoTiffDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file backing a band
    pub fn band_path(&self, band: Band) -> PathBuf {
        for ext in ["tif", "tiff"] {
            let path = self.root.join(format!("{}.{}", band.name(), ext));
            if path.exists() {
                return path;
            }
        }
        self.root.join(format!("{}.tif", band.name()))
    }
}

impl ImagerySource for GeoTiffDirectory {
    fn fetch(&self, request: &EpochRequest) -> Result<ImageEpoch> {
        let mut bands = Vec::with_capacity(request.bands.len());
        for &band in &request.bands {
            let path = self.band_path(band);
            if !path.exists() {
                return Err(Error::MissingBand {
                    epoch: request.name.clone(),
                    band,
                });
            }
            let (mut raster, kind) = read_geotiff_samples(&path)?;
            let scale = request.scale_for(kind)?;
            if scale != 1.0 {
                raster.data_mut().mapv_inplace(|v| v * scale);
            }
            debug!(band = %band, path = %path.display(), samples = ?kind, scale, "loaded band");
            bands.push(RasterBand::new(band, raster));
        }

        let epoch = ImageEpoch::from_bands(request.name.clone(), request.end_date.clone(), bands)?;

        if let Some(region) = request.region {
            check_overlap(&epoch, region)?;
        }

        info!(
            epoch = epoch.name(),
            rows = epoch.rows(),
            cols = epoch.cols(),
            bands = request.bands.len(),
            "loaded epoch from {}",
            self.root.display()
        );
        Ok(epoch)
    }
}

fn check_overlap(epoch: &ImageEpoch, region: [f64; 4]) -> Result<()> {
    let gt = epoch.transform();
    let corners = [
        gt.apply(0.0, 0.0),
        gt.apply(epoch.cols() as f64, 0.0),
        gt.apply(0.0, epoch.rows() as f64),
        gt.apply(epoch.cols() as f64, epoch.rows() as f64),
    ];
    let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

    let [rx0, ry0, rx1, ry1] = region;
    if rx0 > max_x || rx1 < min_x || ry0 > max_y || ry1 < min_y {
        return Err(Error::InvalidParameter {
            name: "region",
            value: format!("{:?}", region),
            reason: format!(
                "does not overlap epoch '{}' extent [{}, {}, {}, {}]",
                epoch.name(),
                min_x,
                min_y,
                max_x,
                max_y
            ),
        });
    }
    Ok(())
}
