//! Image epochs: named sets of co-registered reflectance bands
//!
//! An [`ImageEpoch`] is one capture of a region. All bands of an epoch share
//! the epoch's shape and [`GeoTransform`]; the before/after epochs handed to
//! a detector must share both as well.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// Tolerance for comparing transforms, as a fraction of the pixel size
const TRANSFORM_TOLERANCE: f64 = 1e-6;

/// Wavelength identity of a reflectance band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
}

impl Band {
    /// Bands every detection strategy may ask for
    pub const REQUIRED: [Band; 4] = [Band::Blue, Band::Red, Band::Nir, Band::Swir1];

    /// Lowercase name, also used as the GeoTIFF file stem
    pub fn name(&self) -> &'static str {
        match self {
            Band::Blue => "blue",
            Band::Green => "green",
            Band::Red => "red",
            Band::Nir => "nir",
            Band::Swir1 => "swir1",
            Band::Swir2 => "swir2",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "blue" | "b" => Ok(Band::Blue),
            "green" | "g" => Ok(Band::Green),
            "red" | "r" => Ok(Band::Red),
            "nir" => Ok(Band::Nir),
            "swir1" | "swir" => Ok(Band::Swir1),
            "swir2" => Ok(Band::Swir2),
            other => Err(Error::InvalidParameter {
                name: "band",
                value: other.to_string(),
                reason: "expected blue, green, red, nir, swir1 or swir2".to_string(),
            }),
        }
    }
}

/// A reflectance raster tagged with its wavelength identity
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub band: Band,
    pub raster: Raster<f64>,
}

impl RasterBand {
    pub fn new(band: Band, raster: Raster<f64>) -> Self {
        Self { band, raster }
    }
}

/// One capture of a region: bands sharing a shape, transform and date
#[derive(Debug, Clone)]
pub struct ImageEpoch {
    name: String,
    acquired: String,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    bands: BTreeMap<Band, Raster<f64>>,
}

impl ImageEpoch {
    /// Create an empty epoch with a fixed grid
    pub fn new(
        name: impl Into<String>,
        acquired: impl Into<String>,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
    ) -> Self {
        Self {
            name: name.into(),
            acquired: acquired.into(),
            rows,
            cols,
            transform,
            bands: BTreeMap::new(),
        }
    }

    /// Build an epoch from bands, taking the grid from the first band.
    ///
    /// Fails with `MisalignedEpochs` if the bands disagree on shape or transform.
    pub fn from_bands(
        name: impl Into<String>,
        acquired: impl Into<String>,
        bands: Vec<RasterBand>,
    ) -> Result<Self> {
        let first = bands.first().ok_or_else(|| Error::InvalidParameter {
            name: "bands",
            value: "[]".to_string(),
            reason: "an epoch needs at least one band".to_string(),
        })?;
        let (rows, cols) = first.raster.shape();
        let transform = *first.raster.transform();

        let mut epoch = Self::new(name, acquired, rows, cols, transform);
        for RasterBand { band, raster } in bands {
            epoch.insert(band, raster)?;
        }
        Ok(epoch)
    }

    /// Add or replace a band. The raster must match the epoch grid.
    pub fn insert(&mut self, band: Band, mut raster: Raster<f64>) -> Result<()> {
        if raster.shape() != (self.rows, self.cols) {
            return Err(Error::MisalignedEpochs {
                reason: format!(
                    "band {} of epoch '{}' is {}x{}, epoch grid is {}x{}",
                    band,
                    self.name,
                    raster.rows(),
                    raster.cols(),
                    self.rows,
                    self.cols
                ),
            });
        }
        if !raster.transform().approx_eq(&self.transform, TRANSFORM_TOLERANCE) {
            return Err(Error::MisalignedEpochs {
                reason: format!(
                    "band {} of epoch '{}' has a different georeferencing transform",
                    band, self.name
                ),
            });
        }
        raster.set_transform(self.transform);
        self.bands.insert(band, raster);
        Ok(())
    }

    /// Builder-style variant of [`ImageEpoch::insert`]
    pub fn with_band(mut self, band: Band, raster: Raster<f64>) -> Result<Self> {
        self.insert(band, raster)?;
        Ok(self)
    }

    /// Look up a band, failing with `MissingBand` if it is absent
    pub fn band(&self, band: Band) -> Result<&Raster<f64>> {
        self.bands.get(&band).ok_or_else(|| Error::MissingBand {
            epoch: self.name.clone(),
            band,
        })
    }

    /// Check that every listed band is present
    pub fn require(&self, bands: &[Band]) -> Result<()> {
        for &band in bands {
            self.band(band)?;
        }
        Ok(())
    }

    /// Present bands in wavelength order
    pub fn bands(&self) -> impl Iterator<Item = Band> + '_ {
        self.bands.keys().copied()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquisition date (ISO 8601)
    pub fn acquired(&self) -> &str {
        &self.acquired
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Fail with `MisalignedEpochs` unless both epochs share shape and transform.
    ///
    /// Transforms are compared coefficient by coefficient within a millionth
    /// of a pixel. That only absorbs round-off in georeferencing tags written
    /// by different tools (float32 pixel scales, origins printed in decimal).
    /// Any sub-pixel shift a resampler could leave behind is far larger and is
    /// rejected.
    pub fn ensure_aligned(before: &ImageEpoch, after: &ImageEpoch) -> Result<()> {
        if before.shape() != after.shape() {
            return Err(Error::MisalignedEpochs {
                reason: format!(
                    "'{}' is {}x{} but '{}' is {}x{}",
                    before.name, before.rows, before.cols, after.name, after.rows, after.cols
                ),
            });
        }
        if !before
            .transform
            .approx_eq(&after.transform, TRANSFORM_TOLERANCE)
        {
            return Err(Error::MisalignedEpochs {
                reason: format!(
                    "'{}' and '{}' have different georeferencing transforms",
                    before.name, after.name
                ),
            });
        }
        Ok(())
    }
}
