//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Only single-band rasters are supported; values are
//! read into `f64` and any cell equal to the GDAL_NODATA tag becomes NaN.
//! Samples are returned as stored; scaling integer-coded reflectance is up to
//! the caller, which can ask [`read_geotiff_samples`] how the band was stored.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray64Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// How the samples of a band were stored in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Integer,
    Float,
}

/// Read a single-band GeoTIFF into a `Raster<f64>`
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<Raster<f64>> {
    read_geotiff_samples(path).map(|(raster, _)| raster)
}

/// Read a single-band GeoTIFF along with the storage kind of its samples
pub fn read_geotiff_samples<P: AsRef<Path>>(path: P) -> Result<(Raster<f64>, SampleKind)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let (raster, kind) = decode_geotiff(BufReader::new(file))?;
    debug!(
        path = %path.display(),
        rows = raster.rows(),
        cols = raster.cols(),
        samples = ?kind,
        "read GeoTIFF"
    );
    Ok((raster, kind))
}

/// Read a single-band GeoTIFF from an in-memory buffer
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<(Raster<f64>, SampleKind)> {
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<R: Read + Seek>(reader: R) -> Result<(Raster<f64>, SampleKind)> {
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let image = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let (mut data, kind): (Vec<f64>, SampleKind) = match image {
        DecodingResult::F64(buf) => (buf, SampleKind::Float),
        DecodingResult::F32(buf) => (widen(buf), SampleKind::Float),
        DecodingResult::U8(buf) => (widen(buf), SampleKind::Integer),
        DecodingResult::U16(buf) => (widen(buf), SampleKind::Integer),
        DecodingResult::U32(buf) => (widen(buf), SampleKind::Integer),
        DecodingResult::I8(buf) => (widen(buf), SampleKind::Integer),
        DecodingResult::I16(buf) => (widen(buf), SampleKind::Integer),
        DecodingResult::I32(buf) => (widen(buf), SampleKind::Integer),
        _ => {
            return Err(Error::UnsupportedDataType(
                "only single-band integer or float TIFFs are supported".to_string(),
            ))
        }
    };

    // Multi-sample images decode to interleaved buffers of the wrong length.
    if data.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected {} samples for a {}x{} band, found {}",
            rows * cols,
            rows,
            cols,
            data.len()
        )));
    }

    if let Some(nodata) = read_nodata(&mut decoder) {
        for v in data.iter_mut() {
            if *v == nodata {
                *v = f64::NAN;
            }
        }
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    Ok((raster, kind))
}

fn widen<T: Into<f64>>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(Into::into).collect()
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// GeoTransform from ModelPixelScale + ModelTiepoint, if both are present
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Write a raster as a 64-bit float GeoTIFF. NaN cells are tagged as nodata.
pub fn write_geotiff<P: AsRef<Path>>(raster: &Raster<f64>, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;
    debug!(path = %path.display(), "wrote GeoTIFF");
    Ok(())
}

/// Write a raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(raster: &Raster<f64>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<W: Write + Seek>(raster: &Raster<f64>, writer: W) -> Result<()> {
    let gt = raster.transform();
    if !(gt.row_rotation == 0.0 && gt.col_rotation == 0.0) {
        return Err(Error::UnsupportedDataType(
            "rotated transforms cannot be written with pixel-scale tags".to_string(),
        ));
    }

    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;
    let (rows, cols) = raster.shape();
    let data: Vec<f64> = raster.data().iter().copied().collect();

    let mut image = encoder
        .new_image::<Gray64Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    // GTModelTypeGeoKey = projected, GTRasterTypeGeoKey = pixel is area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];

    let tag_err = |e: tiff::TiffError| Error::Other(format!("Cannot write GeoTIFF tag: {}", e));
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, &geokeys[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(GDAL_NODATA, "nan")
        .map_err(tag_err)?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;
    Ok(())
}
