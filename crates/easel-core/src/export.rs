//! Data URIs and PNG resolution metadata.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

const METERS_PER_INCH: f64 = 0.0254;

/// Errors from building or decoding export payloads.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("png decode error: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("png encode error: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("malformed data uri")]
    MalformedUri,
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Re-encode `png_data` with its pixel density set to `dpi`.
pub fn stamp_png_dpi(png_data: &[u8], dpi: f64) -> Result<Vec<u8>, ExportError> {
    let decoder = png::Decoder::new(png_data);
    let mut reader = decoder.read_info()?;
    let mut pixels = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut pixels)?;
    pixels.truncate(frame.buffer_size());

    let pixels_per_meter = (dpi / METERS_PER_INCH).round() as u32;
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(frame.color_type);
        encoder.set_depth(frame.bit_depth);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels)?;
    }
    Ok(out)
}

/// DPI recorded in a PNG's `pHYs` chunk, if any.
pub fn png_dpi(png_data: &[u8]) -> Result<Option<f64>, ExportError> {
    let reader = png::Decoder::new(png_data).read_info()?;
    Ok(reader.info().pixel_dims.and_then(|dims| match dims.unit {
        png::Unit::Meter => Some(dims.xppu as f64 * METERS_PER_INCH),
        png::Unit::Unspecified => None,
    }))
}

pub fn png_data_uri(png_data: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png_data))
}

pub fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;charset=utf-8,{}", urlencoding::encode(svg))
}

pub fn json_data_uri(json: &str) -> String {
    format!("data:text/json;charset=utf-8,{}", urlencoding::encode(json))
}

/// Split a data URI into its mime type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), ExportError> {
    let rest = uri.strip_prefix("data:").ok_or(ExportError::MalformedUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ExportError::MalformedUri)?;
    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().to_string();
    if params.any(|param| param == "base64") {
        return Ok((mime, STANDARD.decode(payload)?));
    }
    let text = urlencoding::decode(payload).map_err(|_| ExportError::MalformedUri)?;
    Ok((mime, text.into_owned().into_bytes()))
}
