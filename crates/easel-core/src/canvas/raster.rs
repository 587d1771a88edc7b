//! Flat-fill export for [`Scene`](super::Scene).
//!
//! Objects are drawn as their filled bounding boxes. This is enough to
//! produce correctly sized, correctly cropped output without a real renderer.

use super::{CanvasError, CanvasObject, ObjectKind};
use crate::document::Axis;
use kurbo::Rect;
use peniko::Color;

const GUIDELINE_COLOR: Color = Color::from_rgba8(75, 236, 19, 255);

/// Largest PNG side the rasterizer will allocate for.
pub const MAX_RASTER_SIDE: u32 = 16_384;

/// Parse any CSS color into sRGB.
pub fn parse_color(color: &str) -> Result<Color, CanvasError> {
    peniko::color::parse_color(color)
        .map(|parsed| parsed.to_alpha_color())
        .map_err(|e| CanvasError::Color {
            color: color.to_string(),
            reason: e.to_string(),
        })
}

/// Fill of `object`, if it paints anything. `"none"` and empty fills are unpainted.
fn fill_color(object: &CanvasObject) -> Result<Option<Color>, CanvasError> {
    match object.fill.as_deref().map(str::trim) {
        None | Some("") | Some("none") => Ok(None),
        Some(fill) => parse_color(fill).map(Some),
    }
}

/// Area an object covers inside `region`, and the color to paint it with.
fn paint_area(object: &CanvasObject, region: Rect) -> Result<Option<(Rect, Color)>, CanvasError> {
    if !object.visible {
        return Ok(None);
    }
    let (area, color) = match object.kind {
        ObjectKind::GuideLine { axis } => {
            let area = match axis {
                Axis::Horizontal => Rect::new(region.x0, object.top, region.x1, object.top + 1.0),
                Axis::Vertical => Rect::new(object.left, region.y0, object.left + 1.0, region.y1),
            };
            (area, fill_color(object)?.unwrap_or(GUIDELINE_COLOR))
        }
        _ => match fill_color(object)? {
            Some(color) => (object.bounds(), color),
            None => return Ok(None),
        },
    };
    let clipped = area.intersect(region);
    Ok((clipped.area() > 0.0).then_some((clipped, color)))
}

fn region_size(region: Rect) -> Result<(u32, u32), CanvasError> {
    let width = region.width().round();
    let height = region.height().round();
    if !(width >= 1.0 && height >= 1.0) {
        return Err(CanvasError::EmptyRegion);
    }
    let max = f64::from(MAX_RASTER_SIDE);
    if width > max || height > max {
        return Err(CanvasError::TooLarge { width, height });
    }
    Ok((width as u32, height as u32))
}

/// Rasterize `objects` cropped to `region` and encode as PNG.
pub(crate) fn render_png(objects: &[CanvasObject], region: Rect) -> Result<Vec<u8>, CanvasError> {
    let (width, height) = region_size(region)?;
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(CanvasError::TooLarge {
            width: f64::from(width),
            height: f64::from(height),
        })?;
    let mut pixels = vec![0u8; len];

    for object in objects {
        let Some((area, color)) = paint_area(object, region)? else {
            continue;
        };
        let rgba = color.to_rgba8();
        let x0 = (area.x0 - region.x0).floor().max(0.0) as u32;
        let y0 = (area.y0 - region.y0).floor().max(0.0) as u32;
        let x1 = ((area.x1 - region.x0).ceil() as u32).min(width);
        let y1 = ((area.y1 - region.y0).ceil() as u32).min(height);
        for y in y0..y1 {
            for x in x0..x1 {
                let i = (y as usize * width as usize + x as usize) * 4;
                blend(&mut pixels[i..i + 4], [rgba.r, rgba.g, rgba.b, rgba.a]);
            }
        }
    }

    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| CanvasError::Encode(e.to_string()))?;
        writer
            .write_image_data(&pixels)
            .map_err(|e| CanvasError::Encode(e.to_string()))?;
    }
    Ok(png_data)
}

/// Source-over compositing of a straight-alpha color onto a pixel.
fn blend(dst: &mut [u8], src: [u8; 4]) {
    let sa = src[3] as f64 / 255.0;
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let value = (src[c] as f64 * sa + dst[c] as f64 * da * (1.0 - sa)) / out_a;
        dst[c] = value.round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// SVG of `objects` with the viewBox set to `region`.
pub(crate) fn render_svg(objects: &[CanvasObject], region: Rect) -> Result<String, CanvasError> {
    region_size(region)?;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{w}" height="{h}" viewBox="{x} {y} {w} {h}">"#,
        x = region.x0,
        y = region.y0,
        w = region.width(),
        h = region.height(),
    );
    for object in objects.iter().filter(|o| o.visible && !o.is_guideline()) {
        let bounds = object.bounds();
        let fill = object.fill.as_deref().unwrap_or("none");
        svg.push_str(&format!(
            r#"<rect id="{}" x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            escape_attr(&object.id),
            bounds.x0,
            bounds.y0,
            bounds.width(),
            bounds.height(),
            escape_attr(fill),
        ));
    }
    svg.push_str("</svg>");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(color: Color) -> [u8; 4] {
        let c = color.to_rgba8();
        [c.r, c.g, c.b, c.a]
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#fff").map(rgba).unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_color("#102030").map(rgba).unwrap(), [16, 32, 48, 255]);
        assert_eq!(parse_color("#10203080").map(rgba).unwrap(), [16, 32, 48, 128]);
        assert_eq!(parse_color("rgba(255,255,255,1)").map(rgba).unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_color("rgb(1, 2, 3)").map(rgba).unwrap(), [1, 2, 3, 255]);
        assert_eq!(parse_color("White").map(rgba).unwrap(), [255, 255, 255, 255]);
        assert!(matches!(parse_color("#12"), Err(CanvasError::Color { .. })));
        assert!(matches!(parse_color("#\u{e9}1"), Err(CanvasError::Color { .. })));
    }

    #[test]
    fn test_unparseable_fill_is_an_error() {
        let mut object = CanvasObject::workspace(10.0, 10.0, 72.0);
        object.fill = Some("#\u{e9}1".to_string());
        let region = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(matches!(
            render_png(&[object.clone()], region),
            Err(CanvasError::Color { .. })
        ));

        object.fill = Some("none".to_string());
        assert!(render_png(&[object], region).is_ok());
    }

    #[test]
    fn test_oversized_region_is_rejected() {
        let huge = Rect::new(0.0, 0.0, 1e10, 10.0);
        assert!(matches!(render_png(&[], huge), Err(CanvasError::TooLarge { .. })));
        let side = f64::from(MAX_RASTER_SIDE);
        assert!(matches!(
            render_png(&[], Rect::new(0.0, 0.0, side + 1.0, 1.0)),
            Err(CanvasError::TooLarge { .. })
        ));
        assert!(matches!(
            render_png(&[], Rect::new(0.0, 0.0, f64::NAN, 1.0)),
            Err(CanvasError::EmptyRegion)
        ));
    }

    #[test]
    fn test_png_has_region_size_and_fill() {
        let mut object = CanvasObject::workspace(40.0, 20.0, 72.0);
        object.fill = Some("#ff0000".to_string());
        let png_data = render_png(&[object], Rect::new(0.0, 0.0, 40.0, 20.0)).unwrap();

        let decoder = png::Decoder::new(png_data.as_slice());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!((info.width, info.height), (40, 20));
        assert_eq!(&buf[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_empty_region() {
        assert!(matches!(
            render_png(&[], Rect::new(0.0, 0.0, 0.0, 10.0)),
            Err(CanvasError::EmptyRegion)
        ));
    }

    #[test]
    fn test_svg_skips_hidden_and_guides() {
        let mut hidden = CanvasObject::drawable("rect", Rect::new(0.0, 0.0, 5.0, 5.0));
        hidden.visible = false;
        let guide = CanvasObject::guideline(Axis::Horizontal, 3.0);
        let shown = CanvasObject::drawable("rect", Rect::new(1.0, 1.0, 2.0, 2.0));
        let svg = render_svg(&[hidden, guide, shown.clone()], Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(svg.contains(&shown.id));
        assert!(svg.contains(r#"viewBox="0 0 10 10""#));
    }
}
