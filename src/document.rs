//! PDF document backend.
//!
//! Thin wrapper over `printpdf`: US Letter pages handed out one at a time,
//! a small font set (builtin Helvetica unless external TTFs are
//! configured), and primitive drawing helpers the renderer composes cells
//! from. Document Info metadata (Title/Author/Subject/CreationDate) is
//! written by reloading the finished bytes with `lopdf` (printpdf's own
//! writer) and setting the trailer's Info dictionary before the final
//! save.

use chrono::{DateTime, Local};
use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerIndex,
    PdfLayerReference, PdfPageIndex, Point, Polygon, Px, Rgb,
};
use printpdf::path::{PaintMode, WindingOrder};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::config::AssetConfig;
use crate::layout::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM};

/// An RGB color with components in [0, 1].
pub type Rgb01 = (f32, f32, f32);

/// Average glyph advance as a fraction of the font size, used to estimate
/// text widths for right alignment (builtin fonts carry no metrics here).
const AVG_GLYPH_ADVANCE: f32 = 0.52;

const PT_TO_MM: f32 = 25.4 / 72.0;

/// Errors from the document backend.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The PDF backend refused an operation (font registration, byte
    /// assembly).
    #[error("pdf backend: {0}")]
    Backend(String),

    /// The output file could not be created or written.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The finished document could not be reloaded for metadata.
    #[error("document metadata rewrite: {0}")]
    Metadata(#[from] lopdf::Error),
}

/// Document Info fields, written at save time.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub title: String,
    pub author: String,
    pub subject: String,
}

/// The calendar's font set.
pub struct Fonts {
    /// Titles, day numbers, weekday and place labels.
    pub text: IndirectFontRef,
    /// The large tagline.
    pub display: IndirectFontRef,
    /// Moon phase glyphs (28-symbol table).
    pub moon: IndirectFontRef,
}

/// A multi-page calendar document; pages are appended in order and never
/// revisited.
pub struct CalendarDocument {
    doc: PdfDocumentReference,
    fonts: Fonts,
    first: Option<(PdfPageIndex, PdfLayerIndex)>,
}

impl CalendarDocument {
    /// Create an empty document and register fonts. External font files
    /// are best-effort: a missing or unreadable TTF logs a warning and
    /// falls back to the builtin face.
    pub fn new(title: &str, assets: &AssetConfig) -> Result<Self, DocumentError> {
        let (doc, page1, layer1) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "month",
        );

        let helvetica = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| DocumentError::Backend(e.to_string()))?;
        let helvetica_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| DocumentError::Backend(e.to_string()))?;

        let text = external_font(&doc, assets.title_font.as_deref()).unwrap_or(helvetica.clone());
        let moon = external_font(&doc, assets.moon_font.as_deref()).unwrap_or(helvetica);

        Ok(CalendarDocument {
            doc,
            fonts: Fonts {
                text,
                display: helvetica_bold,
                moon,
            },
            first: Some((page1, layer1)),
        })
    }

    pub fn fonts(&self) -> &Fonts {
        &self.fonts
    }

    /// Hand out the next page's drawing layer. The first call returns the
    /// page created with the document.
    pub fn next_page(&mut self) -> PdfLayerReference {
        let (page, layer) = match self.first.take() {
            Some(first) => first,
            None => self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "month"),
        };
        self.doc.get_page(page).get_layer(layer)
    }

    /// Write the document to `path` with Info metadata attached.
    pub fn save(self, path: &Path, meta: &DocumentMeta) -> Result<(), DocumentError> {
        let bytes = self
            .doc
            .save_to_bytes()
            .map_err(|e| DocumentError::Backend(e.to_string()))?;

        let mut pdf = lopdf::Document::load_mem(&bytes)?;
        let mut info = lopdf::Dictionary::new();
        info.set("Title", lopdf::Object::string_literal(meta.title.clone()));
        info.set("Author", lopdf::Object::string_literal(meta.author.clone()));
        info.set(
            "Subject",
            lopdf::Object::string_literal(meta.subject.clone()),
        );
        info.set(
            "CreationDate",
            lopdf::Object::string_literal(pdf_date(Local::now())),
        );
        let info_id = pdf.add_object(lopdf::Object::Dictionary(info));
        pdf.trailer.set("Info", lopdf::Object::Reference(info_id));

        let file = File::create(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        pdf.save_to(&mut writer).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

fn external_font(doc: &PdfDocumentReference, path: Option<&Path>) -> Option<IndirectFontRef> {
    let path = path?;
    let load = || -> Result<IndirectFontRef, DocumentError> {
        let file = File::open(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        doc.add_external_font(file)
            .map_err(|e| DocumentError::Backend(e.to_string()))
    };
    match load() {
        Ok(font) => Some(font),
        Err(e) => {
            warn!(path = %path.display(), error = %e,
                  "could not load font, using builtin face");
            None
        }
    }
}

/// Info-dictionary date string, `D:YYYYMMDDHHMMSS+HH'MM'`.
fn pdf_date(t: DateTime<Local>) -> String {
    let offset = t.format("%z").to_string();
    format!(
        "D:{}{}'{}'",
        t.format("%Y%m%d%H%M%S"),
        &offset[..3],
        &offset[3..]
    )
}

// ---- drawing helpers ------------------------------------------------------

fn rgb(color: Rgb01) -> Color {
    Color::Rgb(Rgb::new(color.0, color.1, color.2, None))
}

/// Composite `color` at `alpha` over a white page; the backend draws
/// opaque fills only.
pub fn blend_over_white(color: Rgb01, alpha: f32) -> Rgb01 {
    (
        color.0 * alpha + (1.0 - alpha),
        color.1 * alpha + (1.0 - alpha),
        color.2 * alpha + (1.0 - alpha),
    )
}

/// Stroke a straight line; coordinates in page millimeters, width in
/// points.
pub fn stroke_line(
    layer: &PdfLayerReference,
    from: (f32, f32),
    to: (f32, f32),
    width_pt: f32,
    color: Rgb01,
) {
    layer.set_outline_color(rgb(color));
    layer.set_outline_thickness(width_pt);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    });
}

/// Fill a closed polygon; coordinates in page millimeters.
pub fn fill_polygon(layer: &PdfLayerReference, points: &[(f32, f32)], color: Rgb01) {
    if points.len() < 3 {
        return;
    }
    layer.set_fill_color(rgb(color));
    layer.add_polygon(Polygon {
        rings: vec![points
            .iter()
            .map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false))
            .collect()],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

/// Draw left-aligned text at `(x, y)` millimeters (baseline).
pub fn text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    size_pt: f32,
    x: f32,
    y: f32,
    s: &str,
) {
    layer.set_fill_color(rgb((0.0, 0.0, 0.0)));
    layer.use_text(s, size_pt, Mm(x), Mm(y), font);
}

/// Estimated rendered width of `s` in millimeters.
pub fn text_width_mm(s: &str, size_pt: f32) -> f32 {
    s.chars().count() as f32 * size_pt * AVG_GLYPH_ADVANCE * PT_TO_MM
}

/// Draw text with its right edge at `right_x` millimeters.
pub fn right_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    size_pt: f32,
    right_x: f32,
    y: f32,
    s: &str,
) {
    text(layer, font, size_pt, right_x - text_width_mm(s, size_pt), y, s);
}

/// Draw text horizontally centered on `center_x` millimeters.
pub fn centered_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    size_pt: f32,
    center_x: f32,
    y: f32,
    s: &str,
) {
    text(
        layer,
        font,
        size_pt,
        center_x - text_width_mm(s, size_pt) / 2.0,
        y,
        s,
    );
}

/// Embed `logo` with its bottom-left corner at `(x, y)` millimeters,
/// scaled to `width_mm`. Transparency is composited against white.
pub fn embed_logo(layer: &PdfLayerReference, logo: &DynamicImage, x: f32, y: f32, width_mm: f32) {
    let rgba = logo.to_rgba8();
    let (width_px, height_px) = rgba.dimensions();

    let mut rgb_image = image::RgbImage::new(width_px, height_px);
    for (px, py, pixel) in rgba.enumerate_pixels() {
        let image::Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let over = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(px, py, image::Rgb([over(r), over(g), over(b)]));
    }

    let xobject = ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    };

    // DPI chosen so the pixel width lands on the requested physical width.
    let dpi = width_px as f32 / (width_mm / 25.4);
    Image::from(xobject).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn pdf_date_format() {
        let t = Local.with_ymd_and_hms(2015, 7, 4, 12, 30, 45).unwrap();
        let formatted = pdf_date(t);
        assert!(formatted.starts_with("D:20150704123045"));
        assert!(formatted.ends_with('\''));
        assert_eq!(formatted.matches('\'').count(), 2);
    }

    #[test]
    fn blend_over_white_limits() {
        let teal = (82.0 / 255.0, 171.0 / 255.0, 183.0 / 255.0);
        assert_eq!(blend_over_white(teal, 1.0), teal);
        let invisible = blend_over_white(teal, 0.0);
        assert!((invisible.0 - 1.0).abs() < 1e-6);
        let faint = blend_over_white(teal, 0.2);
        assert!(faint.0 > teal.0 && faint.0 < 1.0);
    }

    #[test]
    fn text_width_scales_with_length_and_size() {
        assert!(text_width_mm("July", 72.0) > text_width_mm("May", 72.0));
        assert!(text_width_mm("2015", 72.0) > text_width_mm("2015", 16.0));
    }

    #[test]
    fn document_saves_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.pdf");

        let mut doc =
            CalendarDocument::new("Sun * Moon * Tide 2015 Calendar", &AssetConfig::default())
                .unwrap();
        for _ in 0..2 {
            let layer = doc.next_page();
            stroke_line(&layer, (10.0, 10.0), (100.0, 100.0), 1.5, (0.0, 0.0, 0.0));
        }
        doc.save(
            &path,
            &DocumentMeta {
                title: "Sun * Moon * Tide 2015 Calendar".into(),
                author: "CruzViz".into(),
                subject: "Santa Cruz, CA".into(),
            },
        )
        .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500, "suspiciously small output");

        // The Info dictionary must survive a reload.
        let reloaded = lopdf::Document::load(&path).unwrap();
        let info_ref = reloaded.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = reloaded
            .get_object(info_ref)
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(info.has(b"Title"));
        assert!(info.has(b"Author"));
        assert!(info.has(b"CreationDate"));
    }

    #[test]
    fn missing_external_font_falls_back() {
        let assets = AssetConfig {
            title_font: Some("/nonexistent/foglihten.ttf".into()),
            ..Default::default()
        };
        // Construction succeeds; the builtin face silently stands in.
        assert!(CalendarDocument::new("t", &assets).is_ok());
    }
}
