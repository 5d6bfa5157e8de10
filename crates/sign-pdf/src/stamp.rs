//! Visual signature stamps
//!
//! A stamp is the visible layer of a signature field: a background image
//! with text lines drawn over it. The text template carries `{signer}`
//! and `{timestamp}` tokens; each signing step resolves them at its own
//! signing instant, so the two stamps of a two-signature role can differ
//! in the second.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::ColorType;

use crate::error::PdfError;
use crate::writer::escape_literal;

/// Stamp text template matching the layout produced by the legacy
/// service: three blank lines, then signer and date.
pub const DEFAULT_STAMP_TEXT: &str = "\n\n\nSigned by: {signer}\nDate Signed: {timestamp}";

const FONT_SIZE: f64 = 7.0;
const LEADING: f64 = 8.5;

/// Visual stamp specification: text template, background raster, border.
#[derive(Debug, Clone)]
pub struct StampStyle {
    pub text: String,
    pub background: Vec<u8>,
    pub border_width: u32,
}

impl StampStyle {
    pub fn new(background: Vec<u8>) -> Self {
        Self {
            text: DEFAULT_STAMP_TEXT.to_string(),
            background,
            border_width: 0,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Resolve the template tokens for one signing step.
    pub fn render_text(&self, signer: &str, timestamp: &str) -> String {
        self.text
            .replace("{signer}", signer)
            .replace("{timestamp}", timestamp)
    }
}

/// Raster ready for embedding as an image XObject.
pub(crate) struct PreparedImage {
    pub data: Vec<u8>,
    pub filter: &'static str,
    pub color_space: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Decode the stamp background. JPEG passes through untouched as
/// DCTDecode; everything else is decoded to RGB and Flate-compressed.
pub(crate) fn prepare_image(bytes: &[u8]) -> Result<PreparedImage, PdfError> {
    if bytes.is_empty() {
        return Err(PdfError::Image("empty image data".to_string()));
    }

    let decoded = image::load_from_memory(bytes).map_err(|e| PdfError::Image(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());

    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        let color_space = match decoded.color() {
            ColorType::L8 | ColorType::L16 => "DeviceGray",
            _ => "DeviceRGB",
        };
        return Ok(PreparedImage {
            data: bytes.to_vec(),
            filter: "DCTDecode",
            color_space,
            width,
            height,
        });
    }

    let rgb = decoded.to_rgb8();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(rgb.as_raw())
        .map_err(|e| PdfError::Image(e.to_string()))?;
    let data = encoder
        .finish()
        .map_err(|e| PdfError::Image(e.to_string()))?;

    Ok(PreparedImage {
        data,
        filter: "FlateDecode",
        color_space: "DeviceRGB",
        width,
        height,
    })
}

/// Content stream of the appearance form XObject: the background image
/// scaled to the field box, then the rendered text lines.
pub(crate) fn appearance_stream(text: &str, width: f64, height: f64) -> Vec<u8> {
    let mut content = String::new();
    content.push_str(&format!(
        "q\n{:.2} 0 0 {:.2} 0 0 cm\n/Img0 Do\nQ\n",
        width, height
    ));

    content.push_str(&format!(
        "BT\n/Helv {} Tf\n{} TL\n1 0 0 1 4 {:.2} Tm\n",
        FONT_SIZE,
        LEADING,
        height - LEADING
    ));
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            content.push_str("T*\n");
        }
        if !line.is_empty() {
            content.push_str(&format!("({}) Tj\n", escape_literal(line)));
        }
    }
    content.push_str("ET\n");

    content.into_bytes()
}
