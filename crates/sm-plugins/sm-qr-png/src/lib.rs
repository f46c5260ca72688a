//! # sm-qr-png
//!
//! `QrEncoder` backed by the `qrcode` crate. Produces black-on-white PNGs,
//! base64 encoded so they can be dropped into a `data:` URI.

use std::io::Cursor;

use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use sm_core::error::{AppError, Result};
use sm_core::traits::QrEncoder;

/// Pixels per QR module.
pub const DEFAULT_MODULE_PX: u32 = 10;

pub struct PngQrEncoder {
    module_px: u32,
    /// Adds the standard 4-module white border.
    quiet_zone: bool,
}

impl PngQrEncoder {
    pub fn new(module_px: u32, quiet_zone: bool) -> Self {
        Self {
            module_px: module_px.max(1),
            quiet_zone,
        }
    }

    /// Raw PNG bytes for `data`. Picks the smallest version that fits.
    pub fn encode_png(&self, data: &str) -> Result<Vec<u8>> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
            .map_err(|e| AppError::Internal(format!("qr encoding failed: {e}")))?;

        let image = code
            .render::<Luma<u8>>()
            .module_dimensions(self.module_px, self.module_px)
            .quiet_zone(self.quiet_zone)
            .build();

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AppError::Internal(format!("png encoding failed: {e}")))?;
        Ok(png)
    }
}

impl Default for PngQrEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MODULE_PX, true)
    }
}

impl QrEncoder for PngQrEncoder {
    fn encode_png_base64(&self, data: &str) -> Result<String> {
        let png = self.encode_png(data)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    }
}
