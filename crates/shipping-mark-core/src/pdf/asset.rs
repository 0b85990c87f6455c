//! Raster image assets stamped onto labels (barcodes, QR codes).

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::params::Rect;

/// A decoded image ready to embed as an image XObject.
#[derive(Clone)]
pub struct ImageAsset {
    width: u32,
    height: u32,
    /// 8-bit RGB samples, row-major
    rgb: Vec<u8>,
    /// 8-bit alpha samples; `None` when the image is fully opaque
    alpha: Option<Vec<u8>>,
}

impl ImageAsset {
    /// Load and decode an image file.
    ///
    /// Fails with `AssetDrawFailure` if the file is missing or undecodable.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::AssetDrawFailure(format!(
                "image not found: {}",
                path.display()
            )));
        }
        let bytes = std::fs::read(path).map_err(|e| {
            Error::AssetDrawFailure(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::AssetDrawFailure(format!("failed to decode image: {e}")))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::AssetDrawFailure("image has no pixels".to_string()));
        }

        let pixels = img.as_raw();
        let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(pixels.len() / 4);
        for px in pixels.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        let opaque = alpha.iter().all(|&a| a == u8::MAX);

        Ok(Self {
            width,
            height,
            rgb,
            alpha: (!opaque).then_some(alpha),
        })
    }

    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Largest rectangle with the image's aspect ratio that fits in `bounds`,
    /// centered in it.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(&self, bounds: Rect) -> Rect {
        let (iw, ih) = (self.width as f32, self.height as f32);
        let scale = (bounds.w / iw).min(bounds.h / ih);
        let (w, h) = (iw * scale, ih * scale);
        Rect {
            x: bounds.x + (bounds.w - w) / 2.0,
            y: bounds.y + (bounds.h - h) / 2.0,
            w,
            h,
        }
    }

    /// Add the image (and its soft mask) to a document.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut dict = self.image_dict("DeviceRGB");

        if let Some(alpha) = &self.alpha {
            let smask_id = doc.add_object(Stream::new(self.image_dict("DeviceGray"), alpha.clone()));
            dict.set("SMask", Object::Reference(smask_id));
        }

        doc.add_object(Stream::new(dict, self.rgb.clone()))
    }

    fn image_dict(&self, color_space: &str) -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(self.width))),
            ("Height", Object::Integer(i64::from(self.height))),
            ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ])
    }
}

impl std::fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAsset")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_alpha", &self.alpha.is_some())
            .finish()
    }
}
