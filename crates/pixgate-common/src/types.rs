//! Rendering-parameter types.

use serde::{Deserialize, Serialize};

/// The full parameter tuple describing one rendered variant of an image.
///
/// This tuple is the cache key for previously rendered URLs: two requests
/// with identical parameters resolve to the same cached asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ImageParams {
    /// Image identifier (the `name` the upload was registered under).
    pub name: String,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Fit mode, e.g. `"clip"` or `"crop"`.
    pub fit: String,
    /// Output MIME type, e.g. `"image/webp"`.
    pub mime: String,
    /// Whether a blur pass was applied.
    pub blur: bool,
    /// Output quality, 1-100.
    pub quality: u8,
}

impl ImageParams {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        fit: impl Into<String>,
        mime: impl Into<String>,
        blur: bool,
        quality: u8,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            fit: fit.into(),
            mime: mime.into(),
            blur,
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageParams {
        ImageParams::new("img1", 640, 480, "clip", "image/webp", false, 80)
    }

    #[test]
    fn test_params_equality_is_full_tuple() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a, b);

        b.quality = 90;
        assert_ne!(a, b);
    }

    #[test]
    fn test_params_serde_roundtrip() {
        let params = sample();
        let json = serde_json::to_string(&params).unwrap();
        let back: ImageParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
