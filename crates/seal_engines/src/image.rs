#![forbid(unsafe_code)]

use seal_kernel_contracts::audit_doc::RasterImage;

use crate::error::ImageProcessingError;

/// Decoding collaborator for signature, initials and photo attachments.
///
/// Implementations must return upright pixels (EXIF orientation applied).
pub trait ImageProcessor {
    fn decode_oriented(&self, bytes: &[u8]) -> Result<RasterImage, ImageProcessingError>;

    fn resize(
        &self,
        image: &RasterImage,
        width_px: u32,
        height_px: u32,
    ) -> Result<RasterImage, ImageProcessingError> {
        resize_nearest(image, width_px, height_px)
    }
}

/// Largest size within `max_px` on both axes that keeps the aspect ratio.
/// Never upscales.
pub fn bounded_dimensions(width_px: u32, height_px: u32, max_px: u32) -> (u32, u32) {
    if width_px == 0 || height_px == 0 {
        return (width_px, height_px);
    }
    let scale = (f64::from(max_px) / f64::from(width_px))
        .min(f64::from(max_px) / f64::from(height_px))
        .min(1.0);
    let w = (f64::from(width_px) * scale).round().max(1.0) as u32;
    let h = (f64::from(height_px) * scale).round().max(1.0) as u32;
    (w, h)
}

pub fn resize_nearest(
    image: &RasterImage,
    width_px: u32,
    height_px: u32,
) -> Result<RasterImage, ImageProcessingError> {
    if width_px == 0 || height_px == 0 {
        return Err(ImageProcessingError("target size must be > 0".to_string()));
    }
    let src_w = image.width_px as usize;
    let src_h = image.height_px as usize;
    if image.rgb.len() != src_w * src_h * 3 {
        return Err(ImageProcessingError(
            "pixel buffer does not match dimensions".to_string(),
        ));
    }
    if width_px == image.width_px && height_px == image.height_px {
        return Ok(image.clone());
    }
    let (dst_w, dst_h) = (width_px as usize, height_px as usize);
    let mut rgb = Vec::with_capacity(dst_w * dst_h * 3);
    for y in 0..dst_h {
        let sy = (y * src_h / dst_h).min(src_h - 1);
        for x in 0..dst_w {
            let sx = (x * src_w / dst_w).min(src_w - 1);
            let at = (sy * src_w + sx) * 3;
            rgb.extend_from_slice(&image.rgb[at..at + 3]);
        }
    }
    Ok(RasterImage {
        width_px,
        height_px,
        rgb,
    })
}
