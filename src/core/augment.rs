use crate::utils::error::{PipelineError, Result};
use image::{DynamicImage, ImageBuffer, Pixel};
use ndarray::{s, Array3, ArrayView3};
use std::path::Path;

/// Rotates an `(height, width, channels)` image by `k` quarter turns
/// counter-clockwise. Negative `k` turns clockwise.
pub fn rot90<T: Clone>(image: ArrayView3<'_, T>, k: i32) -> Array3<T> {
    match k.rem_euclid(4) {
        0 => image.to_owned(),
        1 => image
            .permuted_axes([1, 0, 2])
            .slice_move(s![..;-1, .., ..])
            .to_owned(),
        2 => image.slice_move(s![..;-1, ..;-1, ..]).to_owned(),
        _ => image
            .permuted_axes([1, 0, 2])
            .slice_move(s![.., ..;-1, ..])
            .to_owned(),
    }
}

/// Rotates an image 90 degrees counter-clockwise.
pub fn rotate_image<T: Clone>(image: ArrayView3<'_, T>) -> Array3<T> {
    rot90(image, 1)
}

/// Copies an image buffer into an `(height, width, channels)` array, keeping
/// its channel count and subpixel type.
pub fn image_to_array<P: Pixel>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
) -> Result<Array3<P::Subpixel>> {
    let (width, height) = image.dimensions();
    let array = Array3::from_shape_vec(
        (height as usize, width as usize, usize::from(P::CHANNEL_COUNT)),
        image.as_raw().clone(),
    )?;
    Ok(array)
}

pub fn array_to_image<P: Pixel>(
    array: &Array3<P::Subpixel>,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>> {
    let (height, width, channels) = array.dim();
    let expected = usize::from(P::CHANNEL_COUNT);
    if channels != expected {
        return Err(PipelineError::ShapeMismatch {
            name: "image".to_string(),
            expected: vec![height, width, expected],
            actual: vec![height, width, channels],
        });
    }

    // iter() walks in logical order, so rotated (strided) views come out row-major
    let pixels: Vec<P::Subpixel> = array.iter().copied().collect();
    ImageBuffer::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        PipelineError::ProcessingError {
            message: format!("Cannot build a {}x{} image from array", width, height),
        }
    })
}

fn rotate_buffer<P: Pixel>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    k: i32,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>> {
    array_to_image(&rot90(image_to_array(image)?.view(), k))
}

/// Rotates a decoded image `k` quarter turns, keeping its color type.
pub fn rotate_dynamic(image: &DynamicImage, k: i32) -> Result<DynamicImage> {
    let rotated: DynamicImage = match image {
        DynamicImage::ImageLuma8(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageLumaA8(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageRgb8(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageRgba8(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageLuma16(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageLumaA16(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageRgb16(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageRgba16(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageRgb32F(b) => rotate_buffer(b, k)?.into(),
        DynamicImage::ImageRgba32F(b) => rotate_buffer(b, k)?.into(),
        other => {
            return Err(PipelineError::ProcessingError {
                message: format!("Unsupported color type {:?}", other.color()),
            })
        }
    };
    Ok(rotated)
}

/// Loads an image file, rotates it `k` quarter turns and writes it to `output`.
/// The output format follows the output file extension.
pub fn rotate_file(input: &Path, output: &Path, k: i32) -> Result<(u32, u32)> {
    let image = image::open(input)?;
    tracing::debug!(
        "Loaded {} ({}x{}, {:?})",
        input.display(),
        image.width(),
        image.height(),
        image.color()
    );

    let rotated = rotate_dynamic(&image, k)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    rotated.save(output)?;

    Ok((rotated.width(), rotated.height()))
}
