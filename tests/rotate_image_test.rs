use anyhow::Result;
use image::{ColorType, ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use pipeline_kit::core::augment::{image_to_array, rotate_file};
use pipeline_kit::rotate_image;
use tempfile::TempDir;

#[test]
fn test_rotate_file_turns_png_counter_clockwise() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("face.png");
    let output = temp_dir.path().join("rotated/face.png");

    // 4 wide, 2 tall, red marker in the top-right corner
    let mut picture = RgbImage::new(4, 2);
    picture.put_pixel(3, 0, Rgb([255, 0, 0]));
    picture.put_pixel(0, 1, Rgb([0, 0, 255]));
    picture.save(&input)?;

    let dims = rotate_file(&input, &output, 1)?;
    assert_eq!(dims, (2, 4));

    let rotated = image::open(&output)?.to_rgb8();
    assert_eq!(rotated.dimensions(), (2, 4));
    assert_eq!(rotated.get_pixel(0, 0), &Rgb([255, 0, 0]));
    // bottom-left goes to bottom-right
    assert_eq!(rotated.get_pixel(1, 3), &Rgb([0, 0, 255]));

    Ok(())
}

#[test]
fn test_rotate_file_back_and_forth_restores_image() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("in.png");
    let turned = temp_dir.path().join("turned.png");
    let restored = temp_dir.path().join("restored.png");

    let picture = RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 7]));
    picture.save(&input)?;

    rotate_file(&input, &turned, 1)?;
    rotate_file(&turned, &restored, -1)?;

    let restored = image::open(&restored)?.to_rgb8();
    assert_eq!(restored, picture);
    Ok(())
}

#[test]
fn test_rotate_image_matches_file_rotation() -> Result<()> {
    let picture = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 0]));
    let array = image_to_array(&picture)?;

    let rotated = rotate_image(array.view());

    assert_eq!(rotated.dim(), (3, 2, 3));
    // out[i][j] = in[j][W - 1 - i]
    for i in 0..3 {
        for j in 0..2 {
            assert_eq!(rotated[[i, j, 0]], (2 - i) as u8);
            assert_eq!(rotated[[i, j, 1]], j as u8);
        }
    }
    Ok(())
}

#[test]
fn test_rotate_file_keeps_alpha_channel() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("overlay.png");
    let output = temp_dir.path().join("overlay-rotated.png");

    let mut picture = RgbaImage::new(2, 1);
    picture.put_pixel(0, 0, Rgba([10, 20, 30, 0]));
    picture.put_pixel(1, 0, Rgba([40, 50, 60, 128]));
    picture.save(&input)?;

    rotate_file(&input, &output, 1)?;

    let rotated = image::open(&output)?;
    assert_eq!(rotated.color(), ColorType::Rgba8);
    let rotated = rotated.to_rgba8();
    assert_eq!(rotated.dimensions(), (1, 2));
    // right pixel moves to the top
    assert_eq!(rotated.get_pixel(0, 0), &Rgba([40, 50, 60, 128]));
    assert_eq!(rotated.get_pixel(0, 1), &Rgba([10, 20, 30, 0]));
    Ok(())
}

#[test]
fn test_rotate_file_keeps_sixteen_bit_grayscale() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("depth.png");
    let output = temp_dir.path().join("depth-rotated.png");

    let mut picture = ImageBuffer::<Luma<u16>, Vec<u16>>::new(2, 1);
    picture.put_pixel(0, 0, Luma([1_000]));
    picture.put_pixel(1, 0, Luma([65_000]));
    picture.save(&input)?;

    rotate_file(&input, &output, 1)?;

    let rotated = image::open(&output)?;
    assert_eq!(rotated.color(), ColorType::L16);
    let rotated = rotated.to_luma16();
    assert_eq!(rotated.dimensions(), (1, 2));
    assert_eq!(rotated.get_pixel(0, 0), &Luma([65_000]));
    assert_eq!(rotated.get_pixel(0, 1), &Luma([1_000]));
    Ok(())
}

#[test]
fn test_missing_input_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = rotate_file(
        &temp_dir.path().join("missing.png"),
        &temp_dir.path().join("out.png"),
        1,
    );
    assert!(result.is_err());
}
