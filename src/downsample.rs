use crate::color::Color;

use image::RgbImage;

/// Output dimensions for a block factor. Pixels past the last full block are dropped.
pub fn output_dimensions(width: u32, height: u32, block_factor: u32) -> (u32, u32) {
    (width / block_factor, height / block_factor)
}

/// The color standing in for output pixel `(out_x, out_y)`.
///
/// Each row of the `k×k` block is averaged first, then the row averages are
/// averaged. Both divisions truncate.
pub fn representative_color(img: &RgbImage, block_factor: u32, out_x: u32, out_y: u32) -> Color {
    if block_factor == 1 {
        return Color::from(*img.get_pixel(out_x, out_y));
    }

    let k = block_factor;
    let (x0, y0) = (out_x * k, out_y * k);
    let mut sum = [0u64; 3];

    for y in y0..y0 + k {
        let mut row = [0u64; 3];
        for x in x0..x0 + k {
            let pixel = img.get_pixel(x, y);
            for c in 0..3 {
                row[c] += pixel[c] as u64;
            }
        }
        for c in 0..3 {
            sum[c] += row[c] / k as u64;
        }
    }

    Color::new(
        (sum[0] / k as u64) as u8,
        (sum[1] / k as u64) as u8,
        (sum[2] / k as u64) as u8,
    )
}
