//! Image buffers and PNG output.

use crate::core::common::*;
use crate::core::geometry::Point2;
use crate::core::spectrum::Spectrum;

/// An RGBA colour sample. The solver's transport is three-channel; alpha is
/// forced to 1 at this export boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rgba {
    /// Red channel.
    pub r: Float,

    /// Green channel.
    pub g: Float,

    /// Blue channel.
    pub b: Float,

    /// Alpha channel.
    pub a: Float,
}

impl From<Spectrum> for Rgba {
    /// Expands a three-channel spectrum to RGBA with alpha 1.
    ///
    /// * `s` - The spectrum.
    fn from(s: Spectrum) -> Self {
        let [r, g, b] = s.to_rgb();
        Self { r, g, b, a: 1.0 }
    }
}

/// Stores RGB image data.
pub struct RGBImage {
    /// The pixels, in row-major order.
    pub pixels: Vec<Spectrum>,

    /// Image resolution.
    pub resolution: Point2<usize>,
}

impl RGBImage {
    /// Creates a new image filled with a constant colour.
    ///
    /// * `width`  - Width of image.
    /// * `height` - Height of image.
    /// * `colour` - Fill colour.
    pub fn new(width: usize, height: usize, colour: Spectrum) -> Self {
        Self {
            pixels: vec![colour; width * height],
            resolution: Point2::new(width, height),
        }
    }

    /// Returns the image width.
    pub fn width(&self) -> usize {
        self.resolution.x
    }

    /// Returns the image height.
    pub fn height(&self) -> usize {
        self.resolution.y
    }

    /// Returns the pixel at the given raster position.
    ///
    /// * `x` - Raster column.
    /// * `y` - Raster row.
    pub fn pixel(&self, x: usize, y: usize) -> Spectrum {
        self.pixels[y * self.resolution.x + x]
    }

    /// Sets the pixel at the given raster position.
    ///
    /// * `x`      - Raster column.
    /// * `y`      - Raster row.
    /// * `colour` - The colour to store.
    pub fn set_pixel(&mut self, x: usize, y: usize, colour: Spectrum) {
        self.pixels[y * self.resolution.x + x] = colour;
    }

    /// Writes the image as an 8-bit PNG. Channel values are clamped to [0, 1]
    /// and gamma-encoded with the sRGB exponent.
    ///
    /// * `path` - Output file path.
    pub fn write_png(&self, path: &str) -> Result<(), String> {
        let mut buf = image::RgbImage::new(self.width() as u32, self.height() as u32);
        for (y, row) in self.pixels.chunks(self.width()).enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                let rgb = pixel.clamp(0.0, 1.0).to_rgb();
                buf.put_pixel(
                    x as u32,
                    y as u32,
                    image::Rgb([
                        (rgb[0].powf(1.0 / 2.2) * 255.0) as u8,
                        (rgb[1].powf(1.0 / 2.2) * 255.0) as u8,
                        (rgb[2].powf(1.0 / 2.2) * 255.0) as u8,
                    ]),
                );
            }
        }
        buf.save(path)
            .map_err(|e| format!("Error writing PNG output to '{path}': {e}"))
    }
}

/// Rasterizes the line between two raster positions with Bresenham's
/// algorithm, invoking the callback once per pixel. The callback is
/// responsible for clipping against the raster bounds.
///
/// * `x0`, `y0`   - Start position.
/// * `x1`, `y1`   - End position.
/// * `draw_pixel` - Per-pixel callback.
pub fn bresenham<F>(x0: Int, y0: Int, x1: Int, y1: Int, mut draw_pixel: F)
where
    F: FnMut(Int, Int),
{
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;

    loop {
        draw_pixel(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_from_spectrum_forces_alpha_to_one() {
        let c = Rgba::from(Spectrum::from_rgb([0.1, 0.2, 0.3]));
        assert_eq!(c.a, 1.0);
        assert_eq!(c.r, 0.1);
    }

    #[test]
    fn set_pixel_roundtrips() {
        let mut img = RGBImage::new(4, 3, Spectrum::new(1.0));
        img.set_pixel(2, 1, Spectrum::default());
        assert!(img.pixel(2, 1).is_black());
        assert!(!img.pixel(0, 0).is_black());
    }

    #[test]
    fn bresenham_visits_endpoints_of_diagonal() {
        let mut visited = Vec::new();
        bresenham(0, 0, 3, 3, |x, y| visited.push((x, y)));
        assert_eq!(visited.first(), Some(&(0, 0)));
        assert_eq!(visited.last(), Some(&(3, 3)));
        assert_eq!(visited.len(), 4);
    }

    #[test]
    fn bresenham_handles_steep_and_reversed_lines() {
        let mut count = 0;
        bresenham(5, 10, 5, 0, |_, _| count += 1);
        assert_eq!(count, 11);
    }
}
