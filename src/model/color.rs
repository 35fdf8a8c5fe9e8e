//! RGBA colors and color generation.

use serde::{Deserialize, Serialize};

/// An 8-bit straight-alpha color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black, used for the root placeholder of a mask history.
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Return a darker color, keeping alpha.
    ///
    /// `factor` follows the percentage convention: 150 divides the
    /// brightness by 1.5, 100 returns the color unchanged.
    pub fn darker(self, factor: u32) -> Self {
        if factor <= 100 {
            return self;
        }
        let scale = |c: u8| ((u32::from(c) * 100) / factor) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }

    /// Build a color from a hue in degrees with fixed saturation/value.
    pub fn from_hue(hue: f32, alpha: u8) -> Self {
        let (r, g, b) = hsv_to_rgb(hue.rem_euclid(360.0), 0.7, 0.9);
        let to_u8 = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(to_u8(r), to_u8(g), to_u8(b), alpha)
    }

    /// Distinct colors for `count` classes, spaced by the golden angle.
    pub fn palette(count: usize, alpha: u8) -> Vec<Rgba> {
        (0..count)
            .map(|i| Self::from_hue(i as f32 * 137.5, alpha))
            .collect()
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Rgba {
    fn from(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}
