/// DPI at which one DIP equals one physical pixel.
pub const DEFAULT_DPI: f32 = 96.0;

/// Converts physical pixels to DIPs at `dpi`.
#[inline]
pub fn pixels_to_dips(pixels: i32, dpi: f32) -> f32 {
    pixels as f32 * DEFAULT_DPI / dpi
}

/// Converts DIPs to physical pixels at `dpi`, rounding half away from zero.
#[inline]
pub fn dips_to_pixels(dips: f32, dpi: f32) -> i32 {
    (dips * dpi / DEFAULT_DPI).round() as i32
}
