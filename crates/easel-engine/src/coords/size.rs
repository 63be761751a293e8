use super::dpi::dips_to_pixels;

/// Size in logical pixels (DIPs).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size::new(0.0, 0.0);

    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero, negative or not finite.
    #[inline]
    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite())
    }

    /// Physical pixel extent of this size at `dpi`, at least 1x1.
    pub fn to_pixels(self, dpi: f32) -> PixelSize {
        let w = dips_to_pixels(self.width, dpi).max(1) as u32;
        let h = dips_to_pixels(self.height, dpi).max(1) as u32;
        PixelSize::new(w, h)
    }
}

/// Size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
