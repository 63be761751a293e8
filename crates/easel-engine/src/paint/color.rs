/// Straight-alpha sRGB color with 8-bit channels.
///
/// This is the clear color of a control. `a == 255` means fully opaque; any other
/// alpha selects a transparent background for the render target.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::from_argb(0, 0, 0, 0);
    pub const BLACK: Color = Color::from_argb(255, 0, 0, 0);
    pub const WHITE: Color = Color::from_argb(255, 255, 255, 255);

    #[inline]
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Returns this color with a different alpha.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Premultiplied `[r, g, b, a]` in `[0, 1]`.
    ///
    /// Render targets blend premultiplied; channels never exceed alpha.
    pub fn to_premul_f32(self) -> [f32; 4] {
        let a = self.a as f32 / 255.0;
        [
            self.r as f32 / 255.0 * a,
            self.g as f32 / 255.0 * a,
            self.b as f32 / 255.0 * a,
            a,
        ]
    }
}
