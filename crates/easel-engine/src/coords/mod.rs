//! Size and DPI types shared by the control core and its render targets.
//!
//! Canonical control space is logical pixels (DIPs). A DIP is one physical pixel at
//! [`DEFAULT_DPI`]; render targets allocate physical pixels via [`dips_to_pixels`].

mod dpi;
mod size;

pub use dpi::{dips_to_pixels, pixels_to_dips, DEFAULT_DPI};
pub use size::{PixelSize, Size};
