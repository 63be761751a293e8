//! Color values consumed by the render path.

mod color;

pub use color::Color;
