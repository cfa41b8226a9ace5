//! Packed clear colors

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color packed as `0xRRGGBBAA`, the layout render engines expect
/// for view clear state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgba(pub u32);

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    // Default view 0 clear color (purple)
    pub const PLUM: Rgba = Rgba(0x7030_70ff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xff)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | a as u32)
    }

    pub const fn packed(self) -> u32 {
        self.0
    }

    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn a(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::PLUM
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        let c = Rgba::PLUM;
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (0x70, 0x30, 0x70, 0xff));
        assert_eq!(Rgba::rgb(0x70, 0x30, 0x70), c);
    }

    #[test]
    fn test_display() {
        assert_eq!(Rgba::PLUM.to_string(), "#703070ff");
    }
}
