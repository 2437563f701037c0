//! Aspect ratio classification used to namespace storage keys.

use serde::Serialize;
use std::{fmt, ops::RangeInclusive};

/// Width/height band treated as 16:9.
pub const LANDSCAPE_RATIO: RangeInclusive<f64> = 1.70..=1.80;

/// Width/height band treated as 9:16.
pub const PORTRAIT_RATIO: RangeInclusive<f64> = 0.56..=0.60;

/// Pixel dimensions of the first stream that reports both width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Callers guarantee a non-zero height.
    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Coarse orientation bucket derived from a video's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Classify a geometry by approximate ratio match. Both bands are inclusive;
    /// anything outside them is `Other`.
    pub fn from_geometry(geometry: Geometry) -> Self {
        if geometry.height == 0 {
            return Self::Other;
        }
        let ratio = geometry.ratio();
        if LANDSCAPE_RATIO.contains(&ratio) {
            Self::Landscape
        } else if PORTRAIT_RATIO.contains(&ratio) {
            Self::Portrait
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(width: u32, height: u32) -> AspectClass {
        AspectClass::from_geometry(Geometry::new(width, height))
    }

    #[test]
    fn common_resolutions() {
        assert_eq!(classify(1920, 1080), AspectClass::Landscape);
        assert_eq!(classify(1280, 720), AspectClass::Landscape);
        assert_eq!(classify(1080, 1920), AspectClass::Portrait);
        assert_eq!(classify(720, 1280), AspectClass::Portrait);
        assert_eq!(classify(1080, 1080), AspectClass::Other);
        assert_eq!(classify(640, 480), AspectClass::Other);
        assert_eq!(classify(2560, 1080), AspectClass::Other);
    }

    // Bands are inclusive on both ends: 17:10 = 1.70, 9:5 = 1.80,
    // 14:25 = 0.56 and 3:5 = 0.60 all land inside.
    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(classify(17, 10), AspectClass::Landscape);
        assert_eq!(classify(9, 5), AspectClass::Landscape);
        assert_eq!(classify(14, 25), AspectClass::Portrait);
        assert_eq!(classify(3, 5), AspectClass::Portrait);
    }

    // Tolerance is the band width, not exact 16:9; just outside falls to other.
    #[test]
    fn just_outside_bands_is_other() {
        assert_eq!(classify(1699, 1000), AspectClass::Other);
        assert_eq!(classify(1801, 1000), AspectClass::Other);
        assert_eq!(classify(559, 1000), AspectClass::Other);
        assert_eq!(classify(601, 1000), AspectClass::Other);
    }

    #[test]
    fn zero_height_is_other() {
        assert_eq!(classify(1920, 0), AspectClass::Other);
    }

    #[test]
    fn renders_lowercase() {
        assert_eq!(AspectClass::Landscape.to_string(), "landscape");
        assert_eq!(AspectClass::Portrait.to_string(), "portrait");
        assert_eq!(AspectClass::Other.to_string(), "other");
    }
}
