//! Presentation metadata for rendering layers
//!
//! Stateless mappings from catalog metadata to display values: the operating
//! organization behind a country code, a fixed color per country, and a
//! blue-to-red ramp for speed or altitude intensities.

use serde::Serialize;

/// RGBA color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create an opaque color
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Components as `[r, g, b, a]`
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Color for countries without a dedicated entry
pub const DEFAULT_COLOR: Color = Color::rgb(0.8, 0.8, 0.8);

/// Organization reported for unmapped country codes
pub const DEFAULT_ORGANIZATION: &str = "Private/Other";

/// Space agency associated with a country code
pub fn organization_for(country: &str) -> &'static str {
    match country {
        "US" => "NASA/DoD",
        "RU" | "SU" => "Roscosmos",
        "CN" => "CNSA",
        "EU" => "ESA",
        "JP" => "JAXA",
        "IN" => "ISRO",
        "KR" => "KARI",
        "CA" => "CSA",
        "AU" => "CSIRO",
        "BR" => "INPE",
        "AR" => "CONAE",
        "IL" => "ISA",
        "TH" => "GISTDA",
        "TR" => "TUBITAK",
        "ZA" => "SANSA",
        "NG" => "NASRDA",
        "KE" => "KARI",
        _ => DEFAULT_ORGANIZATION,
    }
}

/// Display color for a country code
pub fn country_color(country: &str) -> Color {
    match country {
        "US" => Color::rgb(0.0, 0.5, 1.0),
        "RU" | "SU" => Color::rgb(1.0, 0.0, 0.0),
        "CN" => Color::rgb(1.0, 1.0, 0.0),
        "EU" => Color::rgb(0.0, 1.0, 0.3),
        "JP" => Color::rgb(1.0, 0.4, 0.0),
        "IN" => Color::rgb(1.0, 0.0, 1.0),
        _ => DEFAULT_COLOR,
    }
}

/// Blue (0) to red (1) ramp; out-of-range intensities are clamped
pub fn velocity_color(intensity: f64) -> Color {
    let i = if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0) as f32
    };
    Color::rgb(i, 0.5, 1.0 - i)
}
