use std::hash::{Hash, Hasher};

/// A color in a named color space: three channels plus alpha.
///
/// The host stores whatever space the color was constructed in and only
/// converts on request. Supported conversions are between `rgb`, `hsl` and
/// `hwb`; they round-trip within f64 rounding.
#[derive(Debug, Clone)]
pub struct SassColor {
    space: String,
    channels: [f64; 3],
    alpha: f64,
}

impl SassColor {
    pub fn new(space: impl Into<String>, channels: [f64; 3], alpha: f64) -> Self {
        Self {
            space: space.into(),
            channels,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// An opaque `rgb` color with 0-255 channels.
    pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::new("rgb", [red, green, blue], 1.0)
    }

    /// An `hsl` color: hue in degrees, saturation and lightness in percent.
    pub fn hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self::new("hsl", [hue, saturation, lightness], 1.0)
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn channels(&self) -> [f64; 3] {
        self.channels
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Convert to another color space, or `None` if the conversion isn't
    /// between `rgb`, `hsl` and `hwb`.
    pub fn to_space(&self, space: &str) -> Option<SassColor> {
        if self.space == space {
            return Some(self.clone());
        }
        let rgb = match self.space.as_str() {
            "rgb" => self.channels,
            "hsl" => hsl_to_rgb(self.channels),
            "hwb" => hsl_to_rgb(hwb_to_hsl(self.channels)),
            _ => return None,
        };
        let channels = match space {
            "rgb" => rgb,
            "hsl" => rgb_to_hsl(rgb),
            "hwb" => hsl_to_hwb(rgb_to_hsl(rgb)),
            _ => return None,
        };
        Some(SassColor::new(space, channels, self.alpha))
    }

    fn bits(&self) -> [u64; 4] {
        let bit = |v: f64| if v == 0.0 { 0u64 } else { v.to_bits() };
        [
            bit(self.channels[0]),
            bit(self.channels[1]),
            bit(self.channels[2]),
            bit(self.alpha),
        ]
    }
}

impl PartialEq for SassColor {
    fn eq(&self, other: &Self) -> bool {
        self.space == other.space && self.bits() == other.bits()
    }
}

impl Eq for SassColor {}

impl Hash for SassColor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.space.hash(state);
        self.bits().hash(state);
    }
}

// Channel conventions: rgb in 0-255, hsl as (degrees, percent, percent),
// hwb as (degrees, percent, percent).

fn rgb_to_hsl([red, green, blue]: [f64; 3]) -> [f64; 3] {
    let (r, g, b) = (red / 255.0, green / 255.0, blue / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let lightness = (max + min) / 2.0;
    let saturation = if delta == 0.0 {
        0.0
    } else {
        delta / (1.0 - (2.0 * lightness - 1.0).abs())
    };

    [hue, saturation * 100.0, lightness * 100.0]
}

fn hsl_to_rgb([hue, saturation, lightness]: [f64; 3]) -> [f64; 3] {
    let h = hue.rem_euclid(360.0);
    let s = saturation / 100.0;
    let l = lightness / 100.0;

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - chroma / 2.0;

    let (r, g, b) = match h {
        h if h < 60.0 => (chroma, x, 0.0),
        h if h < 120.0 => (x, chroma, 0.0),
        h if h < 180.0 => (0.0, chroma, x),
        h if h < 240.0 => (0.0, x, chroma),
        h if h < 300.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    [(r + m) * 255.0, (g + m) * 255.0, (b + m) * 255.0]
}

fn hsl_to_hwb([hue, saturation, lightness]: [f64; 3]) -> [f64; 3] {
    let s = saturation / 100.0;
    let l = lightness / 100.0;
    let v = l + s * l.min(1.0 - l);
    let sv = if v == 0.0 { 0.0 } else { 2.0 * (1.0 - l / v) };

    let whiteness = (1.0 - sv) * v;
    let blackness = 1.0 - v;
    [hue, whiteness * 100.0, blackness * 100.0]
}

fn hwb_to_hsl([hue, whiteness, blackness]: [f64; 3]) -> [f64; 3] {
    let w = whiteness / 100.0;
    let b = blackness / 100.0;

    let v = 1.0 - b;
    let sv = if v == 0.0 { 0.0 } else { 1.0 - w / v };
    let l = v * (1.0 - sv / 2.0);
    let s = if l == 0.0 || l == 1.0 {
        0.0
    } else {
        (v - l) / l.min(1.0 - l)
    };

    [hue, s * 100.0, l * 100.0]
}
