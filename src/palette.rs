//! Colour gradients for escape-time shading

use serde::{Deserialize, Serialize};

/// Gradient used to shade escape counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteId {
    #[default]
    OceanicNext,
    CatppuccinMocha,
    Grayscale,
}

impl PaletteId {
    pub fn all() -> &'static [PaletteId] {
        &[
            PaletteId::OceanicNext,
            PaletteId::CatppuccinMocha,
            PaletteId::Grayscale,
        ]
    }

    pub fn palette(&self) -> &'static Palette {
        match self {
            PaletteId::OceanicNext => &OCEANIC_NEXT,
            PaletteId::CatppuccinMocha => &CATPPUCCIN_MOCHA,
            PaletteId::Grayscale => &GRAYSCALE,
        }
    }
}

/// Interior colour plus the gradient stops for escaping points
#[derive(Debug)]
pub struct Palette {
    pub interior: u32,
    pub stops: &'static [u32],
}

// Oceanic Next: base00 interior, then blue/cyan/green/yellow/orange/red
static OCEANIC_NEXT: Palette = Palette {
    interior: 0x1B2B34,
    stops: &[
        0x1B2B34, 0x343D46, 0x6699CC, 0x5FB3B3, 0x99C794, 0xFAC863, 0xF99157, 0xEC5F67, 0xF0F4F8,
    ],
};

// Catppuccin Mocha: base, surface1, blue, teal, green, yellow, peach, red, rosewater
static CATPPUCCIN_MOCHA: Palette = Palette {
    interior: 0x1E1E2E,
    stops: &[
        0x1E1E2E, 0x45475A, 0x89B4FA, 0x94E2D5, 0xA6E3A1, 0xF9E2AF, 0xFAB387, 0xF38BA8, 0xF5E0DC,
    ],
};

static GRAYSCALE: Palette = Palette {
    interior: 0x000000,
    stops: &[0x000000, 0xFFFFFF],
};

fn rgb(hex: u32) -> [u8; 3] {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8]
}

impl Palette {
    /// RGBA colour for a point that never escaped
    pub fn interior_rgba(&self) -> [u8; 4] {
        let [r, g, b] = rgb(self.interior);
        [r, g, b, 0xFF]
    }

    /// RGBA colour for `t` in [0, 1] along the gradient
    pub fn sample(&self, t: f64) -> [u8; 4] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let segments = self.stops.len().saturating_sub(1);
        if segments == 0 {
            return self.interior_rgba();
        }
        let pos = t * segments as f64;
        let idx = (pos.floor() as usize).min(segments - 1);
        let frac = pos - idx as f64;
        let a = rgb(self.stops[idx]);
        let b = rgb(self.stops[idx + 1]);
        let mix = |x: u8, y: u8| -> u8 {
            (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8
        };
        [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), 0xFF]
    }
}
