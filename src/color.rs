use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.6);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Color mapping: category → Color32
// ---------------------------------------------------------------------------

/// Maps category names (cities, makes, vehicle types) to distinct colours.
/// Colours are assigned in the order the categories are given.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        let names: Vec<&str> = categories.into_iter().collect();
        let palette = generate_palette(names.len());
        let mapping = names
            .into_iter()
            .zip(palette)
            .map(|(name, c)| (name.to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a category.
    pub fn color_for(&self, category: &str) -> Color32 {
        self.mapping
            .get(category)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Continuous scales for bar values
// ---------------------------------------------------------------------------

/// A continuous colour scale sampled in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gradient {
    /// Dark purple → teal → yellow.
    Viridis,
    /// Red → white → blue.
    RedBlue,
    /// Pale yellow → green → dark blue.
    YellowGreenBlue,
}

impl Gradient {
    fn stops(&self) -> &'static [(f32, f32, f32)] {
        match self {
            Gradient::Viridis => &[
                (0.267, 0.005, 0.329),
                (0.231, 0.322, 0.545),
                (0.129, 0.569, 0.549),
                (0.369, 0.788, 0.384),
                (0.992, 0.906, 0.145),
            ],
            Gradient::RedBlue => &[
                (0.404, 0.000, 0.122),
                (0.839, 0.376, 0.302),
                (0.969, 0.969, 0.969),
                (0.263, 0.576, 0.765),
                (0.020, 0.188, 0.380),
            ],
            Gradient::YellowGreenBlue => &[
                (1.000, 1.000, 0.851),
                (0.780, 0.914, 0.706),
                (0.255, 0.714, 0.769),
                (0.133, 0.369, 0.659),
                (0.031, 0.114, 0.345),
            ],
        }
    }

    /// Colour at position `t`; values outside `[0, 1]` are clamped.
    pub fn at(&self, t: f32) -> Color32 {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let scaled = t * (stops.len() - 1) as f32;
        let i = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - i as f32;

        let lin = |(r, g, b): (f32, f32, f32)| Srgb::new(r, g, b).into_linear::<f32>();
        let a: LinSrgb = lin(stops[i]);
        let b: LinSrgb = lin(stops[i + 1]);
        to_color32(Srgb::from_linear(a.mix(b, frac)))
    }

    /// Colour for `value` relative to `[min, max]`.
    pub fn for_value(&self, value: f64, min: f64, max: f64) -> Color32 {
        if max > min {
            self.at(((value - min) / (max - min)) as f32)
        } else {
            self.at(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_colours() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        for (i, a) in p.iter().enumerate() {
            for b in &p[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn color_map_falls_back_for_unknown_categories() {
        let cm = ColorMap::new(["BEV", "PHEV"]);
        assert_ne!(cm.color_for("BEV"), cm.color_for("PHEV"));
        assert_eq!(cm.color_for("FCEV"), Color32::GRAY);
    }

    #[test]
    fn gradient_hits_its_end_stops() {
        assert_eq!(Gradient::Viridis.at(0.0), Gradient::Viridis.at(-3.0));
        assert_ne!(Gradient::Viridis.at(0.0), Gradient::Viridis.at(1.0));
        assert_eq!(Gradient::Viridis.at(1.0), Gradient::Viridis.at(7.0));
        assert_eq!(Gradient::RedBlue.for_value(5.0, 5.0, 5.0), Gradient::RedBlue.at(1.0));
    }
}
