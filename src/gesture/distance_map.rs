//! Per-tool pan acceptance distances.

use crate::input::SourceTool;

/// Default pan distance in virtual pixels.
pub const DEFAULT_PAN_DISTANCE: f64 = 5.;
/// Default pan distance for pens in virtual pixels. Pens jitter more on contact.
pub const DEFAULT_PEN_PAN_DISTANCE: f64 = 8.;

/// Distance in pixels a pan has to travel before it is accepted, per source tool.
///
/// A tool without an entry uses the [`SourceTool::Unknown`] entry, except for pens which fall
/// back to their own larger default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceMap {
    distances: [Option<f64>; SourceTool::COUNT],
    density: f64,
}

impl DistanceMap {
    /// Default distances for a display with `density` pixels per virtual pixel.
    pub fn with_density(density: f64) -> Self {
        let density = if density > 0. && density.is_finite() {
            density
        } else {
            debug!("invalid display density {density}, using 1");
            1.
        };

        let mut map = Self {
            distances: [None; SourceTool::COUNT],
            density,
        };
        map.reset();
        map
    }

    /// Applies `distance` to every tool. A negative distance keeps the defaults.
    pub fn uniform(distance: f64, density: f64) -> Self {
        let mut map = Self::with_density(density);
        if distance >= 0. {
            map.distances = [Some(distance); SourceTool::COUNT];
        }
        map
    }

    /// Builds a map from explicit entries. Tools not listed follow the fallback rules.
    pub fn from_entries(entries: impl IntoIterator<Item = (SourceTool, f64)>, density: f64) -> Self {
        let mut map = Self::with_density(density);
        map.distances = [None; SourceTool::COUNT];
        for (tool, distance) in entries {
            map.set(tool, distance);
        }
        map
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    /// Sets the distance for `tool`. A negative distance clears the entry.
    pub fn set(&mut self, tool: SourceTool, distance: f64) {
        self.distances[tool.index()] = (distance >= 0.).then_some(distance);
    }

    pub fn get(&self, tool: SourceTool) -> f64 {
        if let Some(distance) = self.distances[tool.index()] {
            return distance;
        }

        match tool {
            SourceTool::Pen => self.default_pen_distance(),
            _ => self.distances[SourceTool::Unknown.index()]
                .unwrap_or_else(|| self.default_distance()),
        }
    }

    /// Restores the default entries for finger, pen and unknown tools.
    pub fn reset(&mut self) {
        self.distances = [None; SourceTool::COUNT];
        self.distances[SourceTool::Finger.index()] = Some(self.default_distance());
        self.distances[SourceTool::Pen.index()] = Some(self.default_pen_distance());
        self.distances[SourceTool::Unknown.index()] = Some(self.default_distance());
    }

    fn default_distance(&self) -> f64 {
        DEFAULT_PAN_DISTANCE * self.density
    }

    fn default_pen_distance(&self) -> f64 {
        DEFAULT_PEN_PAN_DISTANCE * self.density
    }
}

impl Default for DistanceMap {
    fn default() -> Self {
        Self::with_density(1.)
    }
}
