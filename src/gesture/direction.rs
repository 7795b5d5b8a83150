use std::str::FromStr;

use anyhow::bail;
use bitflags::bitflags;

bitflags! {
    /// Directions a pan may move in. Screen coordinates: up is negative y.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PanDirection: u32 {
        const LEFT = 1;
        const RIGHT = 1 << 1;
        const UP = 1 << 2;
        const DOWN = 1 << 3;
        const HORIZONTAL = Self::LEFT.bits() | Self::RIGHT.bits();
        const VERTICAL = Self::UP.bits() | Self::DOWN.bits();
        const ALL = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl PanDirection {
    /// Interprets a raw bitmask, falling back to [`PanDirection::ALL`] for unknown bits.
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits(bits).unwrap_or_else(|| {
            debug!("invalid pan direction {bits:#x}, using all directions");
            Self::ALL
        })
    }

    pub fn allows_horizontal(self) -> bool {
        self.intersects(Self::HORIZONTAL)
    }

    pub fn allows_vertical(self) -> bool {
        self.intersects(Self::VERTICAL)
    }
}

impl Default for PanDirection {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromStr for PanDirection {
    type Err = anyhow::Error;

    /// Parses names like `left`, `vertical` or `left|up`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut direction = PanDirection::empty();
        for part in s.split('|') {
            direction |= match part.trim() {
                "none" => PanDirection::empty(),
                "left" => PanDirection::LEFT,
                "right" => PanDirection::RIGHT,
                "up" => PanDirection::UP,
                "down" => PanDirection::DOWN,
                "horizontal" => PanDirection::HORIZONTAL,
                "vertical" => PanDirection::VERTICAL,
                "all" => PanDirection::ALL,
                other => bail!("invalid pan direction: {other}"),
            };
        }
        Ok(direction)
    }
}
