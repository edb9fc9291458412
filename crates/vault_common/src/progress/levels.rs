//! Level System
//!
//! Flat curve: every level costs `XP_PER_LEVEL` experience points. A gain
//! that crosses one or more thresholds levels up once per threshold and
//! keeps the remainder as the new xp.

use serde::{Deserialize, Serialize};

/// XP needed to go from one level to the next
pub const XP_PER_LEVEL: u32 = 100;

/// Result of applying an XP gain to a `(level, xp)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpGain {
    /// `xp + gain` before wrapping, widened so it cannot overflow
    pub raw_xp: u64,
    /// Thresholds crossed by this gain
    pub level_ups: u32,
    pub new_level: u32,
    /// XP after wrapping, always below `XP_PER_LEVEL`
    pub new_xp: u32,
}

impl XpGain {
    /// Apply `gain` to a record currently at `level` with `xp`
    pub fn apply(level: u32, xp: u32, gain: u32) -> Self {
        let raw_xp = u64::from(xp) + u64::from(gain);
        let per_level = u64::from(XP_PER_LEVEL);
        // Both fit in u32: raw_xp < 2^33, so raw_xp / 100 < 2^32.
        let level_ups = (raw_xp / per_level) as u32;
        let remaining = (raw_xp % per_level) as u32;
        Self {
            raw_xp,
            level_ups,
            new_level: level.saturating_add(level_ups),
            new_xp: remaining,
        }
    }

    pub fn leveled_up(&self) -> bool {
        self.level_ups > 0
    }

    /// Column a UI should highlight for this gain
    pub fn highlighted_column(&self) -> &'static str {
        if self.leveled_up() {
            "level"
        } else {
            "xp"
        }
    }
}

/// Progress towards the next level as a percentage (0-100)
pub fn level_progress_percent(xp: u32) -> u8 {
    ((xp.min(XP_PER_LEVEL) * 100) / XP_PER_LEVEL) as u8
}
