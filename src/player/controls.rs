//! Volume state for the player panel.

/// Volume slider position (0-100) plus mute toggle.
///
/// Dragging the slider to zero mutes; any other position unmutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    level: u8,
    muted: bool,
}

impl Volume {
    pub const MAX: u8 = 100;

    pub fn new(level: u8) -> Self {
        let level = level.min(Self::MAX);
        Self {
            level,
            muted: level == 0,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_level(&mut self, level: u8) {
        *self = Self::new(level);
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn icon(&self) -> &'static str {
        if self.muted {
            "🔇"
        } else {
            "🔊"
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(Self::MAX)
    }
}
