//! Bounded volume adjustment.
//!
//! The step sizes are deliberately exposed as named configuration: the
//! reference behaviour increases and decreases by different amounts, and
//! the derived integer "level" uses its own scaling. Treat these as
//! parameters to verify against the product requirement, not as laws.

/// Default increment applied by a volume-up command.
pub const VOLUME_UP_STEP: f64 = 0.05;

/// Default decrement applied by a volume-down command. Asymmetric with
/// [`VOLUME_UP_STEP`] on purpose; see the module docs.
pub const VOLUME_DOWN_STEP: f64 = 0.111;

/// Scale factor of the derived integer volume level.
pub const VOLUME_LEVEL_SCALE: f64 = 9.0;

/// Offset of the derived integer volume level.
pub const VOLUME_LEVEL_OFFSET: f64 = 1.0;

/// Lower bound of the volume control.
pub const VOLUME_MIN: f64 = 0.0;

/// Upper bound of the volume control.
pub const VOLUME_MAX: f64 = 1.0;

/// Result of one volume adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeAdjust {
    /// The control moved to this value.
    Changed(f64),
    /// Already at the maximum; nothing was mutated.
    AtMax,
    /// Already at the minimum; nothing was mutated.
    AtMin,
}

/// Clamped, asymmetric-step volume adjustment.
#[derive(Debug, Clone, Copy)]
pub struct VolumeControl {
    /// Increment per volume-up command.
    pub up_step: f64,
    /// Decrement per volume-down command.
    pub down_step: f64,
}

impl Default for VolumeControl {
    fn default() -> Self {
        Self {
            up_step: VOLUME_UP_STEP,
            down_step: VOLUME_DOWN_STEP,
        }
    }
}

impl VolumeControl {
    /// Compute the result of a volume-up from `current`.
    ///
    /// Never yields a value above [`VOLUME_MAX`]; at the ceiling the state
    /// is left untouched.
    pub fn increase(&self, current: f64) -> VolumeAdjust {
        if current >= VOLUME_MAX {
            VolumeAdjust::AtMax
        } else {
            VolumeAdjust::Changed((current + self.up_step).min(VOLUME_MAX))
        }
    }

    /// Compute the result of a volume-down from `current`.
    ///
    /// Never yields a value below [`VOLUME_MIN`].
    pub fn decrease(&self, current: f64) -> VolumeAdjust {
        if current <= VOLUME_MIN {
            VolumeAdjust::AtMin
        } else {
            VolumeAdjust::Changed((current - self.down_step).max(VOLUME_MIN))
        }
    }
}

/// The derived integer level shown to the user.
pub fn volume_level(volume: f64) -> i32 {
    (volume * VOLUME_LEVEL_SCALE + VOLUME_LEVEL_OFFSET) as i32
}
