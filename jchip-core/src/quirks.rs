//! Behavioral toggles and presets
use crate::decode::Instruction;

/// Order in which arithmetic instructions write their result and `VF`
///
/// This only matters when the destination register is `VF` itself.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum FlagOrder {
    /// Write the result, then the flag (the flag survives in `VF`)
    #[default]
    FlagLast,
    /// Write the flag, then the result (the result survives in `VF`)
    ResultLast,
}

/// Instruction set accepted by the engine
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Profile {
    /// Base CHIP-8 instructions only
    #[default]
    Chip8,
    /// Base instructions plus the SUPER-CHIP extensions, as implemented by
    /// modern interpreters
    SuperChip,
    /// SUPER-CHIP 1.1 on the HP-48
    ///
    /// Resolution changes keep the picture, `00C0` is rejected, `DXY0` draws
    /// an 8×16 sprite in low resolution, and a high-resolution draw sets `VF`
    /// to the number of rows that collided or were clipped at the bottom.
    SuperChipLegacy,
}

impl Profile {
    /// Checks whether this profile executes the given instruction
    pub fn supports(self, instr: &Instruction) -> bool {
        match self {
            Profile::Chip8 => !instr.is_extended(),
            Profile::SuperChip => !matches!(instr, Instruction::Unsupported(..)),
            Profile::SuperChipLegacy => !matches!(
                instr,
                Instruction::Unsupported(..) | Instruction::ScrollDown(0)
            ),
        }
    }

    /// Checks whether the SUPER-CHIP extensions are enabled
    pub fn is_extended(self) -> bool {
        self != Profile::Chip8
    }
}

/// Quirk configuration for a session
///
/// Every field defaults to the behavior of modern interpreters; deserializing
/// a partial document only overrides the keys it names.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct Quirks {
    /// Where `VF` is written relative to the result in `8XY4`..`8XYE`
    pub flag_order: FlagOrder,

    /// `FX55` / `FX65` advance `I` by `X + 1`
    pub increment_index: bool,

    /// Sprites are cut off at the screen edge instead of wrapping
    pub clip_sprites: bool,

    /// `8XY6` / `8XYE` shift `VY` into `VX`, rather than shifting `VX`
    pub shift_uses_vy: bool,

    /// `BNNN` jumps to `NNN + VX` (with `X` from the opcode) instead of
    /// `NNN + V0`
    pub jump_with_vx: bool,

    /// `8XY1` / `8XY2` / `8XY3` reset `VF` to zero
    pub vf_reset: bool,

    /// Execution stalls after a draw until the next timer tick
    pub display_wait: bool,

    /// Index-relative memory accesses wrap around the end of memory
    pub index_wraparound: bool,

    /// Instruction set
    pub profile: Profile,

    /// Unsupported instructions halt the engine; otherwise they are logged
    /// and skipped
    pub strict: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            flag_order: FlagOrder::FlagLast,
            increment_index: false,
            clip_sprites: false,
            shift_uses_vy: false,
            jump_with_vx: false,
            vf_reset: false,
            display_wait: false,
            index_wraparound: false,
            profile: Profile::Chip8,
            strict: true,
        }
    }
}

impl Quirks {
    /// Suggested number of cycles per 60 Hz frame
    ///
    /// Interpreters that wait for the display run slower in practice, so
    /// they are given a larger budget to reach the same pace.
    pub fn default_instructions_per_frame(&self) -> usize {
        match (self.profile.is_extended(), self.display_wait) {
            (true, _) => 30,
            (false, true) => 15,
            (false, false) => 11,
        }
    }
}

/// Named quirk presets
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Variant {
    /// Behavior expected by most modern CHIP-8 programs
    #[default]
    Modern,
    /// The original COSMAC VIP interpreter
    CosmacVip,
    /// SUPER-CHIP as run by modern interpreters
    SuperChip,
    /// The original SUPER-CHIP 1.1 interpreter
    SuperChipLegacy,
}

impl Variant {
    /// Returns the quirk set for this preset
    pub fn quirks(self) -> Quirks {
        match self {
            Variant::Modern => Quirks::default(),
            Variant::CosmacVip => Quirks {
                increment_index: true,
                shift_uses_vy: true,
                clip_sprites: true,
                vf_reset: true,
                display_wait: true,
                ..Quirks::default()
            },
            Variant::SuperChip => Quirks {
                clip_sprites: true,
                jump_with_vx: true,
                profile: Profile::SuperChip,
                ..Quirks::default()
            },
            Variant::SuperChipLegacy => Quirks {
                profile: Profile::SuperChipLegacy,
                ..Variant::SuperChip.quirks()
            },
        }
    }

    /// Suggested number of cycles per 60 Hz frame for this preset
    pub fn instructions_per_frame(self) -> usize {
        self.quirks().default_instructions_per_frame()
    }
}
