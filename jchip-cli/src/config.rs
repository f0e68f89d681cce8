//! Quirk resolution: preset, then JSON file, then command-line flags
use std::path::Path;

use anyhow::{Context, Result, bail};
use chip8::{FlagOrder, Profile, Quirks, Variant};
use log::debug;
use serde_json::{Map, Value};

/// Individual quirk overrides
///
/// Boolean flags may be given bare (`--clipping`) or with an explicit value
/// (`--clipping=false`).
#[derive(clap::Args, Debug, Default)]
pub struct Overrides {
    /// Clear VF after 8XY1 / 8XY2 / 8XY3
    #[clap(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    vf_reset: Option<bool>,

    /// Advance I after FX55 / FX65
    #[clap(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    increment_index: Option<bool>,

    /// Clip sprites at the screen edge instead of wrapping
    #[clap(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    clipping: Option<bool>,

    /// Shift VY into VX in 8XY6 / 8XYE
    #[clap(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    shift_uses_vy: Option<bool>,

    /// Use VX instead of V0 as the BNNN offset
    #[clap(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    jump_with_vx: Option<bool>,

    /// Wait for the next frame after each draw
    #[clap(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    display_wait: Option<bool>,

    /// Wrap index-relative accesses at the end of memory
    #[clap(
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true
    )]
    index_wraparound: Option<bool>,

    /// Order of the result and VF writes in arithmetic instructions
    #[clap(long, value_enum)]
    flag_order: Option<FlagOrder>,

    /// Instruction set
    #[clap(long, value_enum)]
    profile: Option<Profile>,

    /// Skip unsupported instructions instead of halting
    #[clap(long)]
    relaxed: bool,
}

impl Overrides {
    /// Applies every override that was given on the command line
    pub fn apply(&self, q: &mut Quirks) {
        let flags = [
            (self.vf_reset, &mut q.vf_reset),
            (self.increment_index, &mut q.increment_index),
            (self.clipping, &mut q.clip_sprites),
            (self.shift_uses_vy, &mut q.shift_uses_vy),
            (self.jump_with_vx, &mut q.jump_with_vx),
            (self.display_wait, &mut q.display_wait),
            (self.index_wraparound, &mut q.index_wraparound),
        ];
        for (given, field) in flags {
            if let Some(v) = given {
                *field = v;
            }
        }
        if let Some(f) = self.flag_order {
            q.flag_order = f;
        }
        if let Some(p) = self.profile {
            q.profile = p;
        }
        if self.relaxed {
            q.strict = false;
        }
    }
}

/// Keys accepted from older quirk databases
///
/// Each maps to a field of [`Quirks`]; inverted keys store the opposite
/// sense of that field.
const LEGACY_KEYS: [(&str, &str, bool); 6] = [
    ("logic", "vf_reset", false),
    ("vblank", "display_wait", false),
    ("jump", "jump_with_vx", false),
    ("shift", "shift_uses_vy", true),
    ("memoryLeaveIUnchanged", "increment_index", true),
    ("wrap", "clip_sprites", true),
];

/// Rewrites legacy keys into their [`Quirks`] field names
fn canonicalize(patch: Map<String, Value>) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (k, v) in patch {
        let Some((_, field, inverted)) =
            LEGACY_KEYS.iter().find(|(name, ..)| *name == k)
        else {
            out.insert(k, v);
            continue;
        };
        let v = match (v, *inverted) {
            (Value::Bool(b), true) => Value::Bool(!b),
            (v @ Value::Bool(_), false) => v,
            (v, _) => bail!("expected a boolean for {k:?}, got {v}"),
        };
        debug!("quirk key {k:?} read as {field:?}");
        out.insert(field.to_string(), v);
    }
    Ok(out)
}

/// Overlays a (partial) JSON quirk document onto `base`
pub fn merge_json(base: Quirks, text: &str) -> Result<Quirks> {
    let Value::Object(patch) =
        serde_json::from_str::<Value>(text).context("failed to parse JSON")?
    else {
        bail!("expected a JSON object");
    };
    let Value::Object(mut merged) = serde_json::to_value(base)? else {
        bail!("quirks did not serialize to an object");
    };
    merged.extend(canonicalize(patch)?);
    serde_json::from_value(Value::Object(merged)).context("invalid quirks")
}

/// Resolves the effective quirks for a run
pub fn resolve(
    variant: Variant,
    file: Option<&Path>,
    overrides: &Overrides,
) -> Result<Quirks> {
    let mut quirks = variant.quirks();
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {path:?}"))?;
        quirks = merge_json(quirks, &text)
            .with_context(|| format!("failed to load quirks from {path:?}"))?;
    }
    overrides.apply(&mut quirks);
    Ok(quirks)
}
