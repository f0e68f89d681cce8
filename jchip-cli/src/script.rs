//! Scripted keypad input
use anyhow::{Context, Result, anyhow};
use chip8::Key;

/// A key held down for a number of frames
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Press {
    /// Frame on which the key goes down
    pub frame: usize,
    /// Key to press
    pub key: Key,
    /// Number of frames the key stays down
    pub hold: usize,
}

impl Press {
    /// Frame on which the key is released
    ///
    /// [`parse_press`] guarantees that this does not overflow.
    pub fn release_frame(&self) -> usize {
        self.frame.saturating_add(self.hold)
    }
}

/// Parses `FRAME:KEY[:HOLD]`, with the key in hexadecimal
pub fn parse_press(s: &str) -> Result<Press> {
    let mut parts = s.split(':');
    let frame: usize = parts
        .next()
        .ok_or_else(|| anyhow!("missing frame"))?
        .parse()
        .context("invalid frame number")?;
    let key = parts.next().ok_or_else(|| anyhow!("missing key"))?;
    let key = u8::from_str_radix(key, 16)
        .with_context(|| format!("invalid key {key:?}"))?;
    let key = Key::try_from(key)?;
    let hold = match parts.next() {
        Some(h) => h.parse().context("invalid hold duration")?,
        None => 1,
    };
    if parts.next().is_some() {
        return Err(anyhow!("expected FRAME:KEY[:HOLD], got {s:?}"));
    }
    if hold == 0 {
        return Err(anyhow!("hold duration must be at least one frame"));
    }
    if frame.checked_add(hold).is_none() {
        return Err(anyhow!("key release frame is out of range in {s:?}"));
    }
    Ok(Press { frame, key, hold })
}

/// Key events for a single frame, in delivery order
pub fn events_at(presses: &[Press], frame: usize) -> Vec<(Key, bool)> {
    let releases = presses
        .iter()
        .filter(|p| p.release_frame() == frame)
        .map(|p| (p.key, false));
    let downs = presses
        .iter()
        .filter(|p| p.frame == frame)
        .map(|p| (p.key, true));
    releases.chain(downs).collect()
}
