use thiserror::Error;

/// A key on the 16-key hexadecimal keypad
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Key(u8);

/// Error returned when converting a value above `0xF` into a [`Key`]
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
#[error("{0:#x} is not a valid key (expected 0x0-0xF)")]
pub struct InvalidKey(pub u8);

impl Key {
    /// Returns the key's nibble value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Builds a key from the low nibble of `v`, discarding the rest
    pub fn from_low_nibble(v: u8) -> Self {
        Key(v & 0xF)
    }

    /// Iterates over all sixteen keys in order
    pub fn all() -> impl Iterator<Item = Key> {
        (0..16).map(Key)
    }
}

impl TryFrom<u8> for Key {
    type Error = InvalidKey;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        if v < 16 { Ok(Key(v)) } else { Err(InvalidKey(v)) }
    }
}

impl From<Key> for u8 {
    fn from(k: Key) -> u8 {
        k.0
    }
}

/// Latched state of the keypad
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Keypad {
    held: [bool; 16],
}

impl Keypad {
    /// Records a key as pressed or released
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.held[usize::from(key.0)] = pressed;
    }

    /// Checks whether a key is currently held
    pub fn is_pressed(&self, key: Key) -> bool {
        self.held[usize::from(key.0)]
    }

    /// Returns the lowest-numbered held key, if any
    pub fn any_pressed(&self) -> Option<Key> {
        Key::all().find(|k| self.is_pressed(*k))
    }
}
