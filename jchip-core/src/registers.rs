use crate::memory::PROGRAM_START;

/// Maximum number of nested subroutine calls
pub const STACK_DEPTH: usize = 16;

/// Fixed-depth stack of return addresses
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallStack {
    data: [u16; STACK_DEPTH],

    /// Number of occupied slots
    depth: usize,
}

impl CallStack {
    /// Pushes a return address, returning `false` if the stack is full
    #[must_use]
    pub fn push(&mut self, addr: u16) -> bool {
        if let Some(slot) = self.data.get_mut(self.depth) {
            *slot = addr;
            self.depth += 1;
            true
        } else {
            false
        }
    }

    /// Pops the most recent return address
    pub fn pop(&mut self) -> Option<u16> {
        self.depth = self.depth.checked_sub(1)?;
        Some(self.data[self.depth])
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Checks whether the stack holds no return addresses
    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Occupied slots, oldest first
    pub fn as_slice(&self) -> &[u16] {
        &self.data[..self.depth]
    }
}

/// Register file
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Registers {
    /// General-purpose registers `V0` through `VF`
    pub v: [u8; 16],
    /// Index register
    pub i: u16,
    /// Program counter
    pub pc: u16,
    /// Subroutine return addresses
    pub stack: CallStack,
    /// Delay timer, decremented at 60 Hz
    pub delay: u8,
    /// Sound timer, decremented at 60 Hz; a tone plays while it is nonzero
    pub sound: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            stack: CallStack::default(),
            delay: 0,
            sound: 0,
        }
    }
}
