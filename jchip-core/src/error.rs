use thiserror::Error;

/// Error returned when a program image cannot be placed in memory
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum LoadError {
    /// The image does not fit between the load offset and the end of memory
    #[error(
        "program of {len} bytes does not fit at {offset:#05x} \
         ({capacity} bytes of memory)"
    )]
    TooLarge {
        /// Length of the rejected image
        len: usize,
        /// Address at which it was to be loaded
        offset: usize,
        /// Total memory size
        capacity: usize,
    },
}

/// Fatal (or, for unsupported instructions, possibly recoverable) errors
/// raised while executing a cycle
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum EngineError {
    /// Memory access outside of the address space
    #[error("address {addr:#06x} is outside of memory")]
    OutOfBounds {
        /// Offending address
        addr: usize,
    },

    /// A call was made with a full call stack
    #[error("call stack overflow at {pc:#05x}")]
    StackOverflow {
        /// Address of the call instruction
        pc: u16,
    },

    /// A return was made with an empty call stack
    #[error("return with an empty call stack at {pc:#05x}")]
    StackUnderflow {
        /// Address of the return instruction
        pc: u16,
    },

    /// The opcode has no mapping in the active profile
    #[error("unsupported instruction {opcode:04X} at {pc:#05x}")]
    UnsupportedInstruction {
        /// Raw opcode
        opcode: u16,
        /// Address it was fetched from
        pc: u16,
    },

    /// A jump, call or return targeted an odd address
    #[error("program counter moved to odd address {target:#05x} from {pc:#05x}")]
    MisalignedProgramCounter {
        /// Address of the branching instruction
        pc: u16,
        /// Rejected target
        target: u16,
    },
}

/// Error returned by [`Chip8::configure`](crate::Chip8::configure)
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigureError {
    /// Quirks are fixed once a program has been loaded
    #[error("quirks cannot change once a program has been loaded")]
    SessionStarted,
}
