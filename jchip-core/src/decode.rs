//! Opcode decoding and disassembly
use std::fmt;

/// Broad class of an instruction
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Category {
    /// Register loads, ALU operations and random numbers
    Arithmetic,
    /// Jumps, calls, returns and conditional skips
    Branch,
    /// Index register and memory transfers
    Memory,
    /// Sprite drawing, scrolling and resolution changes
    Draw,
    /// Delay and sound timer access
    Timer,
    /// Keypad tests and key wait
    Input,
    /// Display clear, exit and unsupported opcodes
    System,
}

/// A decoded instruction along with its operands
///
/// Register operands (`x`, `y`) are nibbles in `0..16`.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// `00E0`
    Clear,
    /// `00EE`
    Return,
    /// `1NNN`
    Jump(u16),
    /// `2NNN`
    Call(u16),
    /// `3XNN`
    SkipEqual { x: u8, nn: u8 },
    /// `4XNN`
    SkipNotEqual { x: u8, nn: u8 },
    /// `5XY0`
    SkipEqualReg { x: u8, y: u8 },
    /// `6XNN`
    Load { x: u8, nn: u8 },
    /// `7XNN`
    AddImmediate { x: u8, nn: u8 },
    /// `8XY0`
    Move { x: u8, y: u8 },
    /// `8XY1`
    Or { x: u8, y: u8 },
    /// `8XY2`
    And { x: u8, y: u8 },
    /// `8XY3`
    Xor { x: u8, y: u8 },
    /// `8XY4`
    Add { x: u8, y: u8 },
    /// `8XY5`
    Sub { x: u8, y: u8 },
    /// `8XY6`
    ShiftRight { x: u8, y: u8 },
    /// `8XY7`
    SubReverse { x: u8, y: u8 },
    /// `8XYE`
    ShiftLeft { x: u8, y: u8 },
    /// `9XY0`
    SkipNotEqualReg { x: u8, y: u8 },
    /// `ANNN`
    SetIndex(u16),
    /// `BNNN`
    JumpOffset { x: u8, nnn: u16 },
    /// `CXNN`
    Random { x: u8, nn: u8 },
    /// `DXYN`; `n == 0` selects a large sprite in the extended profiles
    Draw { x: u8, y: u8, n: u8 },
    /// `EX9E`
    SkipKeyPressed { x: u8 },
    /// `EXA1`
    SkipKeyReleased { x: u8 },
    /// `FX07`
    GetDelay { x: u8 },
    /// `FX0A`
    WaitKey { x: u8 },
    /// `FX15`
    SetDelay { x: u8 },
    /// `FX18`
    SetSound { x: u8 },
    /// `FX1E`
    AddIndex { x: u8 },
    /// `FX29`
    FontChar { x: u8 },
    /// `FX33`
    Bcd { x: u8 },
    /// `FX55`
    Store { x: u8 },
    /// `FX65`
    Restore { x: u8 },

    /// `00CN` (extended)
    ScrollDown(u8),
    /// `00FB` (extended)
    ScrollRight,
    /// `00FC` (extended)
    ScrollLeft,
    /// `00FD` (extended)
    Exit,
    /// `00FE` (extended)
    LowRes,
    /// `00FF` (extended)
    HighRes,
    /// `FX30` (extended)
    BigFontChar { x: u8 },
    /// `FX75` (extended)
    SaveFlags { x: u8 },
    /// `FX85` (extended)
    LoadFlags { x: u8 },

    /// Any opcode without a mapping
    Unsupported(u16),
}

/// Decodes a raw opcode
///
/// This is a pure function: every 16-bit value maps to exactly one
/// [`Instruction`], with unknown patterns producing
/// [`Instruction::Unsupported`].
pub fn decode(opcode: u16) -> Instruction {
    use Instruction::*;

    let x = ((opcode >> 8) & 0xF) as u8;
    let y = ((opcode >> 4) & 0xF) as u8;
    let n = (opcode & 0xF) as u8;
    let nn = (opcode & 0xFF) as u8;
    let nnn = opcode & 0xFFF;

    match opcode >> 12 {
        0x0 => match nnn {
            0x0E0 => Clear,
            0x0EE => Return,
            0x0FB => ScrollRight,
            0x0FC => ScrollLeft,
            0x0FD => Exit,
            0x0FE => LowRes,
            0x0FF => HighRes,
            _ if nnn & 0xFF0 == 0x0C0 => ScrollDown(n),
            _ => Unsupported(opcode),
        },
        0x1 => Jump(nnn),
        0x2 => Call(nnn),
        0x3 => SkipEqual { x, nn },
        0x4 => SkipNotEqual { x, nn },
        0x5 if n == 0 => SkipEqualReg { x, y },
        0x6 => Load { x, nn },
        0x7 => AddImmediate { x, nn },
        0x8 => match n {
            0x0 => Move { x, y },
            0x1 => Or { x, y },
            0x2 => And { x, y },
            0x3 => Xor { x, y },
            0x4 => Add { x, y },
            0x5 => Sub { x, y },
            0x6 => ShiftRight { x, y },
            0x7 => SubReverse { x, y },
            0xE => ShiftLeft { x, y },
            _ => Unsupported(opcode),
        },
        0x9 if n == 0 => SkipNotEqualReg { x, y },
        0xA => SetIndex(nnn),
        0xB => JumpOffset { x, nnn },
        0xC => Random { x, nn },
        0xD => Draw { x, y, n },
        0xE => match nn {
            0x9E => SkipKeyPressed { x },
            0xA1 => SkipKeyReleased { x },
            _ => Unsupported(opcode),
        },
        0xF => match nn {
            0x07 => GetDelay { x },
            0x0A => WaitKey { x },
            0x15 => SetDelay { x },
            0x18 => SetSound { x },
            0x1E => AddIndex { x },
            0x29 => FontChar { x },
            0x30 => BigFontChar { x },
            0x33 => Bcd { x },
            0x55 => Store { x },
            0x65 => Restore { x },
            0x75 => SaveFlags { x },
            0x85 => LoadFlags { x },
            _ => Unsupported(opcode),
        },
        _ => Unsupported(opcode),
    }
}

impl Instruction {
    /// Checks whether this instruction belongs to the SUPER-CHIP extensions
    pub fn is_extended(&self) -> bool {
        use Instruction::*;
        matches!(
            self,
            ScrollDown(..)
                | ScrollRight
                | ScrollLeft
                | Exit
                | LowRes
                | HighRes
                | BigFontChar { .. }
                | SaveFlags { .. }
                | LoadFlags { .. }
        )
    }

    /// Returns the instruction's category
    pub fn category(&self) -> Category {
        use Instruction::*;
        match self {
            Clear | Exit | Unsupported(..) => Category::System,
            Return
            | Jump(..)
            | Call(..)
            | SkipEqual { .. }
            | SkipNotEqual { .. }
            | SkipEqualReg { .. }
            | SkipNotEqualReg { .. }
            | JumpOffset { .. } => Category::Branch,
            Load { .. }
            | AddImmediate { .. }
            | Move { .. }
            | Or { .. }
            | And { .. }
            | Xor { .. }
            | Add { .. }
            | Sub { .. }
            | ShiftRight { .. }
            | SubReverse { .. }
            | ShiftLeft { .. }
            | Random { .. } => Category::Arithmetic,
            SetIndex(..)
            | AddIndex { .. }
            | FontChar { .. }
            | BigFontChar { .. }
            | Bcd { .. }
            | Store { .. }
            | Restore { .. }
            | SaveFlags { .. }
            | LoadFlags { .. } => Category::Memory,
            Draw { .. } | ScrollDown(..) | ScrollRight | ScrollLeft | LowRes
            | HighRes => Category::Draw,
            GetDelay { .. } | SetDelay { .. } | SetSound { .. } => {
                Category::Timer
            }
            SkipKeyPressed { .. } | SkipKeyReleased { .. } | WaitKey { .. } => {
                Category::Input
            }
        }
    }
}

/// Disassembles the instruction, using Octo-style mnemonics
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Clear => write!(f, "clear"),
            Return => write!(f, "return"),
            Jump(a) => write!(f, "jump {a:#05x}"),
            Call(a) => write!(f, "call {a:#05x}"),
            SkipEqual { x, nn } => write!(f, "if v{x:x} != {nn:#04x} then"),
            SkipNotEqual { x, nn } => {
                write!(f, "if v{x:x} == {nn:#04x} then")
            }
            SkipEqualReg { x, y } => write!(f, "if v{x:x} != v{y:x} then"),
            Load { x, nn } => write!(f, "v{x:x} := {nn:#04x}"),
            AddImmediate { x, nn } => write!(f, "v{x:x} += {nn:#04x}"),
            Move { x, y } => write!(f, "v{x:x} := v{y:x}"),
            Or { x, y } => write!(f, "v{x:x} |= v{y:x}"),
            And { x, y } => write!(f, "v{x:x} &= v{y:x}"),
            Xor { x, y } => write!(f, "v{x:x} ^= v{y:x}"),
            Add { x, y } => write!(f, "v{x:x} += v{y:x}"),
            Sub { x, y } => write!(f, "v{x:x} -= v{y:x}"),
            ShiftRight { x, y } => write!(f, "v{x:x} >>= v{y:x}"),
            SubReverse { x, y } => write!(f, "v{x:x} =- v{y:x}"),
            ShiftLeft { x, y } => write!(f, "v{x:x} <<= v{y:x}"),
            SkipNotEqualReg { x, y } => {
                write!(f, "if v{x:x} == v{y:x} then")
            }
            SetIndex(a) => write!(f, "i := {a:#05x}"),
            JumpOffset { nnn, .. } => write!(f, "jump0 {nnn:#05x}"),
            Random { x, nn } => write!(f, "v{x:x} := random {nn:#04x}"),
            Draw { x, y, n } => write!(f, "sprite v{x:x} v{y:x} {n}"),
            SkipKeyPressed { x } => write!(f, "if v{x:x} -key then"),
            SkipKeyReleased { x } => write!(f, "if v{x:x} key then"),
            GetDelay { x } => write!(f, "v{x:x} := delay"),
            WaitKey { x } => write!(f, "v{x:x} := key"),
            SetDelay { x } => write!(f, "delay := v{x:x}"),
            SetSound { x } => write!(f, "buzzer := v{x:x}"),
            AddIndex { x } => write!(f, "i += v{x:x}"),
            FontChar { x } => write!(f, "i := hex v{x:x}"),
            Bcd { x } => write!(f, "bcd v{x:x}"),
            Store { x } => write!(f, "save v{x:x}"),
            Restore { x } => write!(f, "load v{x:x}"),
            ScrollDown(n) => write!(f, "scroll-down {n}"),
            ScrollRight => write!(f, "scroll-right"),
            ScrollLeft => write!(f, "scroll-left"),
            Exit => write!(f, "exit"),
            LowRes => write!(f, "lores"),
            HighRes => write!(f, "hires"),
            BigFontChar { x } => write!(f, "i := bighex v{x:x}"),
            SaveFlags { x } => write!(f, "saveflags v{x:x}"),
            LoadFlags { x } => write!(f, "loadflags v{x:x}"),
            Unsupported(op) => write!(f, "0x{:02X} 0x{:02X}", op >> 8, op & 0xFF),
        }
    }
}
