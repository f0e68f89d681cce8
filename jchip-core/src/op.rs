//! Instruction implementations
//!
//! Each function runs after the program counter has been advanced past the
//! instruction; `pc` is the address the instruction was fetched from.
use log::debug;

use crate::{
    Chip8, State,
    display::Edge,
    error::EngineError,
    keypad::Key,
    memory::{
        BIG_FONT_GLYPH_SIZE, BIG_FONT_START, FONT_GLYPH_SIZE, FONT_START,
        MEMORY_SIZE,
    },
    quirks::{FlagOrder, Profile},
};

const FLAG: usize = 0xF;

/// Moves the program counter, rejecting odd targets
#[inline]
fn branch(vm: &mut Chip8, pc: u16, target: u16) -> Result<(), EngineError> {
    if target % 2 != 0 {
        return Err(EngineError::MisalignedProgramCounter { pc, target });
    }
    vm.regs.pc = target;
    Ok(())
}

/// Writes a result and the flag register, in the configured order
#[inline]
fn set_with_flag(vm: &mut Chip8, x: u8, result: u8, flag: bool) {
    let x = usize::from(x);
    match vm.quirks.flag_order {
        FlagOrder::FlagLast => {
            vm.regs.v[x] = result;
            vm.regs.v[FLAG] = u8::from(flag);
        }
        FlagOrder::ResultLast => {
            vm.regs.v[FLAG] = u8::from(flag);
            vm.regs.v[x] = result;
        }
    }
}

/// Returns the address `offset` bytes past the index register
///
/// With the `index_wraparound` quirk, addresses wrap at the end of memory;
/// otherwise they are checked.
#[inline]
fn index_addr(vm: &Chip8, offset: usize) -> Result<usize, EngineError> {
    let addr = usize::from(vm.regs.i) + offset;
    if vm.quirks.index_wraparound {
        Ok(addr % MEMORY_SIZE)
    } else if addr < MEMORY_SIZE {
        Ok(addr)
    } else {
        Err(EngineError::OutOfBounds { addr })
    }
}

/// Reads `len` bytes starting at the index register
fn index_bytes(vm: &Chip8, len: usize) -> Result<Vec<u8>, EngineError> {
    if vm.quirks.index_wraparound {
        (0..len)
            .map(|k| vm.memory.read(index_addr(vm, k)?))
            .collect()
    } else {
        Ok(vm.memory.slice(usize::from(vm.regs.i), len)?.to_vec())
    }
}

#[inline]
fn reg(vm: &Chip8, x: u8) -> u8 {
    vm.regs.v[usize::from(x)]
}

#[inline]
fn skip_if(vm: &mut Chip8, cond: bool) {
    if cond {
        vm.regs.pc = vm.regs.pc.wrapping_add(2);
    }
}

/// Clear
/// ```text
/// 00E0
/// ```
///
/// Turns off every pixel.
pub fn clear(vm: &mut Chip8) {
    vm.display.clear();
}

/// Return
/// ```text
/// 00EE
/// ```
///
/// Pops the most recent return address into the program counter.
pub fn ret(vm: &mut Chip8, pc: u16) -> Result<(), EngineError> {
    let target = vm
        .regs
        .stack
        .pop()
        .ok_or(EngineError::StackUnderflow { pc })?;
    branch(vm, pc, target)
}

/// Jump
/// ```text
/// 1NNN
/// ```
pub fn jump(vm: &mut Chip8, pc: u16, nnn: u16) -> Result<(), EngineError> {
    branch(vm, pc, nnn)
}

/// Call
/// ```text
/// 2NNN
/// ```
///
/// Pushes the address of the following instruction, then jumps to `NNN`.
pub fn call(vm: &mut Chip8, pc: u16, nnn: u16) -> Result<(), EngineError> {
    if nnn % 2 != 0 {
        return Err(EngineError::MisalignedProgramCounter { pc, target: nnn });
    }
    if !vm.regs.stack.push(vm.regs.pc) {
        return Err(EngineError::StackOverflow { pc });
    }
    vm.regs.pc = nnn;
    Ok(())
}

/// Skip if equal (immediate)
/// ```text
/// 3XNN
/// ```
pub fn skip_equal(vm: &mut Chip8, x: u8, nn: u8) {
    let cond = reg(vm, x) == nn;
    skip_if(vm, cond);
}

/// Skip if not equal (immediate)
/// ```text
/// 4XNN
/// ```
pub fn skip_not_equal(vm: &mut Chip8, x: u8, nn: u8) {
    let cond = reg(vm, x) != nn;
    skip_if(vm, cond);
}

/// Skip if registers are equal
/// ```text
/// 5XY0
/// ```
pub fn skip_equal_reg(vm: &mut Chip8, x: u8, y: u8) {
    let cond = reg(vm, x) == reg(vm, y);
    skip_if(vm, cond);
}

/// Load immediate
/// ```text
/// 6XNN
/// ```
pub fn load(vm: &mut Chip8, x: u8, nn: u8) {
    vm.regs.v[usize::from(x)] = nn;
}

/// Add immediate
/// ```text
/// 7XNN
/// ```
///
/// Wraps on overflow without touching `VF`.
pub fn add_immediate(vm: &mut Chip8, x: u8, nn: u8) {
    let v = &mut vm.regs.v[usize::from(x)];
    *v = v.wrapping_add(nn);
}

/// Move
/// ```text
/// 8XY0
/// ```
pub fn mov(vm: &mut Chip8, x: u8, y: u8) {
    vm.regs.v[usize::from(x)] = reg(vm, y);
}

/// Shared implementation of `8XY1` / `8XY2` / `8XY3`
fn logic(vm: &mut Chip8, x: u8, y: u8, f: fn(u8, u8) -> u8) {
    vm.regs.v[usize::from(x)] = f(reg(vm, x), reg(vm, y));
    if vm.quirks.vf_reset {
        vm.regs.v[FLAG] = 0;
    }
}

/// Bitwise or
/// ```text
/// 8XY1
/// ```
pub fn or(vm: &mut Chip8, x: u8, y: u8) {
    logic(vm, x, y, |a, b| a | b);
}

/// Bitwise and
/// ```text
/// 8XY2
/// ```
pub fn and(vm: &mut Chip8, x: u8, y: u8) {
    logic(vm, x, y, |a, b| a & b);
}

/// Bitwise exclusive or
/// ```text
/// 8XY3
/// ```
pub fn xor(vm: &mut Chip8, x: u8, y: u8) {
    logic(vm, x, y, |a, b| a ^ b);
}

/// Add
/// ```text
/// 8XY4
/// ```
///
/// `VF` is set to the carry.
pub fn add(vm: &mut Chip8, x: u8, y: u8) {
    let (r, carry) = reg(vm, x).overflowing_add(reg(vm, y));
    set_with_flag(vm, x, r, carry);
}

/// Subtract
/// ```text
/// 8XY5
/// ```
///
/// `VX = VX - VY`; `VF` is set to 1 when no borrow occurs.
pub fn sub(vm: &mut Chip8, x: u8, y: u8) {
    let (r, borrow) = reg(vm, x).overflowing_sub(reg(vm, y));
    set_with_flag(vm, x, r, !borrow);
}

/// Reverse subtract
/// ```text
/// 8XY7
/// ```
///
/// `VX = VY - VX`; `VF` is set to 1 when no borrow occurs.
pub fn sub_reverse(vm: &mut Chip8, x: u8, y: u8) {
    let (r, borrow) = reg(vm, y).overflowing_sub(reg(vm, x));
    set_with_flag(vm, x, r, !borrow);
}

#[inline]
fn shift_source(vm: &Chip8, x: u8, y: u8) -> u8 {
    if vm.quirks.shift_uses_vy {
        reg(vm, y)
    } else {
        reg(vm, x)
    }
}

/// Shift right
/// ```text
/// 8XY6
/// ```
///
/// `VF` receives the bit shifted out.
pub fn shift_right(vm: &mut Chip8, x: u8, y: u8) {
    let v = shift_source(vm, x, y);
    set_with_flag(vm, x, v >> 1, v & 1 != 0);
}

/// Shift left
/// ```text
/// 8XYE
/// ```
///
/// `VF` receives the bit shifted out.
pub fn shift_left(vm: &mut Chip8, x: u8, y: u8) {
    let v = shift_source(vm, x, y);
    set_with_flag(vm, x, v << 1, v & 0x80 != 0);
}

/// Skip if registers differ
/// ```text
/// 9XY0
/// ```
pub fn skip_not_equal_reg(vm: &mut Chip8, x: u8, y: u8) {
    let cond = reg(vm, x) != reg(vm, y);
    skip_if(vm, cond);
}

/// Set index
/// ```text
/// ANNN
/// ```
pub fn set_index(vm: &mut Chip8, nnn: u16) {
    vm.regs.i = nnn;
}

/// Jump with offset
/// ```text
/// BNNN
/// ```
///
/// Jumps to `NNN + V0`, or `NNN + VX` under the `jump_with_vx` quirk.
pub fn jump_offset(
    vm: &mut Chip8,
    pc: u16,
    x: u8,
    nnn: u16,
) -> Result<(), EngineError> {
    let r = if vm.quirks.jump_with_vx { x } else { 0 };
    let target = nnn + u16::from(reg(vm, r));
    branch(vm, pc, target)
}

/// Random
/// ```text
/// CXNN
/// ```
///
/// `VX` is set to a random byte masked by `NN`.
pub fn random(vm: &mut Chip8, x: u8, nn: u8) {
    vm.regs.v[usize::from(x)] = vm.rng.u8(..) & nn;
}

/// Draw
/// ```text
/// DXYN
/// ```
///
/// XORs an `N`-row sprite from memory at `I` onto the display at
/// `(VX, VY)`, setting `VF` on collision.  With `N == 0`, the extended
/// profiles draw a 16×16 sprite (32 bytes), except for SUPER-CHIP 1.1 in
/// low resolution, which draws 8×16; the base profile draws nothing.
///
/// SUPER-CHIP 1.1 in high resolution sets `VF` to the number of rows that
/// collided, plus the number of rows clipped at the bottom edge.
///
/// All sprite bytes are fetched before the display is touched, so a failed
/// read leaves it unchanged.
pub fn draw(vm: &mut Chip8, x: u8, y: u8, n: u8) -> Result<(), EngineError> {
    let vx = usize::from(reg(vm, x));
    let vy = usize::from(reg(vm, y));
    let edge = if vm.quirks.clip_sprites {
        Edge::Clip
    } else {
        Edge::Wrap
    };
    let hires = vm.display.is_high_resolution();
    let (collided, height) = match (n, vm.quirks.profile) {
        (0, Profile::Chip8) => (0, 0),
        (0, Profile::SuperChipLegacy) if !hires => {
            let rows = index_bytes(vm, 16)?;
            (vm.display.draw(vx, vy, &rows, edge), 16)
        }
        (0, _) => {
            let rows: Vec<u16> = index_bytes(vm, 32)?
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            (vm.display.draw_wide(vx, vy, &rows, edge), 16)
        }
        (n, _) => {
            let rows = index_bytes(vm, usize::from(n))?;
            (vm.display.draw(vx, vy, &rows, edge), usize::from(n))
        }
    };
    let vf = if vm.quirks.profile == Profile::SuperChipLegacy && hires {
        collided + vm.display.clipped_rows(vy, height, edge)
    } else {
        collided.min(1)
    };
    // At most 16 rows, so this always fits
    vm.regs.v[FLAG] = vf as u8;
    if vm.quirks.display_wait {
        vm.stalled = true;
    }
    Ok(())
}

/// Skip if key pressed
/// ```text
/// EX9E
/// ```
///
/// Only the low nibble of `VX` selects the key.
pub fn skip_key_pressed(vm: &mut Chip8, x: u8) {
    let key = Key::from_low_nibble(reg(vm, x));
    let cond = vm.keypad.is_pressed(key);
    skip_if(vm, cond);
}

/// Skip if key released
/// ```text
/// EXA1
/// ```
pub fn skip_key_released(vm: &mut Chip8, x: u8) {
    let key = Key::from_low_nibble(reg(vm, x));
    let cond = !vm.keypad.is_pressed(key);
    skip_if(vm, cond);
}

/// Read delay timer
/// ```text
/// FX07
/// ```
pub fn get_delay(vm: &mut Chip8, x: u8) {
    vm.regs.v[usize::from(x)] = vm.regs.delay;
}

/// Wait for key
/// ```text
/// FX0A
/// ```
///
/// Suspends execution until the host delivers a key press, which is then
/// written to `VX`.
pub fn wait_key(vm: &mut Chip8, x: u8) {
    debug!("waiting for key into v{x:x}");
    vm.state = State::WaitingForKey { register: x };
}

/// Set delay timer
/// ```text
/// FX15
/// ```
pub fn set_delay(vm: &mut Chip8, x: u8) {
    vm.regs.delay = reg(vm, x);
}

/// Set sound timer
/// ```text
/// FX18
/// ```
pub fn set_sound(vm: &mut Chip8, x: u8) {
    vm.regs.sound = reg(vm, x);
}

/// Add to index
/// ```text
/// FX1E
/// ```
///
/// The index register wraps at the end of memory.
pub fn add_index(vm: &mut Chip8, x: u8) {
    let i = usize::from(vm.regs.i) + usize::from(reg(vm, x));
    vm.regs.i = (i % MEMORY_SIZE) as u16;
}

/// Small font glyph
/// ```text
/// FX29
/// ```
///
/// Points `I` at the 4×5 glyph for the low nibble of `VX`.
pub fn font_char(vm: &mut Chip8, x: u8) {
    vm.regs.i = FONT_START + u16::from(reg(vm, x) & 0xF) * FONT_GLYPH_SIZE;
}

/// Large font glyph
/// ```text
/// FX30
/// ```
///
/// Points `I` at the 8×10 glyph for the low nibble of `VX`.
pub fn big_font_char(vm: &mut Chip8, x: u8) {
    vm.regs.i =
        BIG_FONT_START + u16::from(reg(vm, x) & 0xF) * BIG_FONT_GLYPH_SIZE;
}

/// Binary-coded decimal
/// ```text
/// FX33
/// ```
///
/// Writes the hundreds, tens and ones digits of `VX` to `I`, `I + 1` and
/// `I + 2`.
pub fn bcd(vm: &mut Chip8, x: u8) -> Result<(), EngineError> {
    index_addr(vm, 2)?;
    let v = reg(vm, x);
    for (k, digit) in [v / 100, (v / 10) % 10, v % 10].into_iter().enumerate()
    {
        let addr = index_addr(vm, k)?;
        vm.memory.write(addr, digit)?;
    }
    Ok(())
}

#[inline]
fn advance_index(vm: &mut Chip8, x: u8) {
    if vm.quirks.increment_index {
        let i = usize::from(vm.regs.i) + usize::from(x) + 1;
        vm.regs.i = (i % MEMORY_SIZE) as u16;
    }
}

/// Store registers
/// ```text
/// FX55
/// ```
///
/// Copies `V0` through `VX` to memory at `I`.  `I` is left unchanged unless
/// the `increment_index` quirk is set.
pub fn store(vm: &mut Chip8, x: u8) -> Result<(), EngineError> {
    index_addr(vm, usize::from(x))?;
    for k in 0..=usize::from(x) {
        let addr = index_addr(vm, k)?;
        vm.memory.write(addr, vm.regs.v[k])?;
    }
    advance_index(vm, x);
    Ok(())
}

/// Restore registers
/// ```text
/// FX65
/// ```
///
/// Copies memory at `I` into `V0` through `VX`, with the same index
/// behavior as [`store`].
pub fn restore(vm: &mut Chip8, x: u8) -> Result<(), EngineError> {
    let bytes = index_bytes(vm, usize::from(x) + 1)?;
    vm.regs.v[..bytes.len()].copy_from_slice(&bytes);
    advance_index(vm, x);
    Ok(())
}

/// Scroll down
/// ```text
/// 00CN
/// ```
pub fn scroll_down(vm: &mut Chip8, n: u8) {
    vm.display.scroll_down(usize::from(n));
}

/// Scroll right by 4 pixels
/// ```text
/// 00FB
/// ```
pub fn scroll_right(vm: &mut Chip8) {
    vm.display.scroll_right();
}

/// Scroll left by 4 pixels
/// ```text
/// 00FC
/// ```
pub fn scroll_left(vm: &mut Chip8) {
    vm.display.scroll_left();
}

/// Exit
/// ```text
/// 00FD
/// ```
pub fn exit(vm: &mut Chip8, pc: u16) {
    debug!("program exited at {pc:#05x}");
    vm.state = State::Halted;
}

/// Shared implementation of `00FE` / `00FF`
///
/// SUPER-CHIP 1.1 keeps the picture; modern interpreters clear it.
fn set_resolution(vm: &mut Chip8, hires: bool) {
    vm.display.set_high_resolution(hires);
    if vm.quirks.profile != Profile::SuperChipLegacy {
        vm.display.clear();
    }
}

/// Low resolution
/// ```text
/// 00FE
/// ```
pub fn low_res(vm: &mut Chip8) {
    set_resolution(vm, false);
}

/// High resolution
/// ```text
/// 00FF
/// ```
pub fn high_res(vm: &mut Chip8) {
    set_resolution(vm, true);
}

/// Save flags
/// ```text
/// FX75
/// ```
///
/// Copies `V0` through `VX` into persistent flag storage.
pub fn save_flags(vm: &mut Chip8, x: u8) {
    let n = usize::from(x) + 1;
    vm.flags[..n].copy_from_slice(&vm.regs.v[..n]);
}

/// Load flags
/// ```text
/// FX85
/// ```
pub fn load_flags(vm: &mut Chip8, x: u8) {
    let n = usize::from(x) + 1;
    vm.regs.v[..n].copy_from_slice(&vm.flags[..n]);
}
