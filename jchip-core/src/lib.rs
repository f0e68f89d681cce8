//! CHIP-8 virtual machine
//!
//! A [`Chip8`] session owns every piece of machine state.  The host drives
//! two independent clocks: [`Chip8::step`] executes one instruction, and
//! [`Chip8::tick_timers`] decrements the delay and sound timers (nominally
//! at 60 Hz).  Behavior that differs between historical interpreters is
//! selected up front with a [`Quirks`] value.
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod decode;
mod display;
mod error;
mod keypad;
mod memory;
mod op;
mod quirks;
mod registers;

pub use decode::{Category, Instruction, decode};
pub use display::{
    Display, Edge, Frame, HIGH_RES_HEIGHT, HIGH_RES_WIDTH, LOW_RES_HEIGHT,
    LOW_RES_WIDTH,
};
pub use error::{ConfigureError, EngineError, LoadError};
pub use keypad::{InvalidKey, Key, Keypad};
pub use memory::{
    BIG_FONT_START, FONT_START, MAX_PROGRAM_SIZE, MEMORY_SIZE, Memory,
    PROGRAM_START,
};
pub use quirks::{FlagOrder, Profile, Quirks, Variant};
pub use registers::{CallStack, Registers, STACK_DEPTH};

use log::{debug, info, trace, warn};

/// Execution state of a session
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// Instructions are being executed
    Running,
    /// Blocked on `FX0A` until a key is pressed
    WaitingForKey {
        /// Register that receives the key
        register: u8,
    },
    /// Stopped, either by `00FD`, a fatal error or the host
    Halted,
}

/// A single emulation session
#[derive(Debug)]
pub struct Chip8 {
    quirks: Quirks,
    memory: Memory,
    regs: Registers,
    display: Display,
    keypad: Keypad,
    state: State,
    rng: fastrand::Rng,

    /// Persistent flag registers, written by `FX75`
    ///
    /// These survive [`Chip8::load`], like the HP-48 RPL flags they model.
    flags: [u8; 16],

    /// Set once a program has been loaded, freezing the quirks
    loaded: bool,

    /// Set by a draw under the `display_wait` quirk; cleared on the next tick
    stalled: bool,

    /// Number of unsupported instructions skipped in relaxed mode
    unsupported: usize,
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new(Quirks::default())
    }
}

impl Chip8 {
    /// Builds a new session with a randomly seeded generator
    pub fn new(quirks: Quirks) -> Self {
        Self::build(quirks, fastrand::Rng::new())
    }

    /// Builds a new session with a deterministic random number generator
    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Self::build(quirks, fastrand::Rng::with_seed(seed))
    }

    fn build(quirks: Quirks, rng: fastrand::Rng) -> Self {
        Self {
            quirks,
            memory: Memory::new(),
            regs: Registers::default(),
            display: Display::new(),
            keypad: Keypad::default(),
            state: State::Running,
            rng,
            flags: [0; 16],
            loaded: false,
            stalled: false,
            unsupported: 0,
        }
    }

    /// Replaces the quirk configuration
    ///
    /// This is only allowed before the first call to [`Chip8::load`].
    pub fn configure(&mut self, quirks: Quirks) -> Result<(), ConfigureError> {
        if self.loaded {
            return Err(ConfigureError::SessionStarted);
        }
        self.quirks = quirks;
        Ok(())
    }

    /// Resets the machine and loads a program at [`PROGRAM_START`]
    ///
    /// On failure, the session is left untouched.  The keypad latch is kept,
    /// since it mirrors keys the host is still holding down.
    pub fn load(&mut self, image: &[u8]) -> Result<(), LoadError> {
        self.memory.load_program(image, usize::from(PROGRAM_START))?;
        self.regs = Registers::default();
        self.display = Display::new();
        self.state = State::Running;
        self.stalled = false;
        self.unsupported = 0;
        self.loaded = true;
        info!("loaded {} byte program", image.len());
        Ok(())
    }

    /// Executes a single instruction
    ///
    /// This is a no-op unless the session is [`State::Running`] and not
    /// stalled waiting for the display.  Any error moves the session to
    /// [`State::Halted`], except for unsupported instructions when the
    /// `strict` quirk is disabled (those are logged and skipped).
    pub fn step(&mut self) -> Result<(), EngineError> {
        if self.state != State::Running || self.stalled {
            return Ok(());
        }
        match self.cycle() {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(
                    "halting: {e} (return stack {:03x?})",
                    self.regs.stack.as_slice()
                );
                self.state = State::Halted;
                Err(e)
            }
        }
    }

    /// Executes up to `cycles` instructions
    ///
    /// Stops early if the session leaves [`State::Running`] or stalls, and
    /// returns the number of instructions executed.
    pub fn run(&mut self, cycles: usize) -> Result<usize, EngineError> {
        let mut executed = 0;
        while executed < cycles && self.state == State::Running && !self.stalled
        {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Fetches, decodes and executes the instruction at the program counter
    fn cycle(&mut self) -> Result<(), EngineError> {
        let pc = self.regs.pc;
        let opcode = self.memory.read_word(usize::from(pc))?;
        self.regs.pc = pc.wrapping_add(2);
        let instr = decode(opcode);
        trace!("{pc:03x}: {opcode:04X}  {instr}");
        if !self.quirks.profile.supports(&instr) {
            return self.unsupported(opcode, pc);
        }
        self.execute(instr, pc)
    }

    fn unsupported(&mut self, opcode: u16, pc: u16) -> Result<(), EngineError> {
        if self.quirks.strict {
            Err(EngineError::UnsupportedInstruction { opcode, pc })
        } else {
            warn!("skipping unsupported instruction {opcode:04X} at {pc:#05x}");
            self.unsupported += 1;
            Ok(())
        }
    }

    /// Dispatches a decoded instruction
    fn execute(&mut self, instr: Instruction, pc: u16) -> Result<(), EngineError> {
        use Instruction::*;
        match instr {
            Clear => op::clear(self),
            Return => op::ret(self, pc)?,
            Jump(nnn) => op::jump(self, pc, nnn)?,
            Call(nnn) => op::call(self, pc, nnn)?,
            SkipEqual { x, nn } => op::skip_equal(self, x, nn),
            SkipNotEqual { x, nn } => op::skip_not_equal(self, x, nn),
            SkipEqualReg { x, y } => op::skip_equal_reg(self, x, y),
            Load { x, nn } => op::load(self, x, nn),
            AddImmediate { x, nn } => op::add_immediate(self, x, nn),
            Move { x, y } => op::mov(self, x, y),
            Or { x, y } => op::or(self, x, y),
            And { x, y } => op::and(self, x, y),
            Xor { x, y } => op::xor(self, x, y),
            Add { x, y } => op::add(self, x, y),
            Sub { x, y } => op::sub(self, x, y),
            ShiftRight { x, y } => op::shift_right(self, x, y),
            SubReverse { x, y } => op::sub_reverse(self, x, y),
            ShiftLeft { x, y } => op::shift_left(self, x, y),
            SkipNotEqualReg { x, y } => op::skip_not_equal_reg(self, x, y),
            SetIndex(nnn) => op::set_index(self, nnn),
            JumpOffset { x, nnn } => op::jump_offset(self, pc, x, nnn)?,
            Random { x, nn } => op::random(self, x, nn),
            Draw { x, y, n } => op::draw(self, x, y, n)?,
            SkipKeyPressed { x } => op::skip_key_pressed(self, x),
            SkipKeyReleased { x } => op::skip_key_released(self, x),
            GetDelay { x } => op::get_delay(self, x),
            WaitKey { x } => op::wait_key(self, x),
            SetDelay { x } => op::set_delay(self, x),
            SetSound { x } => op::set_sound(self, x),
            AddIndex { x } => op::add_index(self, x),
            FontChar { x } => op::font_char(self, x),
            Bcd { x } => op::bcd(self, x)?,
            Store { x } => op::store(self, x)?,
            Restore { x } => op::restore(self, x)?,
            ScrollDown(n) => op::scroll_down(self, n),
            ScrollRight => op::scroll_right(self),
            ScrollLeft => op::scroll_left(self),
            Exit => op::exit(self, pc),
            LowRes => op::low_res(self),
            HighRes => op::high_res(self),
            BigFontChar { x } => op::big_font_char(self, x),
            SaveFlags { x } => op::save_flags(self, x),
            LoadFlags { x } => op::load_flags(self, x),
            Unsupported(opcode) => self.unsupported(opcode, pc)?,
        }
        Ok(())
    }

    /// Decrements both timers (saturating at zero)
    ///
    /// This also releases a stall from the `display_wait` quirk.
    pub fn tick_timers(&mut self) {
        self.regs.delay = self.regs.delay.saturating_sub(1);
        self.regs.sound = self.regs.sound.saturating_sub(1);
        self.stalled = false;
    }

    /// Records a key press or release
    ///
    /// A press completes a pending `FX0A`, writing the key into its register
    /// and resuming execution.
    pub fn deliver_key_event(&mut self, key: Key, pressed: bool) {
        self.keypad.set_key(key, pressed);
        if let (true, State::WaitingForKey { register }) = (pressed, self.state)
        {
            debug!("key {:x} resumes execution", key.value());
            self.regs.v[usize::from(register)] = key.value();
            self.state = State::Running;
        }
    }

    /// Stops the session; later calls to [`Chip8::step`] do nothing
    pub fn halt(&mut self) {
        debug!("halted by host");
        self.state = State::Halted;
    }

    /// Returns a copy of the current display contents
    pub fn display_snapshot(&self) -> Frame {
        self.display.snapshot()
    }

    /// Checks whether the tone should be playing
    #[must_use]
    pub fn sound_timer_active(&self) -> bool {
        self.regs.sound > 0
    }

    /// Current execution state
    pub fn state(&self) -> State {
        self.state
    }

    /// Shared borrow of the register file
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Shared borrow of memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Active quirk configuration
    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    /// Shared borrow of the keypad latch
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Persistent flag storage used by `FX75` / `FX85`
    pub fn flags(&self) -> &[u8; 16] {
        &self.flags
    }

    /// Number of unsupported instructions skipped since the last load
    pub fn unsupported_count(&self) -> usize {
        self.unsupported
    }

    /// Checks whether execution is paused until the next timer tick
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    fn set_quirk(q: &mut Quirks, name: &str) {
        match name {
            "vf_reset" => q.vf_reset = true,
            "increment_index" => q.increment_index = true,
            "clip" => q.clip_sprites = true,
            "shift_vy" => q.shift_uses_vy = true,
            "jump_vx" => q.jump_with_vx = true,
            "result_last" => q.flag_order = FlagOrder::ResultLast,
            "wrap_index" => q.index_wraparound = true,
            "display_wait" => q.display_wait = true,
            "schip" => q.profile = Profile::SuperChip,
            "relaxed" => q.strict = false,
            _ => panic!("unknown quirk {name:?}"),
        }
    }

    fn assign(vm: &mut Chip8, key: &str, v: u16) {
        if let Some(r) = key.strip_prefix('V') {
            let r = usize::from_str_radix(r, 16).unwrap();
            vm.regs.v[r] = u8::try_from(v).unwrap();
        } else if let Some(a) = key.strip_prefix('M') {
            let a = usize::from_str_radix(a, 16).unwrap();
            vm.memory.write(a, u8::try_from(v).unwrap()).unwrap();
        } else {
            match key {
                "I" => vm.regs.i = v,
                "DT" => vm.regs.delay = u8::try_from(v).unwrap(),
                "ST" => vm.regs.sound = u8::try_from(v).unwrap(),
                _ => panic!("cannot assign {key:?}"),
            }
        }
    }

    fn inspect(vm: &Chip8, key: &str) -> u16 {
        if let Some(r) = key.strip_prefix('V') {
            let r = usize::from_str_radix(r, 16).unwrap();
            u16::from(vm.regs.v[r])
        } else if let Some(a) = key.strip_prefix('M') {
            let a = usize::from_str_radix(a, 16).unwrap();
            u16::from(vm.memory.read(a).unwrap())
        } else {
            match key {
                "I" => vm.regs.i,
                "PC" => vm.regs.pc,
                "DT" => u16::from(vm.regs.delay),
                "ST" => u16::from(vm.regs.sound),
                "SP" => vm.regs.stack.depth() as u16,
                _ => panic!("cannot inspect {key:?}"),
            }
        }
    }

    /// Runs a single line of the opcode test table
    ///
    /// Tokens before the opening parenthesis are quirks (`+name`), register
    /// or memory assignments (`V3=12`, `I=300`, `M300=AB`) or opcodes, which
    /// are assembled in order at `0x200`.  One cycle is executed per opcode,
    /// then each `KEY=VALUE` between the parentheses is checked.
    fn parse_and_test(s: &str) {
        let mut iter = s.split_whitespace();
        let mut quirks = Quirks::default();
        let mut setup: Vec<(&str, u16)> = vec![];
        let mut program: Vec<u8> = vec![];
        while let Some(i) = iter.next() {
            if let Some(q) = i.strip_prefix('+') {
                set_quirk(&mut quirks, q);
            } else if i == "(" {
                let mut vm = Chip8::with_seed(quirks, 0);
                vm.load(&program).unwrap();
                for (k, v) in &setup {
                    assign(&mut vm, k, *v);
                }
                for _ in 0..program.len() / 2 {
                    vm.step().unwrap();
                }
                for e in iter.by_ref() {
                    if e == ")" {
                        break;
                    }
                    let (k, v) = e.split_once('=').unwrap();
                    let expected = u16::from_str_radix(v, 16).unwrap();
                    assert_eq!(
                        inspect(&vm, k),
                        expected,
                        "{k} mismatch in {s:?}"
                    );
                }
            } else if let Some((k, v)) = i.split_once('=') {
                setup.push((k, u16::from_str_radix(v, 16).unwrap()));
            } else {
                let op = u16::from_str_radix(i, 16).unwrap();
                program.extend(op.to_be_bytes());
            }
        }
    }

    #[test]
    fn opcodes() {
        const TEST_SUITE: &str = "
            6A42                          ( VA=42 PC=202 )
            V3=10 73F5                    ( V3=05 VF=00 )
            V1=99 8010                    ( V0=99 V1=99 )
            V0=F0 V1=0F VF=07 8011        ( V0=FF VF=07 )
            V0=F0 V1=3C VF=07 8012        ( V0=30 VF=07 )
            V0=F0 V1=3C VF=07 8013        ( V0=CC VF=07 )
            V0=F0 V1=0F VF=07 +vf_reset 8011  ( V0=FF VF=00 )
            V0=F0 V1=3C VF=07 +vf_reset 8012  ( V0=30 VF=00 )
            V0=F0 V1=3C VF=07 +vf_reset 8013  ( V0=CC VF=00 )
            V0=12 V1=34 8014              ( V0=46 VF=00 )
            V0=FF V1=02 8014              ( V0=01 VF=01 )
            V0=05 V1=03 8015              ( V0=02 VF=01 )
            V0=03 V1=05 8015              ( V0=FE VF=00 )
            V0=05 V1=05 8015              ( V0=00 VF=01 )
            V0=03 V1=05 8017              ( V0=02 VF=01 )
            V0=05 V1=03 8017              ( V0=FE VF=00 )
            V0=05 V1=80 8016              ( V0=02 VF=01 V1=80 )
            V0=81 V1=00 800E              ( V0=02 VF=01 )
            V0=04 V1=81 +shift_vy 8016    ( V0=40 VF=01 V1=81 )
            V0=04 V1=81 +shift_vy 801E    ( V0=02 VF=01 )
            VF=FF V2=01 8F24              ( VF=01 )
            VF=FF V2=01 +result_last 8F24 ( VF=00 )
            VF=01 V2=02 8F25              ( VF=00 )
            VF=01 V2=02 +result_last 8F25 ( VF=FF )
            VF=03 8F06                    ( VF=01 )
            VF=03 +result_last 8F06       ( VF=01 )
            VF=02 +result_last 8F06       ( VF=01 )
            VF=02 8F06                    ( VF=00 )
            V0=12 3012                    ( PC=204 )
            V0=12 3013                    ( PC=202 )
            V0=12 4013                    ( PC=204 )
            V0=12 4012                    ( PC=202 )
            V0=12 V1=12 5010              ( PC=204 )
            V0=12 V1=13 5010              ( PC=202 )
            V0=12 V1=13 9010              ( PC=204 )
            V0=12 V1=12 9010              ( PC=202 )
            1246                          ( PC=246 )
            2300                          ( PC=300 SP=01 )
            A123                          ( I=123 )
            V0=04 B300                    ( PC=304 )
            V0=04 V3=08 B300              ( PC=304 )
            V0=04 V3=08 +jump_vx B300     ( PC=308 )
            V2=20 F215                    ( DT=20 )
            V2=20 F218                    ( ST=20 )
            DT=33 F707                    ( V7=33 )
            I=123 V1=02 F11E              ( I=125 )
            I=FFF V1=02 F11E              ( I=001 )
            V4=0A F429                    ( I=082 )
            V4=1A F429                    ( I=082 )
            V4=0A +schip F430             ( I=104 )
            V5=9C I=300 F533              ( M300=01 M301=05 M302=06 I=300 )
            V5=07 I=300 F533              ( M300=00 M301=00 M302=07 )
            I=300 V0=11 V1=22 V2=33 F255  ( M300=11 M301=22 M302=33 M303=00 I=300 )
            I=300 V0=11 V1=22 V2=33 +increment_index F255  ( I=303 )
            I=300 M300=AA M301=BB F165    ( V0=AA V1=BB V2=00 I=300 )
            I=300 M300=AA M301=BB +increment_index F165  ( I=302 )
            I=FFE V0=01 V1=02 V2=03 +wrap_index F255  ( MFFE=01 MFFF=02 M000=03 )
            V0=05 V1=06 +schip F175 6000 6100 F185  ( V0=05 V1=06 )
        ";
        for line in TEST_SUITE.lines() {
            parse_and_test(line);
        }
    }

    fn load(quirks: Quirks, program: &[u16]) -> Chip8 {
        let mut vm = Chip8::with_seed(quirks, 1234);
        let image: Vec<u8> =
            program.iter().flat_map(|op| op.to_be_bytes()).collect();
        vm.load(&image).unwrap();
        vm
    }

    #[test]
    fn empty_program() {
        let mut vm = Chip8::default();
        vm.load(&[]).unwrap();
        assert_eq!(
            vm.step(),
            Err(EngineError::UnsupportedInstruction {
                opcode: 0x0000,
                pc: 0x200
            })
        );
        assert_eq!(vm.state(), State::Halted);
        assert_eq!(vm.step(), Ok(()));
    }

    #[test]
    fn load_size() {
        let mut vm = Chip8::default();
        assert!(vm.load(&vec![0u8; MAX_PROGRAM_SIZE]).is_ok());
        let mut vm = Chip8::default();
        assert!(matches!(
            vm.load(&vec![0u8; MAX_PROGRAM_SIZE + 1]),
            Err(LoadError::TooLarge { .. })
        ));
        // A failed load leaves the session configurable
        assert!(vm.configure(Quirks::default()).is_ok());
    }

    #[test]
    fn call_return_symmetry() {
        for n in 1..=STACK_DEPTH {
            // Subroutine k lives at 0x300 + 4k, and calls subroutine k + 1
            let mut image = vec![0u8; 0x200];
            image[0..2].copy_from_slice(&0x2300u16.to_be_bytes());
            for k in 0..n {
                let addr = 0x100 + 4 * k;
                if k + 1 < n {
                    let next = 0x2300 + 4 * (k as u16 + 1);
                    image[addr..addr + 2].copy_from_slice(&next.to_be_bytes());
                    image[addr + 2..addr + 4]
                        .copy_from_slice(&0x00EEu16.to_be_bytes());
                } else {
                    image[addr..addr + 2]
                        .copy_from_slice(&0x00EEu16.to_be_bytes());
                }
            }
            let mut vm = Chip8::default();
            vm.load(&image).unwrap();
            for _ in 0..(2 * n) {
                vm.step().unwrap();
            }
            assert_eq!(vm.registers().pc, 0x202, "depth {n}");
            assert!(vm.registers().stack.is_empty());
        }
    }

    #[test]
    fn stack_overflow() {
        // 2200 calls itself forever
        let mut vm = load(Quirks::default(), &[0x2200]);
        for _ in 0..STACK_DEPTH {
            vm.step().unwrap();
        }
        assert_eq!(
            vm.step(),
            Err(EngineError::StackOverflow { pc: 0x200 })
        );
        assert_eq!(vm.state(), State::Halted);
    }

    #[test]
    fn stack_underflow() {
        let mut vm = load(Quirks::default(), &[0x00EE]);
        assert_eq!(
            vm.step(),
            Err(EngineError::StackUnderflow { pc: 0x200 })
        );
        assert_eq!(vm.state(), State::Halted);
    }

    #[test]
    fn misaligned_jump() {
        let mut vm = load(Quirks::default(), &[0x1201]);
        assert_eq!(
            vm.step(),
            Err(EngineError::MisalignedProgramCounter {
                pc: 0x200,
                target: 0x201
            })
        );
        assert_eq!(vm.registers().pc, 0x202);
    }

    #[test]
    fn draw_collision() {
        let mut vm = load(Quirks::default(), &[0xA050, 0xD005, 0xD005]);
        vm.run(2).unwrap();
        assert_eq!(vm.registers().v[0xF], 0);
        assert_eq!(vm.display_snapshot().lit(), 14);
        vm.step().unwrap();
        assert_eq!(vm.registers().v[0xF], 1);
        assert_eq!(vm.display_snapshot().lit(), 0);
    }

    #[test]
    fn draw_wraps_or_clips() {
        // V0 = 62, V1 = 31, I -> glyph "0", draw 5 rows
        let program = [0x603E, 0x611F, 0xA050, 0xD015];
        let mut vm = load(Quirks::default(), &program);
        vm.run(4).unwrap();
        let f = vm.display_snapshot();
        assert!(f.get(62, 31) && f.get(1, 31));
        assert!(f.get(62, 0) && f.get(1, 3));
        assert_eq!(f.lit(), 14);

        let quirks = Quirks {
            clip_sprites: true,
            ..Quirks::default()
        };
        let mut vm = load(quirks, &program);
        vm.run(4).unwrap();
        let f = vm.display_snapshot();
        assert!(f.get(62, 31) && f.get(63, 31));
        assert!(!f.get(0, 31) && !f.get(62, 0));
        assert_eq!(f.lit(), 2);
    }

    #[test]
    fn timers_floor_at_zero() {
        let mut vm = load(Quirks::default(), &[0x6002, 0xF015, 0xF018]);
        vm.run(3).unwrap();
        assert!(vm.sound_timer_active());
        for _ in 0..5 {
            vm.tick_timers();
        }
        assert_eq!(vm.registers().delay, 0);
        assert_eq!(vm.registers().sound, 0);
        assert!(!vm.sound_timer_active());
    }

    #[test]
    fn wait_for_key() {
        let mut vm = load(Quirks::default(), &[0xF30A, 0x6001]);
        vm.step().unwrap();
        assert_eq!(vm.state(), State::WaitingForKey { register: 3 });
        vm.step().unwrap();
        assert_eq!(vm.registers().pc, 0x202);
        assert_eq!(vm.run(10), Ok(0));

        let k = Key::try_from(0xB).unwrap();
        vm.deliver_key_event(k, false);
        assert_eq!(vm.state(), State::WaitingForKey { register: 3 });
        vm.deliver_key_event(k, true);
        assert_eq!(vm.state(), State::Running);
        assert_eq!(vm.registers().v[3], 0xB);
        vm.step().unwrap();
        assert_eq!(vm.registers().v[0], 1);
    }

    #[test]
    fn key_skips() {
        let program = [0x6107, 0xE19E, 0x6201, 0xE1A1, 0x6301];
        let mut vm = load(Quirks::default(), &program);
        vm.deliver_key_event(Key::try_from(7).unwrap(), true);
        vm.run(3).unwrap();
        assert_eq!(vm.registers().pc, 0x208);
        assert_eq!(vm.registers().v[2], 0);
        assert_eq!(vm.run(1), Ok(1));
        assert_eq!(vm.registers().v[3], 1);
    }

    #[test]
    fn relaxed_unsupported() {
        let quirks = Quirks {
            strict: false,
            ..Quirks::default()
        };
        let mut vm = load(quirks, &[0x5121, 0x00FF, 0x6A01]);
        assert_eq!(vm.run(3), Ok(3));
        assert_eq!(vm.unsupported_count(), 2);
        assert_eq!(vm.registers().v[0xA], 1);
        assert_eq!(vm.state(), State::Running);
    }

    #[test]
    fn extended_profile_gating() {
        let mut vm = load(Quirks::default(), &[0x00FF]);
        assert_eq!(
            vm.step(),
            Err(EngineError::UnsupportedInstruction {
                opcode: 0x00FF,
                pc: 0x200
            })
        );

        let mut vm = load(Variant::SuperChip.quirks(), &[0x00FF, 0x00FD]);
        vm.run(2).unwrap();
        assert_eq!(vm.display_snapshot().width(), 128);
        assert_eq!(vm.state(), State::Halted);
    }

    #[test]
    fn configure_after_load() {
        let mut vm = Chip8::default();
        assert!(vm.configure(Variant::CosmacVip.quirks()).is_ok());
        vm.load(&[0x12, 0x00]).unwrap();
        assert_eq!(
            vm.configure(Quirks::default()),
            Err(ConfigureError::SessionStarted)
        );
        assert_eq!(*vm.quirks(), Variant::CosmacVip.quirks());
    }

    #[test]
    fn out_of_bounds_store() {
        let program = [0xAFFF, 0xF255];
        let mut vm = load(Quirks::default(), &program);
        vm.step().unwrap();
        assert_eq!(vm.step(), Err(EngineError::OutOfBounds { addr: 0x1001 }));
        assert_eq!(vm.state(), State::Halted);
        // Nothing was written
        assert_eq!(vm.memory().read(0xFFF), Ok(0));

        let quirks = Quirks {
            index_wraparound: true,
            ..Quirks::default()
        };
        let mut vm = load(quirks, &[0x6007, 0xAFFF, 0xF255]);
        vm.run(3).unwrap();
        assert_eq!(vm.memory().read(0xFFF), Ok(7));
        assert_eq!(vm.memory().read(0x001), Ok(0));
    }

    #[test]
    fn out_of_bounds_sprite() {
        let program = [0xAFFE, 0xD005];
        let mut vm = load(Quirks::default(), &program);
        vm.step().unwrap();
        assert_eq!(vm.step(), Err(EngineError::OutOfBounds { addr: 0x1000 }));
        assert_eq!(vm.display_snapshot().lit(), 0);
        assert_eq!(vm.registers().v[0xF], 0);

        let quirks = Quirks {
            index_wraparound: true,
            ..Quirks::default()
        };
        // The last three rows come from the start of memory, which is zero
        let program = [0x60FF, 0x61FF, 0xAFFE, 0xF155, 0xD005];
        let mut vm = load(quirks, &program);
        vm.run(5).unwrap();
        assert_eq!(vm.display_snapshot().lit(), 16);
    }

    #[test]
    fn runs_off_the_end() {
        let mut image = vec![0u8; MAX_PROGRAM_SIZE];
        image[0..2].copy_from_slice(&0x1FFEu16.to_be_bytes());
        image[MAX_PROGRAM_SIZE - 2..].copy_from_slice(&0x6000u16.to_be_bytes());
        let mut vm = Chip8::default();
        vm.load(&image).unwrap();
        vm.run(2).unwrap();
        assert_eq!(vm.step(), Err(EngineError::OutOfBounds { addr: 0x1000 }));
    }

    #[test]
    fn display_wait() {
        let quirks = Quirks {
            display_wait: true,
            ..Quirks::default()
        };
        let mut vm = load(quirks, &[0xD005, 0x6001, 0x6102]);
        assert_eq!(vm.run(10), Ok(1));
        assert!(vm.is_stalled());
        assert_eq!(vm.run(10), Ok(0));
        vm.tick_timers();
        assert!(!vm.is_stalled());
        assert_eq!(vm.run(2), Ok(2));
        assert_eq!(vm.registers().v[1], 2);
    }

    #[test]
    fn seeded_random() {
        let program = [0xC0FF, 0xC1FF, 0xC20F];
        let mut a = load(Quirks::default(), &program);
        let mut b = load(Quirks::default(), &program);
        a.run(3).unwrap();
        b.run(3).unwrap();
        assert_eq!(a.registers().v, b.registers().v);
        assert_eq!(a.registers().v[2] & 0xF0, 0);
    }

    #[test]
    fn big_sprite() {
        let mut vm = load(
            Variant::SuperChip.quirks(),
            &[0x00FF, 0x6109, 0xF130, 0xD000],
        );
        vm.run(4).unwrap();
        // 16 rows of two bytes each, starting at the large glyph "9"
        let f = vm.display_snapshot();
        assert!(f.get(2, 0) && !f.get(0, 0));
        assert!(f.get(3, 10));
        assert_eq!(vm.registers().v[0xF], 0);

        // The base profile draws nothing
        let mut vm = load(Quirks::default(), &[0xA050, 0xD000]);
        vm.run(2).unwrap();
        assert_eq!(vm.display_snapshot().lit(), 0);
    }

    #[test]
    fn super_chip_resolution_change() {
        let program = [0xA050, 0xD005, 0x00FF, 0x00FD];
        let mut vm = load(Variant::SuperChip.quirks(), &program);
        vm.run(4).unwrap();
        assert_eq!(vm.display_snapshot().width(), 128);
        assert_eq!(vm.display_snapshot().lit(), 0);

        // SUPER-CHIP 1.1 scales the picture up instead of clearing it
        let mut vm = load(Variant::SuperChipLegacy.quirks(), &program);
        vm.run(4).unwrap();
        let f = vm.display_snapshot();
        assert_eq!(f.width(), 128);
        assert_eq!(f.lit(), 14 * 4);
        assert!(f.get(0, 0) && f.get(1, 1) && f.get(7, 0));
    }

    #[test]
    fn super_chip_legacy_scroll_zero() {
        let mut vm = load(Variant::SuperChip.quirks(), &[0x00C0]);
        assert_eq!(vm.step(), Ok(()));

        let mut vm = load(Variant::SuperChipLegacy.quirks(), &[0x00C0]);
        assert_eq!(
            vm.step(),
            Err(EngineError::UnsupportedInstruction {
                opcode: 0x00C0,
                pc: 0x200
            })
        );
    }

    #[test]
    fn super_chip_legacy_low_res_big_sprite() {
        let program = [0xA050, 0xD000];
        let mut vm = load(Variant::SuperChipLegacy.quirks(), &program);
        vm.run(2).unwrap();
        let f = vm.display_snapshot();
        // 8×16: one byte per row, the last row coming from the "3" glyph
        assert!(f.get(0, 15) && f.get(3, 15));
        assert!((0..16).all(|y| (8..64).all(|x| !f.get(x, y))));

        // Modern interpreters draw 16×16 in both resolutions
        let mut vm = load(Variant::SuperChip.quirks(), &program);
        vm.run(2).unwrap();
        let f = vm.display_snapshot();
        assert!(f.get(8, 0));
    }

    #[test]
    fn super_chip_legacy_collision_count() {
        let program = [0x00FF, 0xA050, 0xD005, 0xD005];
        let mut vm = load(Variant::SuperChip.quirks(), &program);
        vm.run(4).unwrap();
        assert_eq!(vm.registers().v[0xF], 1);

        let mut vm = load(Variant::SuperChipLegacy.quirks(), &program);
        vm.run(4).unwrap();
        assert_eq!(vm.registers().v[0xF], 5);

        // Rows clipped at the bottom edge count too
        let program = [0x00FF, 0x613E, 0xA050, 0xD015];
        let mut vm = load(Variant::SuperChipLegacy.quirks(), &program);
        vm.run(4).unwrap();
        assert_eq!(vm.registers().v[0xF], 3);
        assert_eq!(vm.display_snapshot().lit(), 4 + 2);

        let mut vm = load(Variant::SuperChip.quirks(), &program);
        vm.run(4).unwrap();
        assert_eq!(vm.registers().v[0xF], 0);

        // Low resolution still reports a single collision
        let program = [0x00FE, 0xA050, 0xD005, 0xD005];
        let mut vm = load(Variant::SuperChipLegacy.quirks(), &program);
        vm.run(4).unwrap();
        assert_eq!(vm.registers().v[0xF], 1);
    }

    #[test]
    fn keys_survive_load() {
        let mut vm = load(Quirks::default(), &[0x1200]);
        vm.deliver_key_event(Key::try_from(5).unwrap(), true);
        vm.load(&[0x60, 0x05, 0xE0, 0x9E]).unwrap();
        vm.run(2).unwrap();
        assert_eq!(vm.registers().pc, 0x206);
        assert!(vm.keypad().is_pressed(Key::try_from(5).unwrap()));
    }

    #[test]
    fn flags_survive_load() {
        let mut vm = load(Variant::SuperChip.quirks(), &[0x6042, 0xF075]);
        vm.run(2).unwrap();
        vm.load(&[0xF0, 0x85]).unwrap();
        assert_eq!(vm.registers().v[0], 0);
        vm.step().unwrap();
        assert_eq!(vm.registers().v[0], 0x42);
    }

    #[test]
    fn host_halt() {
        let mut vm = load(Quirks::default(), &[0x1200]);
        vm.run(5).unwrap();
        vm.halt();
        assert_eq!(vm.run(5), Ok(0));
        assert_eq!(vm.state(), State::Halted);
    }
}
