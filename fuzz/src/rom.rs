#![no_main]

use arbitrary::Arbitrary;
use chip8::{
    Chip8, EngineError, FlagOrder, Key, MEMORY_SIZE, Profile, Quirks,
    STACK_DEPTH, State,
};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    quirks: u16,
    seed: u64,
    /// Key toggled before each frame
    keys: Vec<u8>,
    rom: Vec<u8>,
}

fn quirks(bits: u16) -> Quirks {
    let bit = |i: u16| bits & (1 << i) != 0;
    Quirks {
        flag_order: if bit(0) {
            FlagOrder::ResultLast
        } else {
            FlagOrder::FlagLast
        },
        increment_index: bit(1),
        clip_sprites: bit(2),
        shift_uses_vy: bit(3),
        jump_with_vx: bit(4),
        vf_reset: bit(5),
        display_wait: bit(6),
        index_wraparound: bit(7),
        profile: match (bit(8), bit(10)) {
            (false, _) => Profile::Chip8,
            (true, false) => Profile::SuperChip,
            (true, true) => Profile::SuperChipLegacy,
        },
        strict: bit(9),
    }
}

fuzz_target!(|input: Input| {
    let mut vm = Chip8::with_seed(quirks(input.quirks), input.seed);
    if vm.load(&input.rom).is_err() {
        return;
    }

    // Run for a bounded number of frames, halting on the first error
    for frame in 0..256 {
        if let Some(k) = input.keys.get(frame) {
            let key = Key::from_low_nibble(*k);
            vm.deliver_key_event(key, k & 0x10 != 0);
        }
        vm.tick_timers();
        match vm.run(32) {
            Ok(_) => (),
            Err(e) => {
                assert_eq!(vm.state(), State::Halted);
                if let EngineError::UnsupportedInstruction { .. } = e {
                    assert!(vm.quirks().strict);
                }
                break;
            }
        }

        let regs = vm.registers();
        assert!(regs.stack.depth() <= STACK_DEPTH);
        assert!(usize::from(regs.i) < MEMORY_SIZE);
        assert_eq!(regs.pc % 2, 0, "misaligned program counter");
        let f = vm.display_snapshot();
        assert_eq!(f.pixels().len(), f.width() * f.height());
        assert!(f.lit() <= f.width() * f.height());
    }
});
