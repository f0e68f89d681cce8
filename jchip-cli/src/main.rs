use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chip8::{Chip8, EngineError, Frame, PROGRAM_START, State, Variant, decode};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

mod config;
mod script;

use config::Overrides;
use script::Press;

/// Headless CHIP-8 runner
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// ROM to load and execute
    rom: PathBuf,

    /// Quirk preset
    #[clap(long, value_enum, default_value_t)]
    variant: Variant,

    /// JSON file overriding individual quirks of the preset
    #[clap(long)]
    quirks: Option<PathBuf>,

    #[clap(flatten)]
    overrides: Overrides,

    /// Instructions executed per 60 Hz frame (defaults to the quirk set's)
    #[clap(short, long)]
    instructions_per_frame: Option<usize>,

    /// Number of frames to run
    #[clap(short, long, default_value_t = 600)]
    frames: usize,

    /// Scripted key press, as FRAME:KEY[:HOLD] (key in hex)
    #[clap(long, value_parser = script::parse_press)]
    press: Vec<Press>,

    /// Seed for the random number generator
    #[clap(long)]
    seed: Option<u64>,

    /// Write the final frame to a PNG file
    #[clap(long)]
    screenshot: Option<PathBuf>,

    /// Pixel scale for the screenshot
    #[clap(
        long,
        default_value_t = 8,
        value_parser = clap::value_parser!(u32).range(1..=64)
    )]
    scale: u32,

    /// Pace frames at 60 Hz instead of running flat out
    #[clap(long)]
    realtime: bool,

    /// Print a disassembly of the ROM and exit
    #[clap(long)]
    disassemble: bool,

    /// Print the effective quirks as JSON and exit
    #[clap(long)]
    print_quirks: bool,
}

const FRAME_TIME: Duration = Duration::from_nanos(1_000_000_000 / 60);

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("JCHIP_LOG", "info")
        .write_style_or("JCHIP_LOG", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();
    let quirks =
        config::resolve(args.variant, args.quirks.as_deref(), &args.overrides)?;
    if args.print_quirks {
        println!("{}", serde_json::to_string_pretty(&quirks)?);
        return Ok(());
    }

    let mut f = std::fs::File::open(&args.rom)
        .with_context(|| format!("failed to open {:?}", args.rom))?;
    let mut rom = vec![];
    f.read_to_end(&mut rom).context("failed to read file")?;

    if args.disassemble {
        disassemble(&rom);
        return Ok(());
    }

    let ipf = args
        .instructions_per_frame
        .unwrap_or_else(|| quirks.default_instructions_per_frame());
    let mut vm = match args.seed {
        Some(seed) => Chip8::with_seed(quirks, seed),
        None => Chip8::new(quirks),
    };
    vm.load(&rom).context("failed to load ROM")?;
    info!("running {} frames at {ipf} instructions per frame", args.frames);

    let start = Instant::now();
    let result = run(&mut vm, &args, ipf);
    info!("finished in {:?}", start.elapsed());
    if vm.unsupported_count() > 0 {
        warn!("skipped {} unsupported instructions", vm.unsupported_count());
    }

    let frame = vm.display_snapshot();
    print!("{frame}");
    if let Some(path) = &args.screenshot {
        screenshot(&frame, args.scale, path)?;
        info!("wrote screenshot to {path:?}");
    }
    result.context("emulation halted")
}

/// Drives the session for the requested number of frames
///
/// Each frame delivers any scripted key events, ticks the timers once, then
/// runs up to `ipf` instructions.
fn run(vm: &mut Chip8, args: &Args, ipf: usize) -> Result<(), EngineError> {
    let mut buzzing = false;
    for frame in 0..args.frames {
        let t = Instant::now();
        for (key, pressed) in script::events_at(&args.press, frame) {
            vm.deliver_key_event(key, pressed);
        }
        vm.tick_timers();
        vm.run(ipf)?;

        if vm.sound_timer_active() != buzzing {
            buzzing = !buzzing;
            info!(
                "sound {} on frame {frame}",
                if buzzing { "on" } else { "off" }
            );
        }
        if vm.state() == State::Halted {
            info!("program exited on frame {frame}");
            break;
        }
        if args.realtime {
            std::thread::sleep(FRAME_TIME.saturating_sub(t.elapsed()));
        }
    }
    if let State::WaitingForKey { register } = vm.state() {
        info!("still waiting for a key into v{register:x}");
    }
    if let Some(key) = vm.keypad().any_pressed() {
        info!("key {:x} is still held", key.value());
    }
    Ok(())
}

fn disassemble(rom: &[u8]) {
    for (i, chunk) in rom.chunks(2).enumerate() {
        let addr = usize::from(PROGRAM_START) + i * 2;
        match *chunk {
            [hi, lo] => {
                let op = u16::from_be_bytes([hi, lo]);
                println!("{addr:03x}: {op:04X}  {}", decode(op));
            }
            _ => {
                // Trailing odd byte
                for b in chunk {
                    println!("{addr:03x}: {b:02X}    0x{b:02X}");
                }
            }
        }
    }
}

/// Renders a frame as a grayscale image, with `scale` pixels per dot
fn render(frame: &Frame, scale: u32) -> Result<image::GrayImage> {
    let scale = scale.max(1);
    let w = u32::try_from(frame.width())?;
    let h = u32::try_from(frame.height())?;
    let (sw, sh) = w
        .checked_mul(scale)
        .zip(h.checked_mul(scale))
        .with_context(|| format!("screenshot scale {scale} is too large"))?;
    let pixels = frame.pixels();
    Ok(image::GrayImage::from_fn(sw, sh, |x, y| {
        let lit = pixels[((y / scale) * w + x / scale) as usize];
        image::Luma([if lit { 0xFF } else { 0x00 }])
    }))
}

fn screenshot(frame: &Frame, scale: u32, path: &Path) -> Result<()> {
    render(frame, scale)?
        .save(path)
        .with_context(|| format!("failed to write {path:?}"))
}
