//! Granulates a generated test tone and writes the result to a wav file.

use granulite::{Error, GrainWindowMode, Granulator, GranulatorOptions};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

// Granular parameter consts (tweak as needed!)

const SAMPLE_RATE: u32 = 44100;
const BLOCK_SIZE: usize = 512;

const GRAIN_SIZE_MS: u32 = 80;
const GRAIN_INTERVAL_MS: u32 = 30;
const PITCH_FACTOR: f32 = 0.8;
const TIME_STRETCH_FACTOR: f32 = 0.5;
const WINDOW_MODE: GrainWindowMode = GrainWindowMode::Cosine;

/// Input tone frequency in Hz.
const TONE_FREQUENCY: f32 = 220.0;
/// Length of the generated input in seconds.
const INPUT_SECONDS: usize = 4;

/// Path of the resulting wav file.
const OUTPUT_PATH: &str = "granulated.wav";

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    // create the engine and dial in the granular texture
    let options = GranulatorOptions {
        window_mode: WINDOW_MODE,
        ..Default::default()
    };
    let mut granulator = Granulator::new_with_options(SAMPLE_RATE, BLOCK_SIZE, options)?;
    granulator.set_grain_size(GRAIN_SIZE_MS)?;
    granulator.set_grain_interval(GRAIN_INTERVAL_MS)?;
    granulator.set_pitch_shift_factor(PITCH_FACTOR);
    granulator.set_timestretch_factor(TIME_STRETCH_FACTOR);
    granulator.start();

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(OUTPUT_PATH, spec).expect("Failed to create wav");

    // stream the tone through the engine, block by block
    let mut input = vec![0.0f32; BLOCK_SIZE];
    let mut phase = 0.0f32;
    let block_count = INPUT_SECONDS * SAMPLE_RATE as usize / BLOCK_SIZE;
    for _ in 0..block_count {
        for sample in input.iter_mut() {
            *sample = (phase * std::f32::consts::TAU).sin() * 0.8;
            phase = (phase + TONE_FREQUENCY / SAMPLE_RATE as f32).fract();
        }
        let output = granulator.process(&input)?;
        for &sample in output {
            writer.write_sample(sample).expect("Failed to write sample");
        }
    }

    granulator.processing_finished();
    writer.finalize().expect("Failed to finalize wav");

    log::info!("Wrote granulated tone to '{OUTPUT_PATH}'");
    Ok(())
}
