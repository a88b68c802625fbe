//! Granular synthesis engine facade.

use std::{sync::Arc, time::Duration};

#[cfg(feature = "assert-allocs")]
use assert_no_alloc::assert_no_alloc;

use crate::{error::Error, parameter::GranulatorParameters, utils};

// -------------------------------------------------------------------------------------------------

pub(crate) mod grain;
pub(crate) mod scheduler;
pub mod store;
pub mod window;

use scheduler::GrainScheduler;
use store::RollingBuffer;
use window::{GrainWindow, GrainWindowMode};

// -------------------------------------------------------------------------------------------------

/// Construction options for a [`Granulator`].
#[derive(Clone, Debug)]
pub struct GranulatorOptions {
    /// Envelope curve applied across every grain's lifetime.
    pub window_mode: GrainWindowMode,
    /// Maximum amount of audio the rolling store can accumulate. The whole capacity
    /// is allocated up-front; appending past it fails the stream.
    pub max_duration: Duration,
    /// Initial time between grain spawns in milliseconds.
    pub grain_interval: f32,
    /// Initial grain duration in milliseconds.
    pub grain_size: f32,
    /// Initial spawn jitter fraction in `0..=1`.
    pub grain_randomness: f32,
    /// Upper bound of concurrently active grains. Size this for the expected overlap
    /// factor `grain_size / grain_interval`; spawns get skipped when every slot is busy.
    pub pool_capacity: usize,
}

impl Default for GranulatorOptions {
    fn default() -> Self {
        Self {
            window_mode: GrainWindowMode::default(),
            max_duration: Duration::from_secs(12 * 60),
            grain_interval: 40.0,
            grain_size: 100.0,
            grain_randomness: 0.1,
            pool_capacity: 64,
        }
    }
}

impl GranulatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate all options.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_duration.is_zero() {
            return Err(Error::ParameterError(
                "Max duration must be > 0".to_string(),
            ));
        }
        if !(self.grain_interval > 0.0) {
            return Err(Error::ParameterError(
                "Grain interval must be > 0 ms".to_string(),
            ));
        }
        if !(self.grain_size > 0.0) {
            return Err(Error::ParameterError(
                "Grain size must be > 0 ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.grain_randomness) {
            return Err(Error::ParameterError(
                "Grain randomness must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.pool_capacity == 0 {
            return Err(Error::ParameterError(
                "Grain pool capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Resynthesizes streamed audio using granular synthesis.
///
/// Every [`process`](Self::process) call appends the input block to the rolling audio
/// store, then fills an equally sized output block by spawning, aging and mixing short
/// overlapping grains which read the store at an independently controllable position,
/// pitch and time-stretch factor.
///
/// `process` is meant to be driven from one real-time-sensitive call site, one block
/// per audio-callback invocation: after construction it never allocates, never blocks
/// and never performs I/O. Control parameters live in a shared, lock-free
/// [`GranulatorParameters`] block and may be changed from other threads at any time;
/// a change becomes audible on the next sample tick.
pub struct Granulator {
    parameters: Arc<GranulatorParameters>,
    store: RollingBuffer,
    window: GrainWindow,
    scheduler: GrainScheduler,
    output_buffer: Box<[f32]>,
    block_size: usize,
}

impl Granulator {
    /// Create an engine with default options for the given sample rate and the fixed
    /// block size all `process` calls will use.
    pub fn new(sample_rate: u32, block_size: usize) -> Result<Self, Error> {
        Self::new_with_options(sample_rate, block_size, GranulatorOptions::default())
    }

    /// Create an engine with custom options.
    pub fn new_with_options(
        sample_rate: u32,
        block_size: usize,
        options: GranulatorOptions,
    ) -> Result<Self, Error> {
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if block_size == 0 {
            return Err(Error::ParameterError(
                "Block size must be > 0".to_string(),
            ));
        }
        options.validate()?;

        let store = RollingBuffer::new(sample_rate, options.max_duration)?;
        let window = GrainWindow::new(options.window_mode, block_size);
        let scheduler =
            GrainScheduler::new(options.pool_capacity, utils::ms_per_sample(sample_rate));
        let parameters = Arc::new(GranulatorParameters::new(
            options.grain_interval,
            options.grain_size,
            options.grain_randomness,
        ));
        log::debug!(
            "Created granulator: {} Hz, {} sample blocks, {} grain slots",
            sample_rate,
            block_size,
            options.pool_capacity
        );
        Ok(Self {
            parameters,
            store,
            window,
            scheduler,
            output_buffer: vec![0.0; block_size].into_boxed_slice(),
            block_size,
        })
    }

    /// The fixed input/output block size in samples.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The shared parameter block. Clone the [`Arc`] to control the engine from
    /// another thread while it keeps processing.
    pub fn parameters(&self) -> &Arc<GranulatorParameters> {
        &self.parameters
    }

    /// Set the nominal playback position in seconds.
    pub fn set_position(&self, seconds: f32) {
        self.parameters.set_position(seconds);
    }

    /// Set the interpolation-rate multiplier for grain playback.
    pub fn set_pitch_shift_factor(&self, factor: f32) {
        self.parameters.set_pitch_shift_factor(factor);
    }

    /// Set the position-advance multiplier. Negative factors play backwards.
    pub fn set_timestretch_factor(&self, factor: f32) {
        self.parameters.set_timestretch_factor(factor);
    }

    /// Set the time between grain spawns in milliseconds.
    pub fn set_grain_interval(&self, milliseconds: u32) -> Result<(), Error> {
        self.parameters.set_grain_interval(milliseconds)
    }

    /// Set the duration of newly spawned grains in milliseconds.
    pub fn set_grain_size(&self, milliseconds: u32) -> Result<(), Error> {
        self.parameters.set_grain_size(milliseconds)
    }

    /// Set the spawn jitter fraction in range `0..=1`.
    pub fn set_grain_randomness(&self, fraction: f32) {
        self.parameters.set_grain_randomness(fraction);
    }

    /// Count of grains currently contributing to the output.
    pub fn active_grain_count(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Count of retired grains waiting for reuse.
    pub fn free_grain_count(&self) -> usize {
        self.scheduler.free_count()
    }

    /// Count of valid samples accumulated in the rolling store so far.
    pub fn watermark(&self) -> usize {
        self.store.watermark()
    }

    /// Reset the spawn timer. Call when (re)starting the stream.
    pub fn start(&mut self) {
        self.scheduler.start();
    }

    /// Granulate one block of input.
    ///
    /// Appends `input` to the rolling audio store, then synthesizes and returns an
    /// equally sized output block. Fails with [`Error::CapacityExceeded`] when the
    /// store's maximum duration is reached, which ends the stream.
    pub fn process(&mut self, input: &[f32]) -> Result<&[f32], Error> {
        if input.len() != self.block_size {
            return Err(Error::ParameterError(format!(
                "Input block has {} samples, expected {}",
                input.len(),
                self.block_size
            )));
        }
        self.store.append(input)?;

        #[cfg(not(feature = "assert-allocs"))]
        self.process_block();
        #[cfg(feature = "assert-allocs")]
        assert_no_alloc(|| self.process_block());

        Ok(&self.output_buffer)
    }

    /// The per-block synthesis cycle: zero the accumulator, run the first-grain
    /// bootstrap if needed, then drive one scheduler tick per output sample.
    fn process_block(&mut self) {
        self.output_buffer.fill(0.0);
        self.scheduler.bootstrap_first_grain(&self.parameters);
        for output in self.output_buffer.iter_mut() {
            *output = self
                .scheduler
                .tick(&self.store, &self.window, &self.parameters);
        }
    }

    /// Teardown hook: notify the engine that no more blocks will arrive, so
    /// downstream consumers of the hook can release their output resources.
    /// The engine itself holds nothing that needs releasing.
    pub fn processing_finished(&mut self) {
        log::debug!(
            "Granulator finished after {} samples of input",
            self.store.watermark()
        );
    }
}

// -------------------------------------------------------------------------------------------------
