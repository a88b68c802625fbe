#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod error;
mod granulator;
mod parameter;

// public, flat re-exports
pub use error::Error;

pub use granulator::{
    store::{
        Interpolation, RollingBuffer, ADAPTIVE_INTERP_HIGH_THRESH, ADAPTIVE_INTERP_LOW_THRESH,
    },
    window::{GrainWindow, GrainWindowMode},
    Granulator, GranulatorOptions,
};

pub use parameter::{GranulatorParameters, ParameterSnapshot};

// public mods
pub mod utils;
