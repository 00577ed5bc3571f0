//! Sparkle Detection and Characterization: pre-masking, an iterative
//! windowed-deviation detector with adaptive window sizing, and the
//! 8-connected clustering / metadata emission built on top of it.

#![allow(dead_code)]

pub use cluster::{
    BandReadings, ClusterOutput, ClusterSummary, DebugRecord, Deviations, NavRecord, PixelRecord,
};
pub use detector::detect;
pub use error::{SdcaError, SdcaResult};
pub use flags::{AlgoFlags, FlagBit};
pub use frame::{run, run_with_random_ids, FrameInputs, SdcaOutput};
pub use geo::{calc_reflections, glint_angle, Reflection};
pub use grid::Grid;
pub use params::Params;
pub use stats::{StatKey, StatStore};

mod cluster;
mod detector;
mod error;
mod finalize;
mod flags;
mod frame;
mod geo;
mod grid;
mod params;
mod premask;
mod stats;
