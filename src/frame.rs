/*!
 * Frame Context: the orchestration entry point that owns one frame's
 * working-state rasters and runs the pipeline stages in order.
 *
 * Reframes the original's self-referential aggregate (where every child
 * component held a back-reference to the whole) as a value passed by
 * reference to free functions; each stage reads what it needs out of
 * `FrameInputs` and writes into the masks/flags/stats it's handed.
 */

use chrono::{DateTime, Utc};
use std::time::Instant;
use uuid::Uuid;

use crate::cluster::{emit, ClusterOutput};
use crate::detector::detect;
use crate::error::{SdcaError, SdcaResult};
use crate::finalize::finalize;
use crate::flags::AlgoFlags;
use crate::grid::Grid;
use crate::params::Params;
use crate::premask;
use crate::stats::StatStore;

/// Everything the core needs for one frame, supplied by external
/// collaborators (file parsing, calibration, geometry, water/cloud
/// masking are all out of scope here; see SPEC_FULL.md §6).
pub struct FrameInputs {
    pub c02_rf: Grid<f32>,
    pub c05_rf: Grid<f32>,
    pub c07_rf: Grid<f32>,
    pub c07_bt: Grid<f32>,
    pub c14_bt: Grid<f32>,

    pub c02_dqf: Grid<u8>,
    pub c05_dqf: Grid<u8>,
    pub c07_dqf: Grid<u8>,
    pub c14_dqf: Grid<u8>,

    /// True = land, false = water.
    pub water_mask: Grid<bool>,
    /// True = cloudy. Computed by the caller per the WF_ABBA contract:
    /// `(c14_bt < 270) | (c07_bt - c14_bt < -4) | ((c07_bt - c14_bt > 20) & (c07_bt < 285))`.
    pub cloud_mask: Grid<bool>,

    pub sun_za: Grid<f32>,
    pub sun_az: Grid<f32>,
    pub sat_za: Grid<f32>,
    pub sat_az: Grid<f32>,
    pub glint_angle: Grid<f32>,

    pub lat_deg: Grid<f32>,
    pub lon_deg: Grid<f32>,

    pub time_coverage_start: DateTime<Utc>,
    pub time_coverage_end: DateTime<Utc>,
}

impl FrameInputs {
    pub fn shape(&self) -> (usize, usize) {
        self.c02_rf.shape()
    }

    /// Every raster must match the source shape (the visible band's
    /// shape) exactly; this core does not resample.
    pub fn validate(&self) -> SdcaResult<()> {
        let expected = self.shape();

        macro_rules! check {
            ($name:expr, $grid:expr) => {
                let found = $grid.shape();
                if found != expected {
                    return Err(SdcaError { name: $name, expected, found });
                }
            };
        }

        check!("c05_rf", self.c05_rf);
        check!("c07_rf", self.c07_rf);
        check!("c07_bt", self.c07_bt);
        check!("c14_bt", self.c14_bt);
        check!("c02_dqf", self.c02_dqf);
        check!("c05_dqf", self.c05_dqf);
        check!("c07_dqf", self.c07_dqf);
        check!("c14_dqf", self.c14_dqf);
        check!("water_mask", self.water_mask);
        check!("cloud_mask", self.cloud_mask);
        check!("sun_za", self.sun_za);
        check!("sun_az", self.sun_az);
        check!("sat_za", self.sat_za);
        check!("sat_az", self.sat_az);
        check!("glint_angle", self.glint_angle);
        check!("lat_deg", self.lat_deg);
        check!("lon_deg", self.lon_deg);

        Ok(())
    }
}

/// Successful-path output of a frame run, or a non-fatal gate refusal.
pub enum SdcaOutput {
    Processed {
        validated_mask: Grid<bool>,
        algo_flags: AlgoFlags,
        stats: StatStore,
        pixels: Vec<crate::cluster::PixelRecord>,
        clusters: Vec<crate::cluster::ClusterSummary>,
    },
    Skipped {
        reason: &'static str,
    },
}

/// Subsample factor used by the daylit-land gate, applied only when
/// `sun_za`/`water_mask` match the source shape (they always do here,
/// since `FrameInputs::validate` already enforced that).
const DAYLIT_GATE_SUBSAMPLE: usize = 10;

fn daylit_land_fraction(inputs: &FrameInputs, params: &Params) -> f32 {
    let (height, width) = inputs.shape();
    let threshold = params.max_sun_za_threshold_rad();

    let mut land_count = 0u64;
    let mut daylit_land_count = 0u64;

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            if *inputs.water_mask.get(y, x) {
                land_count += 1;
                if *inputs.sun_za.get(y, x) <= threshold {
                    daylit_land_count += 1;
                }
            }
            x += DAYLIT_GATE_SUBSAMPLE;
        }
        y += DAYLIT_GATE_SUBSAMPLE;
    }

    if land_count == 0 {
        0.0
    } else {
        daylit_land_count as f32 / land_count as f32
    }
}

/// Run the full pipeline for one frame: pre-mask, finalize, detect,
/// cluster. Returns `Ok(SdcaOutput::Skipped { .. })` on gate refusal
/// (non-fatal); only a shape mismatch is a hard `Err`.
pub fn run(inputs: FrameInputs, params: &Params, cluster_id_suffixes: impl Fn() -> String) -> SdcaResult<SdcaOutput> {
    inputs.validate()?;

    let daylit_fraction = daylit_land_fraction(&inputs, params);
    if daylit_fraction <= params.min_daylit_portion_of_land {
        log::warn!(
            "frame at {} refused: daylit land fraction {:.4} <= {:.4}",
            inputs.time_coverage_start,
            daylit_fraction,
            params.min_daylit_portion_of_land
        );
        return Ok(SdcaOutput::Skipped { reason: "daylit_land_fraction_below_threshold" });
    }

    let (height, width) = inputs.shape();
    let mut flags = AlgoFlags::new(height, width);
    let mut stats = StatStore::new();

    let premask_start = Instant::now();
    let pre = premask::build(&inputs, params, &mut flags);
    log::info!("premask stage: {:?}", premask_start.elapsed());

    let finalize_start = Instant::now();
    let mut masks = finalize(pre, &mut flags);
    log::info!("finalize stage: {:?}", finalize_start.elapsed());

    let detect_start = Instant::now();
    detect(&inputs, params, &mut masks, &mut flags, &mut stats);
    log::info!("detect stage: {:?}", detect_start.elapsed());

    let cluster_start = Instant::now();
    let validated_count = masks.validated.count_true();
    // Enough cluster-id suffixes for the worst case (every validated pixel
    // its own cluster); `emit` only consumes one per actual component.
    let suffixes: Vec<String> = (0..validated_count.max(1)).map(|_| cluster_id_suffixes()).collect();
    let ClusterOutput { pixels, clusters } =
        emit(&masks.validated, &inputs, &flags, &stats, params, &suffixes);
    log::info!("cluster stage: {:?}, {} clusters", cluster_start.elapsed(), clusters.len());

    log::info!("frame complete: {validated_count} validated pixels, {} clusters", clusters.len());

    Ok(SdcaOutput::Processed {
        validated_mask: masks.validated,
        algo_flags: flags,
        stats,
        pixels,
        clusters,
    })
}

/// Convenience wrapper over `run` using `uuid::Uuid::new_v4` for cluster id
/// suffixes, matching the original's `uuid.uuid4()`.
pub fn run_with_random_ids(inputs: FrameInputs, params: &Params) -> SdcaResult<SdcaOutput> {
    run(inputs, params, || Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn sample_inputs(h: usize, w: usize) -> FrameInputs {
        FrameInputs {
            c02_rf: Grid::filled(h, w, 0.6),
            c05_rf: Grid::filled(h, w, 0.6),
            c07_rf: Grid::filled(h, w, 0.2),
            c07_bt: Grid::filled(h, w, 305.0),
            c14_bt: Grid::filled(h, w, 280.0),
            c02_dqf: Grid::filled(h, w, 0),
            c05_dqf: Grid::filled(h, w, 0),
            c07_dqf: Grid::filled(h, w, 0),
            c14_dqf: Grid::filled(h, w, 0),
            water_mask: Grid::filled(h, w, true),
            cloud_mask: Grid::filled(h, w, false),
            sun_za: Grid::filled(h, w, 0.3),
            sun_az: Grid::filled(h, w, 1.0),
            sat_za: Grid::filled(h, w, 0.2),
            sat_az: Grid::filled(h, w, 1.2),
            glint_angle: Grid::filled(h, w, 0.5),
            lat_deg: Grid::filled(h, w, 10.0),
            lon_deg: Grid::filled(h, w, -80.0),
            time_coverage_start: Utc.with_ymd_and_hms(2019, 6, 12, 18, 36, 27).unwrap(),
            time_coverage_end: Utc.with_ymd_and_hms(2019, 6, 12, 18, 37, 27).unwrap(),
        }
    }

    #[test]
    fn validate_rejects_mismatched_raster_shape() {
        let mut inputs = sample_inputs(10, 10);
        inputs.c05_rf = Grid::filled(9, 10, 0.0);
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn gate_refuses_frame_with_no_daylit_land() {
        let mut inputs = sample_inputs(50, 50);
        inputs.sun_za = Grid::filled(50, 50, 89.0f32.to_radians());
        let params = Params::default();
        let out = run(inputs, &params, || "test".to_string()).unwrap();
        assert!(matches!(out, SdcaOutput::Skipped { .. }));
    }

    #[test]
    fn processed_frame_returns_stage_outputs() {
        let inputs = sample_inputs(50, 50);
        let params = Params::default();
        let out = run(inputs, &params, || "test".to_string()).unwrap();
        assert!(matches!(out, SdcaOutput::Processed { .. }));
    }
}
