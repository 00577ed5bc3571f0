/*! Pre-Mask Builder: the four boolean rasters computed before the detector
runs, and the flags each contributing condition records. */

use crate::flags::{AlgoFlags, FlagBit};
use crate::frame::FrameInputs;
use crate::grid::Grid;
use crate::params::Params;

/// The four pre-masks produced from raw inputs, before finalization.
pub struct PreMasks {
    pub bad_dqf: Grid<bool>,
    pub validated: Grid<bool>,
    pub invalidated: Grid<bool>,
    pub skip: Grid<bool>,
}

fn dqf_is_bad(code: u8) -> bool {
    code != 0 && code != 2
}

fn empty_mask(height: usize, width: usize) -> Grid<bool> {
    Grid::filled(height, width, false)
}

/// Build the four pre-masks, recording one flag bit per contributing
/// condition as it is folded in.
pub fn build(inputs: &FrameInputs, params: &Params, flags: &mut AlgoFlags) -> PreMasks {
    let (h, w) = inputs.shape();

    let mut bad_dqf = empty_mask(h, w);
    for (y, x) in bad_dqf.indices() {
        let bad = dqf_is_bad(*inputs.c02_dqf.get(y, x))
            || dqf_is_bad(*inputs.c05_dqf.get(y, x))
            || dqf_is_bad(*inputs.c07_dqf.get(y, x))
            || dqf_is_bad(*inputs.c14_dqf.get(y, x));
        bad_dqf.set(y, x, bad);
    }

    let mut validated = empty_mask(h, w);
    for (y, x) in validated.indices() {
        let v = *inputs.c02_rf.get(y, x) > params.c0x_rf_max_threshold
            && *inputs.c05_rf.get(y, x) > params.c0x_rf_max_threshold
            && *inputs.c07_rf.get(y, x) > params.c0x_rf_max_threshold;
        validated.set(y, x, v);
    }
    flags.set_mask_flag(&validated, FlagBit::PixelPrevalidatedByMaxRfThresholds);

    let mut bad_data = empty_mask(h, w);
    for (y, x) in bad_data.indices() {
        let bad = is_bad(*inputs.c02_rf.get(y, x))
            || is_bad(*inputs.c05_rf.get(y, x))
            || is_bad(*inputs.c07_rf.get(y, x))
            || is_bad(*inputs.c07_bt.get(y, x))
            || is_bad(*inputs.c14_bt.get(y, x));
        bad_data.set(y, x, bad);
    }

    let mut water = empty_mask(h, w);
    for (y, x) in water.indices() {
        water.set(y, x, !*inputs.water_mask.get(y, x));
    }

    let mut max_sat_za = empty_mask(h, w);
    for (y, x) in max_sat_za.indices() {
        max_sat_za.set(y, x, *inputs.sat_za.get(y, x) > params.max_sat_za_threshold_rad());
    }

    let mut max_sun_za = empty_mask(h, w);
    for (y, x) in max_sun_za.indices() {
        max_sun_za.set(y, x, *inputs.sun_za.get(y, x) > params.max_sun_za_threshold_rad());
    }

    let mut min_sun_za = empty_mask(h, w);
    for (y, x) in min_sun_za.indices() {
        min_sun_za.set(y, x, *inputs.sun_za.get(y, x) <= params.min_sun_za_threshold_rad());
    }

    let mut min_glint = empty_mask(h, w);
    for (y, x) in min_glint.indices() {
        min_glint.set(
            y,
            x,
            *inputs.glint_angle.get(y, x) <= params.min_glint_angle_threshold_rad(),
        );
    }

    flags.set_mask_flag(&bad_dqf, FlagBit::PixelPreinvalidatedByBadDqf);
    flags.set_mask_flag(&bad_data, FlagBit::PixelPreinvalidatedByBadData);
    flags.set_mask_flag(&water, FlagBit::PixelPreinvalidatedByWaterMask);
    flags.set_mask_flag(&max_sat_za, FlagBit::PixelPreinvalidatedByMaxSatZaThreshold);
    flags.set_mask_flag(&max_sun_za, FlagBit::PixelPreinvalidatedByMaxSunZaThreshold);
    flags.set_mask_flag(&min_sun_za, FlagBit::PixelPreinvalidatedByMinSunZaThreshold);
    flags.set_mask_flag(&min_glint, FlagBit::PixelPreinvalidatedByMinGlintAngleThreshold);

    let mut invalidated = empty_mask(h, w);
    invalidated.or_assign(&bad_dqf);
    invalidated.or_assign(&bad_data);
    invalidated.or_assign(&water);
    invalidated.or_assign(&max_sat_za);
    invalidated.or_assign(&max_sun_za);
    invalidated.or_assign(&min_sun_za);
    invalidated.or_assign(&min_glint);

    let mut cloud = empty_mask(h, w);
    for (y, x) in cloud.indices() {
        cloud.set(y, x, *inputs.cloud_mask.get(y, x));
    }
    flags.set_mask_flag(&cloud, FlagBit::PixelSkippedByCloudMask);

    let border = border_mask(h, w, params.exclude_border_width);
    flags.set_mask_flag(&border, FlagBit::PixelSkippedByBorderMask);

    let mut min_c02 = empty_mask(h, w);
    let mut min_c05 = empty_mask(h, w);
    let mut min_c07_rf = empty_mask(h, w);
    let mut min_c07_bt = empty_mask(h, w);
    let mut min_c14 = empty_mask(h, w);
    for (y, x) in min_c02.indices() {
        min_c02.set(y, x, *inputs.c02_rf.get(y, x) <= params.c02_rf_min_threshold);
        min_c05.set(y, x, *inputs.c05_rf.get(y, x) <= params.c05_rf_min_threshold);
        min_c07_rf.set(y, x, *inputs.c07_rf.get(y, x) <= params.c07_rf_min_threshold);
        min_c07_bt.set(y, x, *inputs.c07_bt.get(y, x) <= params.c07_bt_min_threshold);
        min_c14.set(y, x, *inputs.c14_bt.get(y, x) <= params.c14_bt_min_threshold);
    }
    flags.set_mask_flag(&min_c02, FlagBit::PixelSkippedByMinC02RfThreshold);
    flags.set_mask_flag(&min_c05, FlagBit::PixelSkippedByMinC05RfThreshold);
    flags.set_mask_flag(&min_c07_rf, FlagBit::PixelSkippedByMinC07RfThreshold);
    flags.set_mask_flag(&min_c07_bt, FlagBit::PixelSkippedByMinC07BtThreshold);
    flags.set_mask_flag(&min_c14, FlagBit::PixelSkippedByMinC14BtThreshold);

    let mut skip = empty_mask(h, w);
    skip.or_assign(&cloud);
    skip.or_assign(&border);
    skip.or_assign(&min_c02);
    skip.or_assign(&min_c05);
    skip.or_assign(&min_c07_rf);
    skip.or_assign(&min_c07_bt);
    skip.or_assign(&min_c14);

    log::debug!(
        "premask: bad_dqf={} validated={} invalidated={} skip={}",
        bad_dqf.count_true(),
        validated.count_true(),
        invalidated.count_true(),
        skip.count_true()
    );

    PreMasks { bad_dqf, validated, invalidated, skip }
}

fn is_bad(value: f32) -> bool {
    value.is_nan() || value <= 0.0
}

fn border_mask(height: usize, width: usize, border: usize) -> Grid<bool> {
    let mut mask = empty_mask(height, width);
    for (y, x) in mask.indices() {
        let on_border = y < border || x < border || y + border >= height || x + border >= width;
        mask.set(y, x, on_border);
    }
    mask
}
