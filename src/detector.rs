/*! The windowed-deviation Detector: adaptive window sizing, multi-pass
feedback, and per-pixel validation. */

use crate::finalize::Masks;
use crate::flags::{AlgoFlags, FlagBit};
use crate::frame::FrameInputs;
use crate::grid::Grid;
use crate::params::Params;
use crate::stats::{StatKey, StatStore};

/// Outcome of the adaptive window-sizing procedure (§4.5.1) for one
/// candidate.
#[derive(Debug, Clone, Copy)]
struct WindowSizing {
    valid: bool,
    radius: u32,
    iter: u32,
    clean_proportion: f32,
}

/// Full-window bounds `(y0, y1, x0, x1)` inclusive, or `None` if the window
/// would be clipped by the raster border.
fn full_window_bounds(
    height: usize,
    width: usize,
    y: usize,
    x: usize,
    radius: usize,
) -> Option<(usize, usize, usize, usize)> {
    if y < radius || x < radius {
        return None;
    }
    let y1 = y + radius;
    let x1 = x + radius;
    if y1 >= height || x1 >= width {
        return None;
    }
    Some((y - radius, y1, x - radius, x1))
}

/// Operates on `discard`, not band data: grow the window radius until its
/// non-discarded fraction exceeds the clean-proportion threshold, or give
/// up after `max_window_radius_iter` growths.
fn window_sizer(discard: &Grid<bool>, y: usize, x: usize, params: &Params) -> WindowSizing {
    let (height, width) = discard.shape();
    let mut last = WindowSizing { valid: false, radius: 0, iter: 0, clean_proportion: 0.0 };

    for k in 1..=params.max_window_radius_iter {
        let radius = (params.first_window_radius * k) as usize;

        let sizing = match full_window_bounds(height, width, y, x, radius) {
            None => WindowSizing { valid: false, radius: radius as u32, iter: k, clean_proportion: 0.0 },
            Some((y0, y1, x0, x1)) => {
                let mut clean = 0usize;
                let mut total = 0usize;
                for yy in y0..=y1 {
                    for xx in x0..=x1 {
                        total += 1;
                        if !*discard.get(yy, xx) {
                            clean += 1;
                        }
                    }
                }
                let proportion = clean as f32 / total as f32;
                WindowSizing {
                    valid: proportion > params.min_window_clean_proportion_threshold,
                    radius: radius as u32,
                    iter: k,
                    clean_proportion: proportion,
                }
            }
        };

        last = sizing;
        if sizing.valid {
            return sizing;
        }
    }

    last
}

/// Chebyshev-radius neighbor test over `bad_dqf`; border-clipped windows
/// are checked over whatever is in bounds (unlike the adaptive sizer, a
/// clipped DQF window is not automatically a failure).
fn dqf_neighbor_bad(bad_dqf: &Grid<bool>, y: usize, x: usize, radius: usize) -> bool {
    let (height, width) = bad_dqf.shape();
    let y0 = y.saturating_sub(radius);
    let y1 = (y + radius).min(height - 1);
    let x0 = x.saturating_sub(radius);
    let x1 = (x + radius).min(width - 1);

    for yy in y0..=y1 {
        for xx in x0..=x1 {
            if *bad_dqf.get(yy, xx) {
                return true;
            }
        }
    }
    false
}

/// NaN-ignoring mean and standard deviation of `band` over a full
/// `(2*radius+1)^2` window centered at `(y, x)`, substituting NaN at any
/// position where `discard` is true. The window is never stored back into
/// `band`; this never mutates the source raster. The center pixel is
/// included in its own window statistics (preserved as-is, see DESIGN.md).
fn nanmean_nanstd(band: &Grid<f32>, discard: &Grid<bool>, y: usize, x: usize, radius: usize) -> (f32, f32) {
    let mut sum = 0f64;
    let mut sumsq = 0f64;
    let mut n = 0u32;

    for yy in (y - radius)..=(y + radius) {
        for xx in (x - radius)..=(x + radius) {
            if *discard.get(yy, xx) {
                continue;
            }
            let v = *band.get(yy, xx);
            if v.is_nan() {
                continue;
            }
            sum += v as f64;
            sumsq += (v as f64) * (v as f64);
            n += 1;
        }
    }

    if n == 0 {
        return (f32::NAN, f32::NAN);
    }

    let mean = sum / n as f64;
    let variance = (sumsq / n as f64 - mean * mean).max(0.0);
    (mean as f32, variance.sqrt() as f32)
}

/// Run the detector's outer pass loop in place over `masks`, recording
/// flags and stats as it goes. Sequential by construction: a validation
/// must be committed before the next candidate in the same pass reads
/// `discard`.
pub fn detect(
    inputs: &FrameInputs,
    params: &Params,
    masks: &mut Masks,
    flags: &mut AlgoFlags,
    stats: &mut StatStore,
) {
    let (height, width) = inputs.shape();

    for pass in 1..=params.max_algo_passes {
        let pass_flag = match FlagBit::for_pass(pass) {
            Some(f) => f,
            None => break,
        };

        for y in 0..height {
            for x in 0..width {
                if *masks.skip.get(y, x) {
                    continue;
                }

                flags.set_flag(y, x, pass_flag);
                stats.set(y, x, StatKey::AlgoPasses, pass as f32);

                if dqf_neighbor_bad(&masks.bad_dqf, y, x, params.exclude_dqf_radius) {
                    masks.skip.set(y, x, true);
                    flags.set_flag(y, x, FlagBit::PixelInvalidatedByDqfNeighbor);
                    continue;
                }

                let sizing = window_sizer(&masks.discard, y, x, params);
                if let Some(iter_flag) = FlagBit::for_window_iter(sizing.iter) {
                    flags.set_flag(y, x, iter_flag);
                }
                stats.set(y, x, StatKey::WindowRadius, sizing.radius as f32);
                stats.set(y, x, StatKey::WindowIterations, sizing.iter as f32);
                stats.set(y, x, StatKey::WindowValidProportion, sizing.clean_proportion);

                if !sizing.valid {
                    masks.skip.set(y, x, true);
                    flags.set_flag(y, x, FlagBit::PixelInvalidatedByWindowSizing);
                    continue;
                }

                let radius = sizing.radius as usize;
                let (c02_mean, c02_stdev) = nanmean_nanstd(&inputs.c02_rf, &masks.discard, y, x, radius);
                let (c05_mean, c05_stdev) = nanmean_nanstd(&inputs.c05_rf, &masks.discard, y, x, radius);
                let (c07_mean, c07_stdev) = nanmean_nanstd(&inputs.c07_rf, &masks.discard, y, x, radius);
                let (c14_mean, c14_stdev) = nanmean_nanstd(&inputs.c14_bt, &masks.discard, y, x, radius);

                let c02_dev = *inputs.c02_rf.get(y, x) - c02_mean;
                let c05_dev = *inputs.c05_rf.get(y, x) - c05_mean;
                let c07_dev = *inputs.c07_rf.get(y, x) - c07_mean;
                let c14_dev = *inputs.c14_bt.get(y, x) - c14_mean;

                stats.set(y, x, StatKey::C02RfDeviation, c02_dev);
                stats.set(y, x, StatKey::C05RfDeviation, c05_dev);
                stats.set(y, x, StatKey::C07RfDeviation, c07_dev);
                stats.set(y, x, StatKey::C14BtDeviation, c14_dev);
                stats.set(y, x, StatKey::C02RfStdev, c02_stdev);
                stats.set(y, x, StatKey::C05RfStdev, c05_stdev);
                stats.set(y, x, StatKey::C07RfStdev, c07_stdev);
                stats.set(y, x, StatKey::C14BtStdev, c14_stdev);

                let validates = c02_dev > params.c02_rf_deviation_min_threshold
                    && c05_dev > params.c05_rf_deviation_min_threshold
                    && c07_dev > params.c07_rf_deviation_min_threshold
                    && c14_dev > params.c14_bt_deviation_min_threshold
                    && c14_stdev <= params.c14_bt_standard_deviation_max_threshold;

                if validates {
                    masks.validated.set(y, x, true);
                    masks.skip.set(y, x, true);
                    masks.discard.set(y, x, true);
                    flags.set_flag(y, x, FlagBit::PixelValidatedByWindowDeviation);
                }
            }
        }

        let validated_so_far = masks.validated.count_true();
        log::info!("detector pass {pass} complete: {validated_so_far} validated pixels");
        if validated_so_far == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn full_window_bounds_clips_at_border() {
        assert_eq!(full_window_bounds(10, 10, 5, 5, 2), Some((3, 7, 3, 7)));
        assert_eq!(full_window_bounds(10, 10, 1, 5, 2), None);
        assert_eq!(full_window_bounds(10, 10, 5, 9, 2), None);
    }

    #[test]
    fn window_sizer_fails_when_border_clips_every_growth() {
        let discard = Grid::filled(5, 5, false);
        let params = Params { first_window_radius: 1, max_window_radius_iter: 2, ..Params::default() };
        let sizing = window_sizer(&discard, 0, 0, &params);
        assert!(!sizing.valid);
        assert_eq!(sizing.iter, 2);
    }

    #[test]
    fn window_sizer_succeeds_with_clean_interior() {
        let discard = Grid::filled(21, 21, false);
        let params = Params { first_window_radius: 2, max_window_radius_iter: 3, ..Params::default() };
        let sizing = window_sizer(&discard, 10, 10, &params);
        assert!(sizing.valid);
        assert_eq!(sizing.iter, 1);
        assert_eq!(sizing.radius, 2);
    }

    #[test]
    fn window_sizer_grows_until_clean_proportion_passes() {
        let mut discard = Grid::filled(21, 21, false);
        // Poison everything within radius 2 so the first growth fails but
        // radius 4 (k=2) has a clean enough proportion.
        for yy in 8..=12 {
            for xx in 8..=12 {
                discard.set(yy, xx, true);
            }
        }
        let params = Params {
            first_window_radius: 2,
            max_window_radius_iter: 3,
            min_window_clean_proportion_threshold: 0.5,
            ..Params::default()
        };
        let sizing = window_sizer(&discard, 10, 10, &params);
        assert!(sizing.valid);
        assert!(sizing.iter >= 2);
    }

    #[test]
    fn dqf_neighbor_bad_checks_clipped_windows_too() {
        let mut bad_dqf = Grid::filled(5, 5, false);
        bad_dqf.set(0, 0, true);
        assert!(dqf_neighbor_bad(&bad_dqf, 0, 1, 1));
        assert!(!dqf_neighbor_bad(&bad_dqf, 4, 4, 1));
    }

    #[test]
    fn nanmean_excludes_discarded_and_nan_positions() {
        let mut band = Grid::filled(3, 3, 2.0f32);
        band.set(0, 0, f32::NAN);
        let mut discard = Grid::filled(3, 3, false);
        discard.set(2, 2, true);
        let (mean, _stdev) = nanmean_nanstd(&band, &discard, 1, 1, 1);
        assert!((mean - 2.0).abs() < 1e-5);
    }
}
