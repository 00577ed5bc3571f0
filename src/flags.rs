/*! The per-pixel decision bitfield and its named-flag dictionary. */

use crate::grid::Grid;

/** Named decision bits set in `algo_flags`.

Bit numbers are stable; external tooling reads them directly, so the
discriminant values below must never be renumbered. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagBit {
    UnprocessedPixel = 0,

    PixelValidatedByPreAlgoMasking = 2,
    PixelPrevalidatedByMaxRfThresholds = 3,

    PixelSkippedByPreAlgoMasking = 11,
    PixelSkippedByCloudMask = 12,
    PixelSkippedByBorderMask = 13,
    PixelSkippedByMinC02RfThreshold = 14,
    PixelSkippedByMinC05RfThreshold = 15,
    PixelSkippedByMinC07RfThreshold = 16,
    PixelSkippedByMinC07BtThreshold = 17,
    PixelSkippedByMinC14BtThreshold = 18,

    PixelInvalidatedByPreAlgoMasking = 21,
    PixelPreinvalidatedByBadDqf = 22,
    PixelPreinvalidatedByBadData = 23,
    PixelPreinvalidatedByWaterMask = 24,
    PixelPreinvalidatedByMaxSatZaThreshold = 25,
    PixelPreinvalidatedByMaxSunZaThreshold = 26,
    PixelPreinvalidatedByMinSunZaThreshold = 27,
    PixelPreinvalidatedByMinGlintAngleThreshold = 28,

    PixelConsideredOnFirstPass = 31,
    PixelConsideredOnSecondPass = 32,

    PixelHad1WindowIterations = 41,
    PixelHad2WindowIterations = 42,
    PixelHad3WindowIterations = 43,

    PixelInvalidatedByDqfNeighbor = 51,
    PixelInvalidatedByWindowSizing = 52,

    PixelValidatedByWindowDeviation = 61,
}

impl FlagBit {
    pub fn bit(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        use FlagBit::*;
        match self {
            UnprocessedPixel => "unprocessed_pixel",
            PixelValidatedByPreAlgoMasking => "pixel_validated_by_pre_algo_masking",
            PixelPrevalidatedByMaxRfThresholds => "pixel_prevalidated_by_max_rf_thresholds",
            PixelSkippedByPreAlgoMasking => "pixel_skipped_by_pre_algo_masking",
            PixelSkippedByCloudMask => "pixel_skipped_by_cloud_mask",
            PixelSkippedByBorderMask => "pixel_skipped_by_border_mask",
            PixelSkippedByMinC02RfThreshold => "pixel_skipped_by_min_c02_rf_threshold",
            PixelSkippedByMinC05RfThreshold => "pixel_skipped_by_min_c05_rf_threshold",
            PixelSkippedByMinC07RfThreshold => "pixel_skipped_by_min_c07_rf_threshold",
            PixelSkippedByMinC07BtThreshold => "pixel_skipped_by_min_c07_bt_threshold",
            PixelSkippedByMinC14BtThreshold => "pixel_skipped_by_min_c14_bt_threshold",
            PixelInvalidatedByPreAlgoMasking => "pixel_invalidated_by_pre_algo_masking",
            PixelPreinvalidatedByBadDqf => "pixel_preinvalidated_by_bad_dqf",
            PixelPreinvalidatedByBadData => "pixel_preinvalidated_by_bad_data",
            PixelPreinvalidatedByWaterMask => "pixel_preinvalidated_by_water_mask",
            PixelPreinvalidatedByMaxSatZaThreshold => "pixel_preinvalidated_by_max_sat_za_threshold",
            PixelPreinvalidatedByMaxSunZaThreshold => "pixel_preinvalidated_by_max_sun_za_threshold",
            PixelPreinvalidatedByMinSunZaThreshold => "pixel_preinvalidated_by_min_sun_za_threshold",
            PixelPreinvalidatedByMinGlintAngleThreshold => {
                "pixel_preinvalidated_by_min_glint_angle_threshold"
            }
            PixelConsideredOnFirstPass => "pixel_considered_on_first_pass",
            PixelConsideredOnSecondPass => "pixel_considered_on_second_pass",
            PixelHad1WindowIterations => "pixel_had_1_window_iterations",
            PixelHad2WindowIterations => "pixel_had_2_window_iterations",
            PixelHad3WindowIterations => "pixel_had_3_window_iterations",
            PixelInvalidatedByDqfNeighbor => "pixel_invalidated_by_dqf_neighbor",
            PixelInvalidatedByWindowSizing => "pixel_invalidated_by_window_sizing",
            PixelValidatedByWindowDeviation => "pixel_validated_by_window_deviation",
        }
    }

    /// The flag for `flag_offset_algo_passes + pass` (pass is 1-based).
    pub fn for_pass(pass: u32) -> Option<FlagBit> {
        match pass {
            1 => Some(FlagBit::PixelConsideredOnFirstPass),
            2 => Some(FlagBit::PixelConsideredOnSecondPass),
            _ => None,
        }
    }

    /// The flag for `flag_offset_window_iterations + iter`.
    pub fn for_window_iter(iter: u32) -> Option<FlagBit> {
        match iter {
            1 => Some(FlagBit::PixelHad1WindowIterations),
            2 => Some(FlagBit::PixelHad2WindowIterations),
            3 => Some(FlagBit::PixelHad3WindowIterations),
            _ => None,
        }
    }

    fn all() -> &'static [FlagBit] {
        use FlagBit::*;
        &[
            UnprocessedPixel,
            PixelValidatedByPreAlgoMasking,
            PixelPrevalidatedByMaxRfThresholds,
            PixelSkippedByPreAlgoMasking,
            PixelSkippedByCloudMask,
            PixelSkippedByBorderMask,
            PixelSkippedByMinC02RfThreshold,
            PixelSkippedByMinC05RfThreshold,
            PixelSkippedByMinC07RfThreshold,
            PixelSkippedByMinC07BtThreshold,
            PixelSkippedByMinC14BtThreshold,
            PixelInvalidatedByPreAlgoMasking,
            PixelPreinvalidatedByBadDqf,
            PixelPreinvalidatedByBadData,
            PixelPreinvalidatedByWaterMask,
            PixelPreinvalidatedByMaxSatZaThreshold,
            PixelPreinvalidatedByMaxSunZaThreshold,
            PixelPreinvalidatedByMinSunZaThreshold,
            PixelPreinvalidatedByMinGlintAngleThreshold,
            PixelConsideredOnFirstPass,
            PixelConsideredOnSecondPass,
            PixelHad1WindowIterations,
            PixelHad2WindowIterations,
            PixelHad3WindowIterations,
            PixelInvalidatedByDqfNeighbor,
            PixelInvalidatedByWindowSizing,
            PixelValidatedByWindowDeviation,
        ]
    }
}

/// Owns the `int64`-per-pixel decision bitfield.
pub struct AlgoFlags {
    bits: Grid<i64>,
}

impl AlgoFlags {
    pub fn new(height: usize, width: usize) -> Self {
        AlgoFlags { bits: Grid::filled(height, width, 0i64) }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.bits.shape()
    }

    pub fn raw(&self) -> &Grid<i64> {
        &self.bits
    }

    /// Bitwise-OR `1 << bit` into the pixel. Flags only ever accumulate.
    pub fn set_flag(&mut self, y: usize, x: usize, flag: FlagBit) {
        let cell = self.bits.get_mut(y, x);
        *cell |= 1i64 << flag.bit();
    }

    /// Apply `set_flag` to every true position in `mask`.
    pub fn set_mask_flag(&mut self, mask: &Grid<bool>, flag: FlagBit) {
        debug_assert_eq!(self.bits.shape(), mask.shape());
        for (y, x) in mask.indices() {
            if *mask.get(y, x) {
                self.set_flag(y, x, flag);
            }
        }
    }

    pub fn has_flag(&self, y: usize, x: usize, flag: FlagBit) -> bool {
        has_flag(*self.bits.get(y, x), flag)
    }

    /// Ordered list of bit-name strings set at this pixel.
    pub fn decode(&self, y: usize, x: usize) -> Vec<&'static str> {
        let bitfield = *self.bits.get(y, x);
        FlagBit::all()
            .iter()
            .filter(|f| has_flag(bitfield, **f))
            .map(|f| f.name())
            .collect()
    }
}

pub fn has_flag(bitfield: i64, flag: FlagBit) -> bool {
    bitfield & (1i64 << flag.bit()) != 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_flag_is_monotone_and_idempotent() {
        let mut flags = AlgoFlags::new(1, 1);
        flags.set_flag(0, 0, FlagBit::PixelSkippedByCloudMask);
        flags.set_flag(0, 0, FlagBit::PixelSkippedByCloudMask);
        assert!(flags.has_flag(0, 0, FlagBit::PixelSkippedByCloudMask));
        flags.set_flag(0, 0, FlagBit::PixelValidatedByWindowDeviation);
        assert!(flags.has_flag(0, 0, FlagBit::PixelSkippedByCloudMask));
        assert!(flags.has_flag(0, 0, FlagBit::PixelValidatedByWindowDeviation));
    }

    #[test]
    fn decode_round_trips_through_name_table() {
        let mut flags = AlgoFlags::new(1, 1);
        flags.set_flag(0, 0, FlagBit::PixelPreinvalidatedByWaterMask);
        let names = flags.decode(0, 0);
        assert_eq!(names, vec!["pixel_preinvalidated_by_water_mask"]);
    }

    #[test]
    fn set_mask_flag_applies_only_to_true_positions() {
        let mut flags = AlgoFlags::new(1, 3);
        let mut mask = Grid::filled(1, 3, false);
        mask.set(0, 1, true);
        flags.set_mask_flag(&mask, FlagBit::PixelSkippedByBorderMask);
        assert!(!flags.has_flag(0, 0, FlagBit::PixelSkippedByBorderMask));
        assert!(flags.has_flag(0, 1, FlagBit::PixelSkippedByBorderMask));
        assert!(!flags.has_flag(0, 2, FlagBit::PixelSkippedByBorderMask));
    }

    #[test]
    fn for_pass_and_for_window_iter_map_correctly() {
        assert_eq!(FlagBit::for_pass(1), Some(FlagBit::PixelConsideredOnFirstPass));
        assert_eq!(FlagBit::for_pass(2), Some(FlagBit::PixelConsideredOnSecondPass));
        assert_eq!(FlagBit::for_pass(3), None);
        assert_eq!(FlagBit::for_window_iter(3), Some(FlagBit::PixelHad3WindowIterations));
    }
}
