/*! Mask Finalizer: the atomic composition step between pre-masking and the
detector. */

use crate::flags::{AlgoFlags, FlagBit};
use crate::grid::Grid;
use crate::premask::PreMasks;

/// The working-state rasters the detector will mutate in place.
pub struct Masks {
    pub validated: Grid<bool>,
    pub invalidated: Grid<bool>,
    pub skip: Grid<bool>,
    pub discard: Grid<bool>,
    pub bad_dqf: Grid<bool>,
}

/// 1. `validated <- validated & !invalidated`
/// 2. `discard <- validated | invalidated`
/// 3. `skip <- skip | discard`
/// 4. emit the three pre-algo-masking flags.
pub fn finalize(pre: PreMasks, flags: &mut AlgoFlags) -> Masks {
    let PreMasks { bad_dqf, mut validated, invalidated, mut skip } = pre;

    validated.and_not_assign(&invalidated);

    let mut discard = Grid::filled(validated.height(), validated.width(), false);
    discard.or_assign(&validated);
    discard.or_assign(&invalidated);

    skip.or_assign(&discard);

    flags.set_mask_flag(&validated, FlagBit::PixelValidatedByPreAlgoMasking);
    flags.set_mask_flag(&invalidated, FlagBit::PixelInvalidatedByPreAlgoMasking);
    flags.set_mask_flag(&skip, FlagBit::PixelSkippedByPreAlgoMasking);

    Masks { validated, invalidated, skip, discard, bad_dqf }
}

#[cfg(test)]
mod test {
    use super::*;

    fn masks_of(h: usize, w: usize) -> PreMasks {
        PreMasks {
            bad_dqf: Grid::filled(h, w, false),
            validated: Grid::filled(h, w, false),
            invalidated: Grid::filled(h, w, false),
            skip: Grid::filled(h, w, false),
        }
    }

    #[test]
    fn validated_excludes_invalidated() {
        let mut pre = masks_of(2, 2);
        pre.validated.set(0, 0, true);
        pre.invalidated.set(0, 0, true);
        let mut flags = AlgoFlags::new(2, 2);
        let masks = finalize(pre, &mut flags);
        assert!(!*masks.validated.get(0, 0));
        assert!(*masks.invalidated.get(0, 0));
    }

    #[test]
    fn discard_is_subset_of_skip() {
        let mut pre = masks_of(2, 2);
        pre.validated.set(1, 1, true);
        let mut flags = AlgoFlags::new(2, 2);
        let masks = finalize(pre, &mut flags);
        for (y, x) in masks.discard.indices() {
            if *masks.discard.get(y, x) {
                assert!(*masks.skip.get(y, x));
            }
        }
    }

    #[test]
    fn flags_are_emitted_for_each_finalized_category() {
        let mut pre = masks_of(1, 1);
        pre.validated.set(0, 0, true);
        let mut flags = AlgoFlags::new(1, 1);
        finalize(pre, &mut flags);
        assert!(flags.has_flag(0, 0, FlagBit::PixelValidatedByPreAlgoMasking));
        assert!(flags.has_flag(0, 0, FlagBit::PixelSkippedByPreAlgoMasking));
    }
}
