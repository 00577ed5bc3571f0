/*! Per-pixel floating statistics recorded by the detector. */

use rustc_hash::FxHashMap;

/** Named statistic recorded for a pixel. Replaces the original's
string-keyed per-pixel dict with a sum type, per the flag/stat
reframing in the design notes. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKey {
    C02RfDeviation,
    C05RfDeviation,
    C07RfDeviation,
    C14BtDeviation,
    C02RfStdev,
    C05RfStdev,
    C07RfStdev,
    C14BtStdev,
    AlgoPasses,
    WindowRadius,
    WindowIterations,
    WindowValidProportion,
}

/// Lazily populated per-pixel statistic store. Only pixels actually touched
/// by the detector get an entry; a miss on any key returns the caller's
/// default rather than panicking.
#[derive(Debug, Default)]
pub struct StatStore {
    values: FxHashMap<(usize, usize), FxHashMap<StatKey, f32>>,
}

impl StatStore {
    pub fn new() -> Self {
        StatStore::default()
    }

    pub fn set(&mut self, y: usize, x: usize, key: StatKey, value: f32) {
        self.values.entry((y, x)).or_default().insert(key, value);
    }

    pub fn get(&self, y: usize, x: usize, key: StatKey, default: f32) -> f32 {
        self.values
            .get(&(y, x))
            .and_then(|m| m.get(&key))
            .copied()
            .unwrap_or(default)
    }

    pub fn has_entry(&self, y: usize, x: usize) -> bool {
        self.values.contains_key(&(y, x))
    }
}
