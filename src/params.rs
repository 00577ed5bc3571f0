//! Frozen threshold configuration for the sparkle detector.

/// Numeric thresholds governing every stage. Populated once via
/// `Params::default()` and read thereafter; there are no setters because
/// nothing downstream expects the table to change mid-frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    pub min_daylit_portion_of_land: f32,
    pub max_algo_passes: u32,
    pub first_window_radius: u32,
    pub max_window_radius_iter: u32,
    pub min_window_clean_proportion_threshold: f32,
    pub exclude_border_width: usize,
    pub exclude_dqf_radius: usize,

    pub max_sat_za_threshold_deg: f32,
    pub max_sun_za_threshold_deg: f32,
    pub min_sun_za_threshold_deg: f32,
    pub min_glint_angle_threshold_deg: f32,

    pub c0x_rf_max_threshold: f32,

    pub c02_rf_min_threshold: f32,
    pub c05_rf_min_threshold: f32,
    pub c07_rf_min_threshold: f32,
    pub c07_bt_min_threshold: f32,
    pub c14_bt_min_threshold: f32,

    pub c02_rf_deviation_min_threshold: f32,
    pub c05_rf_deviation_min_threshold: f32,
    pub c07_rf_deviation_min_threshold: f32,
    pub c14_bt_deviation_min_threshold: f32,
    pub c14_bt_standard_deviation_max_threshold: f32,

    /// Mean earth radius used by the spherical-earth slant-range
    /// approximation behind `geo::pixel_area_m2` (WGS84 semi-major axis).
    pub earth_radius_m: f32,
    /// Satellite height above the earth's surface at nadir.
    pub perspective_point_height_m: f32,
    /// Instrument field of view per pixel, radians, assumed square.
    pub nadir_ifov_rad: f32,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            min_daylit_portion_of_land: 0.10,
            max_algo_passes: 2,
            first_window_radius: 15,
            max_window_radius_iter: 3,
            min_window_clean_proportion_threshold: 0.75,
            exclude_border_width: 15,
            exclude_dqf_radius: 10,

            max_sat_za_threshold_deg: 80.0,
            max_sun_za_threshold_deg: 85.0,
            min_sun_za_threshold_deg: 10.0,
            min_glint_angle_threshold_deg: 10.0,

            c0x_rf_max_threshold: 1.0,

            c02_rf_min_threshold: 0.475,
            c05_rf_min_threshold: 0.55,
            c07_rf_min_threshold: 0.10,
            c07_bt_min_threshold: 300.0,
            c14_bt_min_threshold: 275.0,

            c02_rf_deviation_min_threshold: 0.425,
            c05_rf_deviation_min_threshold: 0.50,
            c07_rf_deviation_min_threshold: 0.05,
            c14_bt_deviation_min_threshold: -3.0,
            c14_bt_standard_deviation_max_threshold: 8.0,

            earth_radius_m: 6_378_137.0,
            perspective_point_height_m: 35_786_023.0,
            nadir_ifov_rad: 5.6e-5,
        }
    }
}

impl Params {
    pub fn max_sat_za_threshold_rad(&self) -> f32 {
        self.max_sat_za_threshold_deg.to_radians()
    }

    pub fn max_sun_za_threshold_rad(&self) -> f32 {
        self.max_sun_za_threshold_deg.to_radians()
    }

    pub fn min_sun_za_threshold_rad(&self) -> f32 {
        self.min_sun_za_threshold_deg.to_radians()
    }

    pub fn min_glint_angle_threshold_rad(&self) -> f32 {
        self.min_glint_angle_threshold_deg.to_radians()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let p = Params::default();
        assert_eq!(p.max_algo_passes, 2);
        assert_eq!(p.first_window_radius, 15);
        assert_eq!(p.exclude_dqf_radius, 10);
        assert!((p.c02_rf_deviation_min_threshold - 0.425).abs() < 1e-6);
        assert!((p.c14_bt_standard_deviation_max_threshold - 8.0).abs() < 1e-6);
    }

    #[test]
    fn angle_thresholds_convert_to_radians() {
        let p = Params::default();
        assert!((p.max_sat_za_threshold_rad() - 80.0f32.to_radians()).abs() < 1e-6);
    }
}
