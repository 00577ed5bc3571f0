/*!
 * Reflection geometry: glint angle and specular-reflector angles (ω, β, γ)
 * shared by the pre-mask gate and the metadata emitter.
 */

/// Reflection angles for a flat reflector that would redirect sunlight
/// toward the satellite at a pixel: specular half-angle `omega`, reflector
/// tilt from horizontal `beta`, reflector azimuth `gamma` (all radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflection {
    pub omega: f32,
    pub beta: f32,
    pub gamma: f32,
}

/**
 * Angular distance between the sun vector and the satellite vector at a
 * pixel, in radians. Small values mean the geometry favors a specular
 * return.
 *
 * `sun_za`/`sun_az`/`sat_za`/`sat_az` are all in radians.
 */
pub fn glint_angle(sun_za: f32, sun_az: f32, sat_za: f32, sat_az: f32) -> f32 {
    (sun_za.cos() * sat_za.cos() - sun_za.sin() * sat_za.sin() * (sun_az - sat_az).cos()).acos()
}

/**
 * Reflection geometry for a flat reflector at a pixel, given the sun and
 * satellite unit vectors implied by `(sun_az, sun_za, sat_az, sat_za)`
 * (radians).
 */
pub fn calc_reflections(sun_za: f32, sun_az: f32, sat_za: f32, sat_az: f32) -> Reflection {
    let s_x = sun_za.sin() * sun_az.cos();
    let s_y = sun_za.sin() * sun_az.sin();
    let s_z = sun_za.cos();

    let r_x = sat_za.sin() * sat_az.cos();
    let r_y = sat_za.sin() * sat_az.sin();
    let r_z = sat_za.cos();

    let omega = (s_x * r_x + s_y * r_y + s_z * r_z).acos() / 2.0;
    let beta = ((s_z + r_z) / (2.0 * omega.cos())).acos();

    let two_pi = 2.0 * std::f32::consts::PI;
    let gamma = ((s_y + r_y).atan2(s_x + r_x) + two_pi) % two_pi;

    Reflection { omega, beta, gamma }
}

/**
 * Ground-projected pixel area at satellite zenith angle `sat_za` (radians),
 * for a square-IFOV sensor on a spherical earth of radius `earth_radius_m`
 * viewed from `perspective_point_height_m` above the surface at nadir.
 *
 * Derived from the law of cosines in the earth-center/pixel/satellite
 * triangle: the slant range `d(za)` grows from `perspective_point_height_m`
 * at nadir, and ground area scales as `(d/d0)^2 / cos(za)` (range stretch
 * squared, times the foreshortening of the viewing incidence angle).
 */
pub fn pixel_area_m2(sat_za: f32, earth_radius_m: f32, perspective_point_height_m: f32, nadir_ifov_rad: f32) -> f32 {
    let r_sat = earth_radius_m + perspective_point_height_m;
    let d = -earth_radius_m * sat_za.cos()
        + (r_sat * r_sat - earth_radius_m * earth_radius_m * sat_za.sin().powi(2)).sqrt();
    let d0 = perspective_point_height_m;

    let nadir_area = (d0 * nadir_ifov_rad).powi(2);
    nadir_area * (d / d0).powi(2) / sat_za.cos()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pixel_area_grows_with_satellite_zenith_angle() {
        let nadir = pixel_area_m2(0.0, 6_378_137.0, 35_786_023.0, 5.6e-5);
        let off_nadir = pixel_area_m2(60.0f32.to_radians(), 6_378_137.0, 35_786_023.0, 5.6e-5);
        assert!(off_nadir > nadir);
        assert!(nadir > 0.0 && nadir.is_finite());
    }

    #[test]
    fn glint_angle_is_zero_when_sun_and_satellite_coincide() {
        let za = 0.3f32;
        let az = 1.1f32;
        let angle = glint_angle(za, az, za, az);
        assert!(angle.abs() < 1e-4, "angle was {angle}");
    }

    #[test]
    fn reflections_are_finite_for_typical_geometry() {
        let r = calc_reflections(0.4, 1.0, 0.6, 1.2);
        assert!(r.omega.is_finite());
        assert!(r.beta.is_finite());
        assert!(r.gamma.is_finite());
        assert!(r.gamma >= 0.0 && r.gamma < 2.0 * std::f32::consts::PI);
    }
}
