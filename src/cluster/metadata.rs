/*!
 * Per-pixel and per-cluster metadata records emitted after clustering.
 */

use crate::cluster::component::{centroid, cluster_members, label_8_connected};
use crate::flags::AlgoFlags;
use crate::frame::FrameInputs;
use crate::geo::{calc_reflections, pixel_area_m2};
use crate::grid::Grid;
use crate::params::Params;
use crate::stats::{StatKey, StatStore};
use chrono::{DateTime, Utc};

const DB_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const SAFE_TIME_FORMAT: &str = "%Y-%m-%dT%H%M%SZ";

fn round(value: f32, decimals: i32) -> f32 {
    let scale = 10f32.powi(decimals);
    (value * scale).round() / scale
}

fn google_maps_url(lat: f32, lon: f32) -> String {
    format!("https://www.google.com/maps/@?api=1&map_action=map&center={lat},{lon}&zoom=14&basemap=satellite")
}

/// Summary of one detected cluster, keyed by its unique id.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub id: String,
    pub centroid_y: usize,
    pub centroid_x: usize,
    pub centroid_lat: f32,
    pub centroid_lon: f32,
    pub centroid_google_maps: String,
    pub centroid_omega_deg: f32,
    pub centroid_beta_deg: f32,
    pub centroid_gamma_deg: f32,
    pub size: usize,
}

/// Reflectance/brightness-temperature/deviation readings for one pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandReadings {
    pub c02_rf: f32,
    pub c05_rf: f32,
    pub c07_rf: f32,
    pub c07_bt: f32,
    pub c14_bt: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Deviations {
    pub c02_rf: f32,
    pub c05_rf: f32,
    pub c07_rf: f32,
    pub c14_bt: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavRecord {
    pub sun_za_deg: f32,
    pub sun_az_deg: f32,
    pub sat_za_deg: f32,
    pub sat_az_deg: f32,
    pub glint_angle_deg: f32,
    pub omega_deg: f32,
    pub beta_deg: f32,
    pub gamma_deg: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DebugRecord {
    pub algo_passes: u32,
    pub window_radius: u32,
    pub window_iterations: u32,
    pub window_valid_proportion: f32,
}

/// One validated pixel's full decision record.
#[derive(Debug, Clone)]
pub struct PixelRecord {
    pub event: &'static str,
    pub time_coverage_start: String,
    pub time_coverage_end: String,
    pub y: usize,
    pub x: usize,
    pub lat: f32,
    pub lon: f32,
    pub area_m: f32,
    pub google_maps: String,
    pub cluster_id: String,
    pub dqfs: [u8; 4],
    pub bands: BandReadings,
    pub deviations: Deviations,
    pub stdevs: Deviations,
    pub nav: NavRecord,
    pub flags: Vec<&'static str>,
    pub debug: DebugRecord,
}

/// Result of the Clusterer & Metadata Emitter stage.
pub struct ClusterOutput {
    pub pixels: Vec<PixelRecord>,
    pub clusters: Vec<ClusterSummary>,
}

fn format_time(t: DateTime<Utc>, fmt: &str) -> String {
    t.format(fmt).to_string()
}

/// 8-connect-label `validated`, then build a per-pixel record for every
/// member of every cluster plus a per-cluster summary.
pub fn emit(
    validated: &Grid<bool>,
    inputs: &FrameInputs,
    flags: &AlgoFlags,
    stats: &StatStore,
    params: &Params,
    cluster_id_suffixes: &[String],
) -> ClusterOutput {
    let (labels, num_clusters) = label_8_connected(validated);
    let members_by_cluster = cluster_members(&labels, num_clusters);

    let start_str = format_time(inputs.time_coverage_start, DB_TIME_FORMAT);
    let end_str = format_time(inputs.time_coverage_end, DB_TIME_FORMAT);
    let safe_start = format_time(inputs.time_coverage_start, SAFE_TIME_FORMAT);

    let mut pixels = Vec::new();
    let mut clusters = Vec::with_capacity(num_clusters as usize);

    for (cluster_idx, members) in members_by_cluster.iter().enumerate() {
        if members.is_empty() {
            continue;
        }

        let suffix = cluster_id_suffixes
            .get(cluster_idx)
            .cloned()
            .unwrap_or_else(|| cluster_idx.to_string());
        let cluster_id = format!("{safe_start}_{suffix}");

        let (cy, cx) = centroid(members);
        let cen_lat = *inputs.lat_deg.get(cy, cx);
        let cen_lon = *inputs.lon_deg.get(cy, cx);
        let cen_reflection = calc_reflections(
            *inputs.sun_za.get(cy, cx),
            *inputs.sun_az.get(cy, cx),
            *inputs.sat_za.get(cy, cx),
            *inputs.sat_az.get(cy, cx),
        );

        clusters.push(ClusterSummary {
            id: cluster_id.clone(),
            centroid_y: cy,
            centroid_x: cx,
            centroid_lat: round(cen_lat, 5),
            centroid_lon: round(cen_lon, 5),
            centroid_google_maps: google_maps_url(round(cen_lat, 5), round(cen_lon, 5)),
            centroid_omega_deg: round(cen_reflection.omega.to_degrees(), 5),
            centroid_beta_deg: round(cen_reflection.beta.to_degrees(), 6),
            centroid_gamma_deg: round(cen_reflection.gamma.to_degrees(), 5),
            size: members.len(),
        });

        for &(y, x) in members {
            let lat = round(*inputs.lat_deg.get(y, x), 5);
            let lon = round(*inputs.lon_deg.get(y, x), 5);
            let area_m = round(
                pixel_area_m2(
                    *inputs.sat_za.get(y, x),
                    params.earth_radius_m,
                    params.perspective_point_height_m,
                    params.nadir_ifov_rad,
                ),
                2,
            );

            let reflection = calc_reflections(
                *inputs.sun_za.get(y, x),
                *inputs.sun_az.get(y, x),
                *inputs.sat_za.get(y, x),
                *inputs.sat_az.get(y, x),
            );

            pixels.push(PixelRecord {
                event: "valid_sparkle",
                time_coverage_start: start_str.clone(),
                time_coverage_end: end_str.clone(),
                y,
                x,
                lat,
                lon,
                area_m,
                google_maps: google_maps_url(lat, lon),
                cluster_id: cluster_id.clone(),
                dqfs: [
                    *inputs.c02_dqf.get(y, x),
                    *inputs.c05_dqf.get(y, x),
                    *inputs.c07_dqf.get(y, x),
                    *inputs.c14_dqf.get(y, x),
                ],
                bands: BandReadings {
                    c02_rf: round(*inputs.c02_rf.get(y, x), 7),
                    c05_rf: round(*inputs.c05_rf.get(y, x), 7),
                    c07_rf: round(*inputs.c07_rf.get(y, x), 7),
                    c07_bt: round(*inputs.c07_bt.get(y, x), 5),
                    c14_bt: round(*inputs.c14_bt.get(y, x), 5),
                },
                deviations: Deviations {
                    c02_rf: round(stats.get(y, x, StatKey::C02RfDeviation, 0.0), 7),
                    c05_rf: round(stats.get(y, x, StatKey::C05RfDeviation, 0.0), 7),
                    c07_rf: round(stats.get(y, x, StatKey::C07RfDeviation, 0.0), 7),
                    c14_bt: round(stats.get(y, x, StatKey::C14BtDeviation, 0.0), 5),
                },
                stdevs: Deviations {
                    c02_rf: round(stats.get(y, x, StatKey::C02RfStdev, 0.0), 7),
                    c05_rf: round(stats.get(y, x, StatKey::C05RfStdev, 0.0), 7),
                    c07_rf: round(stats.get(y, x, StatKey::C07RfStdev, 0.0), 7),
                    c14_bt: round(stats.get(y, x, StatKey::C14BtStdev, 0.0), 5),
                },
                nav: NavRecord {
                    sun_za_deg: round(inputs.sun_za.get(y, x).to_degrees(), 6),
                    sun_az_deg: round(inputs.sun_az.get(y, x).to_degrees(), 5),
                    sat_za_deg: round(inputs.sat_za.get(y, x).to_degrees(), 6),
                    sat_az_deg: round(inputs.sat_az.get(y, x).to_degrees(), 5),
                    glint_angle_deg: round(inputs.glint_angle.get(y, x).to_degrees(), 5),
                    omega_deg: round(reflection.omega.to_degrees(), 5),
                    beta_deg: round(reflection.beta.to_degrees(), 6),
                    gamma_deg: round(reflection.gamma.to_degrees(), 5),
                },
                flags: flags.decode(y, x),
                debug: DebugRecord {
                    algo_passes: stats.get(y, x, StatKey::AlgoPasses, 0.0) as u32,
                    window_radius: stats.get(y, x, StatKey::WindowRadius, 0.0) as u32,
                    window_iterations: stats.get(y, x, StatKey::WindowIterations, 0.0) as u32,
                    window_valid_proportion: round(
                        stats.get(y, x, StatKey::WindowValidProportion, 0.0),
                        7,
                    ),
                },
            });
        }
    }

    ClusterOutput { pixels, clusters }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flags::AlgoFlags;
    use crate::frame::FrameInputs;
    use chrono::{TimeZone, Utc};

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
    fn emits_one_cluster_summary_per_component() {
        let inputs = sample_inputs(5, 5);
        let mut validated = Grid::filled(5, 5, false);
        validated.set(0, 0, true);
        validated.set(4, 4, true);
        let flags = AlgoFlags::new(5, 5);
        let stats = StatStore::new();
        let params = Params::default();
        let out = emit(&validated, &inputs, &flags, &stats, &params, &["aaaa".into(), "bbbb".into()]);
        assert_eq!(out.clusters.len(), 2);
        assert_eq!(out.pixels.len(), 2);
    }

    #[test]
    fn pixel_record_carries_a_positive_area() {
        let inputs = sample_inputs(3, 3);
        let mut validated = Grid::filled(3, 3, false);
        validated.set(1, 1, true);
        let flags = AlgoFlags::new(3, 3);
        let stats = StatStore::new();
        let params = Params::default();
        let out = emit(&validated, &inputs, &flags, &stats, &params, &["xyz".into()]);
        assert!(out.pixels[0].area_m > 0.0);
    }

    #[test]
    fn cluster_id_has_frame_time_prefix() {
        let inputs = sample_inputs(3, 3);
        let mut validated = Grid::filled(3, 3, false);
        validated.set(1, 1, true);
        let flags = AlgoFlags::new(3, 3);
        let stats = StatStore::new();
        let params = Params::default();
        let out = emit(&validated, &inputs, &flags, &stats, &params, &["xyz".into()]);
        assert!(out.clusters[0].id.starts_with("2019-06-12T183627Z_"));
    }
}
