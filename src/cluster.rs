/*!
 * Clusterer & Metadata Emitter: 8-connected labeling of the final
 * validated mask and the per-pixel/per-cluster records built from it.
 */

mod component;
mod metadata;

pub use component::{centroid, cluster_members, label_8_connected};
pub use metadata::{
    emit, BandReadings, ClusterOutput, ClusterSummary, DebugRecord, Deviations, NavRecord,
    PixelRecord,
};
