/*!
 * 8-connected component labeling over the final `validated_mask`.
 */

use crate::grid::Grid;

/// Label every true pixel of `mask` with a 1-based cluster id; label `0`
/// means "not part of any cluster". Uses the full 3x3 structuring element
/// (8-connectivity), matching `scipy.ndimage.label(mask, structure=ones((3,3)))`.
pub fn label_8_connected(mask: &Grid<bool>) -> (Grid<u32>, u32) {
    let (height, width) = mask.shape();
    let mut labels = Grid::filled(height, width, 0u32);
    let mut next_label = 0u32;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for (y, x) in mask.indices() {
        if !*mask.get(y, x) || *labels.get(y, x) != 0 {
            continue;
        }

        next_label += 1;
        labels.set(y, x, next_label);
        stack.push((y, x));

        while let Some((cy, cx)) = stack.pop() {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dy == 0 && dx == 0 {
                        continue;
                    }
                    let ny = cy as i32 + dy;
                    let nx = cx as i32 + dx;
                    if ny < 0 || nx < 0 {
                        continue;
                    }
                    let (ny, nx) = (ny as usize, nx as usize);
                    if ny >= height || nx >= width {
                        continue;
                    }
                    if *mask.get(ny, nx) && *labels.get(ny, nx) == 0 {
                        labels.set(ny, nx, next_label);
                        stack.push((ny, nx));
                    }
                }
            }
        }
    }

    (labels, next_label)
}

/// Member pixel indices of each cluster, ordered by label (1-based), in
/// row-major discovery order within each cluster.
pub fn cluster_members(labels: &Grid<u32>, num_clusters: u32) -> Vec<Vec<(usize, usize)>> {
    let mut members = vec![Vec::new(); num_clusters as usize];
    for (y, x) in labels.indices() {
        let label = *labels.get(y, x);
        if label > 0 {
            members[(label - 1) as usize].push((y, x));
        }
    }
    members
}

/// Element-wise floor of the mean of member indices, matching
/// `np.floor(np.mean(nonzero(...), axis=1)).astype(uint16)`.
pub fn centroid(members: &[(usize, usize)]) -> (usize, usize) {
    let n = members.len().max(1);
    let sum_y: usize = members.iter().map(|(y, _)| *y).sum();
    let sum_x: usize = members.iter().map(|(_, x)| *x).sum();
    (sum_y / n, sum_x / n)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_diagonal_neighbors_as_one_cluster() {
        let mut mask = Grid::filled(4, 4, false);
        mask.set(0, 0, true);
        mask.set(1, 1, true);
        mask.set(3, 3, true);
        let (labels, count) = label_8_connected(&mask);
        assert_eq!(count, 2);
        assert_eq!(*labels.get(0, 0), *labels.get(1, 1));
        assert_ne!(*labels.get(0, 0), *labels.get(3, 3));
    }

    #[test]
    fn partitions_exactly_and_sizes_sum_to_validated_count() {
        let mut mask = Grid::filled(5, 5, false);
        for (y, x) in [(0, 0), (0, 1), (2, 2), (4, 4), (4, 3)] {
            mask.set(y, x, true);
        }
        let (labels, count) = label_8_connected(&mask);
        let members = cluster_members(&labels, count);
        let total: usize = members.iter().map(|m| m.len()).sum();
        assert_eq!(total, mask.count_true());
    }

    #[test]
    fn centroid_is_floor_of_mean() {
        let members = vec![(0, 0), (0, 1), (1, 0), (1, 1)];
        assert_eq!(centroid(&members), (0, 0));
    }
}
