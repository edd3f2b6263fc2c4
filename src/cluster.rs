//! Connected-component clustering over the quantized color predicate.
//!
//! A single left-to-right, top-to-bottom scan labels each pixel with a
//! cluster index while a pixel-level union-find tracks which partial
//! labels belong together. A second pass collapses every label to its
//! union-find root, after which the cluster table is consistent: each
//! cluster's area, color sum, and bounding rect aggregate exactly the
//! pixels carrying its label.

use std::collections::BTreeSet;

use crate::color::{Color, ColorSum};
use crate::config::TraceConfig;
use crate::geom::Rect;
use crate::keying::pixel_at;

/// A contiguous same-color region accumulated during the scan and
/// mutated by hierarchical merging afterwards.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    /// Live pixel count. Zero once merged into another cluster.
    pub area: usize,
    /// Sum of the cluster's own pixels (plus merged clusters').
    pub sum: ColorSum,
    /// Like `sum`, but also folds in sub-threshold clusters absorbed
    /// without becoming layers. This is the sum output colors come from.
    pub residue_sum: ColorSum,
    pub rect: Rect,
}

impl Cluster {
    pub fn color(&self) -> Color {
        self.sum.average()
    }

    pub fn residue_color(&self) -> Color {
        self.residue_sum.average()
    }
}

/// Clusters indexed from 1; index 0 is the "keyed out / unassigned"
/// sentinel and holds an empty placeholder.
#[derive(Debug, Default)]
pub struct ClusterTable {
    clusters: Vec<Cluster>,
}

impl ClusterTable {
    fn new() -> Self {
        Self {
            clusters: vec![Cluster::default()],
        }
    }

    fn push(&mut self) -> u32 {
        self.clusters.push(Cluster::default());
        (self.clusters.len() - 1) as u32
    }

    pub fn get(&self, index: u32) -> &Cluster {
        &self.clusters[index as usize]
    }

    pub fn get_mut(&mut self, index: u32) -> &mut Cluster {
        &mut self.clusters[index as usize]
    }

    /// Number of real clusters (the sentinel excluded).
    pub fn len(&self) -> usize {
        self.clusters.len() - 1
    }

    /// Indices of all real clusters.
    pub fn indices(&self) -> impl Iterator<Item = u32> {
        1..self.clusters.len() as u32
    }
}

/// Rank-compressed union-find over pixel indices, with path halving on
/// lookup. Only used to resolve final per-pixel labels; the cluster
/// level merge chain is a separate structure.
struct PixelUnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl PixelUnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len as u32).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut i: u32) -> u32 {
        while self.parent[i as usize] != i {
            let grandparent = self.parent[self.parent[i as usize] as usize];
            self.parent[i as usize] = grandparent;
            i = grandparent;
        }
        i
    }

    /// Union by rank; returns the surviving root.
    fn union(&mut self, a: u32, b: u32) -> u32 {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }
        let (winner, loser) = if self.rank[ra as usize] >= self.rank[rb as usize] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[loser as usize] = winner;
        if self.rank[winner as usize] == self.rank[loser as usize] {
            self.rank[winner as usize] += 1;
        }
        winner
    }
}

/// Result of the clustering scan: the cluster table plus the per-pixel
/// label array (0 = keyed out).
pub struct Clustering {
    pub table: ClusterTable,
    pub labels: Vec<u32>,
}

/// Label every non-keyed pixel and build the cluster table.
///
/// Neighbor priority follows the scan direction: a pixel first tries to
/// join the cluster above it, then the one to its left, and (in
/// diagonal mode) the one up-left. When both the up and left neighbors
/// match but carry different labels, their clusters are merged on the
/// spot, smaller into larger.
pub fn build_clusters(
    pixels: &[u8],
    width: usize,
    height: usize,
    key: Option<&Color>,
    config: &TraceConfig,
) -> Clustering {
    let shift = config.quantize_shift();
    let diagonal = config.diagonal();
    let mut table = ClusterTable::new();
    let mut labels = vec![0u32; width * height];
    let mut uf = PixelUnionFind::new(width * height);

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let color = pixel_at(pixels, i);
            if key.is_some_and(|k| color.same_rgb(k)) {
                continue;
            }

            // Indices of the three already-scanned neighbors whose
            // quantized color matches this pixel.
            let matching = |dx: i32, dy: i32| -> Option<usize> {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 {
                    return None;
                }
                let n = ny as usize * width + nx as usize;
                if labels[n] == 0 {
                    return None;
                }
                color
                    .same_quantized(&pixel_at(pixels, n), shift)
                    .then_some(n)
            };
            let up = matching(0, -1);
            let left = matching(-1, 0);
            let up_left = matching(-1, -1);

            let joined = match (up, left) {
                (Some(u), Some(l)) => {
                    let ru = uf.find(u as u32);
                    let rl = uf.find(l as u32);
                    if ru != rl {
                        // Two partial clusters meet here: fold the
                        // smaller into the larger and point the
                        // surviving union-find root at the survivor.
                        let cu = labels[ru as usize];
                        let cl = labels[rl as usize];
                        let (dst, src) = if table.get(cu).area >= table.get(cl).area {
                            (cu, cl)
                        } else {
                            (cl, cu)
                        };
                        let src_cluster = std::mem::take(table.get_mut(src));
                        let dst_cluster = table.get_mut(dst);
                        dst_cluster.area += src_cluster.area;
                        dst_cluster.sum.merge(&src_cluster.sum);
                        dst_cluster.rect.merge(&src_cluster.rect);
                        let root = uf.union(ru, rl);
                        labels[root as usize] = dst;
                    }
                    Some(u)
                }
                (Some(u), None) => Some(u),
                (None, Some(l)) => Some(l),
                (None, None) => {
                    if diagonal {
                        up_left
                    } else {
                        None
                    }
                }
            };

            let cluster_index = match joined {
                Some(n) => {
                    let root = uf.find(n as u32);
                    let index = labels[root as usize];
                    let new_root = uf.union(i as u32, root);
                    labels[new_root as usize] = index;
                    index
                }
                None => table.push(),
            };
            labels[i] = cluster_index;
            let cluster = table.get_mut(cluster_index);
            cluster.area += 1;
            cluster.sum.add(&color);
            cluster.rect.add_xy(x as i32, y as i32);
        }
    }

    // Collapse every label to its union-find root's cluster.
    for i in 0..labels.len() {
        if labels[i] != 0 {
            let root = uf.find(i as u32);
            labels[i] = labels[root as usize];
        }
    }

    // Output colors start from each cluster's own pixels.
    for index in 1..=table.len() as u32 {
        let cluster = table.get_mut(index);
        cluster.residue_sum = cluster.sum;
    }

    Clustering { table, labels }
}

/// Symmetric 4-neighbor adjacency between distinct clusters, indexed by
/// cluster. Sets are ordered so neighbor scans are deterministic.
pub fn build_adjacency(
    labels: &[u32],
    width: usize,
    height: usize,
    cluster_count: usize,
) -> Vec<BTreeSet<u32>> {
    let mut adjacency = vec![BTreeSet::new(); cluster_count + 1];
    for y in 0..height {
        for x in 0..width {
            let a = labels[y * width + x];
            if a == 0 {
                continue;
            }
            let mut link = |b: u32| {
                if b != 0 && b != a {
                    adjacency[a as usize].insert(b);
                    adjacency[b as usize].insert(a);
                }
            };
            if x + 1 < width {
                link(labels[y * width + x + 1]);
            }
            if y + 1 < height {
                link(labels[(y + 1) * width + x]);
            }
        }
    }
    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(colors: &[(u8, u8, u8)]) -> Vec<u8> {
        colors.iter().flat_map(|&(r, g, b)| [r, g, b, 255]).collect()
    }

    const RED: (u8, u8, u8) = (255, 0, 0);
    const BLACK: (u8, u8, u8) = (0, 0, 0);

    #[test]
    fn solid_image_is_one_cluster() {
        let pixels = rgba(&[RED; 4]);
        let clustering = build_clusters(&pixels, 2, 2, None, &TraceConfig::default());
        assert_eq!(clustering.table.len(), 1);
        assert_eq!(clustering.table.get(1).area, 4);
        assert_eq!(clustering.labels, vec![1, 1, 1, 1]);
    }

    #[test]
    fn checkerboard_without_diagonals_is_four_clusters() {
        let pixels = rgba(&[RED, BLACK, BLACK, RED]);
        let clustering = build_clusters(&pixels, 2, 2, None, &TraceConfig::default());
        let live = clustering
            .table
            .indices()
            .filter(|&i| clustering.table.get(i).area > 0)
            .count();
        assert_eq!(live, 4);
    }

    #[test]
    fn diagonal_mode_joins_across_the_up_left_corner() {
        let pixels = rgba(&[RED, BLACK, BLACK, RED]);
        let config = TraceConfig {
            layer_difference: 0,
            ..TraceConfig::default()
        };
        let clustering = build_clusters(&pixels, 2, 2, None, &config);
        // The red corners connect through the up-left probe; the black
        // pair only touches along the other diagonal, which the scan
        // never examines, so it stays split.
        let live = clustering
            .table
            .indices()
            .filter(|&i| clustering.table.get(i).area > 0)
            .count();
        assert_eq!(live, 3);
        assert_eq!(clustering.labels[0], clustering.labels[3]);
        assert_ne!(clustering.labels[1], clustering.labels[2]);
    }

    #[test]
    fn u_shape_merges_arms_when_they_meet() {
        // Two red arms joined at the bottom; the scan labels them
        // separately until the final row unifies them.
        let pixels = rgba(&[RED, BLACK, RED, RED, BLACK, RED, RED, RED, RED]);
        let clustering = build_clusters(&pixels, 3, 3, None, &TraceConfig::default());
        let red_label = clustering.labels[0];
        assert_eq!(clustering.labels[2], red_label);
        assert_eq!(clustering.labels[6], red_label);
        assert_eq!(clustering.table.get(red_label).area, 7);
    }

    #[test]
    fn area_matches_label_population() {
        let pixels = rgba(&[RED, RED, BLACK, RED, BLACK, BLACK, RED, RED, RED]);
        let clustering = build_clusters(&pixels, 3, 3, None, &TraceConfig::default());
        for index in clustering.table.indices() {
            let population = clustering.labels.iter().filter(|&&l| l == index).count();
            assert_eq!(clustering.table.get(index).area, population);
        }
    }

    #[test]
    fn sum_aggregates_input_colors() {
        let pixels = rgba(&[(10, 20, 30), (12, 22, 32)]);
        let config = TraceConfig {
            color_precision: 1,
            ..TraceConfig::default()
        };
        let clustering = build_clusters(&pixels, 2, 1, None, &config);
        assert_eq!(clustering.table.len(), 1);
        let sum = &clustering.table.get(1).sum;
        assert_eq!((sum.r, sum.g, sum.b, sum.count), (22, 42, 62, 2));
    }

    #[test]
    fn key_colored_pixels_stay_unlabeled() {
        let key = Color::new(0, 255, 0, 255);
        let pixels = rgba(&[RED, (0, 255, 0), RED, RED]);
        let clustering = build_clusters(&pixels, 2, 2, Some(&key), &TraceConfig::default());
        assert_eq!(clustering.labels[1], 0);
        assert_eq!(clustering.table.get(clustering.labels[0]).area, 3);
    }

    #[test]
    fn adjacency_links_touching_clusters_both_ways() {
        let pixels = rgba(&[RED, BLACK]);
        let clustering = build_clusters(&pixels, 2, 1, None, &TraceConfig::default());
        let adjacency = build_adjacency(&clustering.labels, 2, 1, clustering.table.len());
        let a = clustering.labels[0];
        let b = clustering.labels[1];
        assert!(adjacency[a as usize].contains(&b));
        assert!(adjacency[b as usize].contains(&a));
    }
}
