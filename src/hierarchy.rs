//! Hierarchical cluster merging and layer emission.
//!
//! Clusters are processed smallest-area-first. Each one either becomes
//! an output layer (large enough and color-distinct from its closest
//! neighbor) or is silently folded into that neighbor. Either way the
//! cluster is merged away afterwards, so the survivor keeps growing
//! until it covers the whole image.
//!
//! Because merging keeps mutating cluster state, the color and rect a
//! layer is drawn with are snapshotted the moment it is emitted.

use std::collections::{BTreeSet, HashMap};

use crate::cluster::ClusterTable;
use crate::color::Color;
use crate::config::{Hierarchical, TraceConfig};
use crate::geom::Rect;

/// Merge-chain walks give up after this many hops. Chains are acyclic
/// by construction, so this only guards against corruption.
const MAX_MERGE_HOPS: usize = 10_000;

/// Snapshot of a cluster taken at emission time.
#[derive(Debug, Clone)]
pub struct SavedMeta {
    pub color: Color,
    pub rect: Rect,
}

/// The result of hierarchical merging: emitted cluster indices in
/// bottom-up order, their emission-time snapshots, and the merge chain.
pub struct Hierarchy {
    pub output: Vec<u32>,
    pub saved: HashMap<u32, SavedMeta>,
    pub merged_into: Vec<u32>,
}

/// One output layer with the pixels it owns.
pub struct Layer {
    pub color: Color,
    pub rect: Rect,
    pub pixels: Vec<usize>,
}

struct MergeQueue {
    table: ClusterTable,
    adjacency: Vec<BTreeSet<u32>>,
    merged_into: Vec<u32>,
    output: Vec<u32>,
    saved: HashMap<u32, SavedMeta>,
    /// Populated area values, ascending.
    areas: BTreeSet<usize>,
    /// Clusters currently holding each area.
    buckets: HashMap<usize, BTreeSet<u32>>,
}

impl MergeQueue {
    fn new(table: ClusterTable, adjacency: Vec<BTreeSet<u32>>) -> Self {
        let mut areas = BTreeSet::new();
        let mut buckets: HashMap<usize, BTreeSet<u32>> = HashMap::new();
        for c in table.indices() {
            let area = table.get(c).area;
            if area > 0 {
                buckets.entry(area).or_default().insert(c);
                areas.insert(area);
            }
        }
        let merged_into = (0..=table.len() as u32).collect();
        Self {
            table,
            adjacency,
            merged_into,
            output: Vec::new(),
            saved: HashMap::new(),
            areas,
            buckets,
        }
    }

    fn emit(&mut self, c: u32) {
        let cluster = self.table.get(c);
        self.saved.insert(
            c,
            SavedMeta {
                color: cluster.residue_color(),
                rect: cluster.rect,
            },
        );
        self.output.push(c);
    }

    /// Fold `src` into `dst`: aggregate state, rewire adjacency, record
    /// the merge chain, and move `dst` to its new area bucket. The
    /// residue sum only follows when `src` did not become a layer of
    /// its own.
    fn merge(&mut self, src: u32, dst: u32, fold_residue: bool) {
        let taken = std::mem::take(self.table.get_mut(src));
        let old_area = self.table.get(dst).area;
        {
            let target = self.table.get_mut(dst);
            target.area += taken.area;
            target.sum.merge(&taken.sum);
            if fold_residue {
                target.residue_sum.merge(&taken.residue_sum);
            }
            target.rect.merge(&taken.rect);
        }

        let neighbors = std::mem::take(&mut self.adjacency[src as usize]);
        for n in neighbors {
            self.adjacency[n as usize].remove(&src);
            if n != dst {
                self.adjacency[n as usize].insert(dst);
                self.adjacency[dst as usize].insert(n);
            }
        }
        self.adjacency[dst as usize].remove(&src);

        self.merged_into[src as usize] = dst;

        if let Some(bucket) = self.buckets.get_mut(&old_area) {
            bucket.remove(&dst);
        }
        let new_area = self.table.get(dst).area;
        self.buckets.entry(new_area).or_default().insert(dst);
        self.areas.insert(new_area);
    }

    fn run(mut self, total_area: usize, keyed: bool, config: &TraceConfig) -> Hierarchy {
        let filter_area = config.filter_area();

        while let Some(&area) = self.areas.iter().next() {
            self.areas.remove(&area);
            let Some(bucket) = self.buckets.remove(&area) else {
                continue;
            };
            for c in bucket {
                // Skip entries whose area changed since bucketing.
                if self.table.get(c).area != area {
                    continue;
                }

                // A cluster spanning the whole image is always a layer.
                if self.table.get(c).area >= total_area {
                    self.emit(c);
                    continue;
                }

                // Isolated clusters have nothing to merge into. They
                // are real layers when keying carved the image apart
                // (or nothing else is left); otherwise they are noise.
                if self.adjacency[c as usize].is_empty() {
                    if self.areas.is_empty() || keyed {
                        self.emit(c);
                    }
                    continue;
                }

                let color = self.table.get(c).color();
                let mut closest = 0u32;
                let mut closest_diff = i32::MAX;
                for &n in &self.adjacency[c as usize] {
                    let diff = color.manhattan(&self.table.get(n).color());
                    if diff < closest_diff {
                        closest = n;
                        closest_diff = diff;
                    }
                }

                let large_enough = filter_area > 0 && self.table.get(c).area >= filter_area;
                let distinct = closest_diff > config.layer_difference;
                if large_enough && distinct {
                    self.emit(c);
                    self.merge(c, closest, false);
                } else {
                    self.merge(c, closest, true);
                }
            }
        }

        Hierarchy {
            output: self.output,
            saved: self.saved,
            merged_into: self.merged_into,
        }
    }
}

/// Merge clusters bottom-up and collect the emitted layers.
pub fn build_hierarchy(
    table: ClusterTable,
    adjacency: Vec<BTreeSet<u32>>,
    width: usize,
    height: usize,
    keyed: bool,
    config: &TraceConfig,
) -> Hierarchy {
    MergeQueue::new(table, adjacency).run(width * height, keyed, config)
}

/// Resolve every labeled pixel to the layer that owns it and build the
/// final layer list in emission order.
///
/// A pixel's owner is found by walking the merge chain from its label
/// until an emitted cluster is reached. Pixels whose chain ends without
/// one (dropped isolated clusters) are discarded. In cutout mode,
/// later-emitted layers claim their pixels exclusively, making layers
/// pixel-disjoint.
pub fn assign_pixels(labels: &[u32], hierarchy: &Hierarchy, mode: Hierarchical) -> Vec<Layer> {
    let slots: HashMap<u32, usize> = hierarchy
        .output
        .iter()
        .enumerate()
        .map(|(slot, &c)| (c, slot))
        .collect();

    let mut owned: Vec<Vec<usize>> = vec![Vec::new(); hierarchy.output.len()];
    for (i, &label) in labels.iter().enumerate() {
        if label == 0 {
            continue;
        }
        let mut current = label;
        let mut hops = 0;
        loop {
            if let Some(&slot) = slots.get(&current) {
                owned[slot].push(i);
                break;
            }
            let next = hierarchy.merged_into[current as usize];
            if next == current || hops >= MAX_MERGE_HOPS {
                break;
            }
            current = next;
            hops += 1;
        }
    }

    if mode == Hierarchical::Cutout {
        let mut claimed = vec![false; labels.len()];
        for slot in (0..owned.len()).rev() {
            owned[slot].retain(|&i| {
                if claimed[i] {
                    false
                } else {
                    claimed[i] = true;
                    true
                }
            });
        }
    }

    hierarchy
        .output
        .iter()
        .zip(owned)
        .map(|(&c, pixels)| {
            let meta = &hierarchy.saved[&c];
            Layer {
                color: meta.color,
                rect: meta.rect,
                pixels,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{build_adjacency, build_clusters};

    fn rgba(colors: &[(u8, u8, u8)]) -> Vec<u8> {
        colors.iter().flat_map(|&(r, g, b)| [r, g, b, 255]).collect()
    }

    fn run(
        pixels: &[u8],
        width: usize,
        height: usize,
        config: &TraceConfig,
    ) -> (Hierarchy, Vec<u32>) {
        let clustering = build_clusters(pixels, width, height, None, config);
        let adjacency = build_adjacency(&clustering.labels, width, height, clustering.table.len());
        let hierarchy = build_hierarchy(
            clustering.table,
            adjacency,
            width,
            height,
            false,
            config,
        );
        (hierarchy, clustering.labels)
    }

    const RED: (u8, u8, u8) = (255, 0, 0);
    const WHITE: (u8, u8, u8) = (255, 255, 255);

    #[test]
    fn solid_image_emits_one_layer() {
        let pixels = rgba(&[RED; 4]);
        let (hierarchy, _) = run(&pixels, 2, 2, &TraceConfig::default());
        assert_eq!(hierarchy.output.len(), 1);
        let meta = &hierarchy.saved[&hierarchy.output[0]];
        assert_eq!(meta.color, Color::new(255, 0, 0, 255));
        assert_eq!((meta.rect.left, meta.rect.top, meta.rect.right, meta.rect.bottom), (0, 0, 2, 2));
    }

    #[test]
    fn distinct_region_is_emitted_before_its_background() {
        // 6x6 white with a 4x4 red block: red is smaller, so it is
        // processed and emitted first, then folded into white.
        let mut colors = vec![WHITE; 36];
        for y in 1..5 {
            for x in 1..5 {
                colors[y * 6 + x] = RED;
            }
        }
        let pixels = rgba(&colors);
        let (hierarchy, _) = run(&pixels, 6, 6, &TraceConfig::default());
        assert_eq!(hierarchy.output.len(), 2);
        assert_eq!(hierarchy.saved[&hierarchy.output[0]].color, Color::new(255, 0, 0, 255));
        assert_eq!(
            hierarchy.saved[&hierarchy.output[1]].color,
            Color::new(255, 255, 255, 255)
        );
    }

    #[test]
    fn speckles_fold_into_their_neighbor_color() {
        // A 1-pixel white speck inside red is below the speckle filter:
        // it merges silently and tints the red layer's residue average.
        let mut colors = vec![RED; 9];
        colors[4] = WHITE;
        let pixels = rgba(&colors);
        let (hierarchy, _) = run(&pixels, 3, 3, &TraceConfig::default());
        assert_eq!(hierarchy.output.len(), 1);
        let color = hierarchy.saved[&hierarchy.output[0]].color;
        // (255*8 + 255)/9 = 255 red, (0*8 + 255)/9 = 28 green/blue
        assert_eq!(color, Color::new(255, 28, 28, 255));
    }

    #[test]
    fn emitted_layer_keeps_its_own_residue() {
        // With a permissive filter the white center is emitted as its
        // own layer, so red's saved color stays pure.
        let mut colors = vec![RED; 9];
        colors[4] = WHITE;
        let pixels = rgba(&colors);
        let config = TraceConfig {
            filter_speckle: 1,
            ..TraceConfig::default()
        };
        let (hierarchy, _) = run(&pixels, 3, 3, &config);
        assert_eq!(hierarchy.output.len(), 2);
        assert_eq!(hierarchy.saved[&hierarchy.output[0]].color, Color::new(255, 255, 255, 255));
        assert_eq!(hierarchy.saved[&hierarchy.output[1]].color, Color::new(255, 0, 0, 255));
    }

    #[test]
    fn zero_speckle_filter_merges_everything() {
        let mut colors = vec![WHITE; 36];
        for y in 1..5 {
            for x in 1..5 {
                colors[y * 6 + x] = RED;
            }
        }
        let pixels = rgba(&colors);
        let config = TraceConfig {
            filter_speckle: 0,
            ..TraceConfig::default()
        };
        let (hierarchy, _) = run(&pixels, 6, 6, &config);
        assert_eq!(hierarchy.output.len(), 1);
    }

    #[test]
    fn stacked_ownership_covers_every_labeled_pixel() {
        let mut colors = vec![WHITE; 36];
        for y in 1..5 {
            for x in 1..5 {
                colors[y * 6 + x] = RED;
            }
        }
        let pixels = rgba(&colors);
        let (hierarchy, labels) = run(&pixels, 6, 6, &TraceConfig::default());
        let layers = assign_pixels(&labels, &hierarchy, Hierarchical::Stacked);
        let total: usize = layers.iter().map(|l| l.pixels.len()).sum();
        assert_eq!(total, 36);
        assert_eq!(layers[0].pixels.len(), 16);
    }

    #[test]
    fn cutout_ownership_is_disjoint() {
        let mut colors = vec![WHITE; 36];
        for y in 1..5 {
            for x in 1..5 {
                colors[y * 6 + x] = RED;
            }
        }
        let pixels = rgba(&colors);
        let (hierarchy, labels) = run(&pixels, 6, 6, &TraceConfig::default());
        let layers = assign_pixels(&labels, &hierarchy, Hierarchical::Cutout);
        let mut seen = vec![false; 36];
        for layer in &layers {
            for &i in &layer.pixels {
                assert!(!seen[i], "pixel {i} owned twice");
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn emission_follows_ascending_area() {
        // Three vertical bands: 1 column blue, 2 columns red, 5 white.
        let mut colors = Vec::new();
        for _y in 0..8 {
            colors.push((0, 0, 255));
            colors.extend([RED; 2]);
            colors.extend([WHITE; 5]);
        }
        let pixels = rgba(&colors);
        let config = TraceConfig {
            filter_speckle: 2,
            ..TraceConfig::default()
        };
        let (hierarchy, _) = run(&pixels, 8, 8, &config);
        assert_eq!(hierarchy.output.len(), 3);
        let saved: Vec<Color> = hierarchy
            .output
            .iter()
            .map(|c| hierarchy.saved[c].color)
            .collect();
        assert_eq!(saved[0], Color::new(0, 0, 255, 255));
        assert_eq!(saved[1], Color::new(255, 0, 0, 255));
        assert_eq!(saved[2], Color::new(255, 255, 255, 255));
    }
}
