//! Flat-array binary images and 4-connected component labeling.
//!
//! The boundary walker and hole detection both run on these masks.
//! Out-of-bounds reads return `false` and out-of-bounds writes are
//! dropped, so callers can plot pixel sets without pre-clipping.

use crate::geom::{PointI32, Rect};

/// A width x height bitmask stored as a flat boolean array.
#[derive(Debug, Clone)]
pub struct BinaryImage {
    pub width: usize,
    pub height: usize,
    data: Vec<bool>,
}

impl BinaryImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Pixel at (x, y). Out-of-bounds is `false`.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Set pixel at (x, y). Out-of-bounds writes are no-ops.
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        self.data[y as usize * self.width + x as usize] = value;
    }

    /// Bitwise inversion.
    pub fn negative(&self) -> BinaryImage {
        BinaryImage {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|b| !b).collect(),
        }
    }

    /// Decompose into 4-connected components of set pixels, in scan
    /// order of each component's first pixel.
    pub fn to_clusters(&self) -> Vec<BinaryCluster> {
        let mut visited = vec![false; self.data.len()];
        let mut clusters = Vec::new();

        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let idx = y as usize * self.width + x as usize;
                if visited[idx] || !self.data[idx] {
                    continue;
                }

                // Flood fill with an explicit stack.
                let mut cluster = BinaryCluster::default();
                let mut stack = vec![PointI32::new(x, y)];
                visited[idx] = true;
                while let Some(p) = stack.pop() {
                    cluster.add(p);
                    for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
                        let nx = p.x + dx;
                        let ny = p.y + dy;
                        if !self.get(nx, ny) {
                            continue;
                        }
                        let nidx = ny as usize * self.width + nx as usize;
                        if !visited[nidx] {
                            visited[nidx] = true;
                            stack.push(PointI32::new(nx, ny));
                        }
                    }
                }
                clusters.push(cluster);
            }
        }

        clusters
    }
}

/// One 4-connected component of a [`BinaryImage`], with its pixels in
/// parent-image coordinates.
#[derive(Debug, Clone, Default)]
pub struct BinaryCluster {
    pub rect: Rect,
    pub points: Vec<PointI32>,
}

impl BinaryCluster {
    fn add(&mut self, p: PointI32) {
        self.rect.add_xy(p.x, p.y);
        self.points.push(p);
    }

    pub fn area(&self) -> usize {
        self.points.len()
    }

    /// Render this component into a rect-local binary image.
    pub fn to_binary_image(&self) -> BinaryImage {
        let mut image = BinaryImage::new(self.rect.width() as usize, self.rect.height() as usize);
        for p in &self.points {
            image.set(p.x - self.rect.left, p.y - self.rect.top, true);
        }
        image
    }

    /// Whether this component's rect touches any edge of the given
    /// bounds. Used to tell interior holes from the exterior.
    pub fn touches_edge(&self, width: usize, height: usize) -> bool {
        self.rect.left == 0
            || self.rect.top == 0
            || self.rect.right == width as i32
            || self.rect.bottom == height as i32
    }
}
