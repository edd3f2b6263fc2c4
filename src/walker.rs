//! Boundary walking on the pixel-corner lattice.
//!
//! Paths run along pixel edges, between corners. An edge is part of the
//! boundary exactly when the two pixels flanking it differ. The walk
//! keeps going straight across colinear edges and only records a corner
//! when it is forced to turn, so a straight run of N pixels contributes
//! 2 path points, not N.

use crate::binary::BinaryImage;
use crate::geom::PointI32;

/// Hard cap on corner steps; a walk that runs this long is truncated.
const MAX_WALK_STEPS: usize = 10_000_000;

/// Probe order for clockwise walks: north, east, south, west.
const CLOCKWISE: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
/// Probe order for counter-clockwise walks: west, south, east, north.
const COUNTER_CLOCKWISE: [(i32, i32); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];

/// First corner of the top-most boundary row: the first pixel in scan
/// order that is set with an unset pixel above it.
pub fn find_boundary_start(img: &BinaryImage) -> Option<PointI32> {
    for y in 0..img.height as i32 {
        for x in 0..img.width as i32 {
            if img.get(x, y) && !img.get(x, y - 1) {
                return Some(PointI32::new(x, y));
            }
        }
    }
    None
}

/// Whether the edge leaving corner (x, y) in direction `dir` separates
/// a set pixel from an unset one.
fn is_boundary_edge(img: &BinaryImage, corner: PointI32, dir: (i32, i32)) -> bool {
    let (x, y) = (corner.x, corner.y);
    let (a, b) = match dir {
        (0, -1) => ((x - 1, y - 1), (x, y - 1)), // north
        (1, 0) => ((x, y), (x, y - 1)),          // east
        (0, 1) => ((x - 1, y), (x, y)),          // south
        (-1, 0) => ((x - 1, y), (x - 1, y - 1)), // west
        _ => unreachable!(),
    };
    img.get(a.0, a.1) != img.get(b.0, b.1)
}

/// Walk the closed boundary through `start`, clockwise or counter-
/// clockwise, returning the corners where the path turns.
///
/// At every corner the candidate directions are the boundary edges
/// whose far corner is neither of the last two visited (so the walk
/// cannot immediately back-track). While the previous direction stays
/// the only candidate, the walk continues without recording a point;
/// any forced turn or ambiguity ends the straight run and records the
/// corner.
pub fn walk_path(img: &BinaryImage, start: PointI32, clockwise: bool) -> Vec<PointI32> {
    let dirs = if clockwise { CLOCKWISE } else { COUNTER_CLOCKWISE };

    let mut path: Vec<PointI32> = Vec::new();
    let mut current = start;
    let mut prev: Option<PointI32> = None;
    let mut prev_prev: Option<PointI32> = None;
    let mut last_dir: Option<usize> = None;
    let mut steps = 0usize;

    loop {
        steps += 1;
        if steps > MAX_WALK_STEPS {
            break;
        }

        let mut valid = [false; 4];
        let mut valid_count = 0;
        for (k, &dir) in dirs.iter().enumerate() {
            if !is_boundary_edge(img, current, dir) {
                continue;
            }
            let next = PointI32::new(current.x + dir.0, current.y + dir.1);
            if Some(next) == prev || Some(next) == prev_prev {
                continue;
            }
            valid[k] = true;
            valid_count += 1;
        }
        if valid_count == 0 {
            break;
        }

        let chosen = match last_dir {
            // Straight ahead is the only way out: keep walking without
            // recording this corner.
            Some(k) if valid_count == 1 && valid[k] => k,
            _ => {
                path.push(current);
                valid.iter().position(|&v| v).unwrap()
            }
        };
        last_dir = Some(chosen);

        prev_prev = prev;
        prev = Some(current);
        current = PointI32::new(current.x + dirs[chosen].0, current.y + dirs[chosen].1);

        if current == start && path.len() > 1 {
            break;
        }
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(rows: &[&str]) -> BinaryImage {
        let mut img = BinaryImage::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                img.set(x as i32, y as i32, ch == '#');
            }
        }
        img
    }

    #[test]
    fn start_is_topmost_then_leftmost() {
        let img = image(&[".#.", "###"]);
        assert_eq!(find_boundary_start(&img), Some(PointI32::new(1, 0)));
    }

    #[test]
    fn empty_image_has_no_start() {
        assert_eq!(find_boundary_start(&BinaryImage::new(3, 3)), None);
    }

    #[test]
    fn single_pixel_clockwise() {
        let img = image(&["#"]);
        let path = walk_path(&img, PointI32::new(0, 0), true);
        assert_eq!(
            path,
            vec![
                PointI32::new(0, 0),
                PointI32::new(1, 0),
                PointI32::new(1, 1),
                PointI32::new(0, 1),
            ]
        );
    }

    #[test]
    fn single_pixel_counter_clockwise() {
        let img = image(&["#"]);
        let path = walk_path(&img, PointI32::new(0, 0), false);
        assert_eq!(
            path,
            vec![
                PointI32::new(0, 0),
                PointI32::new(0, 1),
                PointI32::new(1, 1),
                PointI32::new(1, 0),
            ]
        );
    }

    #[test]
    fn straight_edges_are_not_subdivided() {
        let img = image(&["####", "####"]);
        let path = walk_path(&img, PointI32::new(0, 0), true);
        // Four corners only, regardless of edge length.
        assert_eq!(
            path,
            vec![
                PointI32::new(0, 0),
                PointI32::new(4, 0),
                PointI32::new(4, 2),
                PointI32::new(0, 2),
            ]
        );
    }

    #[test]
    fn l_shape_has_six_corners() {
        let img = image(&["#.", "##"]);
        let path = walk_path(&img, PointI32::new(0, 0), true);
        assert_eq!(path.len(), 6);
        // The concave corner is present.
        assert!(path.contains(&PointI32::new(1, 1)));
    }
}
