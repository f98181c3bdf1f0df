//! Marching-squares iso-lines on a regular grid.
//!
//! Points are expressed in index space: `(i, j)` with fractional parts
//! where the iso-line crosses a cell edge.

use ndarray::Array2;
use std::collections::{HashMap, VecDeque};

/// Crossing point identified by the grid edge it lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    // Edge from (i, j) to (i + 1, j)
    AlongI(usize, usize),
    // Edge from (i, j) to (i, j + 1)
    AlongJ(usize, usize),
}

/// A traced iso-line.
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<(f64, f64)>,
    pub closed: bool,
}

impl Contour {
    /// Polyline length in index units.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| ((w[1].0 - w[0].0).powi(2) + (w[1].1 - w[0].1).powi(2)).sqrt())
            .sum()
    }

    /// Index-space bounding box `(min_i, max_i, min_j, max_j)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(a, b, c, d), &(i, j)| (a.min(i), b.max(i), c.min(j), d.max(j)),
        )
    }

    pub fn contains(&self, i: f64, j: f64) -> bool {
        point_in_polygon(i, j, &self.points)
    }
}

/// Even-odd ray casting. The polygon is implicitly closed.
pub fn point_in_polygon(px: f64, py: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut prev = polygon[n - 1];
    for &curr in polygon {
        let (xi, yi) = curr;
        let (xj, yj) = prev;
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        prev = curr;
    }
    inside
}

fn crossing(field: &Array2<f64>, level: f64, edge: Edge) -> (f64, f64) {
    let (a, b, origin, along_i) = match edge {
        Edge::AlongI(i, j) => (field[[i, j]], field[[i + 1, j]], (i, j), true),
        Edge::AlongJ(i, j) => (field[[i, j]], field[[i, j + 1]], (i, j), false),
    };
    let t = if b != a { (level - a) / (b - a) } else { 0.5 };
    let (i, j) = (origin.0 as f64, origin.1 as f64);
    if along_i {
        (i + t, j)
    } else {
        (i, j + t)
    }
}

/// Segments for one cell, as pairs of crossed edges.
fn cell_segments(field: &Array2<f64>, level: f64, i: usize, j: usize) -> Vec<(Edge, Edge)> {
    let v00 = field[[i, j]];
    let v10 = field[[i + 1, j]];
    let v11 = field[[i + 1, j + 1]];
    let v01 = field[[i, j + 1]];

    let case = (v00 > level) as u8
        | ((v10 > level) as u8) << 1
        | ((v11 > level) as u8) << 2
        | ((v01 > level) as u8) << 3;

    let bottom = Edge::AlongI(i, j);
    let right = Edge::AlongJ(i + 1, j);
    let top = Edge::AlongI(i, j + 1);
    let left = Edge::AlongJ(i, j);

    match case {
        0 | 15 => vec![],
        1 | 14 => vec![(left, bottom)],
        2 | 13 => vec![(bottom, right)],
        3 | 12 => vec![(left, right)],
        4 | 11 => vec![(right, top)],
        6 | 9 => vec![(bottom, top)],
        7 | 8 => vec![(left, top)],
        5 | 10 => {
            // Saddle: resolve with the cell-centre value
            let centre_above = (v00 + v10 + v11 + v01) / 4.0 > level;
            let corner00_above = case == 5;
            if centre_above == corner00_above {
                vec![(left, top), (bottom, right)]
            } else {
                vec![(left, bottom), (right, top)]
            }
        }
        _ => unreachable!(),
    }
}

/// Trace every iso-line of `field` at `level`.
///
/// Closed contours repeat their first point at the end.
pub fn find_contours(field: &Array2<f64>, level: f64) -> Vec<Contour> {
    let (nx, ny) = field.dim();
    if nx < 2 || ny < 2 {
        return Vec::new();
    }

    let mut segments: Vec<(Edge, Edge)> = Vec::new();
    for i in 0..nx - 1 {
        for j in 0..ny - 1 {
            segments.extend(cell_segments(field, level, i, j));
        }
    }

    let mut touching: HashMap<Edge, Vec<usize>> = HashMap::new();
    for (s, (a, b)) in segments.iter().enumerate() {
        touching.entry(*a).or_default().push(s);
        touching.entry(*b).or_default().push(s);
    }

    let mut used = vec![false; segments.len()];
    let next_from = |edge: Edge, used: &mut Vec<bool>| -> Option<Edge> {
        let s = *touching.get(&edge)?.iter().find(|&&s| !used[s])?;
        used[s] = true;
        let (a, b) = segments[s];
        Some(if a == edge { b } else { a })
    };

    let mut contours = Vec::new();
    for s in 0..segments.len() {
        if used[s] {
            continue;
        }
        used[s] = true;
        let (head, tail) = segments[s];
        let mut chain: VecDeque<Edge> = VecDeque::from([head, tail]);

        let mut closed = false;
        let mut end = tail;
        while let Some(next) = next_from(end, &mut used) {
            if next == head {
                closed = true;
                break;
            }
            chain.push_back(next);
            end = next;
        }
        if !closed {
            let mut start = head;
            while let Some(prev) = next_from(start, &mut used) {
                chain.push_front(prev);
                start = prev;
            }
        }

        let mut points: Vec<(f64, f64)> =
            chain.iter().map(|e| crossing(field, level, *e)).collect();
        if closed {
            points.push(points[0]);
        }
        contours.push(Contour { points, closed });
    }
    contours
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bump(n: usize) -> Array2<f64> {
        let c = (n as f64 - 1.0) / 2.0;
        Array2::from_shape_fn((n, n), |(i, j)| {
            let r2 = (i as f64 - c).powi(2) + (j as f64 - c).powi(2);
            10.0 - r2
        })
    }

    #[test]
    fn island_gives_one_closed_contour() {
        let contours = find_contours(&bump(11), 1.0);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(c.closed);
        assert_eq!(c.points.first(), c.points.last());
        // Radius 3 circle
        assert!((c.length() - 2.0 * std::f64::consts::PI * 3.0).abs() < 1.5);
        assert!(c.contains(5.0, 5.0));
        assert!(!c.contains(0.0, 0.0));
    }

    #[test]
    fn straight_coast_is_open() {
        let field = Array2::from_shape_fn((6, 4), |(i, _)| i as f64 - 2.5);
        let contours = find_contours(&field, 0.0);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(!c.closed);
        assert_eq!(c.points.len(), 4);
        for p in &c.points {
            assert_abs_diff_eq!(p.0, 2.5, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(c.length(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_field_has_no_contours() {
        let field = Array2::from_elem((5, 5), -3.0);
        assert!(find_contours(&field, 0.0).is_empty());
    }

    #[test]
    fn polygon_test_uses_even_odd_rule() {
        let square = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
        assert!(point_in_polygon(2.0, 2.0, &square));
        assert!(!point_in_polygon(5.0, 2.0, &square));
        assert!(!point_in_polygon(2.0, -1.0, &square));
    }
}
