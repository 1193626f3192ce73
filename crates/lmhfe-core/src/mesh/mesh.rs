//! Triangular mesh: points, edges, cells, and the queries the LMHFE
//! assembly needs from them.

use std::io::{BufRead, Write};

use nalgebra::{Point2, Vector2};

use crate::error::{Error, Result};

use super::cell::Cell;
use super::edge::{Edge, NO_CELL};

/// A 2-D unstructured triangular mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    points: Vec<Point2<f64>>,
    edges: Vec<Edge>,
    cells: Vec<Cell>,
}

impl Mesh {
    /// Build a mesh from already-computed points, edges and cells,
    /// performing no validation.
    pub fn from_parts(points: Vec<Point2<f64>>, edges: Vec<Edge>, cells: Vec<Cell>) -> Self {
        Self {
            points,
            edges,
            cells,
        }
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn npoints(&self) -> usize {
        self.points.len()
    }

    pub fn nedges(&self) -> usize {
        self.edges.len()
    }

    pub fn ncells(&self) -> usize {
        self.cells.len()
    }

    /// Generate an `nx` by `ny` grid of rectangles over `[0, x] x [0, y]`,
    /// each split along the `(i, j+1)-(i+1, j)` diagonal into two
    /// counter-clockwise triangles.
    pub fn gen_rect(nx: usize, ny: usize, x: f64, y: f64) -> Result<Mesh> {
        if nx == 0 || ny == 0 {
            return Err(Error::InvalidArgument(
                "gen_rect: nx and ny must be nonzero".into(),
            ));
        }
        if !(x > 0.0) || !(y > 0.0) {
            return Err(Error::InvalidArgument(
                "gen_rect: x and y must be positive".into(),
            ));
        }

        let dx = x / nx as f64;
        let dy = y / ny as f64;
        let pidx = |i: usize, j: usize| -> usize { j * (nx + 1) + i };

        let mut points = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                points.push(Point2::new(i as f64 * dx, j as f64 * dy));
            }
        }

        let mut edges = Vec::with_capacity(nx * (ny + 1) + (nx + 1) * ny + nx * ny);
        let mut edge_of = std::collections::HashMap::new();
        let mut push_edge = |p1: usize, p2: usize, edges: &mut Vec<Edge>| -> usize {
            let key = if p1 < p2 { (p1, p2) } else { (p2, p1) };
            *edge_of.entry(key).or_insert_with(|| {
                edges.push(Edge::new(p1, p2));
                edges.len() - 1
            })
        };

        for j in 0..=ny {
            for i in 0..nx {
                push_edge(pidx(i, j), pidx(i + 1, j), &mut edges);
            }
        }
        for i in 0..=nx {
            for j in 0..ny {
                push_edge(pidx(i, j), pidx(i, j + 1), &mut edges);
            }
        }
        for i in 0..nx {
            for j in 0..ny {
                push_edge(pidx(i, j + 1), pidx(i + 1, j), &mut edges);
            }
        }

        let mut cells = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let p_sw = pidx(i, j);
                let p_se = pidx(i + 1, j);
                let p_ne = pidx(i + 1, j + 1);
                let p_nw = pidx(i, j + 1);

                // Triangle A: sw, se, nw (counter-clockwise).
                let a_points = [p_sw, p_se, p_nw];
                let a_edges = [
                    *edge_of.get(&Self::key(p_se, p_nw)).unwrap(),
                    *edge_of.get(&Self::key(p_sw, p_nw)).unwrap(),
                    *edge_of.get(&Self::key(p_sw, p_se)).unwrap(),
                ];
                let cell_a = cells.len();
                cells.push(Cell::new(a_points, a_edges));
                for &e in &a_edges {
                    edges[e].attach_cell(cell_a);
                }

                // Triangle B: se, ne, nw (counter-clockwise).
                let b_points = [p_se, p_ne, p_nw];
                let b_edges = [
                    *edge_of.get(&Self::key(p_ne, p_nw)).unwrap(),
                    *edge_of.get(&Self::key(p_se, p_nw)).unwrap(),
                    *edge_of.get(&Self::key(p_se, p_ne)).unwrap(),
                ];
                let cell_b = cells.len();
                cells.push(Cell::new(b_points, b_edges));
                for &e in &b_edges {
                    edges[e].attach_cell(cell_b);
                }
            }
        }

        Ok(Mesh {
            points,
            edges,
            cells,
        })
    }

    fn key(a: usize, b: usize) -> (usize, usize) {
        if a < b { (a, b) } else { (b, a) }
    }

    /// Triangle area, `0.5 * |(p1 - p0) x (p2 - p0)|`.
    pub fn cell_measure(&self, c: usize) -> f64 {
        let cell = &self.cells[c];
        let p0 = self.points[cell.points[0]];
        let p1 = self.points[cell.points[1]];
        let p2 = self.points[cell.points[2]];
        let u = p1 - p0;
        let v = p2 - p0;
        0.5 * (u.x * v.y - u.y * v.x).abs()
    }

    /// Arithmetic mean of the cell's three points.
    pub fn cell_center(&self, c: usize) -> Point2<f64> {
        let cell = &self.cells[c];
        let p0 = self.points[cell.points[0]];
        let p1 = self.points[cell.points[1]];
        let p2 = self.points[cell.points[2]];
        Point2::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// `p2 - p1` of the edge's stored point ordering.
    pub fn get_edge_dir(&self, e: usize) -> Vector2<f64> {
        let edge = &self.edges[e];
        self.points[edge.points[1]] - self.points[edge.points[0]]
    }

    /// True iff the cross product of the edge's stored direction with
    /// `(cell_centroid - p1)` is positive, i.e. the centroid lies to the
    /// left of the directed edge.
    pub fn is_edge_clockwise(&self, e: usize, c: usize) -> bool {
        let dir = self.get_edge_dir(e);
        let p1 = self.points[self.edges[e].points[0]];
        let to_centroid = self.cell_center(c) - p1;
        dir.x * to_centroid.y - dir.y * to_centroid.x > 0.0
    }

    /// Fix a canonical direction for every edge and, for interior edges,
    /// the slot (0 or 1) that its clockwise-adjacent cell occupies.
    ///
    /// Reverses every edge's stored point order, then — for edges shared
    /// by two cells — swaps the cell adjacency so slot 0 holds whichever
    /// cell is clockwise for the edge's new direction.
    ///
    /// Does not permute any cell's `points`/`edges` lists: `is_edge_clockwise`
    /// reads only an edge's global direction and a cell's centroid (a mean,
    /// invariant to point order), so no list reordering changes it, and
    /// every other cell-list consumer (`cell_measure`, `cell_center`, the
    /// B⁻¹ assembly) is itself order-independent. See DESIGN.md.
    pub fn direct(mut self) -> Self {
        for edge in &mut self.edges {
            edge.points.swap(0, 1);
        }
        for e in 0..self.edges.len() {
            let (c0, c1) = (self.edges[e].cells[0], self.edges[e].cells[1]);
            if c0 != NO_CELL && c1 != NO_CELL && !self.is_edge_clockwise(e, c0) {
                self.edges[e].cells.swap(0, 1);
            }
        }
        self
    }

    /// Check every invariant from the data model: index bounds, cell/edge
    /// cross-consistency, and edge-point uniqueness within a cell.
    pub fn is_valid(&self) -> bool {
        for edge in &self.edges {
            if edge.points[0] >= self.points.len() || edge.points[1] >= self.points.len() {
                return false;
            }
            for &c in &edge.cells {
                if c != NO_CELL && c >= self.cells.len() {
                    return false;
                }
            }
        }
        for cell in &self.cells {
            for &p in &cell.points {
                if p >= self.points.len() {
                    return false;
                }
            }
            for k in 0..3 {
                let g = cell.edges[k];
                if g >= self.edges.len() {
                    return false;
                }
                let expected = [cell.points[(k + 1) % 3], cell.points[(k + 2) % 3]];
                let actual = self.edges[g].points;
                let matches = (actual[0] == expected[0] && actual[1] == expected[1])
                    || (actual[0] == expected[1] && actual[1] == expected[0]);
                if !matches {
                    return false;
                }
            }
        }
        for (ci, cell) in self.cells.iter().enumerate() {
            for &g in &cell.edges {
                if !self.edges[g].cells.contains(&ci) {
                    return false;
                }
            }
        }
        true
    }

    /// Write the text form: a header of counts, then points, edges, cells.
    pub fn dump(&self, w: &mut impl Write) -> Result<()> {
        writeln!(w, "{} {} {}", self.points.len(), self.edges.len(), self.cells.len())
            .map_err(|e| Error::IoFailure(e.to_string()))?;
        for p in &self.points {
            writeln!(w, "{} {}", p.x, p.y).map_err(|e| Error::IoFailure(e.to_string()))?;
        }
        for edge in &self.edges {
            let c0 = cell_or_sentinel(edge.cells[0]);
            let c1 = cell_or_sentinel(edge.cells[1]);
            writeln!(w, "{} {} {} {}", edge.points[0], edge.points[1], c0, c1)
                .map_err(|e| Error::IoFailure(e.to_string()))?;
        }
        for cell in &self.cells {
            writeln!(
                w,
                "{} {} {} {} {} {}",
                cell.points[0],
                cell.points[1],
                cell.points[2],
                cell.edges[0],
                cell.edges[1],
                cell.edges[2]
            )
            .map_err(|e| Error::IoFailure(e.to_string()))?;
        }
        Ok(())
    }

    /// Parse the text form written by [`Mesh::dump`].
    pub fn read(r: &mut impl BufRead) -> Result<Mesh> {
        let mut lines = r.lines();
        let header = next_line(&mut lines)?;
        let mut it = header.split_whitespace();
        let npoints = parse_usize(it.next())?;
        let nedges = parse_usize(it.next())?;
        let ncells = parse_usize(it.next())?;

        let mut points = Vec::with_capacity(npoints);
        for _ in 0..npoints {
            let line = next_line(&mut lines)?;
            let mut it = line.split_whitespace();
            let x: f64 = parse_f64(it.next())?;
            let y: f64 = parse_f64(it.next())?;
            points.push(Point2::new(x, y));
        }

        let mut edges = Vec::with_capacity(nedges);
        for _ in 0..nedges {
            let line = next_line(&mut lines)?;
            let mut it = line.split_whitespace();
            let p1 = parse_usize(it.next())?;
            let p2 = parse_usize(it.next())?;
            let c1 = parse_cell(it.next())?;
            let c2 = parse_cell(it.next())?;
            edges.push(Edge {
                points: [p1, p2],
                cells: [c1, c2],
            });
        }

        let mut cells = Vec::with_capacity(ncells);
        for _ in 0..ncells {
            let line = next_line(&mut lines)?;
            let mut it = line.split_whitespace();
            let p1 = parse_usize(it.next())?;
            let p2 = parse_usize(it.next())?;
            let p3 = parse_usize(it.next())?;
            let e1 = parse_usize(it.next())?;
            let e2 = parse_usize(it.next())?;
            let e3 = parse_usize(it.next())?;
            cells.push(Cell::new([p1, p2, p3], [e1, e2, e3]));
        }

        Ok(Mesh {
            points,
            edges,
            cells,
        })
    }
}

fn cell_or_sentinel(c: usize) -> i64 {
    if c == NO_CELL { -1 } else { c as i64 }
}

fn parse_cell(s: Option<&str>) -> Result<usize> {
    let v: i64 = s
        .ok_or_else(|| Error::IoFailure("mesh: truncated edge line".into()))?
        .parse()
        .map_err(|_| Error::IoFailure("mesh: malformed cell index".into()))?;
    Ok(if v < 0 { NO_CELL } else { v as usize })
}

fn parse_usize(s: Option<&str>) -> Result<usize> {
    s.ok_or_else(|| Error::IoFailure("mesh: truncated line".into()))?
        .parse()
        .map_err(|_| Error::IoFailure("mesh: malformed integer".into()))
}

fn parse_f64(s: Option<&str>) -> Result<f64> {
    s.ok_or_else(|| Error::IoFailure("mesh: truncated line".into()))?
        .parse()
        .map_err(|_| Error::IoFailure("mesh: malformed coordinate".into()))
}

fn next_line(lines: &mut std::io::Lines<impl BufRead>) -> Result<String> {
    lines
        .next()
        .ok_or_else(|| Error::IoFailure("mesh: unexpected end of input".into()))?
        .map_err(|e| Error::IoFailure(e.to_string()))
}
