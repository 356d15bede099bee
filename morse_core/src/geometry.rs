// Editor geometry: turns pointer gestures into point sets.
// Line and rectangle never bounds-check; flood fill and the circle tool stay
// inside the grid; apply_points drops anything off the grid before touching
// a pattern.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::types::{Pattern, Point};

/// Bresenham line from `start` to `end`, both endpoints included once.
/// Yields `max(|dx|, |dy|) + 1` points, ordered from `start`.
///
/// The line is always traced from the lexicographically smaller endpoint, so
/// swapping the arguments yields the same cells in reverse order.
pub fn line_points(start: Point, end: Point) -> Vec<Point> {
    if (start.x, start.y) > (end.x, end.y) {
        let mut points = trace_line(end, start);
        points.reverse();
        return points;
    }
    trace_line(start, end)
}

fn trace_line(start: Point, end: Point) -> Vec<Point> {
    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };

    let mut points = Vec::with_capacity(dx.max(dy) as usize + 1);
    let (mut x, mut y) = (start.x, start.y);
    let mut err = dx - dy;

    loop {
        points.push(Point::new(x, y));
        if x == end.x && y == end.y {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }

    points
}

/// Axis-aligned rectangle spanned by two corners in any order.
///
/// Filled returns every point of the closed rectangle. The outline returns
/// the two horizontal edges in full and the vertical edges without their
/// corners, so no point appears twice.
pub fn rectangle_points(corner1: Point, corner2: Point, filled: bool) -> Vec<Point> {
    let (min_x, max_x) = (corner1.x.min(corner2.x), corner1.x.max(corner2.x));
    let (min_y, max_y) = (corner1.y.min(corner2.y), corner1.y.max(corner2.y));

    let mut points = Vec::new();
    if filled {
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                points.push(Point::new(x, y));
            }
        }
        return points;
    }

    for x in min_x..=max_x {
        points.push(Point::new(x, min_y));
        if min_y != max_y {
            points.push(Point::new(x, max_y));
        }
    }
    for y in (min_y + 1)..max_y {
        points.push(Point::new(min_x, y));
        if min_x != max_x {
            points.push(Point::new(max_x, y));
        }
    }
    points
}

/// Radius used by [`circle_points`]: the euclidean distance, rounded.
pub fn circle_radius(center: Point, edge: Point) -> i32 {
    let dx = f64::from(edge.x - center.x);
    let dy = f64::from(edge.y - center.y);
    (dx * dx + dy * dy).sqrt().round() as i32
}

/// [`circle_points`] restricted to `0 <= coord < grid_size`, order kept.
pub fn circle_points_in_grid(center: Point, edge: Point, filled: bool, grid_size: usize) -> Vec<Point> {
    circle_points(center, edge, filled)
        .into_iter()
        .filter(|point| point.in_grid(grid_size))
        .collect()
}

/// Circle around `center` passing (after rounding) through `edge`.
///
/// Filled returns every point within the radius. The outline uses the
/// midpoint algorithm, mirrored into all eight octants; octant seams produce
/// repeats, which are removed while keeping first-seen order.
pub fn circle_points(center: Point, edge: Point, filled: bool) -> Vec<Point> {
    let radius = circle_radius(center, edge);

    if filled {
        let mut points = Vec::new();
        let r2 = radius * radius;
        for y in -radius..=radius {
            for x in -radius..=radius {
                if x * x + y * y <= r2 {
                    points.push(Point::new(center.x + x, center.y + y));
                }
            }
        }
        return points;
    }

    let mut unique = IndexSet::new();
    let (mut x, mut y, mut err) = (radius, 0, 0);
    while x >= y {
        for (ox, oy) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            unique.insert(Point::new(center.x + ox, center.y + oy));
        }

        if err <= 0 {
            y += 1;
            err += 2 * y + 1;
        }
        if err > 0 {
            x -= 1;
            err -= 2 * x + 1;
        }
    }
    unique.into_iter().collect()
}

/// 4-connected flood fill from `start` over cells sharing its value.
///
/// Uses an explicit stack and a visited buffer, so it terminates for any
/// input and never recurses. Bounded by `0 <= coord < grid_size`; a start
/// outside the grid or the pattern yields no points.
pub fn flood_fill_points(pattern: &Pattern, start: Point, grid_size: usize) -> Vec<Point> {
    if !start.in_grid(grid_size) {
        return Vec::new();
    }
    let Some(target) = pattern.at(start) else {
        return Vec::new();
    };

    let mut visited = vec![false; grid_size * grid_size];
    let mut points = Vec::new();
    let mut stack = vec![start];

    while let Some(point) = stack.pop() {
        if !point.in_grid(grid_size) {
            continue;
        }
        let slot = point.y as usize * grid_size + point.x as usize;
        if visited[slot] {
            continue;
        }
        visited[slot] = true;
        if pattern.at(point) != Some(target) {
            continue;
        }

        points.push(point);
        stack.push(Point::new(point.x + 1, point.y));
        stack.push(Point::new(point.x - 1, point.y));
        stack.push(Point::new(point.x, point.y + 1));
        stack.push(Point::new(point.x, point.y - 1));
    }

    points
}

/// Returns a copy of `pattern` with every in-grid point set to `value`.
pub fn apply_points(pattern: &Pattern, points: &[Point], value: bool) -> Pattern {
    let mut next = pattern.clone();
    let size = pattern.size();
    for point in points.iter().filter(|p| p.in_grid(size)) {
        next.set(point.y as usize, point.x as usize, value);
    }
    next
}

/// Editor drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pencil,
    Eraser,
    Line,
    Rectangle,
    Circle,
    Fill,
}

impl Tool {
    /// Points touched by a gesture from `start` to `end`. Pencil and eraser
    /// strokes connect the two samples with a line so fast drags leave no gaps.
    pub fn points(&self, pattern: &Pattern, start: Point, end: Point, filled: bool) -> Vec<Point> {
        match self {
            Tool::Pencil | Tool::Eraser | Tool::Line => line_points(start, end),
            Tool::Rectangle => rectangle_points(start, end, filled),
            Tool::Circle => circle_points_in_grid(start, end, filled, pattern.size()),
            Tool::Fill => flood_fill_points(pattern, start, pattern.size()),
        }
    }

    /// Value written by the gesture. The pencil inverts the cell under the
    /// initial press; fill inverts the region's value; the eraser clears.
    pub fn paint_value(&self, pattern: &Pattern, start: Point) -> bool {
        match self {
            Tool::Eraser => false,
            Tool::Pencil | Tool::Fill => !pattern.at(start).unwrap_or(false),
            Tool::Line | Tool::Rectangle | Tool::Circle => true,
        }
    }

    /// Applies one complete gesture to `pattern`.
    pub fn apply(&self, pattern: &Pattern, start: Point, end: Point, filled: bool) -> Pattern {
        let points = self.points(pattern, start, end, filled);
        apply_points(pattern, &points, self.paint_value(pattern, start))
    }
}
