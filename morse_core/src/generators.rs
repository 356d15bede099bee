// Procedural pattern generators and whole-pattern transforms.
// All of them are pure: same arguments, same grid. Centre is floor(size / 2).

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::types::Pattern;

const HEART: [[u8; 8]; 8] = [
    [0, 1, 1, 0, 0, 1, 1, 0],
    [1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 0],
    [0, 0, 1, 1, 1, 1, 0, 0],
    [0, 0, 0, 1, 1, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0],
];

/// Rounds half-way values towards positive infinity.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn distance_from_center(row: usize, col: usize, center: usize) -> f64 {
    let dr = row as f64 - center as f64;
    let dc = col as f64 - center as f64;
    (dr * dr + dc * dc).sqrt()
}

fn from_fn(size: usize, cell: impl Fn(usize, usize) -> bool) -> Pattern {
    Pattern::from_rows(
        (0..size)
            .map(|row| (0..size).map(|col| cell(row, col)).collect())
            .collect(),
    )
}

/// Disc of the given radius.
pub fn circle(size: usize, radius: f64) -> Pattern {
    let center = size / 2;
    from_fn(size, |row, col| distance_from_center(row, col, center) <= radius)
}

/// Annulus between `inner_radius` and `outer_radius`, both inclusive.
pub fn ring(size: usize, outer_radius: f64, inner_radius: f64) -> Pattern {
    let center = size / 2;
    from_fn(size, |row, col| {
        let distance = distance_from_center(row, col, center);
        distance <= outer_radius && distance >= inner_radius
    })
}

/// Plus sign through the centre row and column.
pub fn cross(size: usize) -> Pattern {
    let center = size / 2;
    from_fn(size, |row, col| row == center || col == center)
}

/// Both diagonals (an X).
pub fn diagonal(size: usize) -> Pattern {
    from_fn(size, |row, col| row == col || row + col + 1 == size)
}

/// On where `row + col` is even.
pub fn checkerboard(size: usize) -> Pattern {
    from_fn(size, |row, col| (row + col) % 2 == 0)
}

/// Square spiral walked clockwise from the top-left corner, keeping a
/// one-cell gap between neighbouring arms.
pub fn spiral(size: usize) -> Pattern {
    const STEPS: [(isize, isize); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

    let mut pattern = Pattern::empty(size);
    if size == 0 {
        return pattern;
    }
    let n = size as isize;
    let lit = |pattern: &Pattern, row: isize, col: isize| {
        (0..n).contains(&row) && (0..n).contains(&col) && pattern.get(row as usize, col as usize) == Some(true)
    };

    let (mut row, mut col, mut heading) = (0isize, 0isize, 0usize);
    pattern.set(0, 0, true);
    // Two turns in a row without moving means the spiral is closed.
    let mut blocked_turns = 0;
    while blocked_turns < 2 {
        let (dr, dc) = STEPS[heading];
        let (next_row, next_col) = (row + dr, col + dc);
        let open = (0..n).contains(&next_row)
            && (0..n).contains(&next_col)
            && !lit(&pattern, next_row, next_col)
            && !lit(&pattern, next_row + dr, next_col + dc);
        if open {
            row = next_row;
            col = next_col;
            pattern.set(row as usize, col as usize, true);
            blocked_turns = 0;
        } else {
            heading = (heading + 1) % STEPS.len();
            blocked_turns += 1;
        }
    }
    pattern
}

/// Three-pixel-thick sine wave across the columns.
pub fn wave(size: usize, amplitude: f64, frequency: f64) -> Pattern {
    let mut pattern = Pattern::empty(size);
    let center = (size / 2) as f64;

    for col in 0..size {
        let phase = (col as f64 / size as f64) * PI * 2.0 * frequency;
        let y = center + round_half_up(amplitude * phase.sin());
        if y < 0.0 || y >= size as f64 {
            continue;
        }
        let y = y as usize;
        pattern.set(y, col, true);
        if y > 0 {
            pattern.set(y - 1, col, true);
        }
        if y + 1 < size {
            pattern.set(y + 1, col, true);
        }
    }
    pattern
}

/// Fixed 8×8 heart, cropped or padded to `size`.
pub fn heart(size: usize) -> Pattern {
    from_fn(size, |row, col| {
        HEART
            .get(row)
            .and_then(|cells| cells.get(col))
            .is_some_and(|&cell| cell == 1)
    })
}

/// Cross-fade between two patterns: shared cells stay on, cells only in
/// `from` stay on while `progress < 0.5`, cells only in `to` turn on once
/// `progress > 0.5`. The result has `from`'s size.
pub fn morph(from: &Pattern, to: &Pattern, progress: f64) -> Pattern {
    from_fn(from.size(), |row, col| {
        let a = from.get(row, col).unwrap_or(false);
        let b = to.get(row, col).unwrap_or(false);
        match (a, b) {
            (true, true) => true,
            (true, false) => progress < 0.5,
            (false, true) => progress > 0.5,
            (false, false) => false,
        }
    })
}

/// Quarter turn.
pub fn rotate(pattern: &Pattern, clockwise: bool) -> Pattern {
    let size = pattern.size();
    from_fn(size, |row, col| {
        let (src_row, src_col) = if clockwise {
            (size - 1 - col, row)
        } else {
            (col, size - 1 - row)
        };
        pattern.get(src_row, src_col).unwrap_or(false)
    })
}

/// Mirror left-right (`horizontal`) or top-bottom.
pub fn flip(pattern: &Pattern, horizontal: bool) -> Pattern {
    let size = pattern.size();
    from_fn(size, |row, col| {
        let (src_row, src_col) = if horizontal {
            (row, size - 1 - col)
        } else {
            (size - 1 - row, col)
        };
        pattern.get(src_row, src_col).unwrap_or(false)
    })
}

/// Nearest-neighbour zoom about the centre. `factor > 1` magnifies.
pub fn scale(pattern: &Pattern, factor: f64) -> Pattern {
    let size = pattern.size();
    let center = (size / 2) as f64;
    from_fn(size, |row, col| {
        let src_row = round_half_up(center + (row as f64 - center) / factor);
        let src_col = round_half_up(center + (col as f64 - center) / factor);
        if src_row < 0.0 || src_col < 0.0 {
            return false;
        }
        pattern.get(src_row as usize, src_col as usize).unwrap_or(false)
    })
}

/// Direction for [`shift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Moves every cell one step. With `wrap`, the edge that falls off re-enters
/// on the opposite side; otherwise the vacated edge is cleared.
pub fn shift(pattern: &Pattern, direction: ShiftDirection, wrap: bool) -> Pattern {
    let size = pattern.size();
    if size == 0 {
        return pattern.clone();
    }
    from_fn(size, |row, col| {
        let (src_row, src_col) = match direction {
            ShiftDirection::Up => (row as isize + 1, col as isize),
            ShiftDirection::Down => (row as isize - 1, col as isize),
            ShiftDirection::Left => (row as isize, col as isize + 1),
            ShiftDirection::Right => (row as isize, col as isize - 1),
        };
        let n = size as isize;
        let in_range = (0..n).contains(&src_row) && (0..n).contains(&src_col);
        if !in_range && !wrap {
            return false;
        }
        let src_row = src_row.rem_euclid(n) as usize;
        let src_col = src_col.rem_euclid(n) as usize;
        pattern.get(src_row, src_col).unwrap_or(false)
    })
}
