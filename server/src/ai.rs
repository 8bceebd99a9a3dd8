//! Targeting engine for the computer opponent.
//!
//! Every function here is pure apart from the random source passed in. The
//! engine never sees the session itself, only views of the strikes it has made
//! and the opposing fleet's sunken and active ships.
//!
//! Move selection has two modes:
//! - **Hunt** while some hit is unresolved (not part of a sunken ship). Aligned
//!   hits are extended past either end of their line; a lone hit is followed
//!   into the neighbouring direction with the most open water ahead.
//! - **Heatmap** otherwise. Each remaining ship length is slid over every
//!   horizontal and vertical placement that avoids struck cells, and every cell
//!   of such a placement scores the ship's length. The best unstruck cell wins.

use rand::seq::SliceRandom;
use rand::Rng;
use shared::{validate_fleet, Coordinate, Ship, Strike, BOARD_SIZE, FLEET_SHIP_LENGTHS};

const GRID: usize = BOARD_SIZE as usize;
const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

const MAX_SHIP_ATTEMPTS: usize = 100;
const MAX_FLEET_ATTEMPTS: usize = 1_000;

pub type Heatmap = [[u32; GRID]; GRID];

struct StrikeGrid {
    struck: [[bool; GRID]; GRID],
}

impl StrikeGrid {
    fn new(strikes: &[Strike]) -> Self {
        let mut struck = [[false; GRID]; GRID];
        for strike in strikes {
            if strike.coordinate.is_on_board() {
                struck[strike.coordinate.row as usize][strike.coordinate.column as usize] = true;
            }
        }
        Self { struck }
    }

    fn is_struck(&self, coordinate: Coordinate) -> bool {
        self.struck[coordinate.row as usize][coordinate.column as usize]
    }

    fn is_open(&self, coordinate: Option<Coordinate>) -> bool {
        coordinate.is_some_and(|c| !self.is_struck(c))
    }

    fn open_cells(&self) -> Vec<Coordinate> {
        Coordinate::all().filter(|c| !self.is_struck(*c)).collect()
    }

    /// Counts unstruck cells from `start` onwards in one direction.
    fn free_run(&self, start: Coordinate, (d_row, d_column): (i32, i32)) -> usize {
        let mut count = 0;
        let mut cursor = Some(start);
        while let Some(cell) = cursor.filter(|c| !self.is_struck(*c)) {
            count += 1;
            cursor = cell.offset(d_row, d_column);
        }
        count
    }
}

/// Picks the computer's next target. Returns `None` only when every cell of
/// the board has already been struck.
pub fn next_strike(
    rng: &mut impl Rng,
    strikes: &[Strike],
    opponent_sunken: &[Ship],
    opponent_active: &[Ship],
) -> Option<Coordinate> {
    let grid = StrikeGrid::new(strikes);
    let hits = unresolved_hits(strikes, opponent_sunken);

    if let Some(target) = hunt_target(rng, &grid, &hits) {
        return Some(target);
    }

    let mut lengths: Vec<usize> = opponent_active.iter().map(Ship::len).collect();
    if lengths.is_empty() {
        lengths = FLEET_SHIP_LENGTHS.to_vec();
    }
    heatmap_target(rng, &grid, &lengths).or_else(|| grid.open_cells().choose(rng).copied())
}

/// Hits that do not belong to an already sunken ship.
pub fn unresolved_hits(strikes: &[Strike], opponent_sunken: &[Ship]) -> Vec<Coordinate> {
    strikes
        .iter()
        .filter(|s| s.hit)
        .map(|s| s.coordinate)
        .filter(|c| !opponent_sunken.iter().any(|ship| ship.occupies(*c)))
        .collect()
}

fn hunt_target(rng: &mut impl Rng, grid: &StrikeGrid, hits: &[Coordinate]) -> Option<Coordinate> {
    if hits.len() >= 2 {
        if let Some(target) = extend_line(rng, grid, hits) {
            return Some(target);
        }
    }

    for hit in hits {
        let scored: Vec<(Coordinate, usize)> = DIRECTIONS
            .iter()
            .filter_map(|&direction| {
                let neighbour = hit.offset(direction.0, direction.1)?;
                if grid.is_struck(neighbour) {
                    return None;
                }
                Some((neighbour, grid.free_run(neighbour, direction)))
            })
            .collect();

        let Some(best) = scored.iter().map(|(_, space)| *space).max() else {
            continue;
        };
        let candidates: Vec<Coordinate> = scored
            .iter()
            .filter(|(_, space)| *space == best)
            .map(|(cell, _)| *cell)
            .collect();
        if let Some(target) = candidates.choose(rng) {
            return Some(*target);
        }
    }

    None
}

/// Finds two orthogonally adjacent hits, walks the run of hits they belong to
/// and returns an open cell just past one of its ends.
fn extend_line(rng: &mut impl Rng, grid: &StrikeGrid, hits: &[Coordinate]) -> Option<Coordinate> {
    for (i, first) in hits.iter().enumerate() {
        for second in &hits[i + 1..] {
            let axis = match (
                first.row as i32 - second.row as i32,
                first.column as i32 - second.column as i32,
            ) {
                (0, 1) | (0, -1) => (0, 1),
                (1, 0) | (-1, 0) => (1, 0),
                _ => continue,
            };

            let end = walk_hits(*first, axis, hits);
            let start = walk_hits(*first, (-axis.0, -axis.1), hits);

            let candidates: Vec<Coordinate> = [end.offset(axis.0, axis.1), start.offset(-axis.0, -axis.1)]
                .into_iter()
                .filter(|c| grid.is_open(*c))
                .flatten()
                .collect();

            if let Some(target) = candidates.choose(rng) {
                return Some(*target);
            }
        }
    }
    None
}

fn walk_hits(from: Coordinate, (d_row, d_column): (i32, i32), hits: &[Coordinate]) -> Coordinate {
    let mut last = from;
    while let Some(next) = last.offset(d_row, d_column).filter(|c| hits.contains(c)) {
        last = next;
    }
    last
}

/// Scores every cell by how many placements of the remaining ships could cover it.
pub fn build_heatmap(strikes: &[Strike], remaining_lengths: &[usize]) -> Heatmap {
    heatmap_for(&StrikeGrid::new(strikes), remaining_lengths)
}

fn heatmap_for(grid: &StrikeGrid, remaining_lengths: &[usize]) -> Heatmap {
    let mut heatmap = [[0u32; GRID]; GRID];

    for &length in remaining_lengths {
        for (d_row, d_column) in [(0, 1), (1, 0)] {
            for start in Coordinate::all() {
                let cells: Option<Vec<Coordinate>> = (0..length as i32)
                    .map(|i| start.offset(d_row * i, d_column * i))
                    .collect();
                let Some(cells) = cells else { continue };
                if cells.iter().any(|c| grid.is_struck(*c)) {
                    continue;
                }
                for cell in cells {
                    heatmap[cell.row as usize][cell.column as usize] += length as u32;
                }
            }
        }
    }

    heatmap
}

fn heatmap_target(rng: &mut impl Rng, grid: &StrikeGrid, remaining_lengths: &[usize]) -> Option<Coordinate> {
    let heatmap = heatmap_for(grid, remaining_lengths);

    let score = |c: &Coordinate| heatmap[c.row as usize][c.column as usize];
    let open = grid.open_cells();
    let best = open.iter().map(score).max().filter(|best| *best > 0)?;

    let candidates: Vec<Coordinate> = open.into_iter().filter(|c| score(c) == best).collect();
    candidates.choose(rng).copied()
}

/// Generates a random legal fleet with ship ids "0" to "4".
///
/// Each ship gets a bounded number of random placements; if one cannot be
/// placed, or the finished fleet fails validation, the whole fleet is redrawn.
pub fn generate_fleet(rng: &mut impl Rng) -> Vec<Ship> {
    for _ in 0..MAX_FLEET_ATTEMPTS {
        if let Some(ships) = try_place_fleet(rng) {
            if validate_fleet(&ships).is_ok() {
                return ships;
            }
        }
    }
    fallback_fleet()
}

fn try_place_fleet(rng: &mut impl Rng) -> Option<Vec<Ship>> {
    let mut ships: Vec<Ship> = Vec::with_capacity(FLEET_SHIP_LENGTHS.len());

    for (index, &length) in FLEET_SHIP_LENGTHS.iter().enumerate() {
        let ship = (0..MAX_SHIP_ATTEMPTS)
            .map(|_| random_ship(rng, index, length))
            .find(|candidate| {
                !ships
                    .iter()
                    .any(|placed| candidate.coordinates.iter().any(|c| placed.occupies(*c)))
            })?;
        ships.push(ship);
    }

    Some(ships)
}

fn random_ship(rng: &mut impl Rng, index: usize, length: usize) -> Ship {
    let horizontal = rng.gen_bool(0.5);
    let span = BOARD_SIZE - length as i32 + 1;
    let (row, column) = if horizontal {
        (rng.gen_range(0..BOARD_SIZE), rng.gen_range(0..span))
    } else {
        (rng.gen_range(0..span), rng.gen_range(0..BOARD_SIZE))
    };

    let coordinates = (0..length as i32)
        .filter_map(|i| {
            if horizontal {
                Coordinate::new(row, column + i)
            } else {
                Coordinate::new(row + i, column)
            }
        })
        .collect();

    Ship::new(index.to_string(), coordinates)
}

fn fallback_fleet() -> Vec<Ship> {
    FLEET_SHIP_LENGTHS
        .iter()
        .enumerate()
        .map(|(index, &length)| {
            let coordinates = (0..length as i32)
                .filter_map(|column| Coordinate::new(index as i32 * 2, column))
                .collect();
            Ship::new(index.to_string(), coordinates)
        })
        .collect()
}
