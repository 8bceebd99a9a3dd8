use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub mod protocol;

pub use protocol::{CommandFrame, CommandType, GameEvent, GameEventType, PING, PONG};

pub const BOARD_SIZE: i32 = 10;
pub const FLEET_SHIP_LENGTHS: [usize; 5] = [5, 4, 3, 3, 2];
pub const MIN_SHIP_LENGTH: usize = 2;
pub const MAX_SHIP_LENGTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: u8,
    pub column: u8,
}

impl Coordinate {
    /// Returns `None` when the cell lies outside the 10x10 board.
    pub fn new(row: i32, column: i32) -> Option<Self> {
        if (0..BOARD_SIZE).contains(&row) && (0..BOARD_SIZE).contains(&column) {
            Some(Self {
                row: row as u8,
                column: column as u8,
            })
        } else {
            None
        }
    }

    pub fn offset(&self, d_row: i32, d_column: i32) -> Option<Self> {
        Self::new(self.row as i32 + d_row, self.column as i32 + d_column)
    }

    pub fn is_on_board(&self) -> bool {
        (self.row as i32) < BOARD_SIZE && (self.column as i32) < BOARD_SIZE
    }

    /// Every cell of the board in row-major order.
    pub fn all() -> impl Iterator<Item = Coordinate> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).filter_map(move |column| Self::new(row, column)))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strike {
    pub coordinate: Coordinate,
    pub hit: bool,
}

impl Strike {
    pub fn new(coordinate: Coordinate, hit: bool) -> Self {
        Self { coordinate, hit }
    }
}

/// Ship as described on the wire: a start cell, an orientation and a length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipPlacement {
    pub id: String,
    pub is_horizontal: bool,
    pub length: i32,
    pub row: i32,
    pub col: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    pub id: String,
    pub coordinates: Vec<Coordinate>,
}

impl Ship {
    pub fn new(id: impl Into<String>, coordinates: Vec<Coordinate>) -> Self {
        Self {
            id: id.into(),
            coordinates,
        }
    }

    /// Builds the ship a placement describes. Horizontal ships run along the
    /// row (column increases), vertical ships along the column.
    pub fn from_placement(placement: &ShipPlacement) -> Result<Self, FleetError> {
        if placement.length < MIN_SHIP_LENGTH as i32 || placement.length > MAX_SHIP_LENGTH as i32 {
            return Err(FleetError::MalformedShip(placement.id.clone()));
        }

        let coordinates = (0..placement.length)
            .map(|i| {
                if placement.is_horizontal {
                    Coordinate::new(placement.row, placement.col + i)
                } else {
                    Coordinate::new(placement.row + i, placement.col)
                }
                .ok_or_else(|| FleetError::OutOfBounds(placement.id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(placement.id.clone(), coordinates))
    }

    pub fn to_placement(&self) -> ShipPlacement {
        let start = self.coordinates.iter().min().copied().unwrap_or(Coordinate { row: 0, column: 0 });
        let is_horizontal = self.coordinates.iter().all(|c| c.row == start.row);

        ShipPlacement {
            id: self.id.clone(),
            is_horizontal,
            length: self.coordinates.len() as i32,
            row: start.row as i32,
            col: start.column as i32,
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn occupies(&self, coordinate: Coordinate) -> bool {
        self.coordinates.contains(&coordinate)
    }

    /// True when every cell of the ship appears in `strikes`.
    pub fn is_sunk_by(&self, strikes: &[Strike]) -> bool {
        self.coordinates
            .iter()
            .all(|c| is_position_struck(*c, strikes))
    }

    /// Cells form one unbroken horizontal or vertical line.
    pub fn is_straight_line(&self) -> bool {
        let mut cells = self.coordinates.clone();
        cells.sort();
        cells.dedup();
        if cells.len() != self.coordinates.len() || cells.is_empty() {
            return false;
        }

        let same_row = cells.iter().all(|c| c.row == cells[0].row);
        let same_column = cells.iter().all(|c| c.column == cells[0].column);

        cells.windows(2).all(|pair| {
            if same_row {
                pair[1].column == pair[0].column + 1
            } else if same_column {
                pair[1].row == pair[0].row + 1
            } else {
                false
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("fleet must contain 5 ships, got {0}")]
    WrongShipCount(usize),
    #[error("fleet must contain ships of lengths 5, 4, 3, 3 and 2")]
    WrongComposition,
    #[error("ship {0} is not a straight line of 2 to 5 cells")]
    MalformedShip(String),
    #[error("ship {0} extends past the board")]
    OutOfBounds(String),
    #[error("ships overlap at {0}")]
    Overlapping(Coordinate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StrikeError {
    #[error("position {0} has already been struck")]
    AlreadyStruck(Coordinate),
}

/// Result of a single legal strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrikeOutcome {
    pub hit: bool,
    pub sunk: bool,
}

/// Checks the classic fleet invariants: five ships with lengths {5, 4, 3, 3, 2},
/// straight, on the board and not sharing any cell.
pub fn validate_fleet(ships: &[Ship]) -> Result<(), FleetError> {
    if ships.len() != FLEET_SHIP_LENGTHS.len() {
        return Err(FleetError::WrongShipCount(ships.len()));
    }

    let mut lengths: Vec<usize> = ships.iter().map(Ship::len).collect();
    lengths.sort_unstable();
    let mut expected = FLEET_SHIP_LENGTHS.to_vec();
    expected.sort_unstable();
    if lengths != expected {
        return Err(FleetError::WrongComposition);
    }

    let mut occupied = HashSet::new();
    for ship in ships {
        if ship.coordinates.iter().any(|c| !c.is_on_board()) {
            return Err(FleetError::OutOfBounds(ship.id.clone()));
        }
        if !ship.is_straight_line() {
            return Err(FleetError::MalformedShip(ship.id.clone()));
        }
        for coordinate in &ship.coordinates {
            if !occupied.insert(*coordinate) {
                return Err(FleetError::Overlapping(*coordinate));
            }
        }
    }

    Ok(())
}

/// Converts wire placements to ships and validates the resulting fleet.
pub fn fleet_from_placements(placements: &[ShipPlacement]) -> Result<Vec<Ship>, FleetError> {
    let ships = placements
        .iter()
        .map(Ship::from_placement)
        .collect::<Result<Vec<_>, _>>()?;
    validate_fleet(&ships)?;
    Ok(ships)
}

pub fn to_placements(ships: &[Ship]) -> Vec<ShipPlacement> {
    ships.iter().map(Ship::to_placement).collect()
}

pub fn is_position_struck(coordinate: Coordinate, strikes: &[Strike]) -> bool {
    strikes.iter().any(|s| s.coordinate == coordinate)
}

pub fn all_ships_sunk(active_ships: &[Ship]) -> bool {
    active_ships.is_empty()
}

/// Records a strike against the opponent's fleet.
///
/// The strike is appended to `own_strikes`. When it completes a ship, that ship
/// moves from `opponent_active` to `opponent_sunken`. Only the ship owning the
/// struck cell is inspected; ships never share cells so there is at most one.
pub fn resolve_strike(
    target: Coordinate,
    own_strikes: &mut Vec<Strike>,
    opponent_active: &mut Vec<Ship>,
    opponent_sunken: &mut Vec<Ship>,
) -> Result<StrikeOutcome, StrikeError> {
    if is_position_struck(target, own_strikes) {
        return Err(StrikeError::AlreadyStruck(target));
    }

    let owner = opponent_active.iter().position(|ship| ship.occupies(target));
    own_strikes.push(Strike::new(target, owner.is_some()));

    let Some(index) = owner else {
        return Ok(StrikeOutcome::default());
    };

    let sunk = opponent_active[index].is_sunk_by(own_strikes);
    if sunk {
        let ship = opponent_active.remove(index);
        opponent_sunken.push(ship);
    }

    Ok(StrikeOutcome { hit: true, sunk })
}
