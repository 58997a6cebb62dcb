//! Fleet placement validation

use std::collections::{BTreeMap, HashMap};

use super::board::{surrounding, Board, Coord};
use super::error::GameError;

/// Ship sizes of a complete fleet, largest first
pub const FLEET: [usize; 10] = [4, 3, 3, 2, 2, 2, 1, 1, 1, 1];

/// Required number of ships per size
fn required_counts() -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for size in FLEET {
        *counts.entry(size).or_insert(0) += 1;
    }
    counts
}

/// Check a submitted layout: exactly the ships of `FLEET`, each a straight
/// 4-connected run, none touching another (diagonals included).
pub fn validate_placement(board: &Board) -> Result<(), GameError> {
    let ships = board.ship_components();
    check_composition(&ships)?;
    check_spacing(&ships)
}

fn check_composition(ships: &[Vec<Coord>]) -> Result<(), GameError> {
    if ships.len() != FLEET.len() {
        return Err(GameError::Composition(format!(
            "expected {} ships, found {}",
            FLEET.len(),
            ships.len()
        )));
    }

    if let Some(ship) = ships.iter().find(|ship| !is_straight(ship)) {
        let (x, y) = ship[0];
        return Err(GameError::Composition(format!(
            "ship at ({}, {}) is not a straight line",
            x, y
        )));
    }

    let mut found = BTreeMap::new();
    for ship in ships {
        *found.entry(ship.len()).or_insert(0usize) += 1;
    }
    if found != required_counts() {
        let summary: Vec<String> = found
            .iter()
            .rev()
            .map(|(size, count)| format!("{}x size {}", count, size))
            .collect();
        return Err(GameError::Composition(format!(
            "expected one size 4, two size 3, three size 2 and four size 1 ships, found {}",
            summary.join(", ")
        )));
    }

    Ok(())
}

fn is_straight(ship: &[Coord]) -> bool {
    ship.iter().all(|&(x, _)| x == ship[0].0) || ship.iter().all(|&(_, y)| y == ship[0].1)
}

fn check_spacing(ships: &[Vec<Coord>]) -> Result<(), GameError> {
    let owner: HashMap<Coord, usize> = ships
        .iter()
        .enumerate()
        .flat_map(|(id, ship)| ship.iter().map(move |&cell| (cell, id)))
        .collect();

    for (id, ship) in ships.iter().enumerate() {
        for &(x, y) in ship {
            let touches_other = surrounding(x, y)
                .any(|n| owner.get(&n).is_some_and(|&other| other != id));
            if touches_other {
                return Err(GameError::Spacing {
                    x: x as u8,
                    y: y as u8,
                });
            }
        }
    }
    Ok(())
}
