//! Board model - 10x10 cell grid, ship discovery, sunk and victory checks

use std::fmt;

use super::error::GameError;

/// Board edge length
pub const BOARD_SIZE: usize = 10;

/// Total number of cells
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// Board coordinate as (x, y), x being the column
pub type Coord = (usize, usize);

/// State of a single cell. Misses are not tracked here, they live in the move log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Ship,
    /// A ship cell that has been struck
    Hit,
}

impl Cell {
    fn is_ship_part(self) -> bool {
        matches!(self, Cell::Ship | Cell::Hit)
    }

    fn to_char(self) -> char {
        match self {
            Cell::Empty => '0',
            Cell::Ship => '1',
            Cell::Hit => '2',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Cell::Empty),
            '1' => Some(Cell::Ship),
            '2' => Some(Cell::Hit),
            _ => None,
        }
    }
}

/// One player's grid, row-major
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

fn index(x: usize, y: usize) -> usize {
    y * BOARD_SIZE + x
}

fn coord(idx: usize) -> Coord {
    (idx % BOARD_SIZE, idx / BOARD_SIZE)
}

/// Whether (x, y) lies on the board
pub fn in_bounds(x: i32, y: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&x) && (0..BOARD_SIZE as i32).contains(&y)
}

/// 4-connected neighbours of a cell index that lie on the board
fn orthogonal_neighbours(idx: usize) -> impl Iterator<Item = usize> {
    let (x, y) = coord(idx);
    let (x, y) = (x as i32, y as i32);
    [(1, 0), (-1, 0), (0, 1), (0, -1)]
        .into_iter()
        .map(move |(dx, dy)| (x + dx, y + dy))
        .filter(|&(nx, ny)| in_bounds(nx, ny))
        .map(|(nx, ny)| index(nx as usize, ny as usize))
}

/// All 8 neighbours of a cell that lie on the board
pub(crate) fn surrounding(x: usize, y: usize) -> impl Iterator<Item = Coord> {
    let (x, y) = (x as i32, y as i32);
    (-1..=1)
        .flat_map(move |dy| (-1..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .map(move |(dx, dy)| (x + dx, y + dy))
        .filter(|&(nx, ny)| in_bounds(nx, ny))
        .map(|(nx, ny)| (nx as usize, ny as usize))
}

impl Board {
    /// An all-empty board
    pub fn empty() -> Self {
        Self {
            cells: [Cell::Empty; CELL_COUNT],
        }
    }

    fn check(x: usize, y: usize) -> Result<usize, GameError> {
        if x >= BOARD_SIZE || y >= BOARD_SIZE {
            return Err(GameError::OutOfRange {
                x: x as i32,
                y: y as i32,
            });
        }
        Ok(index(x, y))
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Cell, GameError> {
        Ok(self.cells[Self::check(x, y)?])
    }

    /// Put an unhit ship segment on (x, y)
    pub fn set_ship(&mut self, x: usize, y: usize) -> Result<(), GameError> {
        let idx = Self::check(x, y)?;
        self.cells[idx] = Cell::Ship;
        Ok(())
    }

    /// Transition a `Ship` cell to `Hit`. Any other cell is left as is.
    /// Returns whether the cell changed.
    pub fn mark_hit(&mut self, x: usize, y: usize) -> Result<bool, GameError> {
        let idx = Self::check(x, y)?;
        if self.cells[idx] == Cell::Ship {
            self.cells[idx] = Cell::Hit;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn is_empty(&self) -> bool {
        self.count(Cell::Empty) == CELL_COUNT
    }

    /// Number of cells in the given state
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }

    /// Iterative flood fill from `start` over 4-connected cells accepted by
    /// `accept`. Cells already marked in `visited` are skipped; every cell
    /// returned is marked.
    fn flood(
        &self,
        start: usize,
        visited: &mut [bool; CELL_COUNT],
        accept: impl Fn(Cell) -> bool,
    ) -> Vec<Coord> {
        let mut component = Vec::new();
        if visited[start] || !accept(self.cells[start]) {
            return component;
        }

        let mut stack = vec![start];
        visited[start] = true;
        while let Some(idx) = stack.pop() {
            component.push(coord(idx));
            for next in orthogonal_neighbours(idx) {
                if !visited[next] && accept(self.cells[next]) {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
        component
    }

    /// Cells of the ship containing (x, y), hit or not. Empty when (x, y)
    /// holds no ship.
    pub fn ship_cells_connected_to(&self, x: usize, y: usize) -> Result<Vec<Coord>, GameError> {
        let start = Self::check(x, y)?;
        let mut visited = [false; CELL_COUNT];
        Ok(self.flood(start, &mut visited, Cell::is_ship_part))
    }

    /// True iff (x, y) belongs to a ship whose every cell is hit
    pub fn is_sunk(&self, x: usize, y: usize) -> Result<bool, GameError> {
        let cells = self.ship_cells_connected_to(x, y)?;
        Ok(!cells.is_empty()
            && cells
                .iter()
                .all(|&(cx, cy)| self.cells[index(cx, cy)] == Cell::Hit))
    }

    /// True iff no unhit ship cell remains
    pub fn all_ships_sunk(&self) -> bool {
        !self.cells.contains(&Cell::Ship)
    }

    /// Every maximal 4-connected run of not yet hit ship cells, in row-major
    /// order of their first cell
    pub fn ship_components(&self) -> Vec<Vec<Coord>> {
        let mut visited = [false; CELL_COUNT];
        (0..CELL_COUNT)
            .filter_map(|idx| {
                let component = self.flood(idx, &mut visited, |c| c == Cell::Ship);
                (!component.is_empty()).then_some(component)
            })
            .collect()
    }

    /// Storage form: 100 characters over {0, 1, 2}, row-major
    pub fn encode(&self) -> String {
        self.cells.iter().map(|c| c.to_char()).collect()
    }

    pub fn decode(encoded: &str) -> Result<Self, GameError> {
        let chars: Vec<char> = encoded.chars().collect();
        if chars.len() != CELL_COUNT {
            return Err(GameError::MalformedBoard(format!(
                "expected {} cells, got {}",
                CELL_COUNT,
                chars.len()
            )));
        }

        let mut board = Self::empty();
        for (idx, c) in chars.into_iter().enumerate() {
            board.cells[idx] = Cell::from_char(c)
                .ok_or_else(|| GameError::MalformedBoard(format!("unknown cell symbol '{}'", c)))?;
        }
        Ok(board)
    }

    /// Build a board from a submitted layout: 10 rows of 10 values, 1 for a
    /// ship segment and 0 for water
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, GameError> {
        if rows.len() != BOARD_SIZE || rows.iter().any(|row| row.len() != BOARD_SIZE) {
            return Err(GameError::MalformedBoard(format!(
                "layout must be {0}x{0}",
                BOARD_SIZE
            )));
        }

        let mut board = Self::empty();
        for (y, row) in rows.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                match value {
                    0 => {}
                    1 => board.set_ship(x, y)?,
                    other => {
                        return Err(GameError::MalformedBoard(format!(
                            "unexpected value {} at ({}, {})",
                            other, x, y
                        )))
                    }
                }
            }
        }
        Ok(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{")?;
        for row in self.cells.chunks(BOARD_SIZE) {
            let line: String = row.iter().map(|c| c.to_char()).collect();
            writeln!(f, "  {}", line)?;
        }
        write!(f, "}}")
    }
}
