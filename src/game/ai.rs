//! AI opponent - random fleet placement and random firing

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::board::{surrounding, Board, Cell, BOARD_SIZE, CELL_COUNT};
use super::error::GameError;
use super::placement::{validate_placement, FLEET};
use super::resolver::MoveResolver;
use super::session::MoveResult;

/// Full restarts of fleet generation before giving up
const MAX_FLEET_RESTARTS: usize = 16;

/// Consecutive resolver failures tolerated within one AI turn
const MAX_CONSECUTIVE_FAILURES: usize = 16;

/// One AI shot and where it landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AiShot {
    pub result: MoveResult,
    pub x: u8,
    pub y: u8,
}

/// A candidate ship position: anchor plus direction
#[derive(Debug, Clone, Copy)]
struct Spot {
    x: usize,
    y: usize,
    horizontal: bool,
}

impl Spot {
    fn cells(self, size: usize) -> impl Iterator<Item = (usize, usize)> {
        (0..size).map(move |i| {
            if self.horizontal {
                (self.x + i, self.y)
            } else {
                (self.x, self.y + i)
            }
        })
    }
}

/// Ship of `size` fits at `spot`: on the board, and neither its cells nor
/// any cell around them already holds a ship
fn can_place(board: &Board, spot: Spot, size: usize) -> bool {
    let end = if spot.horizontal { spot.x } else { spot.y } + size;
    if end > BOARD_SIZE || spot.x >= BOARD_SIZE || spot.y >= BOARD_SIZE {
        return false;
    }

    let is_ship = |(x, y): (usize, usize)| matches!(board.get(x, y), Ok(Cell::Ship));
    spot.cells(size)
        .all(|(x, y)| !is_ship((x, y)) && !surrounding(x, y).any(is_ship))
}

fn put_ship(board: &mut Board, spot: Spot, size: usize) -> Result<(), GameError> {
    for (x, y) in spot.cells(size) {
        board.set_ship(x, y)?;
    }
    Ok(())
}

/// First fitting spot in row-major order, horizontal before vertical
fn first_free_spot(board: &Board, size: usize) -> Option<Spot> {
    (0..BOARD_SIZE)
        .flat_map(|y| (0..BOARD_SIZE).map(move |x| (x, y)))
        .flat_map(|(x, y)| {
            [true, false].into_iter().map(move |horizontal| Spot { x, y, horizontal })
        })
        .find(|&spot| can_place(board, spot, size))
}

/// The computer-controlled seat
pub struct AiPlayer {
    rng: Mutex<ChaCha8Rng>,
    max_attempts: usize,
}

impl AiPlayer {
    /// `max_attempts` caps random tries per ship before the deterministic
    /// fallback kicks in
    pub fn new(seed: u64, max_attempts: usize) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            max_attempts,
        }
    }

    /// Generate a complete, validated fleet
    pub fn place_fleet(&self) -> Result<Board, GameError> {
        self.place_fleet_onto(Board::empty())
    }

    /// Generate a fleet on `board`, which must be empty
    pub fn place_fleet_onto(&self, board: Board) -> Result<Board, GameError> {
        if !board.is_empty() {
            return Err(GameError::BoardNotEmpty);
        }

        for restart in 0..MAX_FLEET_RESTARTS {
            if let Some(fleet) = self.try_place_fleet(board.clone())? {
                validate_placement(&fleet)?;
                return Ok(fleet);
            }
            debug!(restart, "Fleet generation stuck, restarting");
        }
        Err(GameError::FleetPlacementFailed)
    }

    /// One pass over the fleet: rejection sampling per ship, then first fit.
    /// `None` when some ship fits nowhere.
    fn try_place_fleet(&self, mut board: Board) -> Result<Option<Board>, GameError> {
        let mut rng = self.rng.lock();
        for size in FLEET {
            let random = (0..self.max_attempts)
                .map(|_| Spot {
                    x: rng.gen_range(0..BOARD_SIZE),
                    y: rng.gen_range(0..BOARD_SIZE),
                    horizontal: rng.gen_bool(0.5),
                })
                .find(|&spot| can_place(&board, spot, size));

            match random.or_else(|| first_free_spot(&board, size)) {
                Some(spot) => put_ship(&mut board, spot, size)?,
                None => return Ok(None),
            }
        }
        Ok(Some(board))
    }

    /// Random cell the AI has not fired at yet in this game
    fn pick_target(&self, resolver: &MoveResolver, game_id: Uuid, ai_id: Uuid) -> Option<(u8, u8)> {
        let fired = resolver
            .cache()
            .read_all(game_id)
            .iter()
            .filter(|m| m.player_id == ai_id)
            .count();
        if fired >= CELL_COUNT {
            return None;
        }

        let mut rng = self.rng.lock();
        loop {
            let x = rng.gen_range(0..BOARD_SIZE) as u8;
            let y = rng.gen_range(0..BOARD_SIZE) as u8;
            if !resolver.cache().contains_shot(game_id, ai_id, x, y) {
                return Some((x, y));
            }
        }
    }

    /// Fire until a miss or the end of the game. The AI sits in seat 2.
    /// Resolver failures are logged and the AI picks another cell.
    pub fn play_turn(&self, resolver: &MoveResolver, game_id: Uuid) -> Result<Vec<AiShot>, GameError> {
        let mut shots = Vec::new();
        let mut failures = 0;

        loop {
            let game = resolver.load_game(game_id)?;
            if game.is_finished() {
                break;
            }
            let ai_id = game.player2.ok_or(GameError::GameNotStarted(game_id))?;

            let Some((x, y)) = self.pick_target(resolver, game_id, ai_id) else {
                warn!(game_id = %game_id, "AI has no cell left to fire at");
                break;
            };

            match resolver.resolve_move(game_id, ai_id, x as i32, y as i32) {
                Ok(result) => {
                    failures = 0;
                    shots.push(AiShot { result, x, y });
                    if !result.keeps_turn() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(game_id = %game_id, x, y, error = %e, "AI move rejected, picking another cell");
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        break;
                    }
                }
            }
        }

        info!(game_id = %game_id, shots = shots.len(), "AI turn over");
        Ok(shots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::resolver::tests::Fixture;
    use crate::game::{GameStatus, GameType};
    use proptest::prelude::*;

    #[test]
    fn fleet_is_valid() {
        let ai = AiPlayer::new(7, 200);
        let board = ai.place_fleet().unwrap();
        validate_placement(&board).unwrap();
        assert_eq!(board.count(Cell::Ship), FLEET.iter().sum::<usize>());
    }

    #[test]
    fn deterministic_fallback_alone_produces_a_fleet() {
        let ai = AiPlayer::new(0, 0);
        let board = ai.place_fleet().unwrap();
        validate_placement(&board).unwrap();
        // first fit puts the 4-deck in the top-left corner
        assert_eq!(&board.encode()[..5], "11110");
    }

    #[test]
    fn non_empty_board_fails_closed() {
        let ai = AiPlayer::new(1, 200);
        let mut board = Board::empty();
        board.set_ship(0, 0).unwrap();
        assert!(matches!(
            ai.place_fleet_onto(board),
            Err(GameError::BoardNotEmpty)
        ));
    }

    #[test]
    fn can_place_respects_edges_and_spacing() {
        let mut board = Board::empty();
        board.set_ship(5, 5).unwrap();
        let at = |x, y, horizontal| Spot { x, y, horizontal };

        assert!(!can_place(&board, at(7, 0, true), 4));
        assert!(can_place(&board, at(6, 0, true), 4));
        assert!(!can_place(&board, at(0, 7, false), 4));
        assert!(!can_place(&board, at(6, 6, true), 1));
        assert!(!can_place(&board, at(3, 4, true), 2));
        assert!(can_place(&board, at(7, 5, true), 2));
    }

    #[test]
    fn turn_ends_on_miss_or_victory() {
        let fx = Fixture::new();
        let ai = AiPlayer::new(42, 200);
        // seat 2 is the AI; the human has a single ship left at (5, 5)
        let game_id = fx.game(GameType::PvE, &[(5, 5)], &[(0, 0)]);

        for _ in 0..CELL_COUNT {
            let shots = ai.play_turn(&fx.resolver, game_id).unwrap();
            assert!(!shots.is_empty());
            let (last, rest) = shots.split_last().unwrap();
            assert!(rest.iter().all(|s| s.result.keeps_turn()));

            let game = fx.resolver.load_game(game_id).unwrap();
            if game.is_finished() {
                assert_eq!(*last, AiShot { result: MoveResult::Sunk, x: 5, y: 5 });
                assert_eq!(game.winner, Some(fx.p2));
                return;
            }
            assert_eq!(last.result, MoveResult::Miss);
        }
        panic!("AI never found the last ship");
    }

    #[test]
    fn hits_keep_the_ai_firing() {
        let fx = Fixture::new();
        let ai = AiPlayer::new(3, 200);
        let human_fleet: Vec<(usize, usize)> = (0..BOARD_SIZE)
            .flat_map(|y| (0..BOARD_SIZE).map(move |x| (x, y)))
            .filter(|&(x, y)| (x, y) != (9, 9))
            .collect();
        let game_id = fx.game(GameType::PvE, &human_fleet, &[(0, 0)]);

        // only one water cell: the AI sweeps the board in a single turn
        let shots = ai.play_turn(&fx.resolver, game_id).unwrap();
        let game = fx.resolver.load_game(game_id).unwrap();
        match shots.last().unwrap().result {
            MoveResult::Miss => {
                assert_eq!(game.status, GameStatus::InProgress);
                assert!(shots[..shots.len() - 1].iter().all(|s| s.result.keeps_turn()));
            }
            MoveResult::Sunk => {
                assert_eq!(game.status, GameStatus::Finished);
                assert_eq!(shots.len(), CELL_COUNT - 1);
            }
            other => panic!("turn ended on {:?}", other),
        }
    }

    #[test]
    fn finished_game_yields_no_shots() {
        let fx = Fixture::new();
        let ai = AiPlayer::new(5, 200);
        let game_id = fx.game(GameType::PvE, &[(5, 5)], &[(0, 0)]);
        fx.resolver.resolve_move(game_id, fx.p1, 0, 0).unwrap();

        assert!(ai.play_turn(&fx.resolver, game_id).unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn generated_fleets_are_always_valid(seed in any::<u64>()) {
            let board = AiPlayer::new(seed, 200).place_fleet().unwrap();
            prop_assert!(validate_placement(&board).is_ok());

            let ships = board.ship_components();
            prop_assert_eq!(ships.len(), FLEET.len());
            let mut sizes: Vec<usize> = ships.iter().map(Vec::len).collect();
            sizes.sort_unstable_by(|a, b| b.cmp(a));
            prop_assert_eq!(sizes, FLEET.to_vec());

            // no two ships 8-adjacent
            for (i, a) in ships.iter().enumerate() {
                for b in ships.iter().skip(i + 1) {
                    for &(ax, ay) in a {
                        for &(bx, by) in b {
                            prop_assert!(ax.abs_diff(bx) > 1 || ay.abs_diff(by) > 1);
                        }
                    }
                }
            }
        }
    }
}
