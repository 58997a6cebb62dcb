//! Game orchestration - create, join, place ships, play

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ai::{AiPlayer, AiShot};
use super::board::Board;
use super::cache::MoveCache;
use super::error::GameError;
use super::locks::GameLocks;
use super::placement::validate_placement;
use super::resolver::MoveResolver;
use super::session::{GameSession, GameStatus, GameType, Move, MoveResult};
use crate::store::{GameStore, PlayerStore};

/// A human shot as submitted by a client
#[derive(Debug, Clone, Copy)]
pub struct MoveRequest {
    pub player_id: Uuid,
    pub x: i32,
    pub y: i32,
}

/// Everything that happened while processing one human shot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    pub player_result: MoveResult,
    pub x: u8,
    pub y: u8,
    /// The human fires again
    pub is_current_player: bool,
    pub ai_moves: Vec<AiShot>,
    pub status: GameStatus,
    pub winner: Option<Uuid>,
}

/// Composes the engine parts per request
pub struct GameService {
    store: Arc<dyn GameStore>,
    players: PlayerStore,
    cache: Arc<MoveCache>,
    locks: Arc<GameLocks>,
    resolver: MoveResolver,
    ai: AiPlayer,
    ai_player_id: Uuid,
    /// Serialises seat changes so a player never ends up with two active games
    seating: Mutex<()>,
}

impl GameService {
    pub fn new(store: Arc<dyn GameStore>, ai: AiPlayer, ai_player_id: Uuid) -> Self {
        let cache = Arc::new(MoveCache::new(store.clone()));
        let locks = Arc::new(GameLocks::new());
        let resolver = MoveResolver::new(store.clone(), cache.clone(), locks.clone());

        Self {
            players: PlayerStore::new(store.clone()),
            store,
            cache,
            locks,
            resolver,
            ai,
            ai_player_id,
            seating: Mutex::new(()),
        }
    }

    pub fn players(&self) -> &PlayerStore {
        &self.players
    }

    #[cfg(test)]
    pub fn resolver(&self) -> &MoveResolver {
        &self.resolver
    }

    /// Games with a live move cache
    pub fn active_games(&self) -> usize {
        self.cache.active_games()
    }

    fn has_active_game(&self, player_id: Uuid) -> Result<bool, GameError> {
        Ok(self
            .store
            .games_for_player(player_id)?
            .iter()
            .any(|g| !g.is_finished()))
    }

    /// Open a game. PvE games seat the AI at once and place its fleet.
    pub fn create_game(&self, creator_id: Uuid, game_type: GameType) -> Result<GameSession, GameError> {
        self.players.get_player(creator_id)?;

        let game = {
            let _seating = self.seating.lock();
            if self.has_active_game(creator_id)? {
                return Err(GameError::ActiveGameExists(creator_id));
            }

            let mut game = GameSession::new(game_type, creator_id);
            if game_type == GameType::PvE {
                game.seat_second_player(self.ai_player_id);
            }
            self.store.save_game(&game)?;
            game
        };

        self.cache.initialize(game.id)?;

        if game_type == GameType::PvE {
            let fleet = self.ai.place_fleet()?;
            self.store.save_board(game.id, self.ai_player_id, &fleet)?;
        }

        info!(game_id = %game.id, creator = %creator_id, game_type = ?game_type, "Game created");
        Ok(game)
    }

    /// Take the second seat of a waiting game
    pub fn join_game(&self, game_id: Uuid, player_id: Uuid) -> Result<GameSession, GameError> {
        self.players.get_player(player_id)?;

        let game = {
            let _seating = self.seating.lock();
            let mut game = self.resolver.load_game(game_id)?;
            if game.player2.is_some() {
                return Err(GameError::GameFull(game_id));
            }
            if game.player1 == player_id {
                return Err(GameError::CannotJoinOwnGame);
            }
            if self.has_active_game(player_id)? {
                return Err(GameError::ActiveGameExists(player_id));
            }

            game.seat_second_player(player_id);
            self.store.save_game(&game)?;
            game
        };

        self.cache.initialize(game_id)?;

        info!(game_id = %game_id, player_id = %player_id, "Player joined game");
        Ok(game)
    }

    /// Store a player's fleet. Validated, and write-once per (game, player).
    pub fn submit_placement(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        layout: &Board,
    ) -> Result<(), GameError> {
        let lock = self.resolver.live_lock(game_id)?;
        let _guard = lock.lock();

        let game = self.resolver.load_live_game(game_id)?;
        if !game.has_player(player_id) {
            return Err(GameError::NotParticipant { game_id, player_id });
        }
        if self.store.load_board(game_id, player_id)?.is_some() {
            return Err(GameError::PlacementAlreadyExists { game_id, player_id });
        }

        validate_placement(layout)?;
        self.store.save_board(game_id, player_id, layout)?;

        info!(game_id = %game_id, player_id = %player_id, "Fleet placed");
        Ok(())
    }

    /// Resolve a human shot; in PvE a miss hands over to the AI right away
    pub fn process_move(&self, game_id: Uuid, request: MoveRequest) -> Result<MoveReport, GameError> {
        let game = self.resolver.load_game(game_id)?;
        self.players.get_player(request.player_id)?;
        if request.player_id == self.ai_player_id {
            return Err(GameError::AiMoveForbidden);
        }

        let player_result =
            self.resolver
                .resolve_move(game_id, request.player_id, request.x, request.y)?;

        let ai_moves = if game.game_type == GameType::PvE && player_result == MoveResult::Miss {
            self.ai.play_turn(&self.resolver, game_id)?
        } else {
            Vec::new()
        };

        let game = self.resolver.load_game(game_id)?;
        Ok(MoveReport {
            player_result,
            // in range, the resolver accepted them
            x: request.x as u8,
            y: request.y as u8,
            is_current_player: player_result.keeps_turn(),
            ai_moves,
            status: game.status,
            winner: game.winner,
        })
    }

    /// Write back and drop the cache and lock entries of games nobody has
    /// touched for `max_idle`. A later move reloads the log from the store.
    pub fn reclaim_idle(&self, max_idle: Duration) -> usize {
        let mut reclaimed = 0;

        for game_id in self.cache.idle_games(max_idle) {
            let lock = self.locks.get(game_id);
            let guard = lock.lock();
            if !self.cache.is_idle(game_id, max_idle) {
                continue;
            }

            match self.cache.flush(game_id) {
                Ok(written) => {
                    self.cache.invalidate(game_id);
                    debug!(game_id = %game_id, written, "Idle game evicted from cache");
                    reclaimed += 1;
                }
                Err(e) => {
                    warn!(game_id = %game_id, error = %e, "Failed to write back idle game");
                    continue;
                }
            }

            drop(guard);
            self.locks.release_unused(game_id);
        }

        if reclaimed > 0 {
            info!(reclaimed, "Reclaimed idle games");
        }
        reclaimed
    }

    pub fn get_game(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        self.resolver.load_game(game_id)
    }

    /// Every game the player took part in, oldest first
    pub fn game_history(&self, player_id: Uuid) -> Result<Vec<GameSession>, GameError> {
        self.players.get_player(player_id)?;
        Ok(self.store.games_for_player(player_id)?)
    }

    /// Persisted move log; only for finished games
    pub fn game_moves(&self, game_id: Uuid) -> Result<Vec<Move>, GameError> {
        let game = self.resolver.load_game(game_id)?;
        if !game.is_finished() {
            return Err(GameError::GameNotFinished(game_id));
        }
        Ok(self.store.load_moves(game_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::placement::tests::classic_fleet;
    use crate::store::InMemoryStore;

    struct Setup {
        service: GameService,
        alice: Uuid,
        bob: Uuid,
        ai: Uuid,
    }

    fn setup() -> Setup {
        let store: Arc<dyn GameStore> = Arc::new(InMemoryStore::new());
        let players = PlayerStore::new(store.clone());
        let ai = players.ensure_player("AI Player").unwrap().id;
        let alice = players.create_player("alice").unwrap().id;
        let bob = players.create_player("bob").unwrap().id;
        Setup {
            service: GameService::new(store, AiPlayer::new(11, 200), ai),
            alice,
            bob,
            ai,
        }
    }

    fn shot(player_id: Uuid, x: i32, y: i32) -> MoveRequest {
        MoveRequest { player_id, x, y }
    }

    #[test]
    fn pve_game_starts_with_ai_fleet() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvE).unwrap();
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.player2, Some(s.ai));

        let ai_board = s.service.store.load_board(game.id, s.ai).unwrap().unwrap();
        validate_placement(&ai_board).unwrap();
        assert_eq!(s.service.active_games(), 1);
    }

    #[test]
    fn one_active_game_per_player() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvP).unwrap();
        assert_eq!(game.status, GameStatus::WaitingForPlayer);
        assert!(matches!(
            s.service.create_game(s.alice, GameType::PvE),
            Err(GameError::ActiveGameExists(_))
        ));

        s.service.create_game(s.bob, GameType::PvE).unwrap();
        assert!(matches!(
            s.service.join_game(game.id, s.bob),
            Err(GameError::ActiveGameExists(_))
        ));
    }

    #[test]
    fn join_rules() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvP).unwrap();
        assert!(matches!(
            s.service.join_game(game.id, s.alice),
            Err(GameError::CannotJoinOwnGame)
        ));

        let joined = s.service.join_game(game.id, s.bob).unwrap();
        assert_eq!(joined.status, GameStatus::InProgress);
        assert_eq!(joined.player2, Some(s.bob));

        let carol = s.service.players().create_player("carol").unwrap().id;
        assert!(matches!(
            s.service.join_game(game.id, carol),
            Err(GameError::GameFull(_))
        ));
        assert!(matches!(
            s.service.join_game(Uuid::new_v4(), carol),
            Err(GameError::GameNotFound(_))
        ));
        assert!(matches!(
            s.service.create_game(Uuid::new_v4(), GameType::PvP),
            Err(GameError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn placement_is_validated_and_write_once() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvP).unwrap();

        let mut eleven = classic_fleet();
        eleven.set_ship(9, 9).unwrap();
        assert!(matches!(
            s.service.submit_placement(game.id, s.alice, &eleven),
            Err(GameError::Composition(_))
        ));

        s.service
            .submit_placement(game.id, s.alice, &classic_fleet())
            .unwrap();
        assert!(matches!(
            s.service.submit_placement(game.id, s.alice, &classic_fleet()),
            Err(GameError::PlacementAlreadyExists { .. })
        ));
        assert!(matches!(
            s.service.submit_placement(game.id, s.bob, &classic_fleet()),
            Err(GameError::NotParticipant { .. })
        ));
    }

    #[test]
    fn pve_miss_triggers_ai_turn() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvE).unwrap();
        s.service
            .submit_placement(game.id, s.alice, &classic_fleet())
            .unwrap();

        // fire at a water cell of the AI fleet
        let ai_board = s.service.store.load_board(game.id, s.ai).unwrap().unwrap();
        let (x, y) = (0..100)
            .map(|i| (i % 10, i / 10))
            .find(|&(x, y)| ai_board.get(x, y).unwrap() == crate::game::board::Cell::Empty)
            .unwrap();

        let report = s.service.process_move(game.id, shot(s.alice, x as i32, y as i32)).unwrap();
        assert_eq!(report.player_result, MoveResult::Miss);
        assert!(!report.is_current_player);
        assert!(!report.ai_moves.is_empty());
        let (last, rest) = report.ai_moves.split_last().unwrap();
        assert!(rest.iter().all(|m| m.result.keeps_turn()));
        assert_eq!(last.result, MoveResult::Miss);

        let cached = s.service.resolver().cache().read_all(game.id);
        assert_eq!(cached.len(), 1 + report.ai_moves.len());
    }

    #[test]
    fn pve_hit_keeps_the_human_turn() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvE).unwrap();
        s.service
            .submit_placement(game.id, s.alice, &classic_fleet())
            .unwrap();

        let ai_board = s.service.store.load_board(game.id, s.ai).unwrap().unwrap();
        let (x, y) = ai_board.ship_components()[0][0];

        let report = s.service.process_move(game.id, shot(s.alice, x as i32, y as i32)).unwrap();
        assert!(report.player_result.keeps_turn());
        assert!(report.is_current_player);
        assert!(report.ai_moves.is_empty());
    }

    #[test]
    fn moves_for_the_ai_are_forbidden() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvE).unwrap();
        assert!(matches!(
            s.service.process_move(game.id, shot(s.ai, 0, 0)),
            Err(GameError::AiMoveForbidden)
        ));
    }

    #[test]
    fn full_pvp_game_persists_moves() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvP).unwrap();
        s.service.join_game(game.id, s.bob).unwrap();
        s.service.submit_placement(game.id, s.alice, &classic_fleet()).unwrap();
        s.service.submit_placement(game.id, s.bob, &classic_fleet()).unwrap();

        assert!(matches!(
            s.service.game_moves(game.id),
            Err(GameError::GameNotFinished(_))
        ));

        // alice misses once, bob misses once, then alice sinks everything
        s.service.process_move(game.id, shot(s.alice, 9, 9)).unwrap();
        s.service.process_move(game.id, shot(s.bob, 9, 9)).unwrap();

        let targets: Vec<(usize, usize)> = classic_fleet()
            .ship_components()
            .into_iter()
            .flatten()
            .collect();
        let mut last = None;
        for (x, y) in targets {
            last = Some(s.service.process_move(game.id, shot(s.alice, x as i32, y as i32)).unwrap());
        }

        let report = last.unwrap();
        assert_eq!(report.player_result, MoveResult::Sunk);
        assert_eq!(report.status, GameStatus::Finished);
        assert_eq!(report.winner, Some(s.alice));

        let moves = s.service.game_moves(game.id).unwrap();
        assert_eq!(moves.len(), 2 + 20);
        assert_eq!(s.service.active_games(), 0);

        assert!(matches!(
            s.service.process_move(game.id, shot(s.bob, 0, 0)),
            Err(GameError::GameFinished(_))
        ));
        assert!(matches!(
            s.service.submit_placement(game.id, s.bob, &classic_fleet()),
            Err(GameError::GameFinished(_))
        ));

        // both are free to start over
        s.service.create_game(s.alice, GameType::PvP).unwrap();
        assert_eq!(s.service.game_history(s.alice).unwrap().len(), 2);
    }

    #[test]
    fn pve_human_must_place_before_firing() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvE).unwrap();

        for (x, y) in [(0, 0), (5, 5), (9, 9)] {
            assert!(matches!(
                s.service.process_move(game.id, shot(s.alice, x, y)),
                Err(GameError::BoardNotFound { player_id, .. }) if player_id == s.alice
            ));
        }
        assert!(s.service.resolver().cache().read_all(game.id).is_empty());
        assert_eq!(
            s.service.get_game(game.id).unwrap().status,
            GameStatus::InProgress
        );
    }

    #[test]
    fn placements_for_unknown_or_finished_games_take_no_lock() {
        let s = setup();
        for _ in 0..50 {
            assert!(matches!(
                s.service
                    .submit_placement(Uuid::new_v4(), s.alice, &classic_fleet()),
                Err(GameError::GameNotFound(_))
            ));
        }
        assert_eq!(s.service.locks.tracked_games(), 0);

        let mut finished = GameSession::new(GameType::PvP, s.alice);
        finished.seat_second_player(s.bob);
        finished.finish(s.alice);
        s.service.store.save_game(&finished).unwrap();
        assert!(matches!(
            s.service.submit_placement(finished.id, s.bob, &classic_fleet()),
            Err(GameError::GameFinished(_))
        ));
        assert_eq!(s.service.locks.tracked_games(), 0);
    }

    #[test]
    fn idle_games_are_written_back_and_resume() {
        let s = setup();
        let game = s.service.create_game(s.alice, GameType::PvP).unwrap();
        s.service.join_game(game.id, s.bob).unwrap();
        s.service.submit_placement(game.id, s.alice, &classic_fleet()).unwrap();
        s.service.submit_placement(game.id, s.bob, &classic_fleet()).unwrap();
        s.service.process_move(game.id, shot(s.alice, 9, 9)).unwrap();

        assert_eq!(s.service.reclaim_idle(Duration::from_secs(3600)), 0);
        assert_eq!(s.service.reclaim_idle(Duration::ZERO), 1);
        assert_eq!(s.service.active_games(), 0);
        assert_eq!(s.service.locks.tracked_games(), 0);
        assert_eq!(s.service.store.load_moves(game.id).unwrap().len(), 1);

        // turn order survives the round trip through the store
        assert!(matches!(
            s.service.process_move(game.id, shot(s.alice, 8, 9)),
            Err(GameError::NotPlayersTurn(_))
        ));
        s.service.process_move(game.id, shot(s.bob, 9, 9)).unwrap();
        assert_eq!(s.service.resolver().cache().read_all(game.id).len(), 2);
    }
}
