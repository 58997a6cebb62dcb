//! Game session and move records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of opponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameType {
    /// Human versus human
    PvP,
    /// Human versus the AI player
    PvE,
}

/// Lifecycle of a game, one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    WaitingForPlayer,
    InProgress,
    Finished,
}

/// A single game between two seats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: Uuid,
    pub game_type: GameType,
    pub status: GameStatus,
    pub player1: Uuid,
    pub player2: Option<Uuid>,
    pub winner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// New game with only the creator seated
    pub fn new(game_type: GameType, creator: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_type,
            status: GameStatus::WaitingForPlayer,
            player1: creator,
            player2: None,
            winner: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    pub fn has_player(&self, player_id: Uuid) -> bool {
        self.player1 == player_id || self.player2 == Some(player_id)
    }

    /// The other seat, if both are taken
    pub fn opponent_of(&self, player_id: Uuid) -> Option<Uuid> {
        if player_id == self.player1 {
            self.player2
        } else if self.player2 == Some(player_id) {
            Some(self.player1)
        } else {
            None
        }
    }

    /// Fill the second seat and start play
    pub fn seat_second_player(&mut self, player_id: Uuid) {
        self.player2 = Some(player_id);
        if self.status == GameStatus::WaitingForPlayer {
            self.status = GameStatus::InProgress;
        }
    }

    /// Terminal transition; the winner is only ever set here
    pub fn finish(&mut self, winner: Uuid) {
        self.status = GameStatus::Finished;
        self.winner = Some(winner);
        self.finished_at = Some(Utc::now());
    }
}

/// Outcome of one shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveResult {
    Hit,
    Miss,
    /// A hit that completed a ship
    Sunk,
    /// Reserved, never produced by the resolver
    Invalid,
}

impl MoveResult {
    /// Hits keep the turn with the shooter
    pub fn keeps_turn(self) -> bool {
        matches!(self, MoveResult::Hit | MoveResult::Sunk)
    }
}

/// A resolved shot by `player_id` at (x, y) on the opponent's board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub x: u8,
    pub y: u8,
    pub result: MoveResult,
    pub created_at: DateTime<Utc>,
}

impl Move {
    pub fn new(game_id: Uuid, player_id: Uuid, x: u8, y: u8, result: MoveResult) -> Self {
        Self {
            game_id,
            player_id,
            x,
            y,
            result,
            created_at: Utc::now(),
        }
    }

    /// Uniqueness key: one shot per (game, player, cell)
    pub fn key(&self) -> (Uuid, Uuid, u8, u8) {
        (self.game_id, self.player_id, self.x, self.y)
    }

    pub fn targets(&self, player_id: Uuid, x: u8, y: u8) -> bool {
        self.player_id == player_id && self.x == x && self.y == y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seating_and_opponents() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut game = GameSession::new(GameType::PvP, a);
        assert_eq!(game.status, GameStatus::WaitingForPlayer);
        assert_eq!(game.opponent_of(a), None);

        game.seat_second_player(b);
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.opponent_of(a), Some(b));
        assert_eq!(game.opponent_of(b), Some(a));
        assert_eq!(game.opponent_of(c), None);
        assert!(!game.has_player(c));
    }

    #[test]
    fn finish_sets_winner_and_timestamp() {
        let a = Uuid::new_v4();
        let mut game = GameSession::new(GameType::PvE, a);
        game.finish(a);
        assert!(game.is_finished());
        assert_eq!(game.winner, Some(a));
        assert!(game.finished_at.is_some());
    }

    #[test]
    fn result_wire_names() {
        assert_eq!(serde_json::to_string(&MoveResult::Sunk).unwrap(), "\"SUNK\"");
        assert_eq!(
            serde_json::to_string(&GameStatus::WaitingForPlayer).unwrap(),
            "\"WAITING_FOR_PLAYER\""
        );
        assert_eq!(serde_json::to_string(&GameType::PvE).unwrap(), "\"PvE\"");
    }
}
