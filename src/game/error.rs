//! Engine error kinds
//!
//! Every variant is a local validation failure reported straight to the
//! caller, except `Store`, which wraps a durable-store fault.

use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Coordinates ({x}, {y}) are outside the 10x10 board")]
    OutOfRange { x: i32, y: i32 },

    #[error("It is not player {0}'s turn")]
    NotPlayersTurn(Uuid),

    #[error("Cell ({x}, {y}) has already been attacked")]
    CellAlreadyAttacked { x: u8, y: u8 },

    #[error("Game {0} is already finished")]
    GameFinished(Uuid),

    #[error("Invalid fleet composition: {0}")]
    Composition(String),

    #[error("Ships must not touch, including diagonally (cell ({x}, {y}))")]
    Spacing { x: u8, y: u8 },

    #[error("Ships are already placed for player {player_id} in game {game_id}")]
    PlacementAlreadyExists { game_id: Uuid, player_id: Uuid },

    #[error("Game {0} is already full")]
    GameFull(Uuid),

    #[error("Player {0} already has an unfinished game")]
    ActiveGameExists(Uuid),

    #[error("Game {0} not found")]
    GameNotFound(Uuid),

    #[error("Player {0} not found")]
    PlayerNotFound(Uuid),

    #[error("Player name '{0}' is already taken")]
    PlayerNameTaken(String),

    #[error("Cannot join your own game")]
    CannotJoinOwnGame,

    #[error("Player {player_id} does not take part in game {game_id}")]
    NotParticipant { game_id: Uuid, player_id: Uuid },

    #[error("Game {0} is still waiting for a second player")]
    GameNotStarted(Uuid),

    #[error("No ships placed for player {player_id} in game {game_id}")]
    BoardNotFound { game_id: Uuid, player_id: Uuid },

    #[error("Fleet can only be generated on an empty board")]
    BoardNotEmpty,

    #[error("Malformed board: {0}")]
    MalformedBoard(String),

    #[error("Moves cannot be submitted on behalf of the AI player")]
    AiMoveForbidden,

    #[error("Moves of game {0} are only available once it is finished")]
    GameNotFinished(Uuid),

    #[error("Could not generate a fleet placement")]
    FleetPlacementFailed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// Lookup failures, as opposed to rule violations
    pub fn is_not_found(&self) -> bool {
        matches!(self, GameError::GameNotFound(_) | GameError::PlayerNotFound(_))
    }
}
