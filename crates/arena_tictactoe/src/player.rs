//! Player identity and seat symbol.

use crate::Symbol;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Unique identifier for a player, supplied by the request layer.
pub type PlayerId = String;

/// A player: identity, display name and, once seated, a symbol.
///
/// The symbol is fixed when the player takes a seat in a game. A seated
/// player value is owned by that game; the bare identity can be reused for
/// any number of other games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Player {
    /// Player's unique ID.
    id: PlayerId,
    /// Player's display name.
    name: String,
    /// Seat symbol, present once seated.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    symbol: Option<Symbol>,
}

impl Player {
    /// Creates an unseated player.
    #[instrument(skip(id, name))]
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbol: None,
        }
    }

    /// Returns this player seated with `symbol`.
    pub(crate) fn seated(self, symbol: Symbol) -> Self {
        Self {
            symbol: Some(symbol),
            ..self
        }
    }

    /// Checks whether a symbol has been assigned.
    pub fn has_valid_symbol(&self) -> bool {
        self.symbol.is_some()
    }

    /// Checks whether this player has the given id.
    pub fn is(&self, id: &str) -> bool {
        self.id == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_has_no_symbol() {
        let player = Player::new("p1", "Alice");
        assert_eq!(player.id(), "p1");
        assert_eq!(player.name(), "Alice");
        assert!(!player.has_valid_symbol());
    }

    #[test]
    fn test_seated_keeps_identity() {
        let player = Player::new("p1", "Alice").seated(Symbol::O);
        assert_eq!(*player.symbol(), Some(Symbol::O));
        assert!(player.is("p1"));
        assert!(!player.is("p2"));
    }

    #[test]
    fn test_unseated_player_omits_symbol_on_wire() {
        let json = serde_json::to_value(Player::new("p1", "Alice")).expect("Serializable");
        assert!(json.get("symbol").is_none());
    }
}
