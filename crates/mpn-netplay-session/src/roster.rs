//! The player roster.

use mpn_netplay_protocol::{Player, PlayerId};

/// Players in join order, at most one entry per id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `player`, or overwrites the fields of the entry with the
    /// same id in place (keeping its join position).
    ///
    /// Returns `true` if the roster changed. A repeated join notification
    /// with identical fields is a no-op.
    pub fn upsert(&mut self, player: Player) -> bool {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) if *existing == player => false,
            Some(existing) => {
                *existing = player;
                true
            }
            None => {
                self.players.push(player);
                true
            }
        }
    }

    /// Removes the player with `id`. Returns `true` if one was present.
    pub fn remove(&mut self, id: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        self.players.len() != before
    }

    /// Replaces the whole roster.
    ///
    /// Duplicate ids in `players` collapse onto the first position, carrying
    /// the last entry's fields.
    pub fn replace(&mut self, players: Vec<Player>) {
        self.players.clear();
        for player in players {
            self.upsert(player);
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// Returns `true` if the roster holds exactly `players`, in order.
    pub fn matches(&self, players: &[Player]) -> bool {
        self.players == players
    }

    pub fn snapshot(&self) -> Vec<Player> {
        self.players.clone()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
