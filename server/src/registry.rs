//! Player registry for a single game session
//!
//! The registry is the only owner of the live player list. It enforces:
//! - The player capacity of the session
//! - One player per transport address
//! - Unique nicks among the current players
//!
//! Colors are drawn from a generator seeded once when the registry is
//! created, so rapid registrations never share a degenerate seed.

use crate::error::RegistryError;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Player, MAX_PLAYERS, NUM_COLORS};
use std::net::SocketAddr;

/// Owns the players registered in the session.
///
/// Iteration order is the storage order and stays stable between
/// mutations, so a snapshot built from [`PlayerRegistry::players`] lists
/// players in the same order it will be broadcast in. Removing a player
/// may reorder the remaining entries.
pub struct PlayerRegistry {
    players: Vec<Player>,
    max_players: usize,
    rng: StdRng,
}

impl PlayerRegistry {
    /// Creates an empty registry with the given capacity and an
    /// entropy-seeded color generator.
    pub fn new(max_players: usize) -> Self {
        Self::with_rng(max_players, StdRng::from_entropy())
    }

    /// Creates an empty registry drawing colors from `rng`.
    pub fn with_rng(max_players: usize, rng: StdRng) -> Self {
        Self {
            players: Vec::with_capacity(max_players),
            max_players,
            rng,
        }
    }

    /// Registers a new player for `addr` under a unique variant of `nick`.
    ///
    /// Fails with [`RegistryError::GameFull`] when every slot is taken and
    /// with [`RegistryError::AlreadyRegistered`] when the address already
    /// has a player. The registry is unchanged on failure.
    pub fn register(&mut self, nick: &str, addr: SocketAddr) -> Result<&Player, RegistryError> {
        if let Some(existing) = self.find(addr) {
            return Err(RegistryError::AlreadyRegistered {
                nick: existing.nick.clone(),
            });
        }

        if self.is_full() {
            return Err(RegistryError::GameFull);
        }

        let nick = self.unique_nick(nick);
        let color = self.rng.gen_range(0..NUM_COLORS);
        info!("Player {} registered from {} with color {}", nick, addr, color);

        let index = self.players.len();
        self.players.push(Player::new(addr, nick, color));
        Ok(&self.players[index])
    }

    /// Removes the player registered for `addr`, if any.
    pub fn deregister(&mut self, addr: SocketAddr) -> Option<Player> {
        let index = self.players.iter().position(|p| p.addr == addr)?;
        let player = self.players.swap_remove(index);
        info!("Player {} from {} removed", player.nick, addr);
        Some(player)
    }

    /// Returns `proposal` if no player holds it, otherwise the first
    /// `proposal<N>` (N = 1, 2, ...) that no current player holds.
    pub fn unique_nick(&self, proposal: &str) -> String {
        if !self.nick_taken(proposal) {
            return proposal.to_string();
        }

        let mut suffix = 1u32;
        loop {
            let candidate = format!("{}{}", proposal, suffix);
            if !self.nick_taken(&candidate) {
                debug!("Nick {} taken, assigning {}", proposal, candidate);
                return candidate;
            }
            suffix += 1;
        }
    }

    fn nick_taken(&self, nick: &str) -> bool {
        self.players.iter().any(|p| p.nick == nick)
    }

    /// Finds the player registered for `addr`.
    ///
    /// Returns `None` when the address has not signed up.
    pub fn find(&self, addr: SocketAddr) -> Option<&Player> {
        self.players.iter().find(|p| p.addr == addr)
    }

    /// Players in storage order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Addresses of every registered player, in storage order.
    ///
    /// This is the recipient list for a game state broadcast.
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.players.iter().map(|p| p.addr).collect()
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no player is registered.
    ///
    /// The session ends when a disconnect leaves the registry empty.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether every player slot is taken.
    ///
    /// A full registry rejects new signups with [`RegistryError::GameFull`].
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new(MAX_PLAYERS)
    }
}
