//! Command dispatch for the session protocol
//!
//! Turns one decoded client command into registry mutations and the
//! messages that must go out in response. Dispatch never touches the
//! network itself; the session loop delivers what is returned.

use crate::error::RegistryError;
use crate::health::HealthSwitch;
use crate::registry::PlayerRegistry;
use log::{debug, info};
use shared::{ClientCommand, ServerMessage};
use std::net::SocketAddr;

/// What the session must do after one command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Sent to the sender only.
    pub reply: Option<ServerMessage>,
    /// Sent to every registered player.
    pub broadcast: Option<ServerMessage>,
    /// The session ends once these messages are sent.
    pub terminate: bool,
}

impl Dispatch {
    fn reply(message: ServerMessage) -> Self {
        Self {
            reply: Some(message),
            ..Self::default()
        }
    }
}

/// Drives the player registry from client commands.
///
/// Commands are applied strictly one at a time, so every command sees the
/// registry as left by the one before it.
pub struct ProtocolDispatcher {
    registry: PlayerRegistry,
    health: HealthSwitch,
}

impl ProtocolDispatcher {
    /// Creates a dispatcher owning `registry`.
    ///
    /// `health` is the switch shared with the liveness ticker; an
    /// `UNHEALTHY` command turns it off.
    pub fn new(registry: PlayerRegistry, health: HealthSwitch) -> Self {
        Self { registry, health }
    }

    /// Read access to the players, for building recipient lists.
    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    /// Decodes and dispatches a raw frame.
    pub fn dispatch_frame(&mut self, frame: &[u8], sender: SocketAddr) -> Dispatch {
        self.dispatch(ClientCommand::from_bytes(frame), sender)
    }

    /// Applies one command sent by `sender`.
    ///
    /// Signups and disconnects mutate the registry and broadcast the new
    /// game state. Anything unrecognised is acknowledged back to the
    /// sender only.
    pub fn dispatch(&mut self, command: ClientCommand, sender: SocketAddr) -> Dispatch {
        match command {
            ClientCommand::Signup { nick } => self.signup(&nick, sender),
            ClientCommand::MalformedSignup => Dispatch::reply(ServerMessage::invalid_signup()),
            ClientCommand::Disconnect => self.disconnect(sender),
            ClientCommand::Exit => {
                info!("Exit requested by {}", sender);
                Dispatch {
                    reply: Some(ServerMessage::farewell()),
                    broadcast: None,
                    terminate: true,
                }
            }
            ClientCommand::Unhealthy => {
                if self.health.stop() {
                    info!("Health pings disabled by {}", sender);
                } else {
                    debug!("Health pings already disabled");
                }
                Dispatch::default()
            }
            ClientCommand::Echo { tokens } => Dispatch::reply(ServerMessage::ack(&tokens)),
        }
    }

    fn signup(&mut self, nick: &str, sender: SocketAddr) -> Dispatch {
        match self.registry.register(nick, sender) {
            Ok(player) => {
                let hello = ServerMessage::Hello {
                    nick: player.nick.clone(),
                };
                Dispatch {
                    reply: Some(hello),
                    broadcast: Some(self.game_state()),
                    terminate: false,
                }
            }
            Err(RegistryError::GameFull) => {
                info!("Rejected signup from {}: game is full", sender);
                Dispatch::reply(ServerMessage::Full)
            }
            // Lost HELLO replies make clients retry; confirm the existing player.
            Err(RegistryError::AlreadyRegistered { nick }) => {
                Dispatch::reply(ServerMessage::Hello { nick })
            }
        }
    }

    fn disconnect(&mut self, sender: SocketAddr) -> Dispatch {
        if self.registry.deregister(sender).is_none() {
            return Dispatch::reply(ServerMessage::not_signed_up());
        }

        if self.registry.is_empty() {
            info!("Last player left, ending session");
            return Dispatch {
                reply: Some(ServerMessage::Bye),
                broadcast: None,
                terminate: true,
            };
        }

        Dispatch {
            reply: Some(ServerMessage::Bye),
            broadcast: Some(self.game_state()),
            terminate: false,
        }
    }

    /// Snapshot of every registered player, in registry order.
    pub fn game_state(&self) -> ServerMessage {
        ServerMessage::GameState {
            players: self.registry.players().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::MAX_PLAYERS;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn dispatcher() -> ProtocolDispatcher {
        let registry = PlayerRegistry::with_rng(MAX_PLAYERS, StdRng::seed_from_u64(1));
        ProtocolDispatcher::new(registry, HealthSwitch::new())
    }

    fn signup(d: &mut ProtocolDispatcher, nick: &str, port: u16) -> Dispatch {
        d.dispatch_frame(format!("SIGNUP {}\n", nick).as_bytes(), addr(port))
    }

    fn player_count(message: &ServerMessage) -> usize {
        match message {
            ServerMessage::GameState { players } => players.len(),
            other => panic!("Expected game state, got {:?}", other),
        }
    }

    #[test]
    fn test_signup_on_empty_registry() {
        let mut d = dispatcher();

        let out = signup(&mut d, "john", 8000);

        assert_eq!(
            out.reply,
            Some(ServerMessage::Hello {
                nick: "john".to_string()
            })
        );
        let broadcast = out.broadcast.unwrap();
        assert_eq!(player_count(&broadcast), 1);
        assert!(broadcast.to_string().starts_with("GS 1 john "));
        assert!(!out.terminate);
    }

    #[test]
    fn test_signup_duplicate_nick_gets_suffix() {
        let mut d = dispatcher();
        signup(&mut d, "john", 8000);

        let out = signup(&mut d, "john", 8001);

        assert_eq!(
            out.reply,
            Some(ServerMessage::Hello {
                nick: "john1".to_string()
            })
        );
        assert_eq!(player_count(&out.broadcast.unwrap()), 2);
    }

    #[test]
    fn test_signup_when_full() {
        let mut d = dispatcher();
        for i in 0..MAX_PLAYERS {
            signup(&mut d, "p", 8000 + i as u16);
        }

        let out = signup(&mut d, "late", 9000);

        assert_eq!(out.reply, Some(ServerMessage::Full));
        assert!(out.broadcast.is_none());
        assert!(!out.terminate);
        assert_eq!(d.registry().len(), MAX_PLAYERS);
    }

    #[test]
    fn test_malformed_signup() {
        let mut d = dispatcher();

        for frame in ["SIGNUP", "SIGNUP john smith"] {
            let out = d.dispatch_frame(frame.as_bytes(), addr(8000));
            assert_eq!(out.reply, Some(ServerMessage::invalid_signup()));
            assert!(out.broadcast.is_none());
            assert!(!out.terminate);
        }
        assert!(d.registry().is_empty());
    }

    #[test]
    fn test_repeated_signup_confirms_existing_player() {
        let mut d = dispatcher();
        signup(&mut d, "john", 8000);

        let out = signup(&mut d, "other", 8000);

        assert_eq!(
            out.reply,
            Some(ServerMessage::Hello {
                nick: "john".to_string()
            })
        );
        assert!(out.broadcast.is_none());
        assert_eq!(d.registry().len(), 1);
    }

    #[test]
    fn test_disconnect_with_players_remaining() {
        let mut d = dispatcher();
        signup(&mut d, "john", 8000);
        signup(&mut d, "anna", 8001);

        let out = d.dispatch_frame(b"DISCONNECT\n", addr(8000));

        assert_eq!(out.reply, Some(ServerMessage::Bye));
        let broadcast = out.broadcast.unwrap();
        assert_eq!(player_count(&broadcast), 1);
        assert!(broadcast.to_string().starts_with("GS 1 anna "));
        assert!(!out.terminate);
    }

    #[test]
    fn test_disconnect_last_player_terminates() {
        let mut d = dispatcher();
        signup(&mut d, "john", 8000);

        let out = d.dispatch_frame(b"DISCONNECT", addr(8000));

        assert_eq!(out.reply, Some(ServerMessage::Bye));
        assert!(out.broadcast.is_none());
        assert!(out.terminate);
        assert!(d.registry().is_empty());
    }

    #[test]
    fn test_disconnect_unknown_sender() {
        let mut d = dispatcher();
        signup(&mut d, "john", 8000);

        let out = d.dispatch_frame(b"DISCONNECT", addr(9999));

        assert_eq!(out.reply, Some(ServerMessage::not_signed_up()));
        assert!(out.broadcast.is_none());
        assert!(!out.terminate);
        assert_eq!(d.registry().len(), 1);
    }

    #[test]
    fn test_exit_always_terminates() {
        let mut empty = dispatcher();
        let out = empty.dispatch_frame(b"EXIT", addr(8000));
        assert!(out.terminate);
        assert_eq!(out.reply, Some(ServerMessage::farewell()));

        let mut busy = dispatcher();
        signup(&mut busy, "john", 8000);
        let out = busy.dispatch_frame(b"EXIT", addr(8001));
        assert!(out.terminate);
        assert!(out.broadcast.is_none());
    }

    #[test]
    fn test_unhealthy_stops_health_once() {
        let health = HealthSwitch::new();
        let mut d = ProtocolDispatcher::new(PlayerRegistry::default(), health.clone());

        let first = d.dispatch_frame(b"UNHEALTHY", addr(8000));
        let second = d.dispatch_frame(b"UNHEALTHY", addr(8000));

        assert_eq!(first, Dispatch::default());
        assert_eq!(second, Dispatch::default());
        assert!(!health.is_active());
    }

    #[test]
    fn test_unknown_command_is_echoed() {
        let mut d = dispatcher();
        signup(&mut d, "john", 8000);

        let out = d.dispatch_frame(b"FOO BAR\n", addr(8000));

        let reply = out.reply.unwrap().to_string();
        assert!(reply.contains("FOO BAR"));
        assert!(reply.starts_with("MSG: "));
        assert!(out.broadcast.is_none());
        assert!(!out.terminate);
        assert_eq!(d.registry().len(), 1);
        assert_eq!(d.registry().players()[0].nick, "john");
    }

    #[test]
    fn test_empty_frame_is_echoed() {
        let mut d = dispatcher();

        let out = d.dispatch_frame(b"  \n", addr(8000));

        assert_eq!(out.reply, Some(ServerMessage::ack(&[])));
        assert!(!out.terminate);
    }
}
