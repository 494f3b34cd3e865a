//! Text wire protocol shared by the game server and its clients.
//!
//! Every datagram is one UTF-8 line. Clients send whitespace separated
//! commands (`SIGNUP <nick>`, `DISCONNECT`, `EXIT`, `UNHEALTHY`); anything
//! else is echoed back. The server answers with newline terminated replies
//! and broadcasts a `GS` snapshot whenever the set of players changes.

use std::fmt;
use std::net::SocketAddr;

pub const MAX_PLAYERS: usize = 4;
pub const NUM_COLORS: u8 = 10;
pub const DEFAULT_PORT: u16 = 7654;
pub const MAX_FRAME_SIZE: usize = 1024;

pub const SIGNUP: &str = "SIGNUP";
pub const DISCONNECT: &str = "DISCONNECT";
pub const EXIT: &str = "EXIT";
pub const UNHEALTHY: &str = "UNHEALTHY";

pub const HELLO: &str = "HELLO";
pub const FULL: &str = "FULL";
pub const BYE: &str = "BYE";
pub const MSG: &str = "MSG";
pub const GAME_STATE: &str = "GS";

/// One connected client as seen by the game.
///
/// The address is the identity of the player for the whole connection;
/// only `nick`, `color`, position and `points` travel on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub addr: SocketAddr,
    pub nick: String,
    pub color: u8,
    pub x: i32,
    pub y: i32,
    pub points: i32,
}

impl Player {
    /// Creates a player at the origin with no points.
    ///
    /// `nick` must already be unique within the session; the registry
    /// takes care of that before calling this.
    pub fn new(addr: SocketAddr, nick: impl Into<String>, color: u8) -> Self {
        Self {
            addr,
            nick: nick.into(),
            color,
            x: 0,
            y: 0,
            points: 0,
        }
    }
}

/// Commands a client can send, decoded from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Signup { nick: String },
    /// `SIGNUP` with a missing or extra argument.
    MalformedSignup,
    Disconnect,
    Exit,
    Unhealthy,
    /// Anything unrecognized, kept as the original tokens.
    Echo { tokens: Vec<String> },
}

impl ClientCommand {
    /// Decodes raw datagram bytes. Invalid UTF-8 is replaced, never rejected.
    pub fn from_bytes(frame: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(frame))
    }

    pub fn parse(frame: &str) -> Self {
        let tokens = tokenize(frame);

        match tokens.as_slice() {
            [cmd, nick] if cmd == SIGNUP => ClientCommand::Signup { nick: nick.clone() },
            [cmd, ..] if cmd == SIGNUP => ClientCommand::MalformedSignup,
            [cmd] if cmd == DISCONNECT => ClientCommand::Disconnect,
            [cmd] if cmd == EXIT => ClientCommand::Exit,
            [cmd] if cmd == UNHEALTHY => ClientCommand::Unhealthy,
            _ => ClientCommand::Echo { tokens },
        }
    }
}

/// Splits a frame into words, ignoring surrounding and repeated whitespace.
pub fn tokenize(frame: &str) -> Vec<String> {
    frame.split_whitespace().map(str::to_owned).collect()
}

/// Replies and broadcasts produced by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello { nick: String },
    Full,
    Bye,
    /// Free text: protocol errors, farewells and echo acknowledgments.
    Msg(String),
    GameState { players: Vec<Player> },
}

impl ServerMessage {
    pub fn invalid_signup() -> Self {
        ServerMessage::Msg(format!("Invalid command. Expected: {} <nick>", SIGNUP))
    }

    pub fn not_signed_up() -> Self {
        ServerMessage::Msg("Not signed up".to_string())
    }

    pub fn farewell() -> Self {
        ServerMessage::Msg("Server shutting down".to_string())
    }

    pub fn ack(tokens: &[String]) -> Self {
        ServerMessage::Msg(format!("ACK: {}", tokens.join(" ")))
    }

    /// Wire encoding, newline terminated.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Hello { nick } => writeln!(f, "{} {}", HELLO, nick),
            ServerMessage::Full => writeln!(f, "{}", FULL),
            ServerMessage::Bye => writeln!(f, "{}", BYE),
            ServerMessage::Msg(text) => writeln!(f, "{}: {}", MSG, text),
            ServerMessage::GameState { players } => {
                write!(f, "{} {}", GAME_STATE, players.len())?;
                for p in players {
                    write!(f, " {} {} {} {} {}", p.nick, p.color, p.x, p.y, p.points)?;
                }
                writeln!(f)
            }
        }
    }
}
