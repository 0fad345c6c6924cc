//! Textual request/response front end over a [`ConcurrentMap`].
//!
//! Requests are single lines: `PUT key value`, `GET key` or `DEL key`, with
//! integer arguments. Framing and transport belong to the caller.

use crate::map::ConcurrentMap;

use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Put { key: i64, value: i64 },
    Get { key: i64 },
    Del { key: i64 },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown or missing verb")]
    BadCommand,
    #[error("malformed arguments for {verb}")]
    BadArguments { verb: &'static str },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ParseError::BadCommand)?;

        // Verbs are case-sensitive.
        let (verb, arity) = match verb {
            "PUT" => ("PUT", 2),
            "GET" => ("GET", 1),
            "DEL" => ("DEL", 1),
            _ => return Err(ParseError::BadCommand),
        };

        let args = words
            .map(i64::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseError::BadArguments { verb })?;
        if args.len() != arity {
            return Err(ParseError::BadArguments { verb });
        }

        Ok(match verb {
            "PUT" => Command::Put {
                key: args[0],
                value: args[1],
            },
            "GET" => Command::Get { key: args[0] },
            _ => Command::Del { key: args[0] },
        })
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Success,
    Value(i64),
    NoSuchKey,
    Error,
    BadCommand,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Success => f.write_str("Success"),
            Response::Value(v) => write!(f, "{v}"),
            Response::NoSuchKey => f.write_str("No such key"),
            Response::Error => f.write_str("Error"),
            Response::BadCommand => f.write_str("Error: Bad command."),
        }
    }
}

/// Executes [`Command`]s against a table.
///
/// The table cannot delete, so `DEL` leaves the entry in place and records
/// a tombstone that hides it until the next `PUT` of the same key. Deleted
/// keys keep their slot in a fixed-capacity table.
pub struct Store<M> {
    map: M,
    tombstones: RwLock<HashSet<i64>>,
}

impl<M> Store<M>
where
    M: ConcurrentMap<Key = i64, Val = i64>,
{
    pub fn new(map: M) -> Self {
        Self {
            map,
            tombstones: RwLock::new(HashSet::new()),
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Parses and executes one request line.
    pub fn handle(&self, line: &str) -> Response {
        match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(ParseError::BadCommand) => {
                log::debug!("bad command: {line:?}");
                Response::BadCommand
            }
            Err(e) => {
                log::debug!("rejecting {line:?}: {e}");
                Response::Error
            }
        }
    }

    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Put { key, value } => self.put(key, value),
            Command::Get { key } => self.get(key),
            Command::Del { key } => self.del(key),
        }
    }

    fn put(&self, key: i64, value: i64) -> Response {
        let result = if self.tombstones.read().contains(&key) {
            let mut tombstones = self.tombstones.write();
            let result = self.map.put(key, value);
            if result.is_ok() {
                tombstones.remove(&key);
            }
            result
        } else {
            self.map.put(key, value)
        };

        match result {
            Ok(()) => Response::Success,
            Err(e) => {
                log::warn!("PUT {key} failed: {e}");
                Response::Error
            }
        }
    }

    fn get(&self, key: i64) -> Response {
        if self.tombstones.read().contains(&key) {
            return Response::NoSuchKey;
        }
        match self.map.get(&key) {
            Some(value) => Response::Value(value),
            None => Response::NoSuchKey,
        }
    }

    fn del(&self, key: i64) -> Response {
        let mut tombstones = self.tombstones.write();
        if tombstones.contains(&key) || !self.map.contains(&key) {
            return Response::NoSuchKey;
        }
        tombstones.insert(key);
        Response::Success
    }
}
