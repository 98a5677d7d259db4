pub mod echo;
pub mod executable;
pub mod get;
pub mod set;

use bytes::Bytes;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

use echo::Echo;
use get::Get;
use set::Set;

#[derive(Debug, PartialEq)]
pub enum Command {
    Get(Get),
    Set(Set),
    Echo(Echo),
    /// A well-formed request naming a command this server does not
    /// implement. Executing it produces an error reply.
    Unknown(Unknown),
    /// A known command whose argument list fails its arity or type checks.
    /// Executing it produces an error reply.
    Invalid(Invalid),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match self {
            Command::Get(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::Echo(cmd) => cmd.exec(store),
            Command::Unknown(cmd) => cmd.exec(store),
            Command::Invalid(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = Error;

    /// Normalizes a request frame into a command.
    ///
    /// Only structural violations are errors here: a request that is not an
    /// array, an empty array, or a command name that is not a string. Those
    /// are fatal to the connection. An unknown name or a bad argument list
    /// still normalizes, into a command whose execution yields an error
    /// reply, so one bad request cannot take the rest of a pipeline down
    /// with it.
    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the server as arrays of bulk strings.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(Box::new(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                }))
            }
        };

        let parser = &mut CommandParser {
            parts: frames.into_iter(),
        };

        let command_name = parser.parse_command_name()?;

        let command = match &command_name[..] {
            "get" => Get::try_from(parser).map(Command::Get),
            "set" => Set::try_from(parser).map(Command::Set),
            "echo" => Echo::try_from(parser).map(Command::Echo),
            _ => {
                return Ok(Command::Unknown(Unknown {
                    name: command_name.clone(),
                }))
            }
        };

        command.or_else(|err| Ok(Command::Invalid(Invalid::new(&command_name, err))))
    }
}

#[derive(Debug, PartialEq)]
pub struct Unknown {
    pub name: String,
}

impl Executable for Unknown {
    fn exec(self, _store: Store) -> Result<Frame, Error> {
        Err(format!("unknown command '{}'", self.name).into())
    }
}

#[derive(Debug, PartialEq)]
pub struct Invalid {
    pub message: String,
}

impl Invalid {
    fn new(command: &str, err: Error) -> Invalid {
        let message = match err.downcast_ref::<CommandParserError>() {
            Some(CommandParserError::EndOfStream)
            | Some(CommandParserError::WrongNumberOfArguments) => {
                format!("wrong number of arguments for '{}' command", command)
            }
            _ => err.to_string(),
        };

        Invalid { message }
    }
}

impl Executable for Invalid {
    fn exec(self, _store: Store) -> Result<Frame, Error> {
        Err(self.message.into())
    }
}

pub(crate) struct CommandParser {
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        let command_name = self.parts.next().ok_or(CommandParserError::EndOfStream)?;

        match command_name {
            Frame::Simple(s) => Ok(s.to_ascii_lowercase()),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_ascii_lowercase())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        let frame = self.parts.next().ok_or(CommandParserError::EndOfStream)?;

        // Both `Simple` and `Bulk` representations carry a byte payload;
        // canonical clients only ever send `Bulk`.
        match frame {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub(crate) enum CommandParserError {
    #[error("protocol error; invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("wrong number of arguments")]
    WrongNumberOfArguments,
    #[error("protocol error; attempting to extract a value failed due to the frame being fully consumed")]
    EndOfStream,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get_command_with_simple_string() {
        let get_frame = Frame::Array(vec![
            Frame::Simple(String::from("GET")),
            Frame::Simple(String::from("foo")),
        ]);

        let get_command = Command::try_from(get_frame).unwrap();

        assert_eq!(
            get_command,
            Command::Get(Get {
                key: Bytes::from("foo")
            })
        );
    }

    #[test]
    fn parse_get_command_with_bulk_string() {
        let get_frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("get")),
            Frame::Bulk(Bytes::from("foo-from-bytes")),
        ]);

        let get_command = Command::try_from(get_frame).unwrap();

        assert_eq!(
            get_command,
            Command::Get(Get {
                key: Bytes::from("foo-from-bytes")
            })
        );
    }

    #[test]
    fn parse_set_command() {
        let set_frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("SET")),
            Frame::Bulk(Bytes::from("foo")),
            Frame::Bulk(Bytes::from("baz")),
        ]);

        let set_command = Command::try_from(set_frame).unwrap();

        assert_eq!(
            set_command,
            Command::Set(Set {
                key: Bytes::from("foo"),
                value: Bytes::from("baz")
            })
        );
    }

    #[test]
    fn parse_set_command_ignores_extra_arguments() {
        let set_frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("SET")),
            Frame::Bulk(Bytes::from("foo")),
            Frame::Bulk(Bytes::from("baz")),
            Frame::Bulk(Bytes::from("EX")),
            Frame::Bulk(Bytes::from("10")),
        ]);

        let set_command = Command::try_from(set_frame).unwrap();

        assert_eq!(
            set_command,
            Command::Set(Set {
                key: Bytes::from("foo"),
                value: Bytes::from("baz")
            })
        );
    }

    #[test]
    fn parse_echo_command() {
        let echo_frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("ECHO")),
            Frame::Bulk(Bytes::from("Hello")),
        ]);

        let echo_command = Command::try_from(echo_frame).unwrap();

        assert_eq!(
            echo_command,
            Command::Echo(Echo {
                payload: Bytes::from("Hello")
            })
        );
    }

    #[test]
    fn parse_unknown_command() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("FLUSHALL")),
            Frame::Bulk(Bytes::from("ASYNC")),
        ]);

        let command = Command::try_from(frame).unwrap();

        assert_eq!(
            command,
            Command::Unknown(Unknown {
                name: String::from("flushall")
            })
        );
    }

    #[test]
    fn parse_known_command_with_missing_arguments() {
        let frame = Frame::Array(vec![Frame::Bulk(Bytes::from("GET"))]);

        let command = Command::try_from(frame).unwrap();

        assert_eq!(
            command,
            Command::Invalid(Invalid {
                message: String::from("wrong number of arguments for 'get' command")
            })
        );
    }

    #[test]
    fn parse_known_command_with_extra_arguments() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("ECHO")),
            Frame::Bulk(Bytes::from("one")),
            Frame::Bulk(Bytes::from("two")),
        ]);

        let command = Command::try_from(frame).unwrap();

        assert_eq!(
            command,
            Command::Invalid(Invalid {
                message: String::from("wrong number of arguments for 'echo' command")
            })
        );
    }

    #[test]
    fn parse_non_array_frame_is_fatal() {
        let err = Command::try_from(Frame::Simple(String::from("PING")))
            .err()
            .unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(
            *err,
            CommandParserError::InvalidFrame {
                expected: "array".to_string(),
                actual: Frame::Simple(String::from("PING"))
            }
        );
    }

    #[test]
    fn parse_empty_array_is_fatal() {
        let err = Command::try_from(Frame::Array(vec![])).err().unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(*err, CommandParserError::EndOfStream);
    }

    #[test]
    fn parse_non_string_command_name_is_fatal() {
        let err = Command::try_from(Frame::Array(vec![Frame::Integer(1)]))
            .err()
            .unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(
            *err,
            CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: Frame::Integer(1)
            }
        );
    }

    #[test]
    fn exec_unknown_command_reports_name() {
        let command = Command::Unknown(Unknown {
            name: String::from("flushall"),
        });

        let err = command.exec(Store::new()).err().unwrap();

        assert_eq!(err.to_string(), "unknown command 'flushall'");
    }
}
