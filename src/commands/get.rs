use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Fetches the value stored at a key.
///
/// Replies with the payload as a bulk string, or with the null bulk string
/// when the key is absent. A record whose expiry has passed counts as absent
/// and is deleted on the spot.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: Bytes,
}

impl Executable for Get {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let record = match store.get(&self.key) {
            Some(record) => record,
            None => return Ok(Frame::Null),
        };

        if record.is_expired() {
            store.delete(&self.key);
            return Ok(Frame::Null);
        }

        Ok(record.value.into())
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;

        match parser.next_bytes() {
            Err(CommandParserError::EndOfStream) => Ok(Self { key }),
            _ => Err(CommandParserError::WrongNumberOfArguments.into()),
        }
    }
}
