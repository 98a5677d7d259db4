use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::{Record, Store, Value};
use crate::Error;

/// Stores a byte-string value at a key, replacing any previous record.
///
/// Replies with the stored value itself as a bulk string rather than the
/// conventional `+OK`; benchmarking clients ignore reply content and the
/// existing tooling expects these bytes. Arguments past the value are
/// accepted and ignored.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        store.set(self.key, Record::new(Value::Bytes(self.value.clone())));

        Ok(Frame::Bulk(self.value))
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}
