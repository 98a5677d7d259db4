use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// A parsed command that can run against the shared keyspace.
///
/// `Ok` carries the reply frame; `Err` carries a message the connection
/// writes as an error reply without closing.
pub trait Executable {
    fn exec(self, store: Store) -> Result<Frame, Error>;
}
