use std::io::Cursor;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::commands::Command;
use crate::frame::{self, Frame};
use crate::Error;

/// Initial capacity of the read buffer and of the buffered writer.
const INITIAL_BUFFER_SIZE: usize = 4 * 1024;

/// Outcome of one [`Connection::read_commands`] call.
#[derive(Debug)]
pub enum Status {
    /// The peer may send more data; call `read_commands` again.
    Open,
    /// The peer closed its end cleanly.
    EndOfStream,
    /// The byte stream cannot be understood. The connection owes the peer
    /// one error reply and must then be dropped.
    Fatal(Error),
}

pub struct Connection {
    reader: OwnedReadHalf,
    writer: BufWriter<OwnedWriteHalf>,
    // Data is read from the socket into `buf` starting at `write_pos`. The
    // window [read_pos, write_pos) holds bytes received but not yet parsed;
    // a partial frame stays there until the rest of it arrives.
    buf: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        let (reader, writer) = stream.into_split();

        Connection {
            reader,
            writer: BufWriter::with_capacity(INITIAL_BUFFER_SIZE, writer),
            buf: vec![0; INITIAL_BUFFER_SIZE],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Performs one socket read and parses every complete command now
    /// sitting in the buffer.
    ///
    /// Pipelined requests that arrived in the same read come back as one
    /// batch; a trailing partial frame is kept for the next call. `Err` is a
    /// transport failure: the caller drops the connection without replying.
    /// A protocol violation instead travels in [`Status::Fatal`] together
    /// with the commands parsed before it, since those still deserve
    /// replies.
    pub async fn read_commands(&mut self) -> crate::Result<(Vec<Command>, Status)> {
        self.compact();
        self.grow();

        let n = self.reader.read(&mut self.buf[self.write_pos..]).await?;

        if n == 0 {
            // EOF. Whatever complete commands are already buffered still get
            // executed before the connection winds down.
            let (batch, fatal) = self.parse_batch();
            let status = match fatal {
                Some(err) => Status::Fatal(err),
                None => Status::EndOfStream,
            };
            return Ok((batch, status));
        }

        self.write_pos += n;

        let (batch, fatal) = self.parse_batch();
        let status = match fatal {
            Some(err) => Status::Fatal(err),
            None => Status::Open,
        };
        Ok((batch, status))
    }

    /// Moves the unparsed window to the front of the buffer. Compaction is
    /// O(live bytes) and runs before growth, so consumed bytes at the front
    /// are never copied into a larger allocation.
    fn compact(&mut self) {
        // Everything parsed: just reset the indices.
        if self.read_pos == self.write_pos {
            self.read_pos = 0;
            self.write_pos = 0;
            return;
        }

        if self.read_pos > 0 {
            self.buf.copy_within(self.read_pos..self.write_pos, 0);
            self.write_pos -= self.read_pos;
            self.read_pos = 0;
        }
    }

    /// Doubles the buffer when less than a quarter of it is free. Only ever
    /// called after compaction, so the live window already starts at zero.
    fn grow(&mut self) {
        let free = self.buf.len() - self.write_pos;

        if free <= self.buf.len() / 4 {
            self.buf.resize(self.buf.len() * 2, 0);
        }
    }

    /// Extracts every complete command from `[read_pos, write_pos)`,
    /// advancing `read_pos` past each one. Stops cleanly on a partial frame;
    /// a malformed frame or a structurally invalid command returns the batch
    /// accumulated so far along with the error.
    fn parse_batch(&mut self) -> (Vec<Command>, Option<Error>) {
        let mut batch = Vec::new();

        while self.read_pos < self.write_pos {
            let mut cursor = Cursor::new(&self.buf[self.read_pos..self.write_pos]);

            let frame = match Frame::parse(&mut cursor) {
                Ok(frame) => frame,
                Err(frame::Error::Incomplete) => break,
                Err(err) => return (batch, Some(err.into())),
            };

            self.read_pos += cursor.position() as usize;

            match Command::try_from(frame) {
                Ok(command) => batch.push(command),
                Err(err) => return (batch, Some(err)),
            }
        }

        (batch, None)
    }

    /// Serializes a reply frame onto the buffered writer. The bytes reach
    /// the socket on the next [`flush`](Connection::flush).
    pub async fn write_frame(&mut self, frame: &Frame) -> crate::Result<()> {
        self.writer.write_all(&frame.serialize()).await?;
        Ok(())
    }

    /// Writes an `-ERR <message>\r\n` reply line. Error replies are single
    /// protocol lines, so CR and LF in the message are replaced with spaces.
    pub async fn write_error(&mut self, message: &str) -> crate::Result<()> {
        let message = message.replace(['\r', '\n'], " ");

        self.writer
            .write_all(format!("-ERR {}\r\n", message).as_bytes())
            .await?;
        Ok(())
    }

    /// Forces buffered replies out to the socket. Called once per batch:
    /// that single flush is what collapses a pipeline of replies into one
    /// write syscall.
    pub async fn flush(&mut self) -> crate::Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
