use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument};

use crate::commands::executable::Executable;
use crate::connection::{Connection, Status};
use crate::store::Store;
use crate::Error;

/// Accepts connections on `listener` until the process exits, serving every
/// client out of one shared keyspace. Each connection runs on its own task;
/// the keyspace is the only state the tasks share.
pub async fn run(listener: TcpListener) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let store = Store::new();

    info!("Server listening on {}", listener.local_addr()?);

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        debug!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store).await {
                error!("Connection error: {}", e);
            }
        });
    }
}

#[instrument(name = "connection", skip(stream, store))]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream);

    loop {
        let (batch, status) = conn.read_commands().await?;

        for command in batch {
            debug!("Executing command: {:?}", command);
            match command.exec(store.clone()) {
                Ok(frame) => conn.write_frame(&frame).await?,
                // Semantic errors are per command; the connection stays up.
                Err(e) => conn.write_error(&e.to_string()).await?,
            }
        }

        // One flush per batch, however many replies it holds.
        conn.flush().await?;

        match status {
            Status::Open => {}
            Status::EndOfStream => {
                debug!("Connection closed by peer");
                return Ok(());
            }
            Status::Fatal(e) => {
                conn.write_error(&e.to_string()).await?;
                conn.flush().await?;
                return Err(e);
            }
        }
    }
}
