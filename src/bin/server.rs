use clap::Parser;
use tokio::net::TcpListener;

use respd::{server, Error};

const ADDR: &str = "0.0.0.0:6379";

#[derive(Parser, Debug)]
struct Args {
    /// The address to listen on
    #[arg(short, long, default_value = ADDR)]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let listener = TcpListener::bind(&args.addr).await?;

    server::run(listener).await
}
