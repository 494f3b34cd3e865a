//! Line-oriented test client for the game server.
//!
//! Every stdin line is sent as one datagram; every datagram received from
//! the server is printed as it arrives.

use clap::Parser;
use log::{error, info};
use shared::{DEFAULT_PORT, MAX_FRAME_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
    server: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
    info!("Client socket bound to {}", socket.local_addr()?);
    info!("Sending to {}", args.server);

    let receiver = {
        let socket = Arc::clone(&socket);
        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_FRAME_SIZE];
            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, _)) => print!("{}", String::from_utf8_lossy(&buffer[..len])),
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        break;
                    }
                }
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        socket.send_to(line.as_bytes(), args.server).await?;
    }

    receiver.abort();
    Ok(())
}
