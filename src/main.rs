//! Demo binary for `nighthouse`.
//!
//! Connects with the given credentials and either pushes a display frame or
//! prints the user's model stream.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use futures::StreamExt;
use nighthouse::{
    Auth,
    LIGHTHOUSE_COLS,
    LIGHTHOUSE_FRAME_BYTES,
    LIGHTHOUSE_ROWS,
    LighthouseBuilder,
    protocol::display::window_offset,
};
use tracing::info;

/// Diagonal RGB gradient, shifted by `shift` windows.
fn gradient(shift: usize) -> Vec<u8> {
    let mut frame = vec![0; LIGHTHOUSE_FRAME_BYTES];
    let span = LIGHTHOUSE_ROWS + LIGHTHOUSE_COLS;
    for row in 0..LIGHTHOUSE_ROWS {
        for col in 0..LIGHTHOUSE_COLS {
            let Some(offset) = window_offset(row, col) else {
                continue;
            };
            let step = (row + col + shift) % span * 255 / span;
            let level = u8::try_from(step).unwrap_or(u8::MAX);
            frame[offset] = level;
            frame[offset + 1] = u8::MAX - level;
            frame[offset + 2] = level / 2;
        }
    }
    frame
}

#[tokio::main]
async fn main() -> nighthouse::Result<()> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let lh = LighthouseBuilder::new(Auth::new(cli.user, cli.token))
        .url(cli.url)
        .connect()
        .await?;
    info!("connected");

    match cli.command {
        Command::Display { shift } => {
            let reply = lh.put_model(&gradient(shift)).await?;
            println!("{} {}", reply.status, reply.message.unwrap_or_default());
        }
        Command::Stream { limit } => {
            let mut stream = lh.stream_model().await?;
            let mut seen = 0;
            while let Some(reply) = stream.next().await {
                println!("{:?}", reply?.payload);
                seen += 1;
                if limit.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            stream.detach().await?;
        }
    }
    lh.close().await
}
