//! Decode length-prefixed packets from stdin.
//!
//! ```text
//! printf '\x01\x2a\x03abc' | RUST_LOG=debug packetizer
//! ```

use bytes::Bytes;
use chunkwise::Driver;
use chunkwise::async_stream::tokio_impl::{ChannelSink, drive};
use packetizer::Packetizer;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const READ_SIZE: usize = 4096;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (chunk_tx, chunk_rx) = mpsc::channel::<Bytes>(8);
    let (sink, mut packets) = ChannelSink::channel();
    let driver = tokio::spawn(drive(Driver::new(Packetizer::default), sink, chunk_rx));

    let reader = tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let mut buf = vec![0u8; READ_SIZE];
        loop {
            let read = stdin.read(&mut buf).await?;
            if read == 0 || chunk_tx.send(Bytes::copy_from_slice(&buf[..read])).await.is_err() {
                return Ok::<_, std::io::Error>(());
            }
        }
    });

    let mut count = 0usize;
    while let Some(result) = packets.recv().await {
        match result {
            Ok(packet) => {
                count += 1;
                println!("{packet}");
            }
            Err(error) => tracing::error!(kind = error.kind(), "{error}"),
        }
    }

    let driver = driver.await.map_err(std::io::Error::other)?;
    tracing::info!(count, state = ?driver.state(), "done");

    // An errored stream stops reading while stdin may still be open.
    if reader.is_finished() {
        reader.await.map_err(std::io::Error::other)??;
    } else {
        reader.abort();
    }
    Ok(())
}
