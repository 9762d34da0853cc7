//! Live bus monitor subcommand.
//!
//! Streams every extracted frame with a timestamp and decoded field
//! breakdown until interrupted, then prints a short summary. Useful for
//! eyeballing ambient traffic before starting capture sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::constants::READ_POLL_TIMEOUT;
use crate::decode::DecodedFrame;
use crate::extractor::FrameExtractor;
use crate::transport::{TcpTransport, Transport};

/// Monitors the bus at `host:port` until `cancel` trips.
pub fn run(host: &str, port: u16, cancel: Arc<AtomicBool>) -> Result<()> {
    let mut transport = TcpTransport::connect(host, port)?;
    let mut extractor = FrameExtractor::new();
    let mut count: u64 = 0;

    println!("Monitoring {}. Press Ctrl-C to stop.", transport.peer());

    while !cancel.load(Ordering::Relaxed) {
        let chunk = transport.read_chunk(READ_POLL_TIMEOUT)?;
        for frame in extractor.feed(&chunk) {
            count += 1;
            let stamp = chrono::Local::now().format("%H:%M:%S%.3f");
            println!("[{stamp}] #{count} {frame}");
            println!("          {}", DecodedFrame::decode(&frame).summary());
        }
    }

    println!(
        "\n{count} frames observed, {} spans dropped.",
        extractor.dropped_spans()
    );
    Ok(())
}
