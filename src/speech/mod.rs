//! Recognized-text sources
//!
//! A source pushes each recognized utterance into the session's text
//! sender. Dropping the sender tells the session the source is gone.
//!
//! The stdin source stands in for a speech engine. It reads on a plain OS
//! thread so a pending read never holds up runtime shutdown.

use color_eyre::{eyre::eyre, Result};
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Forwards trimmed non-empty lines until end of input or until the session
/// stops accepting text. Returns the number of lines forwarded.
///
/// Blocks; must not be called from an async context.
pub fn forward_lines<R: BufRead>(reader: R, text_tx: &mpsc::Sender<String>) -> Result<u64> {
    let mut forwarded = 0;

    for line in reader.lines() {
        let line = line.map_err(|e| eyre!("Failed to read input: {}", e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        debug!("Recognized: '{}'", line);
        if text_tx.blocking_send(line.to_string()).is_err() {
            info!("Session no longer accepts text");
            return Ok(forwarded);
        }
        forwarded += 1;
    }

    info!("End of input after {} lines", forwarded);
    Ok(forwarded)
}

/// Starts the stdin source: every line is one utterance.
pub fn spawn_stdin_source(text_tx: mpsc::Sender<String>) -> Result<JoinHandle<()>> {
    info!("Reading commands from stdin, one per line");
    thread::Builder::new()
        .name("stdin-source".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            if let Err(e) = forward_lines(stdin.lock(), &text_tx) {
                error!("Stdin source failed: {}", e);
            }
        })
        .map_err(|e| eyre!("Failed to spawn stdin source: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_trimmed_non_empty_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"jump\n\n  walk left  \nblock\n";

        assert_eq!(forward_lines(input, &tx).unwrap(), 3);
        drop(tx);
        assert_eq!(rx.blocking_recv().unwrap(), "jump");
        assert_eq!(rx.blocking_recv().unwrap(), "walk left");
        assert_eq!(rx.blocking_recv().unwrap(), "block");
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_stops_when_session_hangs_up() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        assert_eq!(forward_lines(&b"jump\nblock\n"[..], &tx).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_feeds_a_running_receiver() {
        let (tx, mut rx) = mpsc::channel(1);
        let source = thread::spawn(move || forward_lines(&b"up\ndown\n"[..], &tx));

        assert_eq!(rx.recv().await.unwrap(), "up");
        assert_eq!(rx.recv().await.unwrap(), "down");
        assert!(rx.recv().await.is_none());
        assert_eq!(source.join().unwrap().unwrap(), 2);
    }
}
