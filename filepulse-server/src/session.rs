//! Per-subscriber session: `ACCEPTED → WATCHING → CLOSED`.
//!
//! One task per accepted connection, one watcher per task. Sessions share
//! nothing; a failure here never reaches a sibling session or the accept
//! loop.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use filepulse_protocol::{encode, Message};

use crate::error::ServerError;
use crate::watcher::{FileWatcher, WatchEvent};

/// Drive one subscriber connection to completion.
///
/// Greets the peer with `watching`, registers a dedicated watch, then
/// forwards each change until the peer disconnects or the watch fails.
pub(crate) async fn run_session<S>(
    stream: S,
    session: u64,
    watch_path: &Path,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);

    // ACCEPTED: the greeting goes out before any watch exists, so the
    // subscriber always sees `watching` first.
    let file = watch_path.display().to_string();
    if !send(&mut writer, session, &Message::Watching { file }).await {
        return Ok(());
    }

    // WATCHING: the watch lives exactly as long as this session.
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut watcher = FileWatcher::start(watch_path, event_tx)?;
    watch_loop(reader, writer, session, &mut watcher, event_rx).await;
    Ok(())
}

/// Forward watch events until the connection or the watch goes away.
///
/// Always leaves the watcher stopped — the CLOSED transition cancels the
/// registration before the session ends, whatever path led here.
pub(crate) async fn watch_loop<R, W>(
    mut reader: R,
    mut writer: W,
    session: u64,
    watcher: &mut FileWatcher,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Subscribers have nothing to say; reads only detect disconnect.
    let mut inbound = [0u8; 256];

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(WatchEvent::Changed { timestamp_ms }) => {
                    let message = Message::Changed { timestamp: timestamp_ms };
                    if !send(&mut writer, session, &message).await {
                        break;
                    }
                }
                Some(WatchEvent::Failed { reason }) => {
                    tracing::warn!(session, %reason, "watch failed; closing session");
                    break;
                }
                None => break,
            },
            read = reader.read(&mut inbound) => match read {
                Ok(0) => {
                    tracing::info!(session, "subscriber disconnected");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(session, error = %err, "subscriber read error; closing session");
                    break;
                }
            },
        }
    }

    watcher.stop();
}

/// Write one encoded message. A failed write means the peer is gone; it is
/// logged and ends the session through normal cleanup, never as an error.
async fn send<W>(writer: &mut W, session: u64, message: &Message) -> bool
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode(message);
    let result = async {
        writer.write_all(&bytes).await?;
        writer.flush().await
    }
    .await;

    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(session, error = %err, "write to closed subscriber ignored");
            false
        }
    }
}
