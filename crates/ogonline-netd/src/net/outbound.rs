use bytes::Bytes;
use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;

/// Spawns a task writing framed bytes to the socket.
///
/// Exits once every sender is dropped, after flushing and shutting the write
/// side down.
pub fn spawn_writer<S>(
    mut write: S,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
) -> tokio::task::JoinHandle<anyhow::Result<()>>
where
    S: Sink<Bytes, Error = std::io::Error> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            write.send(frame).await?;
        }
        write.close().await?;
        Ok(())
    })
}
