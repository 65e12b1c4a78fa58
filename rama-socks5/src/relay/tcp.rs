//! Bidirectional TCP byte copy with traffic accounting (§4.3).

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::traffic::TrafficCounters;

/// Wraps a writer half, crediting every successfully written byte to either
/// the upload or download counter. The counter update happens after the
/// inner write succeeds, so a partial write is still accounted correctly:
/// `tokio::io::copy` retries the remainder as its own write.
struct CountingWriter<W> {
    inner: W,
    traffic: std::sync::Arc<TrafficCounters>,
    upload: bool,
}

impl<W: AsyncWrite + Unpin> AsyncWrite for CountingWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            if self.upload {
                self.traffic.add_upload(n as u64);
            } else {
                self.traffic.add_download(n as u64);
            }
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Copy bytes bidirectionally between `client` and `target` until either
/// side reaches EOF or errors, crediting bytes read from `client` to
/// upload and bytes read from `target` to download.
///
/// Each direction is driven by its own `tokio::io::copy`, run concurrently
/// via `try_join!`: within one direction, each read's payload is fully
/// written before the next read happens, and the two directions never
/// interleave a write (they write to different sockets).
pub async fn copy_bidirectional<A, B>(
    client: A,
    target: B,
    traffic: std::sync::Arc<TrafficCounters>,
) -> std::io::Result<()>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (client_r, client_w) = tokio::io::split(client);
    let (target_r, target_w) = tokio::io::split(target);

    let upload = copy_direction(client_r, target_w, traffic.clone(), true);
    let download = copy_direction(target_r, client_w, traffic, false);

    let result = tokio::try_join!(upload, download);
    result.map(|_| ())
}

async fn copy_direction<R, W>(
    mut reader: ReadHalf<R>,
    writer: WriteHalf<W>,
    traffic: std::sync::Arc<TrafficCounters>,
    upload: bool,
) -> std::io::Result<u64>
where
    R: AsyncRead,
    W: AsyncWrite,
{
    let mut writer = CountingWriter {
        inner: writer,
        traffic,
        upload,
    };
    let n = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.shutdown().await?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::duplex;

    #[tokio::test]
    async fn relays_bytes_and_accounts_traffic() {
        let (client, mut client_peer) = duplex(64);
        let (target, mut target_peer) = duplex(64);
        let traffic = Arc::new(TrafficCounters::new());

        let relay = tokio::spawn(copy_bidirectional(client, target, traffic.clone()));

        client_peer.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        tokio::io::AsyncReadExt::read_exact(&mut target_peer, &mut buf)
            .await
            .unwrap();
        assert_eq!(&buf, b"ping");

        target_peer.write_all(b"pong!").await.unwrap();
        let mut buf = [0u8; 5];
        tokio::io::AsyncReadExt::read_exact(&mut client_peer, &mut buf)
            .await
            .unwrap();
        assert_eq!(&buf, b"pong!");

        drop(client_peer);
        drop(target_peer);
        relay.await.unwrap().unwrap();

        let (upload, download) = traffic.snapshot();
        assert_eq!(upload, 4);
        assert_eq!(download, 5);
    }
}
