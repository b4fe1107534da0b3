//! Zip bundles of selected campaign images, streamed as they are written.

use bytes::Bytes;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CHUNK_BYTES: usize = 64 * 1024;
const CHANNEL_DEPTH: usize = 8;

#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Name inside the archive.
    pub name: String,
    pub path: PathBuf,
}

/// Start writing an archive on the blocking pool and return the byte stream.
/// Chunks are sent as soon as they fill, so the archive is never held whole
/// in memory. If the receiver goes away the writer stops at the next chunk.
pub fn bundle_stream(entries: Vec<BundleEntry>) -> ReceiverStream<io::Result<Bytes>> {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let error_tx = tx.clone();

    tokio::task::spawn_blocking(move || {
        let result = write_archive(ChannelWriter::new(tx), &entries);
        if let Err(e) = result {
            tracing::error!("Zip bundle failed: {}", e);
            let _ = error_tx.blocking_send(Err(io::Error::other(e.to_string())));
        }
    });

    ReceiverStream::new(rx)
}

fn write_archive<W: Write>(out: W, entries: &[BundleEntry]) -> zip::result::ZipResult<()> {
    let mut zip = ZipWriter::new_stream(out);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for entry in entries {
        let mut file = std::fs::File::open(&entry.path)?;
        zip.start_file(entry.name.as_str(), options)?;
        io::copy(&mut file, &mut zip)?;
    }

    let mut out = zip.finish()?;
    out.flush()?;
    Ok(())
}

/// Buffers writes into fixed-size chunks and hands them to the response body.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_BYTES),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(
            &mut self.buf,
            Vec::with_capacity(CHUNK_BYTES),
        ));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "download receiver closed"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_BYTES {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        let _ = self.send_buffered();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tokio_stream::StreamExt;

    async fn collect(mut stream: ReceiverStream<io::Result<Bytes>>) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn archive_contains_each_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(tmp.path().join("a.png"), b"first image").unwrap();
        std::fs::write(tmp.path().join("b.jpg"), &big).unwrap();

        let entries = vec![
            BundleEntry {
                name: "a.png".into(),
                path: tmp.path().join("a.png"),
            },
            BundleEntry {
                name: "b.jpg".into(),
                path: tmp.path().join("b.jpg"),
            },
        ];
        let bytes = collect(bundle_stream(entries)).await.unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut first = String::new();
        archive
            .by_name("a.png")
            .unwrap()
            .read_to_string(&mut first)
            .unwrap();
        assert_eq!(first, "first image");

        let mut second = Vec::new();
        archive
            .by_name("b.jpg")
            .unwrap()
            .read_to_end(&mut second)
            .unwrap();
        assert_eq!(second, big);
    }

    #[tokio::test]
    async fn missing_file_ends_stream_with_error() {
        let tmp = tempfile::tempdir().unwrap();
        let entries = vec![BundleEntry {
            name: "gone.png".into(),
            path: tmp.path().join("gone.png"),
        }];
        assert!(collect(bundle_stream(entries)).await.is_err());
    }
}
