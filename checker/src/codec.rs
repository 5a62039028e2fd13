//! `Content-Length` framing for the checker exchange.
//!
//! Each message is `Content-Length: N\r\n\r\n` followed by N bytes of JSON,
//! the same framing language servers use. Both ends of the checker protocol
//! share this module.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Proof documents are small; anything above this is a broken peer.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const LENGTH_HEADER: &str = "Content-Length";

pub struct FrameReader<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Reads one frame. `Ok(None)` means the peer closed the stream cleanly,
    /// before any byte of a new frame.
    pub async fn read_frame(&mut self) -> Result<Option<Value>> {
        let Some(length) = self.read_length().await? else {
            return Ok(None);
        };
        if length > MAX_FRAME_BYTES {
            bail!("frame of {length} bytes exceeds the {MAX_FRAME_BYTES} byte limit");
        }

        let mut body = vec![0u8; length];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading frame body")?;
        let value = serde_json::from_slice(&body).context("decoding frame body")?;
        Ok(Some(value))
    }

    async fn read_length(&mut self) -> Result<Option<usize>> {
        let mut length = None;
        let mut started = false;
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("reading frame header")?;
            if read == 0 {
                if started {
                    bail!("stream ended inside frame headers");
                }
                return Ok(None);
            }
            started = true;

            let header = self.line.trim();
            if header.is_empty() {
                break;
            }
            let Some((name, value)) = header.split_once(':') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case(LENGTH_HEADER) {
                let parsed = value
                    .trim()
                    .parse()
                    .with_context(|| format!("bad {LENGTH_HEADER} value {:?}", value.trim()))?;
                length = Some(parsed);
            }
        }
        length
            .map(Some)
            .with_context(|| format!("frame has no {LENGTH_HEADER} header"))
    }
}

pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes and flushes one frame.
    pub async fn write_frame(&mut self, message: &Value) -> Result<()> {
        let body = serde_json::to_vec(message).context("encoding frame body")?;
        let header = format!("{LENGTH_HEADER}: {}\r\n\r\n", body.len());
        self.writer
            .write_all(header.as_bytes())
            .await
            .context("writing frame header")?;
        self.writer
            .write_all(&body)
            .await
            .context("writing frame body")?;
        self.writer.flush().await.context("flushing frame")?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
