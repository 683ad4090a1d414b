//! ClamAV daemon client speaking the `clamd` socket protocol.
//!
//! Packets are streamed with `zINSTREAM`: every chunk is prefixed with its
//! length as a 4-byte big-endian integer and a zero length ends the stream.
//! The daemon answers with a NUL-terminated line such as `stream: OK` or
//! `stream: Eicar-Test-Signature FOUND`.

use std::path::Path;

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;

use crate::{
    error::{PacketError, Result},
    ports::{ScanVerdict, VirusScanner},
};

/// Standard `clamd` TCP port.
pub const DEFAULT_CLAMD_PORT: u16 = 3310;
/// Bytes per `INSTREAM` chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const INSTREAM: &[u8] = b"zINSTREAM\0";
const PING: &[u8] = b"zPING\0";
const MAX_REPLY_LEN: usize = 4 * 1024;

/// [`VirusScanner`] talking to a `clamd` daemon over TCP.
#[derive(Debug, Clone)]
pub struct ClamdScanner {
    host: String,
    port: u16,
    chunk_size: usize,
}

impl ClamdScanner {
    /// Scanner for the daemon at `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the stream chunk size (at least one byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// `host:port` of the daemon.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Round-trip `PING` to confirm the daemon is reachable.
    pub async fn ping(&self) -> Result<()> {
        let mut stream = self.connect().await?;
        stream
            .write_all(PING)
            .await
            .map_err(|e| scan_io("sending PING", e))?;
        let reply = read_reply(&mut stream).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(PacketError::ScanFailure(format!(
                "unexpected PING reply '{reply}'"
            )))
        }
    }

    async fn connect(&self) -> Result<TcpStream> {
        TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                PacketError::ScanFailure(format!(
                    "clamd at {} unreachable: {e}",
                    self.address()
                ))
            })
    }
}

#[async_trait]
impl VirusScanner for ClamdScanner {
    async fn scan_file(&self, path: &Path) -> Result<ScanVerdict> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| {
            PacketError::ScanFailure(format!(
                "cannot open {} for scanning: {e}",
                path.display()
            ))
        })?;
        let mut stream = self.connect().await?;

        stream
            .write_all(INSTREAM)
            .await
            .map_err(|e| scan_io("sending INSTREAM", e))?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut sent = 0usize;
        loop {
            let read = file
                .read(&mut buf)
                .await
                .map_err(|e| scan_io("reading packet", e))?;
            if read == 0 {
                break;
            }
            let len = u32::try_from(read).map_err(|_| {
                PacketError::ScanFailure("chunk larger than u32".into())
            })?;
            stream
                .write_all(&len.to_be_bytes())
                .await
                .map_err(|e| scan_io("streaming chunk", e))?;
            stream
                .write_all(&buf[..read])
                .await
                .map_err(|e| scan_io("streaming chunk", e))?;
            sent += read;
        }
        stream
            .write_all(&0u32.to_be_bytes())
            .await
            .map_err(|e| scan_io("terminating stream", e))?;
        stream
            .flush()
            .await
            .map_err(|e| scan_io("terminating stream", e))?;

        let reply = read_reply(&mut stream).await?;
        debug!(
            target: "scan::packet",
            bytes = sent,
            reply = %reply,
            "clamd replied"
        );
        parse_reply(&reply)
    }
}

fn scan_io(action: &str, err: std::io::Error) -> PacketError {
    PacketError::ScanFailure(format!("{action} failed: {err}"))
}

async fn read_reply(stream: &mut TcpStream) -> Result<String> {
    let mut reply = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let read = stream
            .read(&mut buf)
            .await
            .map_err(|e| scan_io("reading reply", e))?;
        if read == 0 {
            break;
        }
        reply.extend_from_slice(&buf[..read]);
        if reply.contains(&0) {
            break;
        }
        if reply.len() > MAX_REPLY_LEN {
            return Err(PacketError::ScanFailure(
                "clamd reply exceeds maximum length".into(),
            ));
        }
    }

    let end = reply.iter().position(|b| *b == 0).unwrap_or(reply.len());
    let text = String::from_utf8_lossy(&reply[..end]).trim().to_string();
    if text.is_empty() {
        return Err(PacketError::ScanFailure(
            "clamd closed the connection without a reply".into(),
        ));
    }
    Ok(text)
}

/// Interpret one clamd reply line.
pub fn parse_reply(reply: &str) -> Result<ScanVerdict> {
    let body = reply
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(reply)
        .trim();

    if body == "OK" {
        return Ok(ScanVerdict::Clean);
    }
    if let Some(signature) = body.strip_suffix(" FOUND") {
        let signature = signature.trim();
        return Ok(ScanVerdict::Infected {
            signature: (!signature.is_empty()).then(|| signature.to_string()),
        });
    }
    Err(PacketError::ScanFailure(format!("clamd reported '{reply}'")))
}
