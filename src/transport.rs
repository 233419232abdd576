//! Frame transport over TCP
//!
//! The [`Transport`] trait is the seam between the framer and the network:
//! the client only ever sees whole frames. [`TcpTransport`] is the real
//! implementation; tests substitute in-memory mocks.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::config::GivEnergyConfig;
use crate::constants::READ_BUFFER_SIZE;
use crate::error::{GivEnergyError, GivResult};
use crate::frame::{DecodedFrame, FrameDecoder};

/// Frame-level transport abstraction
#[async_trait]
pub trait Transport: Send {
    /// Write one encoded frame to the wire
    async fn send_frame(&mut self, frame: &[u8]) -> GivResult<()>;

    /// Block until the next complete frame arrives
    async fn next_frame(&mut self) -> GivResult<DecodedFrame>;

    /// Close the underlying connection
    async fn close(&mut self) -> GivResult<()>;
}

/// TCP transport owning the socket and the session's frame decoder
pub struct TcpTransport {
    stream: TcpStream,
    decoder: FrameDecoder,
    read_timeout: Duration,
    write_timeout: Duration,
    peer: String,
}

impl TcpTransport {
    /// Connect to the data adapter described by `config`
    pub async fn connect(config: &GivEnergyConfig) -> GivResult<Self> {
        let peer = config.endpoint();
        debug!("connecting to GivEnergy adapter at {}", peer);

        let stream = timeout(config.connect_timeout(), TcpStream::connect(&peer))
            .await
            .map_err(|_| {
                GivEnergyError::Timeout(format!(
                    "connect to {} timed out after {:?}",
                    peer,
                    config.connect_timeout()
                ))
            })?
            .map_err(|e| GivEnergyError::Connection(format!("connect to {} failed: {}", peer, e)))?;

        // Request/response latency matters more than throughput here
        stream.set_nodelay(true)?;

        info!("connected to GivEnergy adapter at {}", peer);

        Ok(Self {
            stream,
            decoder: FrameDecoder::with_recovery(config.recovery),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            peer,
        })
    }

    /// Remote endpoint this transport is connected to
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_frame(&mut self, frame: &[u8]) -> GivResult<()> {
        trace!("tx {} bytes: {}", frame.len(), hex::encode(frame));

        timeout(self.write_timeout, async {
            self.stream.write_all(frame).await?;
            self.stream.flush().await
        })
        .await
        .map_err(|_| GivEnergyError::Timeout(format!("write to {} timed out", self.peer)))??;

        Ok(())
    }

    async fn next_frame(&mut self) -> GivResult<DecodedFrame> {
        loop {
            if let Some(frame) = self.decoder.try_extract()? {
                return Ok(frame);
            }

            let mut buf = [0u8; READ_BUFFER_SIZE];
            let n = timeout(self.read_timeout, self.stream.read(&mut buf))
                .await
                .map_err(|_| {
                    GivEnergyError::Timeout(format!(
                        "no frame from {} within {:?}",
                        self.peer, self.read_timeout
                    ))
                })??;

            if n == 0 {
                return Err(GivEnergyError::Connection(format!(
                    "connection closed by {} ({} bytes buffered)",
                    self.peer,
                    self.decoder.buffered()
                )));
            }

            trace!("rx {} bytes: {}", n, hex::encode(&buf[..n]));
            self.decoder.feed(&buf[..n]);
        }
    }

    async fn close(&mut self) -> GivResult<()> {
        self.stream.shutdown().await?;
        info!("disconnected from GivEnergy adapter at {}", self.peer);
        Ok(())
    }
}
