// src/core/cache/client.rs

//! A minimal RESP client for administrative commands sent to cache nodes.

use crate::core::ClusterJoinError;
use crate::core::protocol::{RespFrame, RespFrameCodec};
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};

pub struct CacheNodeClient {
    addr: String,
    stream: TcpStream,
    codec: RespFrameCodec,
    timeout: Duration,
}

impl CacheNodeClient {
    /// Connects to `host:port`, giving up after `timeout`.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ClusterJoinError> {
        let addr = format!("{host}:{port}");
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| ClusterJoinError::CacheCluster(format!("connect to {addr} timed out")))?
            .map_err(|e| ClusterJoinError::CacheCluster(format!("connect to {addr}: {e}")))?;
        Ok(Self {
            addr,
            stream,
            codec: RespFrameCodec,
            timeout,
        })
    }

    /// Sends one command frame and waits for exactly one reply frame.
    async fn send_and_receive(&mut self, frame: RespFrame) -> Result<RespFrame, ClusterJoinError> {
        let mut write_buf = BytesMut::new();
        self.codec.encode(frame, &mut write_buf)?;

        tokio::time::timeout(self.timeout, self.stream.write_all(&write_buf))
            .await
            .map_err(|_| {
                ClusterJoinError::CacheCluster(format!("write to {} timed out", self.addr))
            })??;

        let mut read_buf = BytesMut::with_capacity(512);
        loop {
            match tokio::time::timeout(self.timeout, self.stream.read_buf(&mut read_buf)).await {
                Ok(Ok(0)) => {
                    return Err(ClusterJoinError::CacheCluster(format!(
                        "{} closed the connection",
                        self.addr
                    )));
                }
                Ok(Ok(_)) => {
                    if let Some(reply) = self.codec.decode(&mut read_buf)? {
                        return Ok(reply);
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(ClusterJoinError::CacheCluster(format!(
                        "read from {} timed out",
                        self.addr
                    )));
                }
            }
        }
    }

    /// Sends `PING` and expects `PONG`.
    pub async fn ping(&mut self) -> Result<(), ClusterJoinError> {
        match self.send_and_receive(RespFrame::command(["PING"])).await? {
            reply if reply.as_text().is_some_and(|s| s.eq_ignore_ascii_case("PONG")) => Ok(()),
            other => Err(ClusterJoinError::CacheCluster(format!(
                "unexpected reply to PING from {}: {other:?}",
                self.addr
            ))),
        }
    }

    /// Sends `CLUSTER MEET <host> <port>` and expects `OK`.
    pub async fn cluster_meet(&mut self, host: &str, port: u16) -> Result<(), ClusterJoinError> {
        let port = port.to_string();
        let frame = RespFrame::command(["CLUSTER", "MEET", host, port.as_str()]);
        match self.send_and_receive(frame).await? {
            RespFrame::SimpleString(s) if s.eq_ignore_ascii_case("OK") => Ok(()),
            other => Err(ClusterJoinError::CacheCluster(format!(
                "unexpected reply to CLUSTER MEET from {}: {other:?}",
                self.addr
            ))),
        }
    }
}
