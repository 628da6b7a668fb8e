// Copyright (c) 2024 Botho Foundation

//! Length-delimited framing over a byte stream.

use crate::rpc::error::{RpcError, RpcResult};
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::timeout,
};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// One side of a framed exchange.
pub struct FrameChannel<S> {
    framed: Framed<S, LengthDelimitedCodec>,
}

impl<S> FrameChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `stream`, refusing frames longer than `max_frame_len`.
    pub fn new(stream: S, max_frame_len: usize) -> Self {
        let mut codec = LengthDelimitedCodec::new();
        codec.set_max_frame_length(max_frame_len);
        Self {
            framed: Framed::new(stream, codec),
        }
    }

    /// Send one frame.
    pub async fn send(&mut self, frame: impl Into<Bytes>) -> RpcResult<()> {
        self.framed.send(frame.into()).await.map_err(RpcError::Io)
    }

    /// Receive one frame.
    pub async fn recv(&mut self) -> RpcResult<BytesMut> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(RpcError::Io(e)),
            None => Err(RpcError::ConnectionClosed),
        }
    }

    /// Receive one frame, giving up after `recv_timeout`.
    pub async fn recv_with_timeout(&mut self, recv_timeout: Duration) -> RpcResult<BytesMut> {
        match timeout(recv_timeout, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[tokio::test]
    async fn test_send_and_recv() {
        let (a, b) = duplex(1024);
        let mut left = FrameChannel::new(a, 1024);
        let mut right = FrameChannel::new(b, 1024);

        left.send(Bytes::from_static(b"ping")).await.unwrap();
        assert_eq!(&right.recv().await.unwrap()[..], b"ping");
    }

    #[tokio::test]
    async fn test_wire_framing_is_length_prefixed() {
        let stream = tokio_test::io::Builder::new()
            .read(&frame(b"hello"))
            .write(&frame(b"world"))
            .build();
        let mut channel = FrameChannel::new(stream, 1024);

        assert_eq!(&channel.recv().await.unwrap()[..], b"hello");
        channel.send(Bytes::from_static(b"world")).await.unwrap();
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let (a, _b) = duplex(1024);
        let mut channel = FrameChannel::new(a, 1024);
        let result = channel.recv_with_timeout(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(RpcError::Timeout)));
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (a, b) = duplex(1024);
        drop(b);
        let mut channel = FrameChannel::new(a, 1024);
        assert!(matches!(
            channel.recv().await,
            Err(RpcError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (a, b) = duplex(4096);
        let mut sender = FrameChannel::new(a, 4096);
        let mut receiver = FrameChannel::new(b, 16);

        sender.send(Bytes::from(vec![0u8; 64])).await.unwrap();
        assert!(matches!(receiver.recv().await, Err(RpcError::Io(_))));
    }
}
