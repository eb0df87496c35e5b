// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! WebSocket bridge transport.
//!
//! Connects to a bridge process that sits on the media server and forwards
//! room traffic as JSON text messages (see [`wire`](crate::transport::wire)
//! for the format). The bridge owns codecs and reconnection; from here the
//! room is just an ordered event stream plus an ordered audio sink.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::audio::AudioChunk;
use crate::error::TransportError;
use crate::transport::{wire, AudioSink, RoomEvent, RoomSource};

/// How long to wait for the bridge to accept the connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Type aliases for the WebSocket split halves
// ---------------------------------------------------------------------------

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Room source backed by a bridge WebSocket.
pub struct BridgeRoom {
    stream: WsStream,
    sink: BridgeAudioSink,
    disconnected: bool,
}

impl BridgeRoom {
    /// Connect to a bridge endpoint (`ws://` or `wss://`).
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let connect = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url)).await;
        let (ws_stream, _response) = match connect {
            Ok(Ok((stream, response))) => (stream, response),
            Ok(Err(e)) => return Err(TransportError::WebSocket(e)),
            Err(_) => return Err(TransportError::Closed("bridge connect timed out".into())),
        };

        tracing::debug!(url, "bridge connection established");

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(Self::writer_task(write, rx));

        Ok(Self {
            stream: read,
            sink: BridgeAudioSink { tx },
            disconnected: false,
        })
    }

    /// The audio sink paired with this room. Cheap to clone.
    pub fn sink(&self) -> BridgeAudioSink {
        self.sink.clone()
    }

    /// Forwards queued outbound messages onto the socket until the channel
    /// or the socket closes.
    async fn writer_task(mut write: WsSink, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                tracing::debug!(error = %e, "bridge write failed, stopping writer");
                break;
            }
        }
        let _ = write.close().await;
    }
}

#[async_trait]
impl RoomSource for BridgeRoom {
    async fn next_event(&mut self) -> Option<RoomEvent> {
        if self.disconnected {
            return None;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => match wire::decode_event(&text) {
                    Ok(Some(event)) => {
                        if let RoomEvent::Disconnected { .. } = event {
                            self.disconnected = true;
                        }
                        return Some(event);
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed bridge message");
                        continue;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    self.disconnected = true;
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "closed".to_string());
                    return Some(RoomEvent::Disconnected { reason });
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_))) => {
                    // Pings are answered by tungstenite; the protocol is
                    // text-only, so binary is noise.
                    continue;
                }
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    self.disconnected = true;
                    return Some(RoomEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
                None => {
                    self.disconnected = true;
                    return Some(RoomEvent::Disconnected {
                        reason: "stream ended".to_string(),
                    });
                }
            }
        }
    }
}

/// Sink half of a [`BridgeRoom`].
#[derive(Clone)]
pub struct BridgeAudioSink {
    tx: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl AudioSink for BridgeAudioSink {
    async fn write(&self, chunk: AudioChunk) -> Result<(), TransportError> {
        let text = wire::encode_audio(&chunk)?;
        self.tx
            .send(Message::Text(text))
            .map_err(|_| TransportError::Closed("bridge writer gone".into()))
    }

    async fn clear(&self) -> Result<(), TransportError> {
        let text = wire::encode_clear()?;
        self.tx
            .send(Message::Text(text))
            .map_err(|_| TransportError::Closed("bridge writer gone".into()))
    }
}
