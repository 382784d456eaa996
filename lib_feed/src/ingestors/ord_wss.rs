//! # Ord Mempool WSS Connector
//!
//! `tokio-tungstenite` implementation of the push transport's connector.
//! Text frames are passed through, binary frames are accepted when they hold
//! UTF-8 text, and ping/pong traffic is absorbed here so the transport only
//! sees payloads.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::TransportError;
use crate::ingestors::transport::{Connection, Connector};

/// Opens WebSocket connections with `connect_async`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WssConnector;

/// An open WebSocket stream.
pub struct WssConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connector for WssConnector {
    type Conn = WssConnection;

    async fn connect(&mut self, url: &Url) -> Result<WssConnection, TransportError> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        log::debug!("WebSocket handshake with {} answered {}", url, response.status());
        Ok(WssConnection { stream })
    }
}

impl Connection for WssConnection {
    async fn recv(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Binary(bin))) => match String::from_utf8(bin.to_vec()) {
                    Ok(text) => return Ok(text),
                    Err(_) => log::warn!("Ignoring non UTF-8 binary frame ({} bytes).", bin.len()),
                },
                Some(Ok(Message::Close(frame))) => {
                    log::debug!("Close frame received: {:?}", frame);
                    return Err(TransportError::Closed);
                }
                // Ping/Pong: tungstenite queues the pong itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Read(e.to_string())),
                None => return Err(TransportError::Closed),
            }
        }
    }
}
