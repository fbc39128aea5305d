//! WebSocket-Implementierung des Duplex-Kanals
//!
//! Produktiv-Transport ueber tokio-tungstenite. Die Leseschleife speist
//! den vorab uebergebenen Ereignis-Sender, dadurch ist der Handler vor
//! der ersten eingehenden Nachricht verdrahtet. Jede Form des
//! Verbindungsendes (Close-Frame, Fehler, Stromende) wird als genau ein
//! `Getrennt`-Ereignis gemeldet.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use gambit_core::{GambitError, Result};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::platform::{DuplexTransport, DuplexVerbindung, TransportEreignis};

type WsSchreiber = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Oeffnet WebSocket-Verbindungen zum Spieldienst
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn neu() -> Self {
        Self
    }
}

#[async_trait]
impl DuplexTransport for WsTransport {
    async fn oeffnen(
        &self,
        url: &str,
        eingang: mpsc::Sender<TransportEreignis>,
    ) -> Result<Arc<dyn DuplexVerbindung>> {
        tracing::info!(url, "Oeffne WebSocket-Verbindung");
        let (strom, _antwort) = connect_async(url)
            .await
            .map_err(|fehler| GambitError::Verbindung(format!("WebSocket-Aufbau: {fehler}")))?;
        let (schreiber, mut leser) = strom.split();

        // Leseschleife: laeuft bis zum Verbindungsende und meldet genau
        // eine Trennung
        tokio::spawn(async move {
            let grund = loop {
                match leser.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if eingang
                            .send(TransportEreignis::Nachricht(text))
                            .await
                            .is_err()
                        {
                            // Besitzer hat den Empfaenger fallen lassen
                            return;
                        }
                    }
                    // Ping/Pong beantwortet tungstenite selbst
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                    Some(Ok(Message::Binary(daten))) => {
                        tracing::debug!(bytes = daten.len(), "Binaerframe verworfen");
                    }
                    Some(Ok(Message::Frame(_))) => continue,
                    Some(Ok(Message::Close(_))) => break "Gegenseite hat geschlossen".to_string(),
                    Some(Err(fehler)) => break format!("Lesefehler: {fehler}"),
                    None => break "Strom beendet".to_string(),
                }
            };
            let _ = eingang.send(TransportEreignis::Getrennt { grund }).await;
        });

        Ok(Arc::new(WsVerbindung {
            schreiber: tokio::sync::Mutex::new(Some(schreiber)),
        }))
    }
}

/// Schreibseite einer offenen WebSocket-Verbindung
struct WsVerbindung {
    schreiber: tokio::sync::Mutex<Option<WsSchreiber>>,
}

#[async_trait]
impl DuplexVerbindung for WsVerbindung {
    async fn senden(&self, text: String) -> Result<()> {
        let mut schreiber = self.schreiber.lock().await;
        match schreiber.as_mut() {
            Some(schreiber) => schreiber
                .send(Message::Text(text))
                .await
                .map_err(|fehler| GambitError::Getrennt(format!("Senden fehlgeschlagen: {fehler}"))),
            None => Err(GambitError::Getrennt("Verbindung bereits geschlossen".into())),
        }
    }

    async fn schliessen(&self) {
        if let Some(mut schreiber) = self.schreiber.lock().await.take() {
            let _ = schreiber.send(Message::Close(None)).await;
            let _ = schreiber.close().await;
        }
    }
}
