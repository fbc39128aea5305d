//! gambit-client – Kompositionswurzel des Kommandozeilen-Clients
//!
//! Verdrahtet die Produktiv-Implementierungen (WebSocket-Transport,
//! HTTP-Anmeldung, Datei-Speicher) mit Session-Manager und Match-Kanal.
//! Der Lebenszyklus liegt vollstaendig beim Aufrufer: erstellen,
//! verbinden, Ereignisse verfolgen, trennen.

pub mod auth;
pub mod config;

use anyhow::Context;
use gambit_session::{
    DateiKvStore, MatchChannel, MatchEreignis, SessionEreignis, SessionManager, WsTransport,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::auth::HttpAuthDienst;
use crate::config::ClientConfig;

/// Der zusammengesetzte Client
pub struct ClientApp {
    config: ClientConfig,
}

impl ClientApp {
    /// Erstellt den Client mit der geladenen Konfiguration
    pub fn neu(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Meldet an, verbindet, sucht eine Partie und verfolgt Ereignisse
    /// bis Ctrl-C oder bis die Wiederverbindung aufgegeben wird
    pub async fn starten(&self, anzeige_name: Option<&str>) -> anyhow::Result<()> {
        let speicher = Arc::new(
            DateiKvStore::oeffnen(&self.config.speicher.identitaets_datei)
                .context("Identitaets-Speicher nicht verfuegbar")?,
        );
        let manager = SessionManager::neu(
            Arc::new(WsTransport::neu()),
            Arc::new(HttpAuthDienst::neu(self.config.dienst.http_url.clone())),
            speicher,
            self.config.session_config(),
        );
        let kanal = MatchChannel::neu(manager.clone());
        let mut session_ereignisse = manager.abonnieren();
        let mut match_ereignisse = kanal.abonnieren();

        let session = manager
            .anmelden(anzeige_name)
            .await
            .context("Anmeldung fehlgeschlagen")?;
        tracing::info!(
            user_id = %session.user_id,
            name = %session.anzeige_name,
            "Angemeldet"
        );

        manager.verbinden().await.context("Kanal-Aufbau fehlgeschlagen")?;
        let partie = kanal
            .partie_suchen(&self.config.spiel.modus)
            .await
            .context("Partiesuche fehlgeschlagen")?;
        tracing::info!(partie = %partie, modus = %self.config.spiel.modus, "Partie gefunden");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Beende auf Nutzerwunsch");
                    let _ = kanal.partie_verlassen().await;
                    manager.trennen().await;
                    return Ok(());
                }
                ereignis = session_ereignisse.recv() => match ereignis {
                    Ok(SessionEreignis::StatusGeaendert(status)) => {
                        tracing::info!(?status, "Verbindungsstatus");
                    }
                    Ok(SessionEreignis::WiederverbindungAufgegeben { versuche }) => {
                        tracing::error!(versuche, "Verbindung verloren, bitte neu starten");
                        return Ok(());
                    }
                    Ok(SessionEreignis::Push(_)) => {}
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return Ok(()),
                },
                ereignis = match_ereignisse.recv() => match ereignis {
                    Ok(MatchEreignis::SpielstandAktualisiert(stand)) => {
                        tracing::info!(
                            status = %stand.status,
                            am_zug = ?stand.am_zug,
                            gewinner = ?stand.gewinner,
                            "Spielstand"
                        );
                    }
                    Ok(MatchEreignis::SignalEmpfangen(_)) => {
                        // Voice braucht eine Medienebene der Plattform;
                        // der Kommandozeilen-Client hat keine
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return Ok(()),
                },
            }
        }
    }
}
