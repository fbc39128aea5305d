//! Match-Kanal – Matchmaking, Zuege und Push-Demultiplexing
//!
//! Aufgesetzt auf den Duplex-Kanal des [`SessionManager`]s. Ausgehend
//! rahmt er Matchmaking-, Zug- und Signalisierungs-Operationen; eingehend
//! verzweigt er Push-Envelopes anhand des OpCodes:
//! - Spielstand-Schnappschuesse werden als Ereignis gehoben
//! - Voice-Signalisierung wird unveraendert (mit Absender) weitergereicht
//! - unbekannte OpCodes werden geloggt und verworfen, niemals fatal
//!
//! Alle Operationen sind best-effort: ohne bereiten Kanal oder ohne
//! beigetretene Partie wird geloggt und ein Fehler zurueckgegeben,
//! es wird nie gepanict.

use gambit_core::{EventBus, GambitError, MatchId, Result};
use gambit_protocol::control::{AntwortPayload, KlientPayload};
use gambit_protocol::envelope::{InboundEnvelope, OpCode};
use gambit_protocol::signal::{KandidatNachricht, KandidatRelais, SdpNachricht, SdpRelais};
use gambit_protocol::spiel::{BestenlistenEintrag, Spielstand};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::manager::{SessionEreignis, SessionManager, VerbindungsStatus};

// ---------------------------------------------------------------------------
// Ereignisse
// ---------------------------------------------------------------------------

/// Eingehende Voice-Signalisierung, unveraendert weitergereicht
#[derive(Debug, Clone)]
pub enum SignalEreignis {
    Offer(SdpNachricht),
    Answer(SdpNachricht),
    Kandidat(KandidatNachricht),
}

/// Ereignisse des Match-Kanals
#[derive(Debug, Clone)]
pub enum MatchEreignis {
    /// Neuer Spielstand-Schnappschuss des Dienstes
    SpielstandAktualisiert(Spielstand),
    /// Voice-Signalisierung eines Mitspielers
    SignalEmpfangen(SignalEreignis),
}

// ---------------------------------------------------------------------------
// MatchChannel
// ---------------------------------------------------------------------------

/// Matchmaking- und Spielprotokoll ueber den Duplex-Kanal
pub struct MatchChannel {
    session: SessionManager,
    /// Aktuell beigetretene Partie; hoechstens eine pro Session
    partie: RwLock<Option<MatchId>>,
    ereignisse: EventBus<MatchEreignis>,
}

impl MatchChannel {
    /// Erstellt den Match-Kanal und startet das Demultiplexing der
    /// Session-Pushes
    pub fn neu(session: SessionManager) -> Arc<Self> {
        let kanal = Arc::new(Self {
            session: session.clone(),
            partie: RwLock::new(None),
            ereignisse: EventBus::neu(),
        });

        let demux = Arc::clone(&kanal);
        let mut session_rx = session.abonnieren();
        tokio::spawn(async move {
            demux.demux_schleife(&mut session_rx).await;
        });

        kanal
    }

    /// Abonniert die Match-Ereignisse
    pub fn abonnieren(&self) -> broadcast::Receiver<MatchEreignis> {
        self.ereignisse.abonnieren()
    }

    /// Aktuell beigetretene Partie (None wenn keine)
    pub fn aktuelle_partie(&self) -> Option<MatchId> {
        self.partie.read().clone()
    }

    /// Sucht eine Partie fuer den Modus und tritt ihr bei.
    ///
    /// Bewusst zweistufig (ID anfragen, dann beitreten): der Dienst ist
    /// alleiniger Schiedsrichter der Zuteilung, damit viele gleichzeitig
    /// suchende Clients sich nicht gegenseitig ueberholen.
    pub async fn partie_suchen(&self, modus: &str) -> Result<MatchId> {
        let antwort = self
            .session
            .anfrage(KlientPayload::PartieSuchen {
                modus: modus.to_string(),
            })
            .await?;
        let match_id = match antwort {
            AntwortPayload::PartieGefunden { match_id } => match_id,
            andere => {
                return Err(GambitError::UngueltigeNachricht(format!(
                    "unerwartete Antwort auf Partiesuche: {andere:?}"
                )))
            }
        };
        self.partie_beitreten(match_id.clone()).await?;
        Ok(match_id)
    }

    /// Tritt der zugeteilten Partie bei
    pub async fn partie_beitreten(&self, match_id: MatchId) -> Result<()> {
        self.session
            .push_senden(KlientPayload::PartieBeitreten {
                match_id: match_id.clone(),
            })
            .await?;
        tracing::info!(partie = %match_id, "Partie beigetreten");
        *self.partie.write() = Some(match_id);
        Ok(())
    }

    /// Bricht die laufende Partiesuche ab
    pub async fn suche_abbrechen(&self) -> Result<()> {
        self.session.push_senden(KlientPayload::SucheAbbrechen).await
    }

    /// Verlaesst die aktuelle Partie – bei laufender Partie wertet der
    /// Dienst das als Aufgabe
    pub async fn partie_verlassen(&self) -> Result<()> {
        let match_id = match self.partie.write().take() {
            Some(match_id) => match_id,
            None => {
                tracing::warn!("Partie verlassen ohne beigetretene Partie");
                return Err(GambitError::KanalNichtBereit("keine Partie beigetreten".into()));
            }
        };
        tracing::info!(partie = %match_id, "Partie verlassen");
        self.session
            .push_senden(KlientPayload::PartieVerlassen { match_id })
            .await
    }

    /// Sendet einen Zug auf die angegebene Feldposition
    pub async fn zug_senden(&self, position: u8) -> Result<()> {
        let match_id = self.partie_erfordern("Zug")?;
        self.session
            .push_senden(KlientPayload::Zug { match_id, position })
            .await
    }

    /// Ruft die Bestenliste ab
    pub async fn bestenliste_abrufen(&self) -> Result<Vec<BestenlistenEintrag>> {
        match self.session.anfrage(KlientPayload::Bestenliste).await? {
            AntwortPayload::BestenlisteAntwort { eintraege } => Ok(eintraege),
            andere => Err(GambitError::UngueltigeNachricht(format!(
                "unerwartete Antwort auf Bestenliste: {andere:?}"
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Voice-Signalisierung (Relais an die aktuelle Partie)
    // -----------------------------------------------------------------------

    /// Reicht ein SDP-Offer an die aktuelle Partie weiter
    pub async fn offer_senden(&self, sdp: String) -> Result<()> {
        let match_id = self.partie_erfordern("Voice-Offer")?;
        self.session
            .push_senden(KlientPayload::VoiceOffer(SdpRelais { match_id, sdp }))
            .await
    }

    /// Reicht ein SDP-Answer an die aktuelle Partie weiter
    pub async fn answer_senden(&self, sdp: String) -> Result<()> {
        let match_id = self.partie_erfordern("Voice-Answer")?;
        self.session
            .push_senden(KlientPayload::VoiceAnswer(SdpRelais { match_id, sdp }))
            .await
    }

    /// Reicht einen ICE-Kandidaten an die aktuelle Partie weiter
    pub async fn kandidat_senden(
        &self,
        kandidat: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u32>,
    ) -> Result<()> {
        let match_id = self.partie_erfordern("Voice-Kandidat")?;
        self.session
            .push_senden(KlientPayload::VoiceKandidat(KandidatRelais {
                match_id,
                kandidat,
                sdp_mid,
                sdp_mline_index,
            }))
            .await
    }

    fn partie_erfordern(&self, operation: &str) -> Result<MatchId> {
        self.partie.read().clone().ok_or_else(|| {
            tracing::warn!(operation, "Operation ohne beigetretene Partie");
            GambitError::KanalNichtBereit("keine Partie beigetreten".into())
        })
    }

    // -----------------------------------------------------------------------
    // Demultiplexing
    // -----------------------------------------------------------------------

    async fn demux_schleife(&self, session_rx: &mut broadcast::Receiver<SessionEreignis>) {
        loop {
            match session_rx.recv().await {
                Ok(SessionEreignis::Push(envelope)) => self.envelope_verarbeiten(envelope),
                Ok(SessionEreignis::StatusGeaendert(VerbindungsStatus::Getrennt)) => {
                    // Trennung beendet die Partie-Zugehoerigkeit
                    if self.partie.write().take().is_some() {
                        tracing::debug!("Partie-Handle nach Trennung verworfen");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(anzahl)) => {
                    tracing::warn!(anzahl, "Demux hinkt hinterher, Ereignisse uebersprungen");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Verzweigt ein Push-Envelope anhand des OpCodes
    fn envelope_verarbeiten(&self, envelope: InboundEnvelope) {
        match envelope.op_code() {
            OpCode::Spielstand => match envelope.payload_als::<Spielstand>() {
                Ok(stand) => self
                    .ereignisse
                    .senden(MatchEreignis::SpielstandAktualisiert(stand)),
                Err(fehler) => {
                    tracing::warn!(fehler = %fehler, "Unlesbarer Spielstand verworfen")
                }
            },
            OpCode::VoiceOffer => self.signal_weiterleiten(&envelope, SignalEreignis::Offer),
            OpCode::VoiceAnswer => self.signal_weiterleiten(&envelope, SignalEreignis::Answer),
            OpCode::VoiceKandidat => match envelope.payload_als::<KandidatNachricht>() {
                Ok(kandidat) => self.ereignisse.senden(MatchEreignis::SignalEmpfangen(
                    SignalEreignis::Kandidat(kandidat),
                )),
                Err(fehler) => {
                    tracing::warn!(fehler = %fehler, "Unlesbarer ICE-Kandidat verworfen")
                }
            },
            // Keepalive beantwortet bereits der Session-Manager
            OpCode::Ping => {}
            OpCode::Unbekannt(op) => {
                tracing::debug!(op, "Unbekannter OpCode verworfen");
            }
        }
    }

    fn signal_weiterleiten(
        &self,
        envelope: &InboundEnvelope,
        einpacken: fn(SdpNachricht) -> SignalEreignis,
    ) {
        match envelope.payload_als::<SdpNachricht>() {
            Ok(nachricht) => self
                .ereignisse
                .senden(MatchEreignis::SignalEmpfangen(einpacken(nachricht))),
            Err(fehler) => tracing::warn!(fehler = %fehler, "Unlesbare Signalisierung verworfen"),
        }
    }
}
