//! Signal-Router – Kopplung Match-Kanal <-> Peer-Controller
//!
//! Eingehend: abonnierte Signalisierungs-Ereignisse des Match-Kanals
//! werden an den Controller verzweigt; fehlerhafte oder unpassende
//! Nachrichten werden geloggt und verworfen, die Sitzung laeuft weiter.
//! Ausgehend: vom Controller erzeugte Offers/Answers/Kandidaten gehen
//! als Relais an die aktuelle Partie.

use gambit_core::UserId;
use gambit_session::{MatchChannel, MatchEreignis, SignalEreignis};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::peer::{PeerController, SignalAusgang};

/// Haelt die beiden Routing-Tasks einer Voice-Sitzung
pub struct SignalRouter {
    eingang: JoinHandle<()>,
    ausgang: JoinHandle<()>,
}

impl SignalRouter {
    /// Startet die Voice-Sitzung und verkabelt beide Richtungen.
    ///
    /// Das Abo auf dem Match-Kanal wird VOR dem Start des Controllers
    /// eingerichtet, damit kein frueh eintreffendes Signal verloren geht.
    pub async fn starten(
        kanal: Arc<MatchChannel>,
        controller: PeerController,
        selbst_id: UserId,
        ist_initiator: bool,
    ) -> gambit_core::Result<Self> {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let match_rx = kanal.abonnieren();

        controller
            .starten(selbst_id, ist_initiator, signal_tx)
            .await?;

        let eingang = tokio::spawn(eingang_schleife(match_rx, controller, selbst_id));
        let ausgang = tokio::spawn(ausgang_schleife(kanal, signal_rx));
        Ok(Self { eingang, ausgang })
    }

    /// Beendet beide Routing-Tasks (der Controller bleibt unberuehrt;
    /// sein Aufraeumen uebernimmt der Besitzer)
    pub fn stoppen(self) {
        self.eingang.abort();
        self.ausgang.abort();
    }
}

async fn eingang_schleife(
    mut match_rx: broadcast::Receiver<MatchEreignis>,
    controller: PeerController,
    selbst_id: UserId,
) {
    loop {
        let signal = match match_rx.recv().await {
            Ok(MatchEreignis::SignalEmpfangen(signal)) => signal,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(anzahl)) => {
                tracing::warn!(anzahl, "Signal-Router hinkt hinterher");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        // Vom Dienst zurueckgespiegelte eigene Signale ignorieren
        let von = match &signal {
            SignalEreignis::Offer(nachricht) | SignalEreignis::Answer(nachricht) => nachricht.von,
            SignalEreignis::Kandidat(kandidat) => kandidat.von,
        };
        if von == selbst_id {
            continue;
        }

        let ergebnis = match signal {
            SignalEreignis::Offer(nachricht) => controller.offer_verarbeiten(&nachricht.sdp).await,
            SignalEreignis::Answer(nachricht) => {
                controller.answer_verarbeiten(&nachricht.sdp).await
            }
            SignalEreignis::Kandidat(kandidat) => {
                controller
                    .kandidat_verarbeiten(
                        &kandidat.kandidat,
                        kandidat.sdp_mid.as_deref(),
                        kandidat.sdp_mline_index,
                    )
                    .await
            }
        };
        if let Err(fehler) = ergebnis {
            // Einzelne Nachricht verwerfen, die Sitzung laeuft weiter
            tracing::warn!(von = %von, fehler = %fehler, "Signalisierungsnachricht verworfen");
        }
    }
}

async fn ausgang_schleife(
    kanal: Arc<MatchChannel>,
    mut signal_rx: mpsc::UnboundedReceiver<SignalAusgang>,
) {
    while let Some(signal) = signal_rx.recv().await {
        let ergebnis = match signal {
            SignalAusgang::Offer { sdp } => kanal.offer_senden(sdp).await,
            SignalAusgang::Answer { sdp } => kanal.answer_senden(sdp).await,
            SignalAusgang::Kandidat {
                kandidat,
                sdp_mid,
                sdp_mline_index,
            } => kanal.kandidat_senden(kandidat, sdp_mid, sdp_mline_index).await,
        };
        if let Err(fehler) = ergebnis {
            tracing::warn!(fehler = %fehler, "Signal-Relais fehlgeschlagen");
        }
    }
}
