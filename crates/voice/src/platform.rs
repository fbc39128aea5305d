//! Plattform-Traits der Medienebene
//!
//! Mikrofonzugriff, Peer-Verbindung und Pegelmessung sind Faehigkeiten
//! der Plattform (Browser-Engine bzw. Betriebssystem), keine Kernlogik.
//! Die Traits halten die Schnittstelle bewusst schmal, damit der
//! Controller und die Sprachaktivitaets-Erkennung gegen Fakes laufen.

use async_trait::async_trait;
use gambit_core::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Audio-Tracks und Mikrofon
// ---------------------------------------------------------------------------

/// Ein Audio-Track (lokal oder entfernt)
pub trait AudioTrack: Send + Sync {
    /// Aktiviert bzw. deaktiviert den Track (Stummschaltung) –
    /// ohne Neuverhandlung der Verbindung
    fn aktiv_setzen(&self, aktiv: bool);

    fn ist_aktiv(&self) -> bool;

    /// Gibt die zugrunde liegende Medienressource frei; mehrfach aufrufbar
    fn stoppen(&self);
}

/// Mikrofonzugriff der Plattform
///
/// Verweigert die Plattform den Zugriff, muss der Fehler als
/// [`gambit_core::GambitError::MikrofonVerweigert`] gemeldet werden –
/// die Oberflaeche erklaert dann die Berechtigung, das Spiel laeuft weiter.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn mikrofon_oeffnen(&self) -> Result<Arc<dyn AudioTrack>>;
}

/// Liefert den normalisierten Signalpegel (0.0–1.0) eines Streams
pub trait AudioLevelSource: Send + Sync {
    fn pegel(&self) -> f32;
}

// ---------------------------------------------------------------------------
// Peer-Verbindung
// ---------------------------------------------------------------------------

/// Verbindungszustand der Peer-Verbindung (Transport-Ebene)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerZustand {
    Neu,
    Verbindet,
    Verbunden,
    Getrennt,
    Fehlgeschlagen,
    Geschlossen,
}

/// Ereignisse der Peer-Verbindung an den Controller
#[derive(Clone)]
pub enum PeerEreignis {
    /// Lokal entdeckter ICE-Kandidat (Trickle) – an den Mitspieler relaisieren
    LokalerKandidat {
        kandidat: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u32>,
    },
    /// Audio-Track des Mitspielers eingetroffen
    RemoteTrack(Arc<dyn AudioTrack>),
    /// Transport-Zustand hat gewechselt
    ZustandGeaendert(PeerZustand),
}

/// Erstellt Peer-Verbindungen
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Erstellt eine Verbindung, konfiguriert mit den angegebenen
    /// oeffentlichen STUN-Endpunkten fuer die NAT-Durchdringung.
    ///
    /// Der Ereignis-Sender ist vor dem Aufloesen verdrahtet; Kandidaten
    /// und Tracks koennen ab dann jederzeit eintreffen.
    async fn verbindung_erstellen(
        &self,
        stun_server: &[String],
        ereignisse: mpsc::Sender<PeerEreignis>,
    ) -> Result<Arc<dyn PeerVerbindung>>;
}

/// Eine erstellte Peer-Verbindung
#[async_trait]
pub trait PeerVerbindung: Send + Sync {
    /// Haengt den lokalen Audio-Track an die Verbindung
    async fn lokalen_track_anhaengen(&self, track: Arc<dyn AudioTrack>) -> Result<()>;

    /// Erstellt ein SDP-Offer und setzt es als lokale Beschreibung
    async fn offer_erstellen(&self) -> Result<String>;

    /// Wendet ein Remote-Offer an und erstellt das zugehoerige Answer
    /// (setzt Remote- und lokale Beschreibung)
    async fn answer_erstellen(&self, offer: &str) -> Result<String>;

    /// Wendet das Remote-Answer an (Initiator-Seite)
    async fn answer_anwenden(&self, answer: &str) -> Result<()>;

    /// Fuegt einen Remote-ICE-Kandidaten hinzu
    async fn kandidat_hinzufuegen(
        &self,
        kandidat: &str,
        sdp_mid: Option<&str>,
        sdp_mline_index: Option<u32>,
    ) -> Result<()>;

    /// Startet die Wiedergabe eines Remote-Tracks.
    ///
    /// Kann an Autoplay-Beschraenkungen scheitern; das ist zu melden,
    /// aber nicht fatal – das Entsperren braucht ggf. eine Nutzergeste.
    async fn wiedergabe_starten(&self, track: &Arc<dyn AudioTrack>) -> Result<()>;

    /// Schliesst die Verbindung; mehrfach aufrufbar
    async fn schliessen(&self);
}
