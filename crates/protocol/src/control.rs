//! Control-Protokoll (Duplex-Kanal + Auth-Roundtrip)
//!
//! Definiert alle Steuerungsnachrichten zwischen Client und Spieldienst.
//!
//! ## Design
//! - Request/Response Pattern: jede ausgehende Nachricht traegt eine
//!   `request_id: u32`, der Dienst kopiert die ID in die Antwort
//! - JSON-Serialisierung via serde (Textframes, nicht zeitkritisch)
//! - Tagged Enums fuer typsichere Nachrichtentypen

use gambit_core::types::{MatchId, UserId};
use serde::{Deserialize, Serialize};

use crate::signal::{KandidatRelais, SdpRelais};
use crate::spiel::BestenlistenEintrag;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    InternalError,
    InvalidRequest,
    NotFound,
    RateLimited,
    // Auth
    NameVergeben,
    InvalidCredentials,
    SessionExpired,
    // Matchmaking
    KeinePartieGefunden,
    PartieVoll,
    // Konto
    LoeschungAbgelehnt,
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Auth-Roundtrip (laeuft getrennt vom Duplex-Kanal)
// ---------------------------------------------------------------------------

/// Anmeldung mit Geraete-Token und Wunschnamen
///
/// Der Geraete-Token wird einmal erzeugt, dauerhaft gespeichert und bei
/// jeder Anmeldung wiederverwendet, damit derselbe logische Account
/// angefragt wird.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnmeldeAnfrage {
    /// Stabiler, opaker Geraete-Token
    pub geraete_token: String,
    /// Gewuenschter Anzeigename (kann als vergeben abgelehnt werden)
    pub anzeige_name: String,
    /// Client-Version fuer Kompatibilitaetspruefung
    pub client_version: String,
}

/// Erfolgreiche Anmelde-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnmeldeAntwort {
    /// Zugewiesene User-ID
    pub user_id: UserId,
    /// Vom Dienst bestaetigter Anzeigename
    pub anzeige_name: String,
    /// Sitzungs-Token, bindet den Duplex-Kanal an die Session
    pub sitzungs_token: String,
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten (Client -> Dienst)
// ---------------------------------------------------------------------------

/// Alle ausgehenden Nachrichten-Typen (typsicher via Tagged Enum)
///
/// Anfragen erwarten eine Antwort mit gleicher `request_id`; Pushes sind
/// fire-and-forget und werden vom Dienst nicht beantwortet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KlientPayload {
    // Anfragen
    /// Partie fuer den Modus suchen oder erstellen lassen.
    /// Der Dienst ist alleiniger Schiedsrichter der Zuteilung, damit
    /// gleichzeitig suchende Clients sich nicht gegenseitig ueberholen.
    PartieSuchen { modus: String },
    /// Bestenliste abrufen
    Bestenliste,
    /// Konto-Daten serverseitig loeschen (Bestenlisten-/Profileintrag)
    KontoLoeschen,

    // Pushes
    /// Der vom Dienst zugeteilten Partie beitreten
    PartieBeitreten { match_id: MatchId },
    /// Partie verlassen – gilt bei laufender Partie als Aufgabe
    PartieVerlassen { match_id: MatchId },
    /// Laufende Partiesuche abbrechen
    SucheAbbrechen,
    /// Zug auf die angegebene Feldposition
    Zug { match_id: MatchId, position: u8 },

    // Voice-Signalisierung (an die aktuelle Partie adressiert)
    VoiceOffer(SdpRelais),
    VoiceAnswer(SdpRelais),
    VoiceKandidat(KandidatRelais),

    // Keepalive
    /// Antwort auf einen Ping-Push des Dienstes
    Pong { echo_timestamp_ms: u64 },
}

/// Ausgehende Nachricht mit Request/Response-Zuordnung
///
/// Jede Nachricht traegt eine `request_id` die der Client monoton vergibt.
/// Bei Pushes dient die ID nur der Log-Korrelation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KlientNachricht {
    /// Eindeutige Nachrichten-ID fuer Request/Response-Zuordnung
    pub request_id: u32,
    /// Inhalt der Nachricht
    pub payload: KlientPayload,
}

impl KlientNachricht {
    /// Erstellt eine neue ausgehende Nachricht
    pub fn neu(request_id: u32, payload: KlientPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt eine Pong-Antwort auf einen Server-Ping
    pub fn pong(request_id: u32, echo_timestamp_ms: u64) -> Self {
        Self::neu(request_id, KlientPayload::Pong { echo_timestamp_ms })
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Antworten (Dienst -> Client, mit request_id)
// ---------------------------------------------------------------------------

/// Alle Antwort-Typen auf Anfragen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AntwortPayload {
    /// Antwort auf `PartieSuchen`: zugeteilte Partie-ID
    PartieGefunden { match_id: MatchId },
    /// Antwort auf `Bestenliste`
    BestenlisteAntwort { eintraege: Vec<BestenlistenEintrag> },
    /// Bestaetigung der Konto-Loeschung (der Dienst trennt danach
    /// ueblicherweise selbst die Verbindung)
    KontoGeloescht,
    /// Fehler-Antwort auf eine beliebige Anfrage
    Fehler(ErrorResponse),
}

/// Antwort-Rahmen mit der gespiegelten Request-ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntwortRahmen {
    pub request_id: u32,
    pub payload: AntwortPayload,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
