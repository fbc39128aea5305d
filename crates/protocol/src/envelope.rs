//! Eingehende Push-Nachrichten (Envelope + OpCode)
//!
//! Der Dienst pusht Nachrichten als Envelope mit numerischem
//! Diskriminator-Feld `op`. Der OpCode waehlt die Dekodierung des
//! Payloads; unbekannte Codes werden geloggt und verworfen, niemals
//! als Fehler behandelt.

use serde::{Deserialize, Serialize};

use crate::control::AntwortRahmen;

// ---------------------------------------------------------------------------
// OpCodes
// ---------------------------------------------------------------------------

/// Spielstand-Schnappschuss
pub const OP_SPIELSTAND: u8 = 1;
/// SDP-Offer eines Mitspielers
pub const OP_VOICE_OFFER: u8 = 2;
/// SDP-Answer eines Mitspielers
pub const OP_VOICE_ANSWER: u8 = 3;
/// ICE-Kandidat eines Mitspielers
pub const OP_VOICE_KANDIDAT: u8 = 4;
/// Keepalive-Ping des Dienstes
pub const OP_PING: u8 = 5;

/// Dekodierter OpCode eines eingehenden Envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Spielstand,
    VoiceOffer,
    VoiceAnswer,
    VoiceKandidat,
    Ping,
    /// Vom Client nicht verstandener Code – wird verworfen
    Unbekannt(u8),
}

impl OpCode {
    /// Ordnet einen Roh-Wert dem OpCode zu
    pub fn von(op: u8) -> Self {
        match op {
            OP_SPIELSTAND => Self::Spielstand,
            OP_VOICE_OFFER => Self::VoiceOffer,
            OP_VOICE_ANSWER => Self::VoiceAnswer,
            OP_VOICE_KANDIDAT => Self::VoiceKandidat,
            OP_PING => Self::Ping,
            andere => Self::Unbekannt(andere),
        }
    }

    /// Gibt den Roh-Wert zurueck
    pub fn wert(&self) -> u8 {
        match self {
            Self::Spielstand => OP_SPIELSTAND,
            Self::VoiceOffer => OP_VOICE_OFFER,
            Self::VoiceAnswer => OP_VOICE_ANSWER,
            Self::VoiceKandidat => OP_VOICE_KANDIDAT,
            Self::Ping => OP_PING,
            Self::Unbekannt(n) => *n,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Push-Einheit des Dienstes: numerischer Diskriminator + Roh-Payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Numerischer Diskriminator, waehlt die Payload-Dekodierung
    pub op: u8,
    /// Roh-Payload, wird erst nach der OpCode-Verzweigung typisiert
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InboundEnvelope {
    /// Gibt den dekodierten OpCode zurueck
    pub fn op_code(&self) -> OpCode {
        OpCode::von(self.op)
    }

    /// Typisiert den Payload fuer den bereits verzweigten OpCode
    pub fn payload_als<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Keepalive-Ping-Payload des Dienstes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingNachricht {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Eingehender Rahmen (Antwort ODER Push)
// ---------------------------------------------------------------------------

/// Jede eingehende Textnachricht ist entweder eine Antwort auf eine
/// Anfrage (erkennbar am `request_id`-Feld) oder ein Push-Envelope
/// (erkennbar am `op`-Feld).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EingehendeNachricht {
    Antwort(AntwortRahmen),
    Push(InboundEnvelope),
}

impl EingehendeNachricht {
    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
