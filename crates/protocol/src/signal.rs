//! Voice-Signalisierung (SDP Offer/Answer + ICE-Kandidaten)
//!
//! Der Duplex-Kanal dient der Peer-Verhandlung nur als Relais: der Client
//! reicht SDP-Beschreibungen und ICE-Kandidaten an die aktuelle Partie
//! weiter, der Dienst stellt sie dem Mitspieler mit Absender-Kennung zu.
//! Die Payloads bleiben dabei unveraendert (verbatim forwarding).

use gambit_core::types::{MatchId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ausgehend (an die Partie adressiert)
// ---------------------------------------------------------------------------

/// SDP-Beschreibung (Offer oder Answer) an die aktuelle Partie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpRelais {
    pub match_id: MatchId,
    /// Vollstaendige SDP-Beschreibung als String
    pub sdp: String,
}

/// ICE-Kandidat an die aktuelle Partie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KandidatRelais {
    pub match_id: MatchId,
    pub kandidat: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u32>,
}

// ---------------------------------------------------------------------------
// Eingehend (mit Absender-Kennung)
// ---------------------------------------------------------------------------

/// SDP-Beschreibung eines Mitspielers (Payload der OpCodes 2 und 3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdpNachricht {
    /// Absender der Beschreibung
    pub von: UserId,
    pub sdp: String,
}

/// ICE-Kandidat eines Mitspielers (Payload von OpCode 4)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KandidatNachricht {
    /// Absender des Kandidaten
    pub von: UserId,
    pub kandidat: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u32>,
}
