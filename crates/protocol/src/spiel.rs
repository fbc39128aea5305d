//! Spielbezogene Datentypen (Schnappschuss + Bestenliste)

use gambit_core::types::UserId;
use serde::{Deserialize, Serialize};

/// Spielstand-Schnappschuss (Payload von OpCode 1)
///
/// Der Dienst ist die Autoritaet ueber Regeln und Gewinnerkennung; der
/// Client rendert den Schnappschuss nur. Felder die der Dienst nicht
/// mitschickt bleiben auf ihrem Default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spielstand {
    /// Partie-Status, z.B. "waiting", "active", "finished"
    pub status: String,
    /// Brettfelder, index = Position; None = leer
    #[serde(default)]
    pub brett: Vec<Option<UserId>>,
    /// Wer am Zug ist (None wenn die Partie nicht laeuft)
    #[serde(default)]
    pub am_zug: Option<UserId>,
    /// Gewinner (None solange die Partie laeuft oder unentschieden endet)
    #[serde(default)]
    pub gewinner: Option<UserId>,
    /// Restzeit des aktuellen Zugs in ms (nur im "timed"-Modus gesetzt)
    #[serde(default)]
    pub zug_restzeit_ms: Option<u64>,
}

/// Ein Eintrag der Bestenliste
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestenlistenEintrag {
    pub name: String,
    pub siege: u32,
    pub punkte: i64,
}
