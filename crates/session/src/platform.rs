//! Plattform-Traits
//!
//! Die Browser- bzw. Betriebssystem-Faehigkeiten (Duplex-Kanal, lokaler
//! Speicher, Auth-Roundtrip) sind keine Kernlogik. Jede Faehigkeit wird
//! als schmaler Trait definiert, damit die Zustandsmaschinen ohne echtes
//! Netzwerk testbar bleiben. Die Produktiv-Implementierungen liegen in
//! [`crate::ws`] (WebSocket) und im Client-Binary (HTTP-Auth, Datei-Store).

use async_trait::async_trait;
use gambit_core::Result;
use gambit_protocol::control::{AnmeldeAnfrage, AnmeldeAntwort};
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Duplex-Kanal
// ---------------------------------------------------------------------------

/// Ereignisse die der Transport an den Besitzer des Kanals meldet
#[derive(Debug, Clone)]
pub enum TransportEreignis {
    /// Eingehende Textnachricht (JSON)
    Nachricht(String),
    /// Der Kanal wurde getrennt (vom Server, vom Netz oder lokal)
    Getrennt { grund: String },
}

/// Oeffnet Duplex-Kanaele zum Spieldienst
#[async_trait]
pub trait DuplexTransport: Send + Sync {
    /// Oeffnet einen Kanal zur angegebenen URL.
    ///
    /// Der Ereignis-Sender wird VOR dem Oeffnen uebergeben und muss vom
    /// Transport verdrahtet sein bevor `oeffnen` aufloest. Damit kann
    /// zwischen "Kanal offen" und "Handler registriert" keine Push-
    /// Nachricht verloren gehen.
    async fn oeffnen(
        &self,
        url: &str,
        eingang: mpsc::Sender<TransportEreignis>,
    ) -> Result<Arc<dyn DuplexVerbindung>>;
}

/// Eine offene Duplex-Verbindung
#[async_trait]
pub trait DuplexVerbindung: Send + Sync {
    /// Sendet eine Textnachricht (JSON)
    async fn senden(&self, text: String) -> Result<()>;

    /// Schliesst die Verbindung; mehrfach aufrufbar
    async fn schliessen(&self);
}

// ---------------------------------------------------------------------------
// Auth-Roundtrip
// ---------------------------------------------------------------------------

/// Authentifizierung beim Spieldienst
///
/// Laeuft als eigener Roundtrip getrennt vom Duplex-Kanal: schlaegt die
/// Anmeldung fehl (insbesondere bei vergebenem Namen), wird gar kein
/// Kanal geoeffnet. Ein Namenskonflikt muss als
/// [`gambit_core::GambitError::NameVergeben`] gemeldet werden.
#[async_trait]
pub trait AuthDienst: Send + Sync {
    async fn anmelden(&self, anfrage: &AnmeldeAnfrage) -> Result<AnmeldeAntwort>;
}

// ---------------------------------------------------------------------------
// Lokaler Key/Value-Speicher
// ---------------------------------------------------------------------------

/// Dauerhafter Key/Value-Speicher des Geraets
///
/// Haelt genau zwei Werte ueber Neustarts hinweg: den Geraete-Token und
/// den zuletzt bestaetigten Anzeigenamen (siehe [`crate::identity`]).
pub trait KeyValueStore: Send + Sync {
    fn lesen(&self, schluessel: &str) -> Result<Option<String>>;
    fn schreiben(&self, schluessel: &str, wert: &str) -> Result<()>;
    fn entfernen(&self, schluessel: &str) -> Result<()>;
}
