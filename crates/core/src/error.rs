//! Fehlertypen fuer Gambit
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende des Clients
//! abdeckt. Die Varianten spiegeln die Fehler-Taxonomie des Systems:
//! Auth-Fehler werden lokal behoben (zurueck zur Namenseingabe),
//! Verbindungsfehler stossen die Wiederverbindung an, Kanal- und
//! Signal-Fehler werden gemeldet aber brechen nie die Session ab.

use thiserror::Error;

/// Globaler Result-Alias fuer Gambit
pub type Result<T> = std::result::Result<T, GambitError>;

/// Alle moeglichen Fehler im Gambit-Client
#[derive(Debug, Error)]
pub enum GambitError {
    // --- Authentifizierung ---
    /// Der gewuenschte Anzeigename ist bereits vergeben.
    /// Muss getrennt von generischen Auth-Fehlern gemeldet werden,
    /// damit die Aufrufseite einen neuen Namen erfragen kann.
    #[error("Anzeigename bereits vergeben: {0}")]
    NameVergeben(String),

    #[error("Authentifizierung fehlgeschlagen: {0}")]
    AuthFehlgeschlagen(String),

    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    /// Operation ohne offenen Kanal bzw. ohne beigetretene Partie
    #[error("Kanal nicht bereit: {0}")]
    KanalNichtBereit(String),

    /// Alle Wiederverbindungsversuche aufgebraucht – manueller Neustart noetig
    #[error("Wiederverbindung aufgegeben nach {versuche} Versuchen")]
    WiederverbindungErschoepft { versuche: u32 },

    // --- Konto-Loeschung ---
    /// Weder Antwort noch Trennung innerhalb des Zeitfensters –
    /// serverseitig evtl. trotzdem erfolgreich, Wiederholung ratsam
    #[error("Konto-Loeschung: Zeitlimit ueberschritten")]
    LoeschTimeout,

    /// Der Dienst hat die Loeschung explizit abgelehnt
    #[error("Konto-Loeschung fehlgeschlagen: {0}")]
    LoeschFehlgeschlagen(String),

    /// Eine zweite Loeschung waehrend eine andere laeuft
    #[error("Konto-Loeschung laeuft bereits")]
    LoeschungLaeuft,

    // --- Voice ---
    /// Plattform verweigert den Mikrofonzugriff – eigenstaendig meldbar,
    /// damit die Oberflaeche die Berechtigung erklaeren kann
    #[error("Mikrofonzugriff verweigert: {0}")]
    MikrofonVerweigert(String),

    /// Fehlerhafte oder unpassende Signalisierungsnachricht –
    /// die einzelne Nachricht wird verworfen, die Session laeuft weiter
    #[error("Signalisierungsfehler: {0}")]
    SignalFehler(String),

    // --- Persistenz ---
    #[error("Speicherfehler: {0}")]
    Speicher(String),

    // --- Intern ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialisierungsfehler: {0}")]
    Serialisierung(#[from] serde_json::Error),
}

impl GambitError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Getrennt(_) | Self::LoeschTimeout
        )
    }
}
