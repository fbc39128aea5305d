//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist.

use gambit_session::{ReconnectPolicy, SessionConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpunkte des Spieldiensts
    pub dienst: DienstEinstellungen,
    /// Verbindungs- und Timeout-Einstellungen
    pub verbindung: VerbindungsEinstellungen,
    /// Backoff-Parameter der Wiederverbindung
    pub wiederverbindung: WiederverbindungsEinstellungen,
    /// Spiel-Einstellungen
    pub spiel: SpielEinstellungen,
    /// Lokaler Speicher
    pub speicher: SpeicherEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Endpunkte des Spieldiensts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DienstEinstellungen {
    /// Basis-URL des Auth-Endpunkts (HTTP)
    pub http_url: String,
    /// URL des Duplex-Kanals (WebSocket)
    pub ws_url: String,
}

impl Default for DienstEinstellungen {
    fn default() -> Self {
        Self {
            http_url: "http://127.0.0.1:8443".into(),
            ws_url: "ws://127.0.0.1:8443/spiel".into(),
        }
    }
}

/// Verbindungs- und Timeout-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    /// Karenzzeit nach Kanal-Oeffnung in Millisekunden
    pub bereitschaft_ms: u64,
    /// Zeitlimit fuer Request/Response-Aufrufe in Sekunden
    pub rpc_timeout_s: u64,
    /// Zeitfenster der Konto-Loeschung in Sekunden
    pub loesch_timeout_s: u64,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            bereitschaft_ms: 300,
            rpc_timeout_s: 10,
            loesch_timeout_s: 5,
        }
    }
}

/// Backoff-Parameter der Wiederverbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WiederverbindungsEinstellungen {
    /// Basis-Verzoegerung in Millisekunden
    pub basis_ms: u64,
    /// Harter Deckel in Millisekunden
    pub deckel_ms: u64,
    /// Maximale Anzahl automatischer Versuche
    pub max_versuche: u32,
}

impl Default for WiederverbindungsEinstellungen {
    fn default() -> Self {
        Self {
            basis_ms: 1_000,
            deckel_ms: 30_000,
            max_versuche: 10,
        }
    }
}

/// Spiel-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpielEinstellungen {
    /// Gewuenschter Partie-Modus
    pub modus: String,
}

impl Default for SpielEinstellungen {
    fn default() -> Self {
        Self {
            modus: "timed".into(),
        }
    }
}

/// Lokaler Speicher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Pfad der Identitaets-Datei (Geraete-Token + Anzeigename)
    pub identitaets_datei: String,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            identitaets_datei: "gambit-identitaet.json".into(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Leitet die Session-Konfiguration ab
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            dienst_url: self.dienst.ws_url.clone(),
            bereitschafts_verzoegerung: Duration::from_millis(self.verbindung.bereitschaft_ms),
            rpc_timeout: Duration::from_secs(self.verbindung.rpc_timeout_s),
            loesch_timeout: Duration::from_secs(self.verbindung.loesch_timeout_s),
            reconnect: ReconnectPolicy {
                basis: Duration::from_millis(self.wiederverbindung.basis_ms),
                deckel: Duration::from_millis(self.wiederverbindung.deckel_ms),
                max_versuche: self.wiederverbindung.max_versuche,
            },
        }
    }
}
