//! Dauerhafte Geraete-Identitaet
//!
//! Der Geraete-Token wird genau einmal erzeugt, dauerhaft gespeichert und
//! bei jeder Anmeldung wiederverwendet, damit der Dienst denselben
//! logischen Account zuordnet. Der Anzeigename wird nach der ersten
//! bestaetigten Anmeldung gemerkt, um beim Start eine stille
//! Wiederanmeldung zu versuchen. Abmeldung und Konto-Loeschung raeumen
//! beide Werte vollstaendig ab.

use gambit_core::{GambitError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::platform::KeyValueStore;

/// Speicher-Schluessel des Geraete-Tokens
pub const SCHLUESSEL_GERAETE_TOKEN: &str = "gambit.geraete_token";
/// Speicher-Schluessel des Anzeigenamens
pub const SCHLUESSEL_ANZEIGE_NAME: &str = "gambit.anzeige_name";

/// Die beiden dauerhaften Identitaets-Felder
#[derive(Debug, Clone)]
pub struct Identitaet {
    /// Stabiler, opaker Geraete-Token
    pub geraete_token: String,
    /// Zuletzt bestaetigter Anzeigename (None vor der ersten Anmeldung)
    pub anzeige_name: Option<String>,
}

// ---------------------------------------------------------------------------
// IdentityStore
// ---------------------------------------------------------------------------

/// Liest und schreibt die Identitaet ueber einen [`KeyValueStore`]
pub struct IdentityStore {
    store: Arc<dyn KeyValueStore>,
}

impl IdentityStore {
    /// Erstellt einen neuen IdentityStore
    pub fn neu(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Laedt die Identitaet; erzeugt den Geraete-Token beim ersten Aufruf
    pub fn laden_oder_erzeugen(&self) -> Result<Identitaet> {
        let geraete_token = match self.store.lesen(SCHLUESSEL_GERAETE_TOKEN)? {
            Some(token) => token,
            None => {
                let token = Uuid::new_v4().to_string();
                self.store.schreiben(SCHLUESSEL_GERAETE_TOKEN, &token)?;
                tracing::info!("Neuer Geraete-Token erzeugt");
                token
            }
        };
        let anzeige_name = self.store.lesen(SCHLUESSEL_ANZEIGE_NAME)?;
        Ok(Identitaet {
            geraete_token,
            anzeige_name,
        })
    }

    /// Merkt sich den vom Dienst bestaetigten Anzeigenamen
    pub fn name_merken(&self, name: &str) -> Result<()> {
        self.store.schreiben(SCHLUESSEL_ANZEIGE_NAME, name)
    }

    /// Loescht beide Identitaets-Felder (Abmeldung / Konto-Loeschung)
    pub fn alles_loeschen(&self) -> Result<()> {
        self.store.entfernen(SCHLUESSEL_GERAETE_TOKEN)?;
        self.store.entfernen(SCHLUESSEL_ANZEIGE_NAME)?;
        tracing::info!("Gespeicherte Identitaet geloescht");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SpeicherKvStore (in-memory)
// ---------------------------------------------------------------------------

/// In-Memory-Store fuer Tests und fluechtige Sitzungen
#[derive(Default)]
pub struct SpeicherKvStore {
    werte: Mutex<HashMap<String, String>>,
}

impl SpeicherKvStore {
    pub fn neu() -> Self {
        Self::default()
    }
}

impl KeyValueStore for SpeicherKvStore {
    fn lesen(&self, schluessel: &str) -> Result<Option<String>> {
        Ok(self.werte.lock().get(schluessel).cloned())
    }

    fn schreiben(&self, schluessel: &str, wert: &str) -> Result<()> {
        self.werte
            .lock()
            .insert(schluessel.to_string(), wert.to_string());
        Ok(())
    }

    fn entfernen(&self, schluessel: &str) -> Result<()> {
        self.werte.lock().remove(schluessel);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DateiKvStore (JSON-Datei)
// ---------------------------------------------------------------------------

/// Datei-gestuetzter Store: eine flache JSON-Map, bei jedem Schreiben
/// vollstaendig zurueckgeschrieben (zwei kleine Werte, kein Durchsatz)
pub struct DateiKvStore {
    pfad: PathBuf,
    werte: Mutex<HashMap<String, String>>,
}

impl DateiKvStore {
    /// Oeffnet den Store; eine fehlende Datei gilt als leerer Store
    pub fn oeffnen(pfad: impl Into<PathBuf>) -> Result<Self> {
        let pfad = pfad.into();
        let werte = match std::fs::read_to_string(&pfad) {
            Ok(inhalt) => serde_json::from_str(&inhalt)
                .map_err(|e| GambitError::Speicher(format!("'{}' unlesbar: {e}", pfad.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(GambitError::Speicher(format!(
                    "'{}' nicht lesbar: {e}",
                    pfad.display()
                )))
            }
        };
        Ok(Self {
            pfad,
            werte: Mutex::new(werte),
        })
    }

    fn zurueckschreiben(&self, werte: &HashMap<String, String>) -> Result<()> {
        if let Some(eltern) = self.pfad.parent() {
            if !eltern.as_os_str().is_empty() {
                std::fs::create_dir_all(eltern)?;
            }
        }
        let json = serde_json::to_string_pretty(werte)?;
        std::fs::write(&self.pfad, json)
            .map_err(|e| GambitError::Speicher(format!("'{}' nicht schreibbar: {e}", self.pfad.display())))
    }
}

impl KeyValueStore for DateiKvStore {
    fn lesen(&self, schluessel: &str) -> Result<Option<String>> {
        Ok(self.werte.lock().get(schluessel).cloned())
    }

    fn schreiben(&self, schluessel: &str, wert: &str) -> Result<()> {
        let mut werte = self.werte.lock();
        werte.insert(schluessel.to_string(), wert.to_string());
        self.zurueckschreiben(&werte)
    }

    fn entfernen(&self, schluessel: &str) -> Result<()> {
        let mut werte = self.werte.lock();
        werte.remove(schluessel);
        self.zurueckschreiben(&werte)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
