//! Wiederverbindungs-Richtlinie
//!
//! Reines exponentielles Backoff mit hartem Deckel:
//! `verzoegerung(n) = min(basis * 2^(n-1), deckel)`.
//! Der Versuchszaehler lebt im [`ReconnectState`] und gehoert dem
//! SessionManager; bei jeder erfolgreichen Verbindung faellt er auf 0.
//! Nach Erreichen des Versuchslimits wird genau einmal ein fataler
//! Zustand gemeldet und keine weitere Wiederverbindung geplant.

use std::time::Duration;

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// Parameter des Backoffs – rein, zustandslos, deterministisch
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Verzoegerung des ersten Versuchs
    pub basis: Duration,
    /// Harter Deckel fuer die Verzoegerung
    pub deckel: Duration,
    /// Maximale Anzahl automatischer Versuche
    pub max_versuche: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            basis: Duration::from_secs(1),
            deckel: Duration::from_secs(30),
            max_versuche: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Verzoegerung vor Versuch `versuch` (1-basiert)
    pub fn verzoegerung(&self, versuch: u32) -> Duration {
        // 2^(n-1), gegen Overflow gesattigt – ab Faktor 2^32 greift
        // ohnehin der Deckel
        let exponent = versuch.saturating_sub(1).min(31);
        let faktor = 1u32 << exponent;
        self.basis
            .checked_mul(faktor)
            .unwrap_or(self.deckel)
            .min(self.deckel)
    }
}

// ---------------------------------------------------------------------------
// ReconnectState
// ---------------------------------------------------------------------------

/// Zaehlerzustand der laufenden Wiederverbindung
///
/// Explizit modelliert statt als loses Instanzfeld, damit die
/// Nebenlaeufigkeits-Garantien (sequenzielle Versuche, genau eine
/// Erschoepfungs-Meldung) pruefbar bleiben.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    versuch: u32,
    erschoepfung_gemeldet: bool,
}

impl ReconnectState {
    /// Frischer Zustand: kein Versuch unternommen
    pub fn neu() -> Self {
        Self {
            versuch: 0,
            erschoepfung_gemeldet: false,
        }
    }

    /// Aktueller Versuchszaehler
    pub fn versuch(&self) -> u32 {
        self.versuch
    }

    /// Setzt den Zaehler nach erfolgreicher Verbindung zurueck
    pub fn zuruecksetzen(&mut self) {
        self.versuch = 0;
        self.erschoepfung_gemeldet = false;
    }

    /// Reserviert den naechsten Versuch.
    ///
    /// Gibt `Some(versuchsnummer)` zurueck solange Versuche uebrig sind,
    /// sonst `None` – dann ist keine weitere Wiederverbindung zu planen.
    pub fn naechster_versuch(&mut self, richtlinie: &ReconnectPolicy) -> Option<u32> {
        if self.versuch >= richtlinie.max_versuche {
            return None;
        }
        self.versuch += 1;
        Some(self.versuch)
    }

    /// Markiert die Erschoepfung als gemeldet.
    ///
    /// Gibt `true` nur beim ersten Aufruf zurueck – die fatale
    /// Benachrichtigung feuert genau einmal.
    pub fn erschoepfung_melden(&mut self) -> bool {
        if self.erschoepfung_gemeldet {
            false
        } else {
            self.erschoepfung_gemeldet = true;
            true
        }
    }
}

impl Default for ReconnectState {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
