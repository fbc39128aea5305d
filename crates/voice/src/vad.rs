//! Sprachaktivitaets-Erkennung (VAD)
//!
//! Tastet den lokalen und den entfernten Audiopegel in einem festen
//! kurzen Intervall ab. Ein Pegel oberhalb der Schwelle gilt als
//! "spricht". Gemeldet werden nur UEBERGAENGE (spricht/spricht nicht),
//! nicht jeder Messwert – sonst flutet die Erkennung den Event-Bus.
//! Die lokale Seite ist durch das Stumm-Flag verriegelt: ein stummes
//! Mikrofon meldet nie Sprachaktivitaet, egal wie laut die Umgebung ist.

use gambit_core::EventBus;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::platform::AudioLevelSource;

// ---------------------------------------------------------------------------
// Konfiguration und Ereignisse
// ---------------------------------------------------------------------------

/// Konfiguration der Sprachaktivitaets-Erkennung
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Pegel-Schwellenwert (normalisiert, 0.0–1.0)
    pub schwelle: f32,
    /// Abtast-Intervall
    pub intervall: Duration,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            schwelle: 0.02,
            intervall: Duration::from_millis(100),
        }
    }
}

/// Welcher Stream den Uebergang ausgeloest hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprachQuelle {
    Lokal,
    Entfernt,
}

/// Uebergangs-Ereignis der Erkennung
#[derive(Debug, Clone)]
pub enum VadEreignis {
    SprichtGeaendert { quelle: SprachQuelle, spricht: bool },
}

// ---------------------------------------------------------------------------
// SprachDetektor
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Quellen {
    lokal: Option<Arc<dyn AudioLevelSource>>,
    entfernt: Option<Arc<dyn AudioLevelSource>>,
}

/// Tastet Pegelquellen ab und meldet Sprech-Uebergaenge
#[derive(Clone)]
pub struct SprachDetektor {
    kern: Arc<DetektorKern>,
}

struct DetektorKern {
    config: VadConfig,
    /// Stumm-Flag des Controllers (gemeinsam genutzt)
    stumm: Arc<AtomicBool>,
    quellen: Mutex<Quellen>,
    /// (lokal_spricht, entfernt_spricht)
    zustand: Mutex<(bool, bool)>,
    ereignisse: EventBus<VadEreignis>,
    laeuft: AtomicBool,
}

impl SprachDetektor {
    /// Erstellt die Erkennung; `stumm` ist das gemeinsame Flag des
    /// Peer-Controllers (siehe `PeerController::stumm_flag`)
    pub fn neu(config: VadConfig, stumm: Arc<AtomicBool>) -> Self {
        Self {
            kern: Arc::new(DetektorKern {
                config,
                stumm,
                quellen: Mutex::new(Quellen::default()),
                zustand: Mutex::new((false, false)),
                ereignisse: EventBus::neu(),
                laeuft: AtomicBool::new(false),
            }),
        }
    }

    /// Abonniert die Uebergangs-Ereignisse
    pub fn abonnieren(&self) -> broadcast::Receiver<VadEreignis> {
        self.kern.ereignisse.abonnieren()
    }

    /// Setzt die lokale Pegelquelle (Mikrofon)
    pub fn lokale_quelle_setzen(&self, quelle: Arc<dyn AudioLevelSource>) {
        self.kern.quellen.lock().lokal = Some(quelle);
    }

    /// Setzt die entfernte Pegelquelle (Mitspieler-Stream)
    pub fn entfernte_quelle_setzen(&self, quelle: Arc<dyn AudioLevelSource>) {
        self.kern.quellen.lock().entfernt = Some(quelle);
    }

    /// Gibt zurueck ob die jeweilige Seite gerade als sprechend gilt
    pub fn spricht(&self, quelle: SprachQuelle) -> bool {
        let zustand = self.kern.zustand.lock();
        match quelle {
            SprachQuelle::Lokal => zustand.0,
            SprachQuelle::Entfernt => zustand.1,
        }
    }

    /// Ein Abtastschritt. Oeffentlich, damit Tests ohne Zeitsteuerung
    /// auskommen; der Intervall-Treiber ruft nichts anderes auf.
    pub fn tick(&self) {
        let (lokal, entfernt) = {
            let quellen = self.kern.quellen.lock();
            (quellen.lokal.clone(), quellen.entfernt.clone())
        };

        if let Some(quelle) = lokal {
            // Verriegelung: stumm meldet nie Sprachaktivitaet
            let spricht = !self.kern.stumm.load(Ordering::SeqCst)
                && quelle.pegel() > self.kern.config.schwelle;
            self.uebergang_melden(SprachQuelle::Lokal, spricht);
        }
        if let Some(quelle) = entfernt {
            let spricht = quelle.pegel() > self.kern.config.schwelle;
            self.uebergang_melden(SprachQuelle::Entfernt, spricht);
        }
    }

    fn uebergang_melden(&self, quelle: SprachQuelle, spricht: bool) {
        let mut zustand = self.kern.zustand.lock();
        let bisher = match quelle {
            SprachQuelle::Lokal => &mut zustand.0,
            SprachQuelle::Entfernt => &mut zustand.1,
        };
        if *bisher != spricht {
            *bisher = spricht;
            drop(zustand);
            self.kern
                .ereignisse
                .senden(VadEreignis::SprichtGeaendert { quelle, spricht });
        }
    }

    /// Startet den Intervall-Treiber; laeuft bis `stoppen`
    pub fn starten(&self) -> tokio::task::JoinHandle<()> {
        self.kern.laeuft.store(true, Ordering::SeqCst);
        let detektor = self.clone();
        tokio::spawn(async move {
            let mut intervall = tokio::time::interval(detektor.kern.config.intervall);
            loop {
                intervall.tick().await;
                if !detektor.kern.laeuft.load(Ordering::SeqCst) {
                    return;
                }
                detektor.tick();
            }
        })
    }

    /// Haelt den Intervall-Treiber an
    pub fn stoppen(&self) {
        self.kern.laeuft.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
