//! Session-Manager – Authentifizierung, Kanal-Lebenszyklus, Wiederverbindung
//!
//! Besitzt exklusiv die Session, den Duplex-Kanal und die Statusmaschine:
//!
//! ```text
//! Getrennt -> Verbindet -> Verbunden
//!     ^                       |
//!     |                       v (unerwarteter Abriss)
//!     +-- Wiederverbindet <---+
//! ```
//!
//! ## Garantien
//! - Der Ereignis-Sender ist vor dem Oeffnen des Kanals verdrahtet,
//!   zwischen "Kanal offen" und "Handler registriert" geht kein Push verloren
//! - Wiederverbindungsversuche laufen strikt sequenziell; nach dem
//!   Versuchslimit feuert genau eine fatale Meldung und nichts weiter
//! - Abmeldung und Konto-Loeschung unterdruecken die Wiederverbindung ueber
//!   ein atomar gesetztes Flag, nicht ueber Callback-Reihenfolgen
//! - Die Konto-Loeschung ist durch ein In-Progress-Flag reentranzsicher

use chrono::{DateTime, Utc};
use gambit_core::{EventBus, GambitError, Result, UserId};
use gambit_protocol::control::{
    AnmeldeAnfrage, AntwortPayload, ErrorCode, ErrorResponse, KlientNachricht, KlientPayload,
};
use gambit_protocol::envelope::{EingehendeNachricht, InboundEnvelope, OpCode, PingNachricht};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::identity::IdentityStore;
use crate::platform::{AuthDienst, DuplexTransport, DuplexVerbindung, KeyValueStore, TransportEreignis};
use crate::reconnect::{ReconnectPolicy, ReconnectState};

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Verbindungsstatus des Duplex-Kanals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsStatus {
    Getrennt,
    Verbindet,
    Verbunden,
    Wiederverbindet,
}

/// Ereignisse des Session-Managers (einziger Benachrichtigungspunkt)
#[derive(Debug, Clone)]
pub enum SessionEreignis {
    /// Der Verbindungsstatus hat gewechselt
    StatusGeaendert(VerbindungsStatus),
    /// Alle Wiederverbindungsversuche aufgebraucht – feuert genau einmal,
    /// danach hilft nur ein manuelles `verbinden`
    WiederverbindungAufgegeben { versuche: u32 },
    /// Push-Nachricht des Dienstes (Demux uebernimmt der MatchChannel)
    Push(InboundEnvelope),
}

/// Ephemere Session nach erfolgreicher Anmeldung
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    /// Vom Dienst bestaetigter Anzeigename
    pub anzeige_name: String,
    /// Bindet den Duplex-Kanal an diese Session
    pub sitzungs_token: String,
    pub angemeldet_am: DateTime<Utc>,
}

/// Konfiguration des Session-Managers
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket-URL des Spieldiensts
    pub dienst_url: String,
    /// Karenzzeit nach Kanal-Oeffnung bevor Anfragen erlaubt sind –
    /// der Dienst meldet den Kanal offen bevor sein Routing bereit ist
    pub bereitschafts_verzoegerung: Duration,
    /// Zeitlimit fuer Request/Response-Aufrufe
    pub rpc_timeout: Duration,
    /// Zeitfenster der Konto-Loeschung (muss unter `rpc_timeout` liegen)
    pub loesch_timeout: Duration,
    /// Backoff-Parameter der Wiederverbindung
    pub reconnect: ReconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dienst_url: "ws://127.0.0.1:8443/spiel".into(),
            bereitschafts_verzoegerung: Duration::from_millis(300),
            rpc_timeout: Duration::from_secs(10),
            loesch_timeout: Duration::from_secs(5),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Verwaltet Anmeldung, Kanal und Wiederverbindung
///
/// Explizit konstruiert und per Dependency Injection weitergereicht –
/// der Lebenszyklus (erstellen/verbinden/trennen) liegt beim Aufrufer,
/// nicht bei einem modulglobalen Singleton.
#[derive(Clone)]
pub struct SessionManager {
    kern: Arc<ManagerKern>,
}

struct ManagerKern {
    transport: Arc<dyn DuplexTransport>,
    auth: Arc<dyn AuthDienst>,
    identitaet: IdentityStore,
    config: SessionConfig,
    ereignisse: EventBus<SessionEreignis>,
    status: Mutex<VerbindungsStatus>,
    session: RwLock<Option<Session>>,
    verbindung: tokio::sync::Mutex<Option<Arc<dyn DuplexVerbindung>>>,
    /// Monoton steigende Request-IDs
    naechste_request_id: AtomicU32,
    /// Offene Anfragen: request_id -> Antwort-Sender
    wartende: Mutex<HashMap<u32, oneshot::Sender<AntwortPayload>>>,
    /// Verbindungs-Generation: Trennungs-Ereignisse aelterer Kanaele
    /// werden daran erkannt und ignoriert
    generation: AtomicU64,
    wiederverbindung: Mutex<ReconnectState>,
    wiederverbindung_laeuft: AtomicBool,
    /// Unterdrueckt die Wiederverbindung waehrend Abmeldung/Loeschung;
    /// wird VOR der jeweiligen Operation gesetzt
    unterdrueckt: AtomicBool,
    /// Reentranz-Guard der Konto-Loeschung
    loeschung_laeuft: AtomicBool,
    /// true solange der Kanal bereit ist; Grundlage des
    /// Trennungs-Rennens bei der Konto-Loeschung
    verbunden_tx: watch::Sender<bool>,
}

impl SessionManager {
    /// Erstellt einen neuen Session-Manager
    pub fn neu(
        transport: Arc<dyn DuplexTransport>,
        auth: Arc<dyn AuthDienst>,
        speicher: Arc<dyn KeyValueStore>,
        config: SessionConfig,
    ) -> Self {
        let (verbunden_tx, _) = watch::channel(false);
        Self {
            kern: Arc::new(ManagerKern {
                transport,
                auth,
                identitaet: IdentityStore::neu(speicher),
                config,
                ereignisse: EventBus::neu(),
                status: Mutex::new(VerbindungsStatus::Getrennt),
                session: RwLock::new(None),
                verbindung: tokio::sync::Mutex::new(None),
                naechste_request_id: AtomicU32::new(1),
                wartende: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                wiederverbindung: Mutex::new(ReconnectState::neu()),
                wiederverbindung_laeuft: AtomicBool::new(false),
                unterdrueckt: AtomicBool::new(false),
                loeschung_laeuft: AtomicBool::new(false),
                verbunden_tx,
            }),
        }
    }

    /// Abonniert die Session-Ereignisse
    pub fn abonnieren(&self) -> broadcast::Receiver<SessionEreignis> {
        self.kern.ereignisse.abonnieren()
    }

    /// Aktueller Verbindungsstatus
    pub fn status(&self) -> VerbindungsStatus {
        *self.kern.status.lock()
    }

    /// Aktive Session (None wenn nicht angemeldet)
    pub fn session(&self) -> Option<Session> {
        self.kern.session.read().clone()
    }

    /// Meldet sich mit Geraete-Token und Anzeigenamen an.
    ///
    /// Ohne expliziten Namen wird der zuletzt bestaetigte verwendet
    /// (stille Wiederanmeldung beim Start). Ein Namenskonflikt kommt als
    /// [`GambitError::NameVergeben`] zurueck, damit die Aufrufseite einen
    /// neuen Namen erfragen kann; es wird dann keine Session angelegt
    /// und kein Kanal geoeffnet.
    pub async fn anmelden(&self, anzeige_name: Option<&str>) -> Result<Session> {
        let identitaet = self.kern.identitaet.laden_oder_erzeugen()?;
        let name = anzeige_name
            .map(str::to_string)
            .or(identitaet.anzeige_name)
            .ok_or_else(|| GambitError::AuthFehlgeschlagen("kein Anzeigename gewaehlt".into()))?;

        let anfrage = AnmeldeAnfrage {
            geraete_token: identitaet.geraete_token,
            anzeige_name: name,
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let antwort = self.kern.auth.anmelden(&anfrage).await?;
        self.kern.identitaet.name_merken(&antwort.anzeige_name)?;

        let session = Session {
            user_id: antwort.user_id,
            anzeige_name: antwort.anzeige_name,
            sitzungs_token: antwort.sitzungs_token,
            angemeldet_am: Utc::now(),
        };
        *self.kern.session.write() = Some(session.clone());
        tracing::info!(user_id = %session.user_id, name = %session.anzeige_name, "Anmeldung erfolgreich");
        Ok(session)
    }

    /// Oeffnet den Duplex-Kanal fuer die aktive Session.
    ///
    /// Schlaegt der Aufbau fehl, wird die automatische Wiederverbindung
    /// angestossen (sofern nicht gerade Abmeldung/Loeschung laeuft) und
    /// der Fehler trotzdem zurueckgegeben.
    pub async fn verbinden(&self) -> Result<()> {
        if self.status() == VerbindungsStatus::Verbunden {
            return Ok(());
        }
        match ManagerKern::kanal_oeffnen(&self.kern).await {
            Ok(()) => Ok(()),
            Err(fehler) => {
                if !self.kern.unterdrueckt.load(Ordering::SeqCst)
                    && self.kern.session.read().is_some()
                {
                    ManagerKern::wiederverbindung_anstossen(&self.kern);
                }
                Err(fehler)
            }
        }
    }

    /// Schliesst den Kanal und verwirft die Session. Idempotent,
    /// auch ohne offenen Kanal aufrufbar.
    pub async fn trennen(&self) {
        self.kern.trennen().await;
    }

    /// Trennt und loescht die gespeicherte Identitaet
    pub async fn abmelden(&self) -> Result<()> {
        self.kern.unterdrueckt.store(true, Ordering::SeqCst);
        self.kern.trennen().await;
        let ergebnis = self.kern.identitaet.alles_loeschen();
        self.kern.unterdrueckt.store(false, Ordering::SeqCst);
        tracing::info!("Abgemeldet");
        ergebnis
    }

    /// Laesst den Dienst die Konto-Daten loeschen, dann wie `abmelden`.
    ///
    /// Es laeuft hoechstens eine Loeschung gleichzeitig; eine zweite wird
    /// sofort mit [`GambitError::LoeschungLaeuft`] abgewiesen. Das Ergebnis
    /// ist ein Rennen zwischen Antwort, Kanal-Trennung und Zeitfenster:
    /// trennt der Dienst den Kanal vor Ablauf, gilt die Loeschung als
    /// erfolgreich (das ist sein uebliches Erfolgssignal); laeuft das
    /// Fenster bei offenem Kanal ab, kommt [`GambitError::LoeschTimeout`]
    /// (serverseitig evtl. trotzdem erfolgreich – Wiederholung ratsam);
    /// eine explizite Ablehnung kommt als
    /// [`GambitError::LoeschFehlgeschlagen`] und wird nicht wiederholt.
    pub async fn konto_loeschen(&self) -> Result<()> {
        if self.kern.loeschung_laeuft.swap(true, Ordering::SeqCst) {
            return Err(GambitError::LoeschungLaeuft);
        }
        let ergebnis = self.kern.konto_loeschen_ablauf().await;
        self.kern.loeschung_laeuft.store(false, Ordering::SeqCst);
        ergebnis
    }

    /// Sendet eine Anfrage und wartet auf die Antwort mit gleicher ID
    pub(crate) async fn anfrage(&self, payload: KlientPayload) -> Result<AntwortPayload> {
        self.kern.anfrage(payload).await
    }

    /// Sendet einen Push (fire-and-forget)
    pub(crate) async fn push_senden(&self, payload: KlientPayload) -> Result<()> {
        self.kern.push_senden(payload).await
    }
}

// ---------------------------------------------------------------------------
// Kern-Implementierung
// ---------------------------------------------------------------------------

impl ManagerKern {
    fn status_setzen(&self, neu: VerbindungsStatus) {
        let mut status = self.status.lock();
        if *status != neu {
            tracing::debug!(von = ?*status, nach = ?neu, "Verbindungsstatus gewechselt");
            *status = neu;
            drop(status);
            self.ereignisse.senden(SessionEreignis::StatusGeaendert(neu));
        }
    }

    fn aktueller_status(&self) -> VerbindungsStatus {
        *self.status.lock()
    }

    /// Oeffnet den Kanal: Verbindet -> (Karenzzeit) -> Verbunden
    async fn kanal_oeffnen(kern: &Arc<ManagerKern>) -> Result<()> {
        let token = kern
            .session
            .read()
            .as_ref()
            .map(|s| s.sitzungs_token.clone())
            .ok_or_else(|| GambitError::Verbindung("keine aktive Session".into()))?;

        kern.status_setzen(VerbindungsStatus::Verbindet);
        let generation = kern.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Der Ereignis-Sender wird dem Transport VOR dem Oeffnen uebergeben –
        // fruehe Pushes koennen nicht verloren gehen
        let (eingang_tx, eingang_rx) = mpsc::channel(64);
        let url = format!("{}?token={}", kern.config.dienst_url, token);
        let verbindung = match kern.transport.oeffnen(&url, eingang_tx).await {
            Ok(verbindung) => verbindung,
            Err(fehler) => {
                kern.status_setzen(VerbindungsStatus::Getrennt);
                return Err(fehler);
            }
        };
        *kern.verbindung.lock().await = Some(verbindung);

        let pump = Arc::clone(kern);
        tokio::spawn(async move {
            pump.empfangs_schleife(eingang_rx, generation).await;
        });

        // Karenzzeit: der Kanal gilt erst danach als bereit fuer Anfragen
        tokio::time::sleep(kern.config.bereitschafts_verzoegerung).await;
        if kern.generation.load(Ordering::SeqCst) != generation
            || kern.verbindung.lock().await.is_none()
        {
            return Err(GambitError::Verbindung(
                "Kanal waehrend der Karenzzeit getrennt".into(),
            ));
        }

        kern.wiederverbindung.lock().zuruecksetzen();
        let _ = kern.verbunden_tx.send(true);
        kern.status_setzen(VerbindungsStatus::Verbunden);
        tracing::info!("Kanal bereit");
        Ok(())
    }

    async fn trennen(&self) {
        // Pump-Tasks des bisherigen Kanals fuer veraltet erklaeren
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(verbindung) = self.verbindung.lock().await.take() {
            verbindung.schliessen().await;
        }
        *self.session.write() = None;
        self.wartende_scheitern_lassen();
        let _ = self.verbunden_tx.send(false);
        self.status_setzen(VerbindungsStatus::Getrennt);
    }

    /// Laesst alle offenen Anfragen mit "Getrennt" scheitern
    fn wartende_scheitern_lassen(&self) {
        self.wartende.lock().clear();
    }

    async fn empfangs_schleife(
        self: Arc<Self>,
        mut eingang: mpsc::Receiver<TransportEreignis>,
        generation: u64,
    ) {
        while let Some(ereignis) = eingang.recv().await {
            match ereignis {
                TransportEreignis::Nachricht(text) => self.nachricht_verarbeiten(&text).await,
                TransportEreignis::Getrennt { grund } => {
                    ManagerKern::trennung_verarbeiten(&self, generation, &grund).await;
                    return;
                }
            }
        }
        // Sender ohne Getrennt-Ereignis gefallen – wie eine Trennung behandeln
        ManagerKern::trennung_verarbeiten(&self, generation, "Transport beendet").await;
    }

    async fn nachricht_verarbeiten(&self, text: &str) {
        let nachricht = match EingehendeNachricht::from_json(text) {
            Ok(nachricht) => nachricht,
            Err(fehler) => {
                tracing::warn!(fehler = %fehler, "Unlesbare Nachricht verworfen");
                return;
            }
        };
        match nachricht {
            EingehendeNachricht::Antwort(rahmen) => {
                let wartender = self.wartende.lock().remove(&rahmen.request_id);
                match wartender {
                    Some(sender) => {
                        let _ = sender.send(rahmen.payload);
                    }
                    None => tracing::warn!(
                        request_id = rahmen.request_id,
                        "Antwort ohne wartende Anfrage verworfen"
                    ),
                }
            }
            EingehendeNachricht::Push(envelope) => {
                if envelope.op_code() == OpCode::Ping {
                    self.ping_beantworten(&envelope).await;
                    return;
                }
                self.ereignisse.senden(SessionEreignis::Push(envelope));
            }
        }
    }

    /// Keepalive: Server-Pings werden auf Session-Ebene beantwortet
    async fn ping_beantworten(&self, envelope: &InboundEnvelope) {
        let zeitstempel = envelope
            .payload_als::<PingNachricht>()
            .map(|ping| ping.timestamp_ms)
            .unwrap_or(0);
        let request_id = self.naechste_request_id.fetch_add(1, Ordering::Relaxed);
        let pong = KlientNachricht::pong(request_id, zeitstempel);
        let verbindung = self.verbindung.lock().await.clone();
        if let (Some(verbindung), Ok(json)) = (verbindung, pong.to_json()) {
            if let Err(fehler) = verbindung.senden(json).await {
                tracing::debug!(fehler = %fehler, "Pong nicht zustellbar");
            }
        }
    }

    async fn trennung_verarbeiten(kern: &Arc<ManagerKern>, generation: u64, grund: &str) {
        if kern.generation.load(Ordering::SeqCst) != generation {
            tracing::trace!(grund, "Trennung einer veralteten Verbindung ignoriert");
            return;
        }
        tracing::warn!(grund, "Kanal unerwartet getrennt");
        *kern.verbindung.lock().await = None;
        kern.wartende_scheitern_lassen();
        let _ = kern.verbunden_tx.send(false);
        kern.status_setzen(VerbindungsStatus::Getrennt);

        // Atomar gesetztes Flag statt Callback-Reihenfolge: ein Abriss im
        // Fenster zwischen Flag-Setzen und diesem Handler wird immer erkannt
        if kern.unterdrueckt.load(Ordering::SeqCst) {
            tracing::debug!("Trennung waehrend Abmeldung/Loeschung – keine Wiederverbindung");
            return;
        }
        if kern.session.read().is_none() {
            return;
        }
        ManagerKern::wiederverbindung_anstossen(kern);
    }

    fn wiederverbindung_anstossen(kern: &Arc<ManagerKern>) {
        if kern.wiederverbindung_laeuft.swap(true, Ordering::SeqCst) {
            return;
        }
        let kern = Arc::clone(kern);
        tokio::spawn(async move {
            ManagerKern::wiederverbindungs_schleife(&kern).await;
            kern.wiederverbindung_laeuft.store(false, Ordering::SeqCst);
        });
    }

    /// Sequenzielle Wiederverbindung: ein neuer Versuch wird erst geplant
    /// nachdem der vorherige aufgeloest ist
    async fn wiederverbindungs_schleife(kern: &Arc<ManagerKern>) {
        loop {
            if kern.unterdrueckt.load(Ordering::SeqCst) || kern.session.read().is_none() {
                return;
            }
            let versuch = match kern
                .wiederverbindung
                .lock()
                .naechster_versuch(&kern.config.reconnect)
            {
                Some(versuch) => versuch,
                None => {
                    let melden = kern.wiederverbindung.lock().erschoepfung_melden();
                    if melden {
                        let versuche = kern.config.reconnect.max_versuche;
                        tracing::error!(versuche, "Wiederverbindung aufgegeben");
                        kern.ereignisse
                            .senden(SessionEreignis::WiederverbindungAufgegeben { versuche });
                    }
                    return;
                }
            };

            kern.status_setzen(VerbindungsStatus::Wiederverbindet);
            let warten = kern.config.reconnect.verzoegerung(versuch);
            tracing::info!(
                versuch,
                warten_ms = warten.as_millis() as u64,
                "Wiederverbindung geplant"
            );
            tokio::time::sleep(warten).await;

            match ManagerKern::kanal_oeffnen(kern).await {
                Ok(()) => {
                    tracing::info!(versuch, "Wiederverbindung erfolgreich");
                    return;
                }
                Err(fehler) => {
                    tracing::warn!(versuch, fehler = %fehler, "Wiederverbindungsversuch fehlgeschlagen");
                }
            }
        }
    }

    async fn anfrage(&self, payload: KlientPayload) -> Result<AntwortPayload> {
        let verbindung = self.bereite_verbindung().await?;
        let request_id = self.naechste_request_id.fetch_add(1, Ordering::Relaxed);
        let (sender, empfaenger) = oneshot::channel();
        self.wartende.lock().insert(request_id, sender);

        let json = KlientNachricht::neu(request_id, payload).to_json()?;
        if let Err(fehler) = verbindung.senden(json).await {
            self.wartende.lock().remove(&request_id);
            return Err(fehler);
        }

        match tokio::time::timeout(self.config.rpc_timeout, empfaenger).await {
            Ok(Ok(AntwortPayload::Fehler(fehler))) => Err(fehler_zuordnen(fehler)),
            Ok(Ok(antwort)) => Ok(antwort),
            Ok(Err(_)) => Err(GambitError::Getrennt(
                "Kanal waehrend der Anfrage getrennt".into(),
            )),
            Err(_) => {
                self.wartende.lock().remove(&request_id);
                Err(GambitError::Zeitlimit(format!(
                    "Anfrage {request_id} ohne Antwort"
                )))
            }
        }
    }

    async fn push_senden(&self, payload: KlientPayload) -> Result<()> {
        let verbindung = self.bereite_verbindung().await?;
        let request_id = self.naechste_request_id.fetch_add(1, Ordering::Relaxed);
        let json = KlientNachricht::neu(request_id, payload).to_json()?;
        verbindung.senden(json).await
    }

    /// Gibt die Verbindung zurueck sobald der Kanal als bereit gilt
    async fn bereite_verbindung(&self) -> Result<Arc<dyn DuplexVerbindung>> {
        if self.aktueller_status() != VerbindungsStatus::Verbunden {
            tracing::warn!(status = ?self.aktueller_status(), "Operation ohne bereiten Kanal");
            return Err(GambitError::KanalNichtBereit(
                "Kanal nicht verbunden".into(),
            ));
        }
        self.verbindung
            .lock()
            .await
            .clone()
            .ok_or_else(|| GambitError::KanalNichtBereit("kein offener Kanal".into()))
    }

    async fn konto_loeschen_ablauf(&self) -> Result<()> {
        if !*self.verbunden_tx.borrow() {
            return Err(GambitError::KanalNichtBereit(
                "Konto-Loeschung ohne offenen Kanal".into(),
            ));
        }

        // Unterdrueckung VOR dem Request setzen, damit auch ein sofortiger
        // Abriss als Teil der Loeschung behandelt wird
        self.unterdrueckt.store(true, Ordering::SeqCst);
        let mut verbunden_rx = self.verbunden_tx.subscribe();

        let ergebnis = tokio::select! {
            antwort = self.anfrage(KlientPayload::KontoLoeschen) => match antwort {
                Ok(AntwortPayload::KontoGeloescht) => Ok(()),
                Ok(_) => Err(GambitError::UngueltigeNachricht(
                    "unerwartete Antwort auf Konto-Loeschung".into(),
                )),
                // Trennung waehrend der Loeschung ist das erwartete Erfolgssignal
                Err(GambitError::Getrennt(_)) => Ok(()),
                Err(fehler) => Err(fehler),
            },
            _ = auf_trennung_warten(&mut verbunden_rx) => Ok(()),
            _ = tokio::time::sleep(self.config.loesch_timeout) => Err(GambitError::LoeschTimeout),
        };

        let ergebnis = match ergebnis {
            Ok(()) => {
                tracing::info!("Konto-Daten geloescht");
                self.trennen().await;
                self.identitaet.alles_loeschen()
            }
            Err(fehler) => {
                tracing::warn!(fehler = %fehler, "Konto-Loeschung nicht bestaetigt");
                Err(fehler)
            }
        };
        self.unterdrueckt.store(false, Ordering::SeqCst);
        ergebnis
    }
}

/// Loest auf sobald der Kanal nicht mehr verbunden ist
async fn auf_trennung_warten(verbunden_rx: &mut watch::Receiver<bool>) {
    loop {
        if !*verbunden_rx.borrow_and_update() {
            return;
        }
        if verbunden_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Ordnet eine Server-Fehlerantwort der Fehler-Taxonomie zu
fn fehler_zuordnen(fehler: ErrorResponse) -> GambitError {
    match fehler.code {
        ErrorCode::NameVergeben => GambitError::NameVergeben(fehler.message),
        ErrorCode::LoeschungAbgelehnt => GambitError::LoeschFehlgeschlagen(fehler.message),
        ErrorCode::InvalidCredentials | ErrorCode::SessionExpired => {
            GambitError::AuthFehlgeschlagen(fehler.message)
        }
        _ => GambitError::Verbindung(format!("{:?}: {}", fehler.code, fehler.message)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
