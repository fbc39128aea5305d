//! Peer-Controller – eine Audioverbindung pro Partie
//!
//! Besitzt exklusiv die Peer-Verbindung und beide Medien-Tracks.
//! Zustandsmaschine pro Peer-Sitzung:
//!
//! ```text
//! Leerlauf -> Verhandelt -> Verbunden -> Geschlossen
//!                 ^ (Offer/Answer/ICE troepfeln intern weiter)
//! ```
//!
//! `Geschlossen` wird entweder durch explizites Aufraeumen erreicht oder
//! durch einen Transport-Wechsel auf fehlgeschlagen/getrennt; beide Wege
//! geben saemtliche Medienressourcen frei. Scheitert ein Schritt des
//! Starts, bleibt kein Teilzustand zurueck.

use gambit_core::{EventBus, GambitError, Result, UserId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::platform::{
    AudioTrack, MediaCapture, PeerEreignis, PeerTransport, PeerVerbindung, PeerZustand,
};

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Zustand der Peer-Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSitzungsZustand {
    Leerlauf,
    Verhandelt,
    Verbunden,
    Geschlossen,
}

/// Rolle in der Verhandlung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rolle {
    Initiator,
    Antwortender,
}

/// An den Mitspieler zu relaisierende Signalisierung
#[derive(Debug, Clone)]
pub enum SignalAusgang {
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    Kandidat {
        kandidat: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u32>,
    },
}

/// Beobachtbare Ereignisse des Controllers
#[derive(Debug, Clone)]
pub enum VoiceEreignis {
    ZustandGeaendert(PeerSitzungsZustand),
    /// Wiedergabe-Start gescheitert (Autoplay) – gemeldet, nicht fatal
    WiedergabeFehlgeschlagen(String),
}

/// Konfiguration der Peer-Verbindung
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Kleine feste Liste oeffentlicher STUN-Endpunkte. Ohne eigene
    /// TURN-Infrastruktur kann der Aufbau hinter restriktiven NATs
    /// scheitern – bekannte Grenze, kein Fehler.
    pub stun_server: Vec<String>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            stun_server: vec![
                "stun:stun.l.google.com:19302".into(),
                "stun:stun1.l.google.com:19302".into(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// PeerController
// ---------------------------------------------------------------------------

/// Steuert genau eine Peer-Audioverbindung
#[derive(Clone)]
pub struct PeerController {
    kern: Arc<PeerKern>,
}

struct PeerKern {
    capture: Arc<dyn MediaCapture>,
    transport: Arc<dyn PeerTransport>,
    config: PeerConfig,
    zustand: Mutex<PeerSitzungsZustand>,
    rolle: Mutex<Option<Rolle>>,
    selbst_id: Mutex<Option<UserId>>,
    verbindung: tokio::sync::Mutex<Option<Arc<dyn PeerVerbindung>>>,
    lokaler_track: Mutex<Option<Arc<dyn AudioTrack>>>,
    remote_track: Mutex<Option<Arc<dyn AudioTrack>>>,
    /// Gemeinsames Stumm-Flag; die Sprachaktivitaets-Erkennung liest es mit
    stumm: Arc<AtomicBool>,
    signal_ausgang: Mutex<Option<mpsc::UnboundedSender<SignalAusgang>>>,
    ereignisse: EventBus<VoiceEreignis>,
}

impl PeerController {
    /// Erstellt einen Controller ueber den gegebenen Plattform-Faehigkeiten
    pub fn neu(
        capture: Arc<dyn MediaCapture>,
        transport: Arc<dyn PeerTransport>,
        config: PeerConfig,
    ) -> Self {
        Self {
            kern: Arc::new(PeerKern {
                capture,
                transport,
                config,
                zustand: Mutex::new(PeerSitzungsZustand::Leerlauf),
                rolle: Mutex::new(None),
                selbst_id: Mutex::new(None),
                verbindung: tokio::sync::Mutex::new(None),
                lokaler_track: Mutex::new(None),
                remote_track: Mutex::new(None),
                stumm: Arc::new(AtomicBool::new(false)),
                signal_ausgang: Mutex::new(None),
                ereignisse: EventBus::neu(),
            }),
        }
    }

    /// Abonniert die Controller-Ereignisse
    pub fn abonnieren(&self) -> broadcast::Receiver<VoiceEreignis> {
        self.kern.ereignisse.abonnieren()
    }

    /// Aktueller Sitzungszustand
    pub fn zustand(&self) -> PeerSitzungsZustand {
        *self.kern.zustand.lock()
    }

    /// Eigene User-ID der laufenden Sitzung
    pub fn selbst_id(&self) -> Option<UserId> {
        *self.kern.selbst_id.lock()
    }

    /// Gemeinsames Stumm-Flag (fuer die Sprachaktivitaets-Erkennung)
    pub fn stumm_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.kern.stumm)
    }

    pub fn ist_stumm(&self) -> bool {
        self.kern.stumm.load(Ordering::SeqCst)
    }

    /// Startet die Voice-Sitzung: Mikrofon, Verbindung, Track; als
    /// Initiator zusaetzlich das erste Offer.
    ///
    /// Scheitert ein Schritt, wird vollstaendig aufgeraeumt und der
    /// Fehler gemeldet – ein verweigertes Mikrofon kommt unveraendert
    /// als [`GambitError::MikrofonVerweigert`] an.
    pub async fn starten(
        &self,
        selbst_id: UserId,
        ist_initiator: bool,
        signal_ausgang: mpsc::UnboundedSender<SignalAusgang>,
    ) -> Result<()> {
        {
            let zustand = self.kern.zustand.lock();
            if !matches!(
                *zustand,
                PeerSitzungsZustand::Leerlauf | PeerSitzungsZustand::Geschlossen
            ) {
                return Err(GambitError::Intern("Peer-Sitzung bereits aktiv".into()));
            }
        }
        *self.kern.selbst_id.lock() = Some(selbst_id);
        *self.kern.rolle.lock() = Some(if ist_initiator {
            Rolle::Initiator
        } else {
            Rolle::Antwortender
        });
        *self.kern.signal_ausgang.lock() = Some(signal_ausgang);

        let ergebnis = self.starten_innen(ist_initiator).await;
        if let Err(fehler) = &ergebnis {
            tracing::warn!(fehler = %fehler, "Voice-Start gescheitert, raeume auf");
            self.aufraeumen().await;
        }
        ergebnis
    }

    async fn starten_innen(&self, ist_initiator: bool) -> Result<()> {
        let track = self.kern.capture.mikrofon_oeffnen().await?;
        track.aktiv_setzen(!self.kern.stumm.load(Ordering::SeqCst));
        *self.kern.lokaler_track.lock() = Some(Arc::clone(&track));

        let (ereignis_tx, ereignis_rx) = mpsc::channel(32);
        let verbindung = self
            .kern
            .transport
            .verbindung_erstellen(&self.kern.config.stun_server, ereignis_tx)
            .await?;
        *self.kern.verbindung.lock().await = Some(Arc::clone(&verbindung));

        let kern = Arc::clone(&self.kern);
        tokio::spawn(async move {
            PeerKern::ereignis_schleife(kern, ereignis_rx).await;
        });

        verbindung.lokalen_track_anhaengen(track).await?;
        self.kern.zustand_setzen(PeerSitzungsZustand::Verhandelt);

        if ist_initiator {
            let sdp = verbindung.offer_erstellen().await?;
            self.kern.signal_senden(SignalAusgang::Offer { sdp });
        }
        Ok(())
    }

    /// Wendet ein Remote-Offer an und sendet das Answer (Antwortender)
    pub async fn offer_verarbeiten(&self, offer: &str) -> Result<()> {
        if *self.kern.rolle.lock() != Some(Rolle::Antwortender) {
            return Err(GambitError::SignalFehler(
                "Offer in Initiator-Rolle erhalten".into(),
            ));
        }
        let verbindung = self.kern.verbindung_erfordern("Offer").await?;
        let sdp = verbindung.answer_erstellen(offer).await?;
        self.kern.signal_senden(SignalAusgang::Answer { sdp });
        Ok(())
    }

    /// Wendet das Remote-Answer an (Initiator)
    pub async fn answer_verarbeiten(&self, answer: &str) -> Result<()> {
        if *self.kern.rolle.lock() != Some(Rolle::Initiator) {
            return Err(GambitError::SignalFehler(
                "Answer in Antwortender-Rolle erhalten".into(),
            ));
        }
        let verbindung = self.kern.verbindung_erfordern("Answer").await?;
        verbindung.answer_anwenden(answer).await
    }

    /// Fuegt einen Remote-ICE-Kandidaten hinzu.
    ///
    /// Vorbedingung: die Verbindung existiert bereits. Kandidaten vor dem
    /// Verbindungsaufbau sind ein Protokollverstoss des Absenders und
    /// werden geloggt und verworfen, nicht gepuffert.
    pub async fn kandidat_verarbeiten(
        &self,
        kandidat: &str,
        sdp_mid: Option<&str>,
        sdp_mline_index: Option<u32>,
    ) -> Result<()> {
        let verbindung = self.kern.verbindung_erfordern("ICE-Kandidat").await?;
        verbindung
            .kandidat_hinzufuegen(kandidat, sdp_mid, sdp_mline_index)
            .await
    }

    /// Schaltet das ausgehende Audio stumm bzw. wieder frei.
    ///
    /// Wirkt direkt auf den lokalen Track, ohne Neuverhandlung.
    /// Gibt den neuen Stumm-Zustand zurueck.
    pub fn stummschalten_umschalten(&self) -> bool {
        let stumm = !self.kern.stumm.load(Ordering::SeqCst);
        self.kern.stumm.store(stumm, Ordering::SeqCst);
        if let Some(track) = self.kern.lokaler_track.lock().as_ref() {
            track.aktiv_setzen(!stumm);
        }
        tracing::debug!(stumm, "Stummschaltung umgeschaltet");
        stumm
    }

    /// Beendet die Sitzung und gibt alle Ressourcen frei.
    ///
    /// Idempotent und aus jedem Zustand aufrufbar, auch vor `starten`.
    pub async fn aufraeumen(&self) {
        self.kern.aufraeumen().await;
    }
}

// ---------------------------------------------------------------------------
// Kern-Implementierung
// ---------------------------------------------------------------------------

impl PeerKern {
    fn zustand_setzen(&self, neu: PeerSitzungsZustand) {
        let mut zustand = self.zustand.lock();
        if *zustand != neu {
            tracing::debug!(von = ?*zustand, nach = ?neu, "Peer-Zustand gewechselt");
            *zustand = neu;
            drop(zustand);
            self.ereignisse.senden(VoiceEreignis::ZustandGeaendert(neu));
        }
    }

    fn signal_senden(&self, signal: SignalAusgang) {
        let sender = self.signal_ausgang.lock().clone();
        match sender {
            Some(sender) => {
                if sender.send(signal).is_err() {
                    tracing::warn!("Signal-Ausgang geschlossen, Nachricht verworfen");
                }
            }
            None => tracing::warn!("Signal ohne laufende Sitzung verworfen"),
        }
    }

    async fn verbindung_erfordern(&self, kontext: &str) -> Result<Arc<dyn PeerVerbindung>> {
        match self.verbindung.lock().await.clone() {
            Some(verbindung) => Ok(verbindung),
            None => {
                tracing::warn!(kontext, "Signalisierung vor Verbindungsaufbau verworfen");
                Err(GambitError::SignalFehler(format!(
                    "{kontext} vor Verbindungsaufbau"
                )))
            }
        }
    }

    async fn ereignis_schleife(kern: Arc<PeerKern>, mut ereignisse: mpsc::Receiver<PeerEreignis>) {
        while let Some(ereignis) = ereignisse.recv().await {
            match ereignis {
                PeerEreignis::LokalerKandidat {
                    kandidat,
                    sdp_mid,
                    sdp_mline_index,
                } => {
                    kern.signal_senden(SignalAusgang::Kandidat {
                        kandidat,
                        sdp_mid,
                        sdp_mline_index,
                    });
                }
                PeerEreignis::RemoteTrack(track) => {
                    *kern.remote_track.lock() = Some(Arc::clone(&track));
                    let verbindung = kern.verbindung.lock().await.clone();
                    if let Some(verbindung) = verbindung {
                        if let Err(fehler) = verbindung.wiedergabe_starten(&track).await {
                            // Autoplay-Blockade: melden, Sitzung laeuft weiter
                            tracing::warn!(fehler = %fehler, "Wiedergabe-Start gescheitert");
                            kern.ereignisse.senden(VoiceEreignis::WiedergabeFehlgeschlagen(
                                fehler.to_string(),
                            ));
                        }
                    }
                }
                PeerEreignis::ZustandGeaendert(zustand) => match zustand {
                    PeerZustand::Verbunden => {
                        kern.zustand_setzen(PeerSitzungsZustand::Verbunden);
                    }
                    PeerZustand::Fehlgeschlagen | PeerZustand::Getrennt => {
                        tracing::warn!(?zustand, "Peer-Verbindung verloren, raeume auf");
                        kern.aufraeumen().await;
                        return;
                    }
                    _ => {}
                },
            }
        }
    }

    async fn aufraeumen(&self) {
        if let Some(track) = self.lokaler_track.lock().take() {
            track.stoppen();
        }
        if let Some(track) = self.remote_track.lock().take() {
            track.stoppen();
        }
        if let Some(verbindung) = self.verbindung.lock().await.take() {
            verbindung.schliessen().await;
        }
        *self.rolle.lock() = None;
        *self.signal_ausgang.lock() = None;
        self.zustand_setzen(PeerSitzungsZustand::Geschlossen);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    struct FakeTrack {
        aktiv: AtomicBool,
        gestoppt: AtomicBool,
    }

    impl FakeTrack {
        fn neu() -> Arc<Self> {
            Arc::new(Self {
                aktiv: AtomicBool::new(true),
                gestoppt: AtomicBool::new(false),
            })
        }
    }

    impl AudioTrack for FakeTrack {
        fn aktiv_setzen(&self, aktiv: bool) {
            self.aktiv.store(aktiv, Ordering::SeqCst);
        }
        fn ist_aktiv(&self) -> bool {
            self.aktiv.load(Ordering::SeqCst)
        }
        fn stoppen(&self) {
            self.gestoppt.store(true, Ordering::SeqCst);
        }
    }

    struct FakeCapture {
        verweigert: bool,
        track: Arc<FakeTrack>,
    }

    #[async_trait]
    impl MediaCapture for FakeCapture {
        async fn mikrofon_oeffnen(&self) -> Result<Arc<dyn AudioTrack>> {
            if self.verweigert {
                return Err(GambitError::MikrofonVerweigert(
                    "Berechtigung abgelehnt".into(),
                ));
            }
            Ok(Arc::clone(&self.track) as Arc<dyn AudioTrack>)
        }
    }

    #[derive(Default)]
    struct FakeVerbindungsProtokoll {
        offers: AtomicU32,
        answers: AtomicU32,
        kandidaten: AtomicU32,
        geschlossen: AtomicU32,
        track_angehaengt: AtomicBool,
        wiedergabe_scheitert: AtomicBool,
    }

    struct FakePeerVerbindung {
        protokoll: Arc<FakeVerbindungsProtokoll>,
    }

    #[async_trait]
    impl PeerVerbindung for FakePeerVerbindung {
        async fn lokalen_track_anhaengen(&self, _track: Arc<dyn AudioTrack>) -> Result<()> {
            self.protokoll.track_angehaengt.store(true, Ordering::SeqCst);
            Ok(())
        }
        async fn offer_erstellen(&self) -> Result<String> {
            self.protokoll.offers.fetch_add(1, Ordering::SeqCst);
            Ok("sdp-offer".into())
        }
        async fn answer_erstellen(&self, _offer: &str) -> Result<String> {
            self.protokoll.answers.fetch_add(1, Ordering::SeqCst);
            Ok("sdp-answer".into())
        }
        async fn answer_anwenden(&self, _answer: &str) -> Result<()> {
            Ok(())
        }
        async fn kandidat_hinzufuegen(
            &self,
            _kandidat: &str,
            _sdp_mid: Option<&str>,
            _sdp_mline_index: Option<u32>,
        ) -> Result<()> {
            self.protokoll.kandidaten.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn wiedergabe_starten(&self, _track: &Arc<dyn AudioTrack>) -> Result<()> {
            if self.protokoll.wiedergabe_scheitert.load(Ordering::SeqCst) {
                return Err(GambitError::Intern("Autoplay blockiert".into()));
            }
            Ok(())
        }
        async fn schliessen(&self) {
            self.protokoll.geschlossen.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakePeerTransport {
        protokoll: Arc<FakeVerbindungsProtokoll>,
        ereignisse: Mutex<Option<mpsc::Sender<PeerEreignis>>>,
    }

    impl FakePeerTransport {
        fn neu() -> Arc<Self> {
            Arc::new(Self {
                protokoll: Arc::new(FakeVerbindungsProtokoll::default()),
                ereignisse: Mutex::new(None),
            })
        }

        fn ereignis_sender(&self) -> mpsc::Sender<PeerEreignis> {
            self.ereignisse.lock().clone().expect("keine Verbindung erstellt")
        }
    }

    #[async_trait]
    impl PeerTransport for FakePeerTransport {
        async fn verbindung_erstellen(
            &self,
            _stun_server: &[String],
            ereignisse: mpsc::Sender<PeerEreignis>,
        ) -> Result<Arc<dyn PeerVerbindung>> {
            *self.ereignisse.lock() = Some(ereignisse);
            Ok(Arc::new(FakePeerVerbindung {
                protokoll: Arc::clone(&self.protokoll),
            }))
        }
    }

    fn controller_bauen(
        verweigert: bool,
    ) -> (PeerController, Arc<FakeTrack>, Arc<FakePeerTransport>) {
        let track = FakeTrack::neu();
        let transport = FakePeerTransport::neu();
        let controller = PeerController::neu(
            Arc::new(FakeCapture {
                verweigert,
                track: Arc::clone(&track),
            }),
            Arc::clone(&transport) as Arc<dyn PeerTransport>,
            PeerConfig::default(),
        );
        (controller, track, transport)
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn initiator_sendet_offer_nach_start() {
        let (controller, _, transport) = controller_bauen(false);
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();

        controller
            .starten(UserId::new(), true, signal_tx)
            .await
            .unwrap();

        assert_eq!(controller.zustand(), PeerSitzungsZustand::Verhandelt);
        assert!(transport.protokoll.track_angehaengt.load(Ordering::SeqCst));
        match signal_rx.recv().await.unwrap() {
            SignalAusgang::Offer { sdp } => assert_eq!(sdp, "sdp-offer"),
            andere => panic!("Erwartet Offer, erhalten {andere:?}"),
        }
    }

    #[tokio::test]
    async fn antwortender_beantwortet_offer() {
        let (controller, _, _) = controller_bauen(false);
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();

        controller
            .starten(UserId::new(), false, signal_tx)
            .await
            .unwrap();
        controller.offer_verarbeiten("sdp-offer").await.unwrap();

        match signal_rx.recv().await.unwrap() {
            SignalAusgang::Answer { sdp } => assert_eq!(sdp, "sdp-answer"),
            andere => panic!("Erwartet Answer, erhalten {andere:?}"),
        }
    }

    #[tokio::test]
    async fn offer_in_initiator_rolle_ist_signalfehler() {
        let (controller, _, _) = controller_bauen(false);
        let (signal_tx, _signal_rx) = mpsc::unbounded_channel();

        controller
            .starten(UserId::new(), true, signal_tx)
            .await
            .unwrap();
        let fehler = controller.offer_verarbeiten("sdp-offer").await.unwrap_err();
        assert!(matches!(fehler, GambitError::SignalFehler(_)));
        // Sitzung laeuft weiter
        assert_eq!(controller.zustand(), PeerSitzungsZustand::Verhandelt);
    }

    #[tokio::test]
    async fn mikrofon_verweigert_raeumt_vollstaendig_auf() {
        let (controller, _, transport) = controller_bauen(true);
        let (signal_tx, _signal_rx) = mpsc::unbounded_channel();

        let fehler = controller
            .starten(UserId::new(), true, signal_tx)
            .await
            .unwrap_err();
        assert!(matches!(fehler, GambitError::MikrofonVerweigert(_)));
        assert_eq!(controller.zustand(), PeerSitzungsZustand::Geschlossen);
        // Kein Offer gesendet, nichts angehaengt
        assert_eq!(transport.protokoll.offers.load(Ordering::SeqCst), 0);
        assert!(!transport.protokoll.track_angehaengt.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn aufraeumen_ist_idempotent_auch_vor_start() {
        let (controller, track, transport) = controller_bauen(false);

        // Vor dem Start: kein Fehler, keine aktiven Tracks
        controller.aufraeumen().await;
        controller.aufraeumen().await;
        assert_eq!(controller.zustand(), PeerSitzungsZustand::Geschlossen);

        // Nach dem Start: doppelt aufraeumen stoppt Track und schliesst genau einmal
        let (signal_tx, _signal_rx) = mpsc::unbounded_channel();
        controller
            .starten(UserId::new(), true, signal_tx)
            .await
            .unwrap();
        controller.aufraeumen().await;
        controller.aufraeumen().await;

        assert!(track.gestoppt.load(Ordering::SeqCst));
        assert_eq!(transport.protokoll.geschlossen.load(Ordering::SeqCst), 1);
        assert_eq!(controller.zustand(), PeerSitzungsZustand::Geschlossen);
    }

    #[tokio::test]
    async fn kandidat_vor_start_wird_verworfen() {
        let (controller, _, _) = controller_bauen(false);
        let fehler = controller
            .kandidat_verarbeiten("candidate:1", None, Some(0))
            .await
            .unwrap_err();
        assert!(matches!(fehler, GambitError::SignalFehler(_)));
    }

    #[tokio::test]
    async fn stummschalten_wirkt_auf_den_lokalen_track() {
        let (controller, track, _) = controller_bauen(false);
        let (signal_tx, _signal_rx) = mpsc::unbounded_channel();
        controller
            .starten(UserId::new(), false, signal_tx)
            .await
            .unwrap();

        assert!(track.ist_aktiv());
        assert!(controller.stummschalten_umschalten());
        assert!(!track.ist_aktiv());
        assert!(!controller.stummschalten_umschalten());
        assert!(track.ist_aktiv());
    }

    #[tokio::test]
    async fn lokale_kandidaten_werden_relaisiert() {
        let (controller, _, transport) = controller_bauen(false);
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        controller
            .starten(UserId::new(), false, signal_tx)
            .await
            .unwrap();

        transport
            .ereignis_sender()
            .send(PeerEreignis::LokalerKandidat {
                kandidat: "candidate:7".into(),
                sdp_mid: Some("0".into()),
                sdp_mline_index: Some(0),
            })
            .await
            .unwrap();

        match signal_rx.recv().await.unwrap() {
            SignalAusgang::Kandidat { kandidat, .. } => assert_eq!(kandidat, "candidate:7"),
            andere => panic!("Erwartet Kandidat, erhalten {andere:?}"),
        }
    }

    #[tokio::test]
    async fn transport_ausfall_schliesst_die_sitzung() {
        let (controller, track, transport) = controller_bauen(false);
        let (signal_tx, _signal_rx) = mpsc::unbounded_channel();
        controller
            .starten(UserId::new(), false, signal_tx)
            .await
            .unwrap();

        transport
            .ereignis_sender()
            .send(PeerEreignis::ZustandGeaendert(PeerZustand::Fehlgeschlagen))
            .await
            .unwrap();

        // Die Ereignis-Schleife raeumt asynchron auf
        for _ in 0..100 {
            if controller.zustand() == PeerSitzungsZustand::Geschlossen {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(controller.zustand(), PeerSitzungsZustand::Geschlossen);
        assert!(track.gestoppt.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn wiedergabe_fehler_ist_nicht_fatal() {
        let (controller, _, transport) = controller_bauen(false);
        let (signal_tx, _signal_rx) = mpsc::unbounded_channel();
        let mut ereignisse = controller.abonnieren();
        controller
            .starten(UserId::new(), false, signal_tx)
            .await
            .unwrap();

        transport
            .protokoll
            .wiedergabe_scheitert
            .store(true, Ordering::SeqCst);
        transport
            .ereignis_sender()
            .send(PeerEreignis::RemoteTrack(FakeTrack::neu()))
            .await
            .unwrap();

        loop {
            match ereignisse.recv().await.unwrap() {
                VoiceEreignis::WiedergabeFehlgeschlagen(_) => break,
                VoiceEreignis::ZustandGeaendert(_) => continue,
            }
        }
        // Sitzung besteht weiter
        assert_eq!(controller.zustand(), PeerSitzungsZustand::Verhandelt);
    }
}
