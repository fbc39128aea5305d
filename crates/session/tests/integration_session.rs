//! Integrationstests fuer SessionManager und MatchChannel
//!
//! Laufen gegen Fake-Implementierungen der Plattform-Traits mit
//! angehaltener tokio-Zeit: Backoff- und Timeout-Verhalten ist damit
//! deterministisch pruefbar ohne echte Wartezeiten.

use async_trait::async_trait;
use gambit_core::{GambitError, Result, UserId};
use gambit_protocol::control::{
    AnmeldeAnfrage, AnmeldeAntwort, AntwortPayload, AntwortRahmen, ErrorCode, ErrorResponse,
    KlientNachricht, KlientPayload,
};
use gambit_protocol::envelope::{InboundEnvelope, OP_PING, OP_SPIELSTAND};
use gambit_session::identity::{SCHLUESSEL_ANZEIGE_NAME, SCHLUESSEL_GERAETE_TOKEN};
use gambit_session::{
    DuplexTransport, DuplexVerbindung, KeyValueStore, MatchChannel, MatchEreignis,
    ReconnectPolicy, SessionConfig, SessionEreignis, SessionManager, SpeicherKvStore,
    TransportEreignis, AuthDienst, VerbindungsStatus,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Fake-Anmeldedienst: Erfolg oder Namenskonflikt
struct FakeAuth {
    name_vergeben: bool,
}

#[async_trait]
impl AuthDienst for FakeAuth {
    async fn anmelden(&self, anfrage: &AnmeldeAnfrage) -> Result<AnmeldeAntwort> {
        if self.name_vergeben {
            return Err(GambitError::NameVergeben(anfrage.anzeige_name.clone()));
        }
        Ok(AnmeldeAntwort {
            user_id: UserId::new(),
            anzeige_name: anfrage.anzeige_name.clone(),
            sitzungs_token: "sitzung-1".into(),
        })
    }
}

/// Reaktion des Fake-Diensts auf eine gesendete Nachricht
enum ServerAktion {
    Antwort(AntwortPayload),
    Trennen(String),
    Nichts,
}

type Antwortgeber = dyn Fn(&KlientNachricht) -> Vec<ServerAktion> + Send + Sync;

/// Fake-Spieldienst: Transport + skriptbares Serververhalten
#[derive(Clone)]
struct FakeDienst {
    kern: Arc<DienstKern>,
}

struct DienstKern {
    antwortgeber: Mutex<Arc<Antwortgeber>>,
    /// Ereignis-Sender der juengsten Verbindung
    eingang: Mutex<Option<mpsc::Sender<TransportEreignis>>>,
    gesendet: Mutex<Vec<KlientNachricht>>,
    oeffnungen: AtomicU32,
    /// So viele kommende Oeffnungsversuche schlagen fehl
    fehlschlaege: AtomicU32,
}

impl FakeDienst {
    fn neu() -> Self {
        Self {
            kern: Arc::new(DienstKern {
                antwortgeber: Mutex::new(Arc::new(|_| vec![ServerAktion::Nichts])),
                eingang: Mutex::new(None),
                gesendet: Mutex::new(Vec::new()),
                oeffnungen: AtomicU32::new(0),
                fehlschlaege: AtomicU32::new(0),
            }),
        }
    }

    fn antworten_mit<F>(&self, f: F)
    where
        F: Fn(&KlientNachricht) -> Vec<ServerAktion> + Send + Sync + 'static,
    {
        *self.kern.antwortgeber.lock() = Arc::new(f);
    }

    fn oeffnungen(&self) -> u32 {
        self.kern.oeffnungen.load(Ordering::SeqCst)
    }

    fn fehlschlaege_setzen(&self, anzahl: u32) {
        self.kern.fehlschlaege.store(anzahl, Ordering::SeqCst);
    }

    fn gesendete(&self) -> Vec<KlientNachricht> {
        self.kern.gesendet.lock().clone()
    }

    fn eingang(&self) -> mpsc::Sender<TransportEreignis> {
        self.kern.eingang.lock().clone().expect("keine offene Verbindung")
    }

    /// Spielt einen Push des Diensts ein
    async fn push_einspielen(&self, envelope: InboundEnvelope) {
        let json = serde_json::to_string(&envelope).unwrap();
        self.eingang()
            .send(TransportEreignis::Nachricht(json))
            .await
            .unwrap();
    }

    /// Simuliert einen Verbindungsabriss
    async fn trennen(&self, grund: &str) {
        self.eingang()
            .send(TransportEreignis::Getrennt {
                grund: grund.into(),
            })
            .await
            .unwrap();
    }
}

#[async_trait]
impl DuplexTransport for FakeDienst {
    async fn oeffnen(
        &self,
        _url: &str,
        eingang: mpsc::Sender<TransportEreignis>,
    ) -> Result<Arc<dyn DuplexVerbindung>> {
        self.kern.oeffnungen.fetch_add(1, Ordering::SeqCst);
        if self.kern.fehlschlaege.load(Ordering::SeqCst) > 0 {
            self.kern.fehlschlaege.fetch_sub(1, Ordering::SeqCst);
            return Err(GambitError::Verbindung("Fake: Dienst nicht erreichbar".into()));
        }
        *self.kern.eingang.lock() = Some(eingang);
        Ok(Arc::new(FakeVerbindung {
            dienst: self.clone(),
        }))
    }
}

struct FakeVerbindung {
    dienst: FakeDienst,
}

#[async_trait]
impl DuplexVerbindung for FakeVerbindung {
    async fn senden(&self, text: String) -> Result<()> {
        let nachricht: KlientNachricht = serde_json::from_str(&text).unwrap();
        self.dienst.kern.gesendet.lock().push(nachricht.clone());
        let antwortgeber = self.dienst.kern.antwortgeber.lock().clone();
        let aktionen = antwortgeber(&nachricht);
        let eingang = self.dienst.kern.eingang.lock().clone();
        let Some(eingang) = eingang else { return Ok(()) };
        for aktion in aktionen {
            match aktion {
                ServerAktion::Antwort(payload) => {
                    let rahmen = AntwortRahmen {
                        request_id: nachricht.request_id,
                        payload,
                    };
                    let json = serde_json::to_string(&rahmen).unwrap();
                    let _ = eingang.send(TransportEreignis::Nachricht(json)).await;
                }
                ServerAktion::Trennen(grund) => {
                    let _ = eingang.send(TransportEreignis::Getrennt { grund }).await;
                }
                ServerAktion::Nichts => {}
            }
        }
        Ok(())
    }

    async fn schliessen(&self) {}
}

// ---------------------------------------------------------------------------
// Aufbau-Helfer
// ---------------------------------------------------------------------------

fn test_config() -> SessionConfig {
    SessionConfig {
        dienst_url: "ws://fake/spiel".into(),
        ..SessionConfig::default()
    }
}

fn manager_bauen(
    dienst: &FakeDienst,
    name_vergeben: bool,
    config: SessionConfig,
) -> (SessionManager, Arc<SpeicherKvStore>) {
    let speicher = Arc::new(SpeicherKvStore::neu());
    let manager = SessionManager::neu(
        Arc::new(dienst.clone()),
        Arc::new(FakeAuth { name_vergeben }),
        speicher.clone(),
        config,
    );
    (manager, speicher)
}

async fn status_erwarten(
    ereignisse: &mut broadcast::Receiver<SessionEreignis>,
    erwartet: VerbindungsStatus,
) {
    loop {
        match tokio::time::timeout(Duration::from_secs(300), ereignisse.recv()).await {
            Ok(Ok(SessionEreignis::StatusGeaendert(status))) if status == erwartet => return,
            Ok(Ok(_)) => continue,
            Ok(Err(fehler)) => panic!("Ereignisstrom beendet: {fehler}"),
            Err(_) => panic!("Status {erwartet:?} nicht erreicht"),
        }
    }
}

fn spielstand_envelope(status: &str) -> InboundEnvelope {
    InboundEnvelope {
        op: OP_SPIELSTAND,
        payload: serde_json::json!({ "status": status }),
    }
}

// ---------------------------------------------------------------------------
// Szenario-Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn anmeldung_verbindung_partiesuche_spielstand() {
    let dienst = FakeDienst::neu();
    dienst.antworten_mit(|nachricht| match &nachricht.payload {
        KlientPayload::PartieSuchen { .. } => vec![ServerAktion::Antwort(
            AntwortPayload::PartieGefunden {
                match_id: "m-1".into(),
            },
        )],
        _ => vec![ServerAktion::Nichts],
    });
    let (manager, _) = manager_bauen(&dienst, false, test_config());
    let mut ereignisse = manager.abonnieren();

    // Anmeldung erzeugt eine Session
    let session = manager.anmelden(Some("ash")).await.unwrap();
    assert_eq!(session.anzeige_name, "ash");

    // Verbindungsaufbau: Getrennt -> Verbindet -> Verbunden
    let kanal = MatchChannel::neu(manager.clone());
    let mut match_ereignisse = kanal.abonnieren();
    manager.verbinden().await.unwrap();
    status_erwarten(&mut ereignisse, VerbindungsStatus::Verbindet).await;
    status_erwarten(&mut ereignisse, VerbindungsStatus::Verbunden).await;

    // Partiesuche liefert die ID und tritt bei
    let match_id = kanal.partie_suchen("timed").await.unwrap();
    assert_eq!(match_id.inner(), "m-1");
    assert_eq!(kanal.aktuelle_partie(), Some("m-1".into()));
    assert!(dienst.gesendete().iter().any(|n| matches!(
        &n.payload,
        KlientPayload::PartieBeitreten { match_id } if match_id.inner() == "m-1"
    )));

    // Spielstand-Push wird als Ereignis gehoben
    dienst.push_einspielen(spielstand_envelope("active")).await;
    let ereignis = tokio::time::timeout(Duration::from_secs(5), match_ereignisse.recv())
        .await
        .unwrap()
        .unwrap();
    match ereignis {
        MatchEreignis::SpielstandAktualisiert(stand) => assert_eq!(stand.status, "active"),
        andere => panic!("Erwartet Spielstand, erhalten {andere:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn namenskonflikt_legt_keine_session_an() {
    let dienst = FakeDienst::neu();
    let (manager, _) = manager_bauen(&dienst, true, test_config());

    let fehler = manager.anmelden(Some("ash")).await.unwrap_err();
    assert!(matches!(fehler, GambitError::NameVergeben(name) if name == "ash"));

    // Keine Session, kein Kanal
    assert!(manager.session().is_none());
    assert_eq!(dienst.oeffnungen(), 0);
    assert!(manager.verbinden().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn wiederverbindung_beginnt_nach_erfolg_wieder_bei_versuch_eins() {
    let dienst = FakeDienst::neu();
    let (manager, _) = manager_bauen(&dienst, false, test_config());
    let mut ereignisse = manager.abonnieren();

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();
    status_erwarten(&mut ereignisse, VerbindungsStatus::Verbunden).await;

    // Erster Abriss: Versuch 1 greift nach der Basis-Verzoegerung (1s)
    let start = tokio::time::Instant::now();
    dienst.trennen("Netz weg").await;
    status_erwarten(&mut ereignisse, VerbindungsStatus::Wiederverbindet).await;
    status_erwarten(&mut ereignisse, VerbindungsStatus::Verbunden).await;
    let dauer = start.elapsed();
    assert!(dauer >= Duration::from_secs(1), "Backoff nicht abgewartet: {dauer:?}");
    assert!(dauer < Duration::from_secs(2), "Backoff zu lang: {dauer:?}");
    assert_eq!(dienst.oeffnungen(), 2);

    // Zweiter Abriss nach Erfolg: Zaehler beginnt wieder bei 1,
    // die Verzoegerung ist also erneut die Basis und nicht 2s
    let start = tokio::time::Instant::now();
    dienst.trennen("Netz wieder weg").await;
    status_erwarten(&mut ereignisse, VerbindungsStatus::Verbunden).await;
    let dauer = start.elapsed();
    assert!(dauer >= Duration::from_secs(1));
    assert!(dauer < Duration::from_secs(2), "Backoff wurde nicht zurueckgesetzt: {dauer:?}");
    assert_eq!(dienst.oeffnungen(), 3);
}

#[tokio::test(start_paused = true)]
async fn wiederverbindung_erschoepft_meldet_genau_einmal() {
    let dienst = FakeDienst::neu();
    let config = SessionConfig {
        reconnect: ReconnectPolicy {
            max_versuche: 3,
            ..ReconnectPolicy::default()
        },
        ..test_config()
    };
    let (manager, _) = manager_bauen(&dienst, false, config);
    let mut ereignisse = manager.abonnieren();

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();
    status_erwarten(&mut ereignisse, VerbindungsStatus::Verbunden).await;

    // Alle folgenden Versuche schlagen fehl
    dienst.fehlschlaege_setzen(u32::MAX);
    dienst.trennen("Netz weg").await;

    let mut aufgegeben = 0u32;
    loop {
        match tokio::time::timeout(Duration::from_secs(600), ereignisse.recv()).await {
            Ok(Ok(SessionEreignis::WiederverbindungAufgegeben { versuche })) => {
                assert_eq!(versuche, 3);
                aufgegeben += 1;
                break;
            }
            Ok(Ok(_)) => continue,
            andere => panic!("Erschoepfung nicht gemeldet: {andere:?}"),
        }
    }

    // Lange warten: kein 4. Versuch, keine zweite Meldung
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(dienst.oeffnungen(), 1 + 3, "kein weiterer Versuch nach Erschoepfung");
    while let Ok(ereignis) = ereignisse.try_recv() {
        if matches!(ereignis, SessionEreignis::WiederverbindungAufgegeben { .. }) {
            aufgegeben += 1;
        }
    }
    assert_eq!(aufgegeben, 1, "Fatale Meldung feuert genau einmal");
    assert_eq!(manager.status(), VerbindungsStatus::Getrennt);
}

#[tokio::test(start_paused = true)]
async fn konto_loeschung_trennung_vor_ablauf_ist_erfolg() {
    let dienst = FakeDienst::neu();
    dienst.antworten_mit(|nachricht| match &nachricht.payload {
        KlientPayload::KontoLoeschen => {
            vec![ServerAktion::Trennen("Konto geloescht".into())]
        }
        _ => vec![ServerAktion::Nichts],
    });
    let (manager, speicher) = manager_bauen(&dienst, false, test_config());

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();
    assert!(speicher.lesen(SCHLUESSEL_GERAETE_TOKEN).unwrap().is_some());

    manager.konto_loeschen().await.unwrap();

    // Identitaet vollstaendig geraeumt, Session weg, keine Wiederverbindung
    assert!(speicher.lesen(SCHLUESSEL_GERAETE_TOKEN).unwrap().is_none());
    assert!(speicher.lesen(SCHLUESSEL_ANZEIGE_NAME).unwrap().is_none());
    assert!(manager.session().is_none());
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(dienst.oeffnungen(), 1, "keine Wiederverbindung nach Loeschung");
}

#[tokio::test(start_paused = true)]
async fn konto_loeschung_ohne_antwort_ist_timeout() {
    let dienst = FakeDienst::neu();
    let (manager, speicher) = manager_bauen(&dienst, false, test_config());

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();

    let fehler = manager.konto_loeschen().await.unwrap_err();
    assert!(matches!(fehler, GambitError::LoeschTimeout));

    // Timeout loescht nichts lokal – Wiederholung bleibt moeglich
    assert!(speicher.lesen(SCHLUESSEL_GERAETE_TOKEN).unwrap().is_some());
    assert_eq!(manager.status(), VerbindungsStatus::Verbunden);
}

#[tokio::test(start_paused = true)]
async fn konto_loeschung_explizite_ablehnung() {
    let dienst = FakeDienst::neu();
    dienst.antworten_mit(|nachricht| match &nachricht.payload {
        KlientPayload::KontoLoeschen => vec![ServerAktion::Antwort(AntwortPayload::Fehler(
            ErrorResponse {
                code: ErrorCode::LoeschungAbgelehnt,
                message: "Richtlinie".into(),
            },
        ))],
        _ => vec![ServerAktion::Nichts],
    });
    let (manager, _) = manager_bauen(&dienst, false, test_config());

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();

    let fehler = manager.konto_loeschen().await.unwrap_err();
    assert!(matches!(fehler, GambitError::LoeschFehlgeschlagen(_)));
}

#[tokio::test(start_paused = true)]
async fn zweite_loeschung_waehrend_laufender_wird_abgewiesen() {
    let dienst = FakeDienst::neu();
    let (manager, _) = manager_bauen(&dienst, false, test_config());

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();

    let erster_aufruf = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.konto_loeschen().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Zweiter Aufruf waehrend der erste noch laeuft: sofortige Abweisung
    let zweiter = manager.konto_loeschen().await;
    assert!(matches!(zweiter, Err(GambitError::LoeschungLaeuft)));

    let erster = erster_aufruf.await.unwrap();
    assert!(matches!(erster, Err(GambitError::LoeschTimeout)));
}

#[tokio::test(start_paused = true)]
async fn unbekannter_opcode_hebt_kein_ereignis() {
    let dienst = FakeDienst::neu();
    let (manager, _) = manager_bauen(&dienst, false, test_config());
    let kanal = MatchChannel::neu(manager.clone());
    let mut match_ereignisse = kanal.abonnieren();

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();

    dienst
        .push_einspielen(InboundEnvelope {
            op: 99,
            payload: serde_json::json!({ "x": 1 }),
        })
        .await;
    // Danach ein gueltiger Spielstand: das ERSTE beobachtete Ereignis
    // muss der Spielstand sein, der unbekannte Code hob nichts
    dienst.push_einspielen(spielstand_envelope("active")).await;

    let ereignis = tokio::time::timeout(Duration::from_secs(5), match_ereignisse.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(ereignis, MatchEreignis::SpielstandAktualisiert(_)));
}

#[tokio::test(start_paused = true)]
async fn operationen_ohne_kanal_melden_statt_panik() {
    let dienst = FakeDienst::neu();
    let (manager, _) = manager_bauen(&dienst, false, test_config());
    let kanal = MatchChannel::neu(manager.clone());

    assert!(matches!(
        kanal.partie_suchen("timed").await,
        Err(GambitError::KanalNichtBereit(_))
    ));
    assert!(matches!(
        kanal.zug_senden(4).await,
        Err(GambitError::KanalNichtBereit(_))
    ));
    assert!(matches!(
        kanal.partie_verlassen().await,
        Err(GambitError::KanalNichtBereit(_))
    ));
    assert!(matches!(
        kanal.bestenliste_abrufen().await,
        Err(GambitError::KanalNichtBereit(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn server_ping_wird_automatisch_beantwortet() {
    let dienst = FakeDienst::neu();
    let (manager, _) = manager_bauen(&dienst, false, test_config());

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();

    dienst
        .push_einspielen(InboundEnvelope {
            op: OP_PING,
            payload: serde_json::json!({ "timestamp_ms": 123456 }),
        })
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(dienst.gesendete().iter().any(|n| matches!(
        n.payload,
        KlientPayload::Pong {
            echo_timestamp_ms: 123456
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn abmelden_loescht_identitaet_und_trennt() {
    let dienst = FakeDienst::neu();
    let (manager, speicher) = manager_bauen(&dienst, false, test_config());

    manager.anmelden(Some("ash")).await.unwrap();
    manager.verbinden().await.unwrap();

    manager.abmelden().await.unwrap();

    assert!(manager.session().is_none());
    assert_eq!(manager.status(), VerbindungsStatus::Getrennt);
    assert!(speicher.lesen(SCHLUESSEL_GERAETE_TOKEN).unwrap().is_none());

    // Keine Wiederverbindung nach bewusster Abmeldung
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(dienst.oeffnungen(), 1);
}
