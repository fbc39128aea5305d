//! gambit-session – Session-Manager, Wiederverbindung und Match-Kanal
//!
//! Dieses Crate besitzt die Verbindung zum Spieldienst:
//! - [`platform`]: schmale Traits fuer Plattform-Faehigkeiten (Duplex-Kanal,
//!   Key/Value-Speicher, Auth-Roundtrip), damit alle Zustandsmaschinen
//!   gegen Fakes testbar sind
//! - [`identity`]: dauerhafte Geraete-Identitaet (Token + Anzeigename)
//! - [`reconnect`]: exponentielles Backoff mit Deckel und Versuchslimit
//! - [`manager`]: Authentifizierung, Kanal-Lebenszyklus, Statusmaschine,
//!   Wiederverbindung, Abmeldung und Konto-Loeschung
//! - [`channel`]: Matchmaking, Zuege, Bestenliste und das Demultiplexen
//!   eingehender Push-Nachrichten
//! - [`ws`]: WebSocket-Implementierung des Duplex-Kanals

pub mod channel;
pub mod identity;
pub mod manager;
pub mod platform;
pub mod reconnect;
pub mod ws;

pub use channel::{MatchChannel, MatchEreignis, SignalEreignis};
pub use identity::{DateiKvStore, Identitaet, IdentityStore, SpeicherKvStore};
pub use manager::{Session, SessionConfig, SessionEreignis, SessionManager, VerbindungsStatus};
pub use platform::{AuthDienst, DuplexTransport, DuplexVerbindung, KeyValueStore, TransportEreignis};
pub use reconnect::{ReconnectPolicy, ReconnectState};
pub use ws::WsTransport;
