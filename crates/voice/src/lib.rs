//! gambit-voice – Peer-to-Peer Audioverbindung zwischen zwei Mitspielern
//!
//! Baut pro Partie genau eine direkte Audioverbindung auf. Die
//! Signalisierung (SDP Offer/Answer, ICE-Kandidaten) laeuft als Relais
//! ueber den Match-Kanal; die Medienebene selbst (Mikrofon, Peer-
//! Verbindung, Pegelmessung) ist ueber schmale Plattform-Traits
//! abstrahiert und damit ohne Hardware testbar.
//!
//! - [`platform`]: `MediaCapture`, `PeerTransport`, `AudioLevelSource`
//! - [`peer`]: Verbindungs-Controller mit Zustandsmaschine
//!   `Leerlauf -> Verhandelt -> Verbunden -> Geschlossen`
//! - [`router`]: Kopplung Match-Kanal <-> Controller in beide Richtungen
//! - [`vad`]: Sprachaktivitaets-Erkennung mit Uebergangs-Ereignissen

pub mod peer;
pub mod platform;
pub mod router;
pub mod vad;

pub use peer::{PeerConfig, PeerController, PeerSitzungsZustand, SignalAusgang, VoiceEreignis};
pub use platform::{
    AudioLevelSource, AudioTrack, MediaCapture, PeerEreignis, PeerTransport, PeerVerbindung,
    PeerZustand,
};
pub use router::SignalRouter;
pub use vad::{SprachDetektor, SprachQuelle, VadConfig, VadEreignis};
