//! gambit-protocol – Protokoll-Definitionen fuer den Gambit-Client
//!
//! Drei Nachrichtenklassen laufen ueber den Duplex-Kanal:
//! - Anfragen mit `request_id`, auf die der Dienst mit derselben ID antwortet
//! - Pushes vom Client (fire-and-forget, z.B. Zuege und Voice-Signalisierung)
//! - Pushes vom Dienst als [`envelope::InboundEnvelope`] mit numerischem OpCode
//!
//! Die Authentifizierung laeuft als eigener Roundtrip VOR dem Kanalaufbau
//! (siehe [`control::AnmeldeAnfrage`]), damit bei einem Namenskonflikt kein
//! Kanal geoeffnet wird.

pub mod control;
pub mod envelope;
pub mod signal;
pub mod spiel;

pub use control::{AntwortPayload, AntwortRahmen, ErrorCode, ErrorResponse, KlientNachricht, KlientPayload};
pub use envelope::{EingehendeNachricht, InboundEnvelope, OpCode};
pub use signal::{KandidatNachricht, KandidatRelais, SdpNachricht, SdpRelais};
pub use spiel::{BestenlistenEintrag, Spielstand};
