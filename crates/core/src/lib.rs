//! gambit-core – Gemeinsame Typen, Fehlertypen und Event-Bus
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Gambit-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{GambitError, Result};
pub use event::EventBus;
pub use types::{MatchId, UserId};
