//! Typisierter Event-Bus
//!
//! Ersetzt einzelne optionale Callback-Felder durch ein Abo-Modell mit
//! mehreren Empfaengern und explizitem Abbestellen (Receiver fallen lassen).
//! Implementiert ueber tokio broadcast-Kanaele: der Sender blockiert nie,
//! langsame Empfaenger verlieren die aeltesten Ereignisse.

use tokio::sync::broadcast;

/// Standard-Kapazitaet pro Bus (Ereignisse die ein langsamer Empfaenger
/// nachholen kann bevor die aeltesten verworfen werden)
pub const STANDARD_KAPAZITAET: usize = 64;

/// Typisierter Event-Bus mit beliebig vielen Abonnenten
///
/// `senden` schlaegt nie fehl: ohne Abonnenten wird das Ereignis
/// verworfen, das ist fuer Statusmeldungen das gewuenschte Verhalten.
#[derive(Debug, Clone)]
pub struct EventBus<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    /// Erstellt einen neuen Bus mit Standard-Kapazitaet
    pub fn neu() -> Self {
        Self::mit_kapazitaet(STANDARD_KAPAZITAET)
    }

    /// Erstellt einen neuen Bus mit eigener Kapazitaet
    pub fn mit_kapazitaet(kapazitaet: usize) -> Self {
        let (sender, _) = broadcast::channel(kapazitaet);
        Self { sender }
    }

    /// Sendet ein Ereignis an alle aktuellen Abonnenten
    pub fn senden(&self, ereignis: T) {
        // Err bedeutet lediglich: momentan kein Abonnent
        let _ = self.sender.send(ereignis);
    }

    /// Abonniert alle zukuenftigen Ereignisse
    ///
    /// Abbestellen erfolgt durch Fallenlassen des Receivers.
    pub fn abonnieren(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Gibt die Anzahl aktiver Abonnenten zurueck
    pub fn abonnenten(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::neu()
    }
}
