//! HTTP-Implementierung des Anmeldediensts
//!
//! Die Anmeldung laeuft als einzelner HTTP-Roundtrip gegen den
//! Spieldienst, getrennt vom Duplex-Kanal. Ein Namenskonflikt wird vom
//! Dienst als 409 Conflict gemeldet und hier in
//! [`GambitError::NameVergeben`] uebersetzt.

use async_trait::async_trait;
use gambit_core::{GambitError, Result};
use gambit_protocol::control::{AnmeldeAnfrage, AnmeldeAntwort};
use gambit_session::AuthDienst;
use reqwest::StatusCode;

/// Anmeldedienst ueber HTTP
pub struct HttpAuthDienst {
    client: reqwest::Client,
    basis_url: String,
}

impl HttpAuthDienst {
    /// Erstellt den Dienst fuer die angegebene Basis-URL
    pub fn neu(basis_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            basis_url,
        }
    }
}

#[async_trait]
impl AuthDienst for HttpAuthDienst {
    async fn anmelden(&self, anfrage: &AnmeldeAnfrage) -> Result<AnmeldeAntwort> {
        let url = format!("{}/anmelden", self.basis_url);
        let antwort = self
            .client
            .post(&url)
            .json(anfrage)
            .send()
            .await
            .map_err(|fehler| {
                GambitError::Verbindung(format!("Anmeldedienst nicht erreichbar: {fehler}"))
            })?;

        match antwort.status() {
            StatusCode::OK => antwort.json::<AnmeldeAntwort>().await.map_err(|fehler| {
                GambitError::AuthFehlgeschlagen(format!("Unlesbare Anmelde-Antwort: {fehler}"))
            }),
            // Erkennbares Statussignal des Transports fuer den Namenskonflikt
            StatusCode::CONFLICT => Err(GambitError::NameVergeben(anfrage.anzeige_name.clone())),
            status => Err(GambitError::AuthFehlgeschlagen(format!(
                "Anmeldung abgelehnt (Status {status})"
            ))),
        }
    }
}
