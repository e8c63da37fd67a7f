// ── Client domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ClientId;
use super::spot::Vehicle;

/// Contact details captured at check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

impl ClientInfo {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            phone: phone.into().trim().to_owned(),
        }
    }

    /// Key used to recognise a returning client.
    pub fn match_key(&self) -> String {
        client_key(&self.name, &self.phone)
    }
}

/// The canonical Client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub phone: String,
    /// Last vehicle this client checked in.
    pub vehicle: Option<Vehicle>,
    pub total_spent: f64,
    pub visits: u32,
    pub registered_at: DateTime<Utc>,
    pub last_visit: Option<DateTime<Utc>>,
}

impl Client {
    pub fn match_key(&self) -> String {
        client_key(&self.name, &self.phone)
    }

    /// Average amount spent per visit, or zero before the first visit.
    pub fn average_ticket(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_spent / f64::from(self.visits)
        }
    }
}

/// Case-insensitive name plus phone digits.
fn client_key(name: &str, phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("{}|{digits}", name.trim().to_lowercase())
}
