//! Domain subsets used to select dialogues for a corpus.

use std::fmt;
use std::str::FromStr;

use crate::dstc::{dstc_service_name, DstcDialogue};
use crate::error::SerializerError;

/// Domains present in the SGD training split.
pub const SEEN_DOMAINS: [&str; 16] = [
    "Banks",
    "Buses",
    "Calendar",
    "Events",
    "Flights",
    "Homes",
    "Hotels",
    "Media",
    "Movies",
    "Music",
    "RentalCars",
    "Restaurants",
    "RideSharing",
    "Services",
    "Travel",
    "Weather",
];

/// Domains that only appear in the SGD test split.
pub const UNSEEN_DOMAINS: [&str; 4] = ["Alarm", "Messaging", "Payment", "Trains"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainSetting {
    All,
    Seen,
    Unseen,
    Custom,
}

impl DomainSetting {
    /// Resolve to a concrete domain list. `custom` is used only for
    /// [`DomainSetting::Custom`].
    pub fn domains(self, custom: &[String]) -> Vec<String> {
        match self {
            DomainSetting::All => SEEN_DOMAINS
                .iter()
                .chain(UNSEEN_DOMAINS.iter())
                .map(|d| d.to_string())
                .collect(),
            DomainSetting::Seen => SEEN_DOMAINS.iter().map(|d| d.to_string()).collect(),
            DomainSetting::Unseen => UNSEEN_DOMAINS.iter().map(|d| d.to_string()).collect(),
            DomainSetting::Custom => custom.to_vec(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DomainSetting::All => "all",
            DomainSetting::Seen => "seen",
            DomainSetting::Unseen => "unseen",
            DomainSetting::Custom => "custom",
        }
    }
}

impl FromStr for DomainSetting {
    type Err = SerializerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DomainSetting::All),
            "seen" => Ok(DomainSetting::Seen),
            "unseen" => Ok(DomainSetting::Unseen),
            "custom" => Ok(DomainSetting::Custom),
            other => Err(SerializerError::UnknownDomainSetting(other.to_string())),
        }
    }
}

impl fmt::Display for DomainSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when every service of the dialogue belongs to one of `domains`.
pub fn dialogue_in_domains(dialogue: &DstcDialogue, domains: &[String]) -> bool {
    dialogue
        .services
        .iter()
        .all(|service| domains.iter().any(|d| d == dstc_service_name(service)))
}
