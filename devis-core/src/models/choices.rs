use std::fmt;

use serde::{Deserialize, Serialize};

/// Which guarantees a proposal covers.
///
/// The wire codes (`TRC`, `DO`, `DUO`) are what the REST API stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GuaranteeType {
    /// Tous Risques Chantier only.
    #[default]
    #[serde(rename = "TRC")]
    Trc,
    /// Dommages Ouvrage only.
    #[serde(rename = "DO")]
    Do,
    /// Both guarantees (DO + TRC).
    #[serde(rename = "DUO")]
    Duo,
}

impl GuaranteeType {
    pub fn all() -> &'static [GuaranteeType] {
        &[GuaranteeType::Trc, GuaranteeType::Do, GuaranteeType::Duo]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trc => "TRC",
            Self::Do => "DO",
            Self::Duo => "DUO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "TRC" => Some(Self::Trc),
            "DO" => Some(Self::Do),
            "DUO" => Some(Self::Duo),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Trc => "TRC Seule",
            Self::Do => "DO Seule",
            Self::Duo => "DUO (DO + TRC)",
        }
    }

    /// DO and DUO proposals must name the destination of the works.
    pub fn requires_destination(&self) -> bool {
        matches!(self, Self::Do | Self::Duo)
    }

    /// Whether the TRC rate takes part in the premium.
    pub fn covers_trc(&self) -> bool {
        !matches!(self, Self::Do)
    }

    /// Whether the DO rate takes part in the premium.
    pub fn covers_do(&self) -> bool {
        !matches!(self, Self::Trc)
    }
}

impl fmt::Display for GuaranteeType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of the building works. "No destination" is modelled as
/// `Option::None` on the records and travels as `""` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OuvrageDestination {
    #[serde(rename = "HABITATION")]
    Habitation,
    #[serde(rename = "HORS_HABITATION")]
    HorsHabitation,
}

impl OuvrageDestination {
    pub fn all() -> &'static [OuvrageDestination] {
        &[
            OuvrageDestination::Habitation,
            OuvrageDestination::HorsHabitation,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Habitation => "HABITATION",
            Self::HorsHabitation => "HORS_HABITATION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "HABITATION" => Some(Self::Habitation),
            "HORS_HABITATION" => Some(Self::HorsHabitation),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Habitation => "Habitation",
            Self::HorsHabitation => "Hors Habitation",
        }
    }
}

impl fmt::Display for OuvrageDestination {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkType {
    #[default]
    #[serde(rename = "NEUF")]
    Neuf,
    #[serde(rename = "RENOVATIONLE")]
    RenovationLegere,
    #[serde(rename = "RENOVATIONLD")]
    RenovationLourde,
}

impl WorkType {
    pub fn all() -> &'static [WorkType] {
        &[
            WorkType::Neuf,
            WorkType::RenovationLegere,
            WorkType::RenovationLourde,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neuf => "NEUF",
            Self::RenovationLegere => "RENOVATIONLE",
            Self::RenovationLourde => "RENOVATIONLD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "NEUF" => Some(Self::Neuf),
            "RENOVATIONLE" => Some(Self::RenovationLegere),
            "RENOVATIONLD" => Some(Self::RenovationLourde),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Neuf => "Ouvrage Neuf",
            Self::RenovationLegere => "Rénovation légère",
            Self::RenovationLourde => "Rénovation lourde",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarantee_codes_round_trip_through_parse() {
        for g in GuaranteeType::all() {
            assert_eq!(GuaranteeType::parse(g.as_str()), Some(*g));
        }
        assert_eq!(GuaranteeType::parse("duo"), None);
    }

    #[test]
    fn guarantee_coverage_flags() {
        assert!(GuaranteeType::Trc.covers_trc());
        assert!(!GuaranteeType::Trc.covers_do());
        assert!(!GuaranteeType::Do.covers_trc());
        assert!(GuaranteeType::Do.covers_do());
        assert!(GuaranteeType::Duo.covers_trc() && GuaranteeType::Duo.covers_do());
    }

    #[test]
    fn only_do_and_duo_require_a_destination() {
        assert!(!GuaranteeType::Trc.requires_destination());
        assert!(GuaranteeType::Do.requires_destination());
        assert!(GuaranteeType::Duo.requires_destination());
    }

    #[test]
    fn work_type_wire_codes() {
        assert_eq!(
            serde_json::to_string(&WorkType::RenovationLourde).unwrap(),
            "\"RENOVATIONLD\""
        );
        assert_eq!(WorkType::parse(" RENOVATIONLE "), Some(WorkType::RenovationLegere));
    }

    #[test]
    fn destination_labels() {
        assert_eq!(OuvrageDestination::HorsHabitation.label(), "Hors Habitation");
        assert_eq!(
            OuvrageDestination::parse("HORS_HABITATION"),
            Some(OuvrageDestination::HorsHabitation)
        );
    }
}
