use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::wire;
use super::{GuaranteeType, OuvrageDestination, PersistedProposal, WorkType};
use crate::calculations::premium::{PremiumCalculator, PremiumInput, fraction_to_percent};

pub type ProposalId = i64;

/// The record being edited in the proposal wizard.
///
/// Rates are fractions (`0.01` is 1 %). The draft keeps whatever the operator
/// typed for both rates even when the current guarantee ignores one of them;
/// [`ProposalDraft::to_payload`] is where the unused rate is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalDraft {
    pub opportunity_number: String,
    pub client_name: String,
    pub guarantee_type: GuaranteeType,
    #[serde(with = "wire::destination")]
    pub ouvrage_destination: Option<OuvrageDestination>,
    pub work_type: WorkType,
    /// `None` while the cost field is blank.
    #[serde(deserialize_with = "wire::lenient_decimal")]
    pub ouvrage_cost: Option<Decimal>,
    pub address_chantier: String,
    pub ouvrage_description: String,
    pub existing_presence: bool,
    pub is_vip_client: bool,
    pub rcmo_desired: bool,
    #[serde(deserialize_with = "wire::lenient_decimal")]
    pub trc_rate: Option<Decimal>,
    #[serde(deserialize_with = "wire::lenient_decimal")]
    pub do_rate: Option<Decimal>,
}

impl Default for ProposalDraft {
    fn default() -> Self {
        Self {
            opportunity_number: String::new(),
            client_name: String::new(),
            guarantee_type: GuaranteeType::default(),
            ouvrage_destination: None,
            work_type: WorkType::default(),
            ouvrage_cost: Some(Decimal::ZERO),
            address_chantier: String::new(),
            ouvrage_description: String::new(),
            existing_presence: false,
            is_vip_client: false,
            rcmo_desired: false,
            trc_rate: None,
            do_rate: None,
        }
    }
}

impl ProposalDraft {
    /// Builds a draft from a server record, keeping only the editable fields.
    pub fn from_persisted(record: &PersistedProposal) -> Self {
        let mut draft = Self {
            opportunity_number: record.opportunity_number.clone(),
            client_name: record.client_name.clone(),
            guarantee_type: record.guarantee_type,
            ouvrage_destination: record.ouvrage_destination,
            work_type: record.work_type,
            ouvrage_cost: record.ouvrage_cost.or(Some(Decimal::ZERO)),
            address_chantier: record.address_chantier.clone(),
            ouvrage_description: record.ouvrage_description.clone(),
            existing_presence: record.existing_presence,
            is_vip_client: record.is_vip_client,
            rcmo_desired: record.rcmo_desired,
            trc_rate: record.trc_rate,
            do_rate: record.do_rate,
        };
        draft.enforce_destination_rule();
        draft
    }

    /// Applies a single field change and re-derives the destination rule.
    pub fn apply(
        &mut self,
        update: FieldUpdate,
    ) {
        match update {
            FieldUpdate::OpportunityNumber(v) => self.opportunity_number = v,
            FieldUpdate::ClientName(v) => self.client_name = v,
            FieldUpdate::GuaranteeType(v) => self.guarantee_type = v,
            FieldUpdate::OuvrageDestination(v) => self.ouvrage_destination = v,
            FieldUpdate::WorkType(v) => self.work_type = v,
            FieldUpdate::OuvrageCost(v) => self.ouvrage_cost = v,
            FieldUpdate::AddressChantier(v) => self.address_chantier = v,
            FieldUpdate::OuvrageDescription(v) => self.ouvrage_description = v,
            FieldUpdate::ExistingPresence(v) => self.existing_presence = v,
            FieldUpdate::IsVipClient(v) => self.is_vip_client = v,
            FieldUpdate::RcmoDesired(v) => self.rcmo_desired = v,
            FieldUpdate::TrcRate(v) => self.trc_rate = v,
            FieldUpdate::DoRate(v) => self.do_rate = v,
        }
        self.enforce_destination_rule();
    }

    fn enforce_destination_rule(&mut self) {
        if self.guarantee_type == GuaranteeType::Trc {
            self.ouvrage_destination = None;
        }
    }

    pub fn premium_input(&self) -> PremiumInput {
        PremiumInput {
            ouvrage_cost: self.ouvrage_cost,
            trc_rate: self.trc_rate,
            do_rate: self.do_rate,
            guarantee_type: self.guarantee_type,
        }
    }

    /// The record as it is sent to the store: blank cost becomes zero, the
    /// rate the guarantee does not cover is nulled, and the destination is
    /// dropped unless the guarantee requires one.
    pub fn to_payload(&self) -> ProposalPayload {
        let guarantee = self.guarantee_type;
        ProposalPayload {
            opportunity_number: self.opportunity_number.trim().to_string(),
            client_name: self.client_name.trim().to_string(),
            guarantee_type: guarantee,
            ouvrage_destination: self
                .ouvrage_destination
                .filter(|_| guarantee.requires_destination()),
            work_type: self.work_type,
            ouvrage_cost: self.ouvrage_cost.unwrap_or(Decimal::ZERO),
            address_chantier: self.address_chantier.clone(),
            ouvrage_description: self.ouvrage_description.clone(),
            existing_presence: self.existing_presence,
            is_vip_client: self.is_vip_client,
            rcmo_desired: self.rcmo_desired,
            trc_rate: self.trc_rate.filter(|_| guarantee.covers_trc()),
            do_rate: self.do_rate.filter(|_| guarantee.covers_do()),
        }
    }
}

fn opt_display(value: &Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn rate_display(value: &Option<Decimal>) -> String {
    value
        .map(|v| format!("{} %", fraction_to_percent(v).normalize()))
        .unwrap_or_else(|| "-".to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value { "Oui" } else { "Non" }
}

/// Recap shown on the last wizard stage.
impl fmt::Display for ProposalDraft {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let premiums = PremiumCalculator::calculate(&self.premium_input());

        writeln!(f, "N° d'opportunité:      {}", self.opportunity_number)?;
        writeln!(f, "Client:                {}", self.client_name)?;
        writeln!(f, "Garantie:              {}", self.guarantee_type.label())?;
        writeln!(
            f,
            "Destination:           {}",
            self.ouvrage_destination.map(|d| d.label()).unwrap_or("-")
        )?;
        writeln!(f, "Type de travaux:       {}", self.work_type.label())?;
        writeln!(f, "Coût de l'ouvrage:     {}", opt_display(&self.ouvrage_cost))?;
        writeln!(f, "Adresse du chantier:   {}", self.address_chantier)?;
        writeln!(f, "Description:           {}", self.ouvrage_description)?;
        writeln!(f, "Existants:             {}", yes_no(self.existing_presence))?;
        writeln!(f, "Client VIP:            {}", yes_no(self.is_vip_client))?;
        writeln!(f, "RCMO souhaitée:        {}", yes_no(self.rcmo_desired))?;
        if self.guarantee_type.covers_trc() {
            writeln!(f, "Taux TRC:              {}", rate_display(&self.trc_rate))?;
            writeln!(f, "Prime seule TRC:       {}", premiums.prime_seule_trc)?;
        }
        if self.guarantee_type.covers_do() {
            writeln!(f, "Taux DO:               {}", rate_display(&self.do_rate))?;
            writeln!(f, "Prime seule DO:        {}", premiums.prime_seule_do)?;
        }
        write!(f, "Prime totale:          {}", premiums.prime_seule_duo)
    }
}

/// What the store receives on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub opportunity_number: String,
    pub client_name: String,
    pub guarantee_type: GuaranteeType,
    #[serde(with = "wire::destination", default)]
    pub ouvrage_destination: Option<OuvrageDestination>,
    pub work_type: WorkType,
    pub ouvrage_cost: Decimal,
    #[serde(default)]
    pub address_chantier: String,
    #[serde(default)]
    pub ouvrage_description: String,
    #[serde(default)]
    pub existing_presence: bool,
    #[serde(default)]
    pub is_vip_client: bool,
    #[serde(default)]
    pub rcmo_desired: bool,
    pub trc_rate: Option<Decimal>,
    pub do_rate: Option<Decimal>,
}

/// Summary held once a proposal has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedProposal {
    pub id: ProposalId,
    pub opportunity_number: String,
    pub client_name: String,
}

impl From<&PersistedProposal> for SubmittedProposal {
    fn from(record: &PersistedProposal) -> Self {
        Self {
            id: record.id,
            opportunity_number: record.opportunity_number.clone(),
            client_name: record.client_name.clone(),
        }
    }
}

/// Editable fields of a proposal, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalField {
    OpportunityNumber,
    ClientName,
    GuaranteeType,
    OuvrageDestination,
    WorkType,
    OuvrageCost,
    AddressChantier,
    OuvrageDescription,
    ExistingPresence,
    IsVipClient,
    RcmoDesired,
    TrcRate,
    DoRate,
}

impl ProposalField {
    pub fn all() -> &'static [ProposalField] {
        &[
            Self::OpportunityNumber,
            Self::ClientName,
            Self::GuaranteeType,
            Self::OuvrageDestination,
            Self::WorkType,
            Self::OuvrageCost,
            Self::AddressChantier,
            Self::OuvrageDescription,
            Self::ExistingPresence,
            Self::IsVipClient,
            Self::RcmoDesired,
            Self::TrcRate,
            Self::DoRate,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpportunityNumber => "opportunity_number",
            Self::ClientName => "client_name",
            Self::GuaranteeType => "guarantee_type",
            Self::OuvrageDestination => "ouvrage_destination",
            Self::WorkType => "work_type",
            Self::OuvrageCost => "ouvrage_cost",
            Self::AddressChantier => "address_chantier",
            Self::OuvrageDescription => "ouvrage_description",
            Self::ExistingPresence => "existing_presence",
            Self::IsVipClient => "is_vip_client",
            Self::RcmoDesired => "rcmo_desired",
            Self::TrcRate => "trc_rate",
            Self::DoRate => "do_rate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::all().iter().copied().find(|f| f.as_str() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OpportunityNumber => "N° d'opportunité",
            Self::ClientName => "Nom du client",
            Self::GuaranteeType => "Type de garantie",
            Self::OuvrageDestination => "Destination de l'ouvrage",
            Self::WorkType => "Type de travaux",
            Self::OuvrageCost => "Coût de l'ouvrage",
            Self::AddressChantier => "Adresse du chantier",
            Self::OuvrageDescription => "Description de l'ouvrage",
            Self::ExistingPresence => "Présence d'existants",
            Self::IsVipClient => "Client VIP",
            Self::RcmoDesired => "RCMO souhaitée",
            Self::TrcRate => "Taux TRC",
            Self::DoRate => "Taux DO",
        }
    }

    pub fn help_text(&self) -> &'static str {
        match self {
            Self::OpportunityNumber => "Identifiant unique de l'opportunité commerciale.",
            Self::ClientName => "Raison sociale ou nom du souscripteur.",
            Self::GuaranteeType => "TRC seule, DO seule, ou DUO (DO + TRC).",
            Self::OuvrageDestination => "Obligatoire pour les garanties DO et DUO.",
            Self::WorkType => "Ouvrage neuf, rénovation légère ou rénovation lourde.",
            Self::OuvrageCost => "Coût total de construction en euros HT.",
            Self::AddressChantier => "Adresse postale du chantier.",
            Self::OuvrageDescription => "Nature et description des travaux.",
            Self::ExistingPresence => "Les travaux portent-ils sur des existants ?",
            Self::IsVipClient => "Client bénéficiant de conditions particulières.",
            Self::RcmoDesired => "Responsabilité civile du maître d'ouvrage.",
            Self::TrcRate => "Taux appliqué au coût de l'ouvrage pour la prime TRC.",
            Self::DoRate => "Taux appliqué au coût de l'ouvrage pour la prime DO.",
        }
    }
}

impl fmt::Display for ProposalField {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldParseError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("invalid choice '{value}' for {field}")]
    InvalidChoice { field: ProposalField, value: String },
    #[error("invalid number '{value}' for {field}")]
    InvalidNumber { field: ProposalField, value: String },
    #[error("{field} cannot be negative")]
    Negative { field: ProposalField },
    #[error("'{value}' exceeds the size allowed for {field}")]
    OutOfRange { field: ProposalField, value: String },
    #[error("invalid yes/no value '{value}' for {field}")]
    InvalidFlag { field: ProposalField, value: String },
}

/// A single edit to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    OpportunityNumber(String),
    ClientName(String),
    GuaranteeType(GuaranteeType),
    OuvrageDestination(Option<OuvrageDestination>),
    WorkType(WorkType),
    OuvrageCost(Option<Decimal>),
    AddressChantier(String),
    OuvrageDescription(String),
    ExistingPresence(bool),
    IsVipClient(bool),
    RcmoDesired(bool),
    TrcRate(Option<Decimal>),
    DoRate(Option<Decimal>),
}

impl FieldUpdate {
    pub fn field(&self) -> ProposalField {
        match self {
            Self::OpportunityNumber(_) => ProposalField::OpportunityNumber,
            Self::ClientName(_) => ProposalField::ClientName,
            Self::GuaranteeType(_) => ProposalField::GuaranteeType,
            Self::OuvrageDestination(_) => ProposalField::OuvrageDestination,
            Self::WorkType(_) => ProposalField::WorkType,
            Self::OuvrageCost(_) => ProposalField::OuvrageCost,
            Self::AddressChantier(_) => ProposalField::AddressChantier,
            Self::OuvrageDescription(_) => ProposalField::OuvrageDescription,
            Self::ExistingPresence(_) => ProposalField::ExistingPresence,
            Self::IsVipClient(_) => ProposalField::IsVipClient,
            Self::RcmoDesired(_) => ProposalField::RcmoDesired,
            Self::TrcRate(_) => ProposalField::TrcRate,
            Self::DoRate(_) => ProposalField::DoRate,
        }
    }

    /// Builds an update from raw text input. Numbers are read with
    /// [`wire::parse_decimal_text`]; rates are taken as fractions.
    pub fn parse(
        field: ProposalField,
        raw: &str,
    ) -> Result<Self, FieldParseError> {
        let update = match field {
            ProposalField::OpportunityNumber => Self::OpportunityNumber(raw.to_string()),
            ProposalField::ClientName => Self::ClientName(raw.to_string()),
            ProposalField::AddressChantier => Self::AddressChantier(raw.to_string()),
            ProposalField::OuvrageDescription => Self::OuvrageDescription(raw.to_string()),
            ProposalField::GuaranteeType => Self::GuaranteeType(
                GuaranteeType::parse(raw).ok_or_else(|| invalid_choice(field, raw))?,
            ),
            ProposalField::WorkType => {
                Self::WorkType(WorkType::parse(raw).ok_or_else(|| invalid_choice(field, raw))?)
            }
            ProposalField::OuvrageDestination => {
                if raw.trim().is_empty() {
                    Self::OuvrageDestination(None)
                } else {
                    Self::OuvrageDestination(Some(
                        OuvrageDestination::parse(raw).ok_or_else(|| invalid_choice(field, raw))?,
                    ))
                }
            }
            ProposalField::OuvrageCost => Self::OuvrageCost(parse_amount(field, raw)?),
            ProposalField::TrcRate => Self::TrcRate(parse_amount(field, raw)?),
            ProposalField::DoRate => Self::DoRate(parse_amount(field, raw)?),
            ProposalField::ExistingPresence => Self::ExistingPresence(parse_flag(field, raw)?),
            ProposalField::IsVipClient => Self::IsVipClient(parse_flag(field, raw)?),
            ProposalField::RcmoDesired => Self::RcmoDesired(parse_flag(field, raw)?),
        };
        Ok(update)
    }

    /// Like [`FieldUpdate::parse`] with the field given by its wire name.
    pub fn parse_named(
        name: &str,
        raw: &str,
    ) -> Result<Self, FieldParseError> {
        let field =
            ProposalField::parse(name).ok_or_else(|| FieldParseError::UnknownField(name.to_string()))?;
        Self::parse(field, raw)
    }
}

fn invalid_choice(
    field: ProposalField,
    raw: &str,
) -> FieldParseError {
    FieldParseError::InvalidChoice {
        field,
        value: raw.trim().to_string(),
    }
}

fn parse_amount(
    field: ProposalField,
    raw: &str,
) -> Result<Option<Decimal>, FieldParseError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value = wire::parse_decimal_text(raw).ok_or_else(|| FieldParseError::InvalidNumber {
        field,
        value: raw.trim().to_string(),
    })?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FieldParseError::Negative { field });
    }
    let limit = match field {
        ProposalField::OuvrageCost => wire::DecimalLimit::COST,
        _ => wire::DecimalLimit::RATE,
    };
    if !limit.admits(value) {
        return Err(FieldParseError::OutOfRange {
            field,
            value: raw.trim().to_string(),
        });
    }
    Ok(Some(value))
}

fn parse_flag(
    field: ProposalField,
    raw: &str,
) -> Result<bool, FieldParseError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "oui" | "yes" | "1" => Ok(true),
        "false" | "non" | "no" | "0" | "" => Ok(false),
        _ => Err(FieldParseError::InvalidFlag {
            field,
            value: raw.trim().to_string(),
        }),
    }
}
