use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{GuaranteeType, ProposalDraft, ProposalField};

pub const MSG_OPPORTUNITY_AND_CLIENT: &str =
    "Veuillez remplir le numéro d'opportunité et le nom du client.";
pub const MSG_OPPORTUNITY: &str = "Veuillez remplir le numéro d'opportunité.";
pub const MSG_CLIENT: &str = "Veuillez remplir le nom du client.";
pub const MSG_DESTINATION_DO: &str =
    "Pour la garantie 'DO Seule', veuillez sélectionner une destination d'ouvrage.";
pub const MSG_DESTINATION_DUO: &str =
    "Pour la garantie 'DUO', veuillez sélectionner une destination d'ouvrage.";
pub const MSG_COST: &str = "Veuillez saisir le coût de l'ouvrage.";
pub const MSG_DO_RATE: &str = "Veuillez saisir le taux DO.";
pub const MSG_TRC_RATE: &str = "Veuillez saisir le taux TRC.";

/// The three steps of the proposal wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum FormStage {
    /// Opportunity, client, guarantee and destination.
    #[default]
    General,
    /// Works, cost and rates.
    Project,
    /// Read-only recap before submission.
    Recap,
}

impl FormStage {
    pub fn number(&self) -> u8 {
        match self {
            Self::General => 1,
            Self::Project => 2,
            Self::Recap => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::General),
            2 => Some(Self::Project),
            3 => Some(Self::Recap),
            _ => None,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::General => Self::Project,
            Self::Project | Self::Recap => Self::Recap,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Self::General | Self::Project => Self::General,
            Self::Recap => Self::Project,
        }
    }

    pub fn is_final(&self) -> bool {
        *self == Self::Recap
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::General => "Informations générales",
            Self::Project => "Détails du projet",
            Self::Recap => "Récapitulatif",
        }
    }
}

impl fmt::Display for FormStage {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/3 {}", self.number(), self.title())
    }
}

/// Outcome of validating a draft for leaving a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageValidation {
    pub stage: FormStage,
    /// Marker per offending field.
    pub field_errors: BTreeMap<ProposalField, String>,
    /// One message per violated rule, in rule order.
    pub messages: Vec<String>,
}

impl StageValidation {
    fn new(stage: FormStage) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    pub fn stage_ok(&self) -> bool {
        self.messages.is_empty()
    }

    fn reject(
        &mut self,
        fields: &[(ProposalField, &str)],
        message: &str,
    ) {
        for (field, marker) in fields {
            self.field_errors.insert(*field, marker.to_string());
        }
        self.messages.push(message.to_string());
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub struct FormStageValidator;

impl FormStageValidator {
    /// Checks whether `draft` may leave `stage`. Never mutates anything.
    pub fn validate(
        stage: FormStage,
        draft: &ProposalDraft,
    ) -> StageValidation {
        let mut result = StageValidation::new(stage);
        match stage {
            FormStage::General => Self::validate_general(draft, &mut result),
            FormStage::Project => Self::validate_project(draft, &mut result),
            FormStage::Recap => {}
        }
        result
    }

    fn validate_general(
        draft: &ProposalDraft,
        result: &mut StageValidation,
    ) {
        let missing_opportunity = is_blank(&draft.opportunity_number);
        let missing_client = is_blank(&draft.client_name);

        match (missing_opportunity, missing_client) {
            (true, true) => result.reject(
                &[
                    (ProposalField::OpportunityNumber, MSG_OPPORTUNITY),
                    (ProposalField::ClientName, MSG_CLIENT),
                ],
                MSG_OPPORTUNITY_AND_CLIENT,
            ),
            (true, false) => result.reject(
                &[(ProposalField::OpportunityNumber, MSG_OPPORTUNITY)],
                MSG_OPPORTUNITY,
            ),
            (false, true) => {
                result.reject(&[(ProposalField::ClientName, MSG_CLIENT)], MSG_CLIENT)
            }
            (false, false) => {}
        }

        if draft.ouvrage_destination.is_none() {
            let message = match draft.guarantee_type {
                GuaranteeType::Do => Some(MSG_DESTINATION_DO),
                GuaranteeType::Duo => Some(MSG_DESTINATION_DUO),
                GuaranteeType::Trc => None,
            };
            if let Some(message) = message {
                result.reject(&[(ProposalField::OuvrageDestination, message)], message);
            }
        }
    }

    fn validate_project(
        draft: &ProposalDraft,
        result: &mut StageValidation,
    ) {
        if draft.ouvrage_cost.is_none() {
            result.reject(&[(ProposalField::OuvrageCost, MSG_COST)], MSG_COST);
        }
        if draft.guarantee_type.covers_do() && draft.do_rate.is_none() {
            result.reject(&[(ProposalField::DoRate, MSG_DO_RATE)], MSG_DO_RATE);
        }
        if draft.guarantee_type.covers_trc() && draft.trc_rate.is_none() {
            result.reject(&[(ProposalField::TrcRate, MSG_TRC_RATE)], MSG_TRC_RATE);
        }
    }
}

/// Position in the wizard. Advancing is gated by [`FormStageValidator`];
/// going back is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageMachine {
    stage: FormStage,
}

impl StageMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> FormStage {
        self.stage
    }

    /// Validates the current stage and moves forward when it passes.
    /// The last stage is terminal: it validates clean and stays put.
    pub fn advance(
        &mut self,
        draft: &ProposalDraft,
    ) -> StageValidation {
        let result = FormStageValidator::validate(self.stage, draft);
        if result.stage_ok() {
            self.stage = self.stage.next();
        }
        result
    }

    pub fn retreat(&mut self) -> FormStage {
        self.stage = self.stage.previous();
        self.stage
    }

    pub fn reset(&mut self) {
        self.stage = FormStage::General;
    }
}
