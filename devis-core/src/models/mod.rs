mod address;
mod choices;
mod document;
mod history;
mod persisted;
mod proposal;
pub mod wire;

pub use address::{AddressQuery, AddressSuggestion, GeoPoint};
pub use choices::{GuaranteeType, OuvrageDestination, WorkType};
pub use document::{DocumentType, GeneratedDocument, fallback_filename};
pub use history::{CREATED_STATUS, FieldChange, HistoryEntry};
pub use persisted::{FieldValue, PersistedProposal};
pub use proposal::{
    FieldParseError, FieldUpdate, ProposalDraft, ProposalField, ProposalId, ProposalPayload,
    SubmittedProposal,
};
