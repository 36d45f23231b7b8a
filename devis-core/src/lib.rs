pub mod calculations;
pub mod listing;
pub mod models;
pub mod store;
pub mod validation;

pub use models::*;
pub use store::repository::{
    AddressGeocoder, DocumentGenerator, ProposalStore, StoreError, ValidationErrors,
};
