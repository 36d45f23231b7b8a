pub mod factory;
pub mod memory;
pub mod repository;

pub use factory::{Backend, StoreConfig, StoreFactory, StoreRegistry};
pub use memory::{MemoryProposalStore, MemoryStoreFactory};
pub use repository::{
    AddressGeocoder, DocumentGenerator, ProposalStore, StoreError, ValidationErrors,
};
