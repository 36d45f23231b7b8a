//! REST backend for the proposal API and the national address database.

mod document;
mod factory;
mod geocoder;
mod repository;
mod response;

pub use document::filename_from_content_disposition;
pub use factory::HttpStoreFactory;
pub use geocoder::{AdresseGeocoder, DEFAULT_GEOCODER_URL};
pub use repository::HttpProposalStore;
