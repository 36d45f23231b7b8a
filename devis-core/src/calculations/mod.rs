//! Premium calculation modules.
//!
//! [`premium`] holds the editor-side calculation and the rule the store
//! applies when a proposal is saved; [`common`] has the rounding helpers they
//! share.

pub mod common;
pub mod premium;

pub use premium::{CalculatedPremiums, PremiumCalculator, PremiumInput, StoredPremiums};
