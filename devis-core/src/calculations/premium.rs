//! Premium ("prime seule") calculations.
//!
//! Two rules live here:
//!
//! | Rule | Used by | Rounding |
//! |------|---------|----------|
//! | [`PremiumCalculator`] | the editor, recomputed on every change | none |
//! | [`StoredPremiums`] | the store, when a proposal is saved | cents, half-up |
//!
//! Rates are fractions of the construction cost: `0.0125` is 1.25 %.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use devis_core::GuaranteeType;
//! use devis_core::calculations::{PremiumCalculator, PremiumInput};
//!
//! let input = PremiumInput {
//!     ouvrage_cost: Some(dec!(200000)),
//!     trc_rate: Some(dec!(0.01)),
//!     do_rate: Some(dec!(0.02)),
//!     guarantee_type: GuaranteeType::Duo,
//! };
//!
//! let premiums = PremiumCalculator::calculate(&input);
//!
//! assert_eq!(premiums.prime_seule_trc, dec!(2000));
//! assert_eq!(premiums.prime_seule_do, dec!(4000));
//! assert_eq!(premiums.prime_seule_duo, dec!(6000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{or_zero, round_half_up};
use crate::models::{GuaranteeType, ProposalPayload, wire};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Converts a percentage typed by an operator (`1.25`) into a rate (`0.0125`).
pub fn percent_to_fraction(percent: Decimal) -> Decimal {
    percent / HUNDRED
}

/// Converts a rate (`0.0125`) into a percentage for display (`1.25`).
pub fn fraction_to_percent(fraction: Decimal) -> Decimal {
    fraction * HUNDRED
}

/// Inputs of the premium calculation. Absent values count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumInput {
    pub ouvrage_cost: Option<Decimal>,
    pub trc_rate: Option<Decimal>,
    pub do_rate: Option<Decimal>,
    pub guarantee_type: GuaranteeType,
}

impl PremiumInput {
    /// Builds an input from raw text fields; anything non-numeric is absent.
    pub fn from_text(
        ouvrage_cost: &str,
        trc_rate: &str,
        do_rate: &str,
        guarantee_type: GuaranteeType,
    ) -> Self {
        Self {
            ouvrage_cost: wire::parse_decimal_text(ouvrage_cost),
            trc_rate: wire::parse_decimal_text(trc_rate),
            do_rate: wire::parse_decimal_text(do_rate),
            guarantee_type,
        }
    }
}

/// Premiums derived from an input. Never persisted by the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedPremiums {
    pub prime_seule_trc: Decimal,
    pub prime_seule_do: Decimal,
    /// Always `prime_seule_trc + prime_seule_do`.
    pub prime_seule_duo: Decimal,
}

pub struct PremiumCalculator;

impl PremiumCalculator {
    /// Computes the premiums shown while editing.
    ///
    /// The rate the guarantee does not cover is zeroed before multiplying:
    /// DO ignores the TRC rate, TRC ignores the DO rate, DUO uses both.
    pub fn calculate(input: &PremiumInput) -> CalculatedPremiums {
        let cost = or_zero(input.ouvrage_cost);
        let trc_rate = if input.guarantee_type.covers_trc() {
            or_zero(input.trc_rate)
        } else {
            Decimal::ZERO
        };
        let do_rate = if input.guarantee_type.covers_do() {
            or_zero(input.do_rate)
        } else {
            Decimal::ZERO
        };

        let premiums = trc_rate.checked_mul(cost).zip(do_rate.checked_mul(cost));
        let Some((prime_seule_trc, prime_seule_do, prime_seule_duo)) =
            premiums.and_then(|(trc, do_)| Some((trc, do_, trc.checked_add(do_)?)))
        else {
            tracing::warn!(cost = %cost, "premium calculation overflowed; showing zero");
            return CalculatedPremiums::default();
        };

        CalculatedPremiums {
            prime_seule_trc,
            prime_seule_do,
            prime_seule_duo,
        }
    }
}

/// Premiums the store records on save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPremiums {
    pub prime_seule_tarif_trc: Option<Decimal>,
    pub prime_seule_tarif_do: Option<Decimal>,
    pub prime_seule_tarif_duo: Option<Decimal>,
}

impl StoredPremiums {
    /// Applies the persistence rule:
    ///
    /// - DO: no TRC premium, DUO premium equals the DO premium.
    /// - TRC: no DO premium, DUO premium equals the TRC premium.
    /// - DUO: each premium exists only when its rate is given; the DUO
    ///   premium is their sum, zero when neither rate is given.
    ///
    /// Amounts too large for a decimal are recorded as zero.
    pub fn from_payload(payload: &ProposalPayload) -> Self {
        let cost = payload.ouvrage_cost;
        let premium = |rate: Option<Decimal>| {
            or_zero(rate).checked_mul(cost).map(round_half_up).unwrap_or_else(|| {
                tracing::warn!(cost = %cost, "stored premium overflowed; recording zero");
                Decimal::ZERO
            })
        };
        let trc = premium(payload.trc_rate);
        let do_ = premium(payload.do_rate);

        match payload.guarantee_type {
            GuaranteeType::Do => Self {
                prime_seule_tarif_trc: None,
                prime_seule_tarif_do: Some(do_),
                prime_seule_tarif_duo: Some(do_),
            },
            GuaranteeType::Trc => Self {
                prime_seule_tarif_trc: Some(trc),
                prime_seule_tarif_do: None,
                prime_seule_tarif_duo: Some(trc),
            },
            GuaranteeType::Duo => {
                let trc = payload.trc_rate.map(|_| trc);
                let do_ = payload.do_rate.map(|_| do_);
                Self {
                    prime_seule_tarif_trc: trc,
                    prime_seule_tarif_do: do_,
                    prime_seule_tarif_duo: Some(
                        or_zero(trc).checked_add(or_zero(do_)).unwrap_or(Decimal::ZERO),
                    ),
                }
            }
        }
    }
}
