use devis_core::calculations::common::round_half_up;
use rust_decimal::Decimal;

/// Formats an amount in euros, to the cent: `1 234,50 €`.
pub fn format_euros(amount: Decimal) -> String {
    let rounded = round_half_up(amount);
    let text = format!("{:.2}", rounded.abs());
    let (units, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped},{cents} €")
}

/// Formats an optional amount, using "—" when `None`.
pub fn opt_euros_display(d: &Option<Decimal>) -> String {
    d.map(format_euros).unwrap_or_else(|| "—".to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn format_euros_groups_thousands() {
        assert_eq!(format_euros(dec!(1234567.891)), "1 234 567,89 €");
        assert_eq!(format_euros(dec!(950)), "950,00 €");
        assert_eq!(format_euros(dec!(0)), "0,00 €");
    }

    #[test]
    fn opt_displays_use_dash_for_none() {
        assert_eq!(opt_euros_display(&None), "—");
        assert_eq!(opt_euros_display(&Some(dec!(12.5))), "12,50 €");
    }
}
