//! Quote construction.
//!
//! A quote fixes what the provider is paid (base) and what the platform
//! keeps (markup) before any money moves. Percentage markup always rounds
//! up to the next whole naira so fractional-kobo margins never occur.

use crate::wallet::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// Amount forwarded to the provider.
    pub base: Amount,
    /// Platform margin charged on top.
    pub markup: Amount,
}

impl Quote {
    /// Markup as a whole-naira ceiling of `percent` of the base.
    pub fn percentage(base: Amount, percent: u32) -> Self {
        Self {
            base,
            markup: base.percent_ceil(percent),
        }
    }

    /// Fixed markup, used for flat-fee services.
    pub fn flat(base: Amount, markup: Amount) -> Self {
        Self { base, markup }
    }

    /// What the wallet is debited.
    pub fn total(&self) -> Amount {
        self.base + self.markup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_markup_rounds_up_to_whole_naira() {
        let quote = Quote::percentage(Amount::from_naira(549), 2);
        assert_eq!(quote.markup, Amount::from_naira(11));
        assert_eq!(quote.total(), Amount::from_naira(560));
    }

    #[test]
    fn exact_percentage_does_not_round() {
        let quote = Quote::percentage(Amount::from_naira(500), 2);
        assert_eq!(quote.markup, Amount::from_naira(10));
        assert_eq!(quote.total(), Amount::from_naira(510));
    }

    #[test]
    fn zero_percent_means_cost_price() {
        let quote = Quote::percentage(Amount::from_naira(3000), 0);
        assert_eq!(quote.markup, Amount::ZERO);
        assert_eq!(quote.total(), quote.base);
    }

    #[test]
    fn flat_markup_is_added_verbatim() {
        let quote = Quote::flat(Amount::from_naira(150), Amount::from_naira(50));
        assert_eq!(quote.total(), Amount::from_naira(200));
    }
}
