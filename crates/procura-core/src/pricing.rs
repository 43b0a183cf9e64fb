//! # Line-Item Pricing
//!
//! Recalculates the monetary fields of a GRN or PO line from its inputs.
//!
//! ## Calculation Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every arrow is one rounded step (2 dp, half away from zero)            │
//! │                                                                         │
//! │  unit price × quantity ──► subtotal                                     │
//! │                               │                                         │
//! │        discount rate % ──────►├──► discount amount                      │
//! │   (or discount override) ────►│    (rate back-computed from override)   │
//! │                               ▼                                         │
//! │                        net before tax = subtotal − discount             │
//! │                               │                                         │
//! │             tax rate % ──────►├──► tax amount                           │
//! │        (or tax override) ────►│      inclusive: nbt × r / (100 + r)     │
//! │                               │      exclusive: nbt × r / 100           │
//! │                               ▼                                         │
//! │        inclusive: net = nbt − tax,  total = nbt                         │
//! │        exclusive: net = nbt,        total = nbt + tax                   │
//! │                               │                                         │
//! │                               └──► × exchange rate ──► base amounts     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding after each step (rather than once at the end) is what the
//! receiving forms display, so totals reconcile line by line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{round2, Money};
use crate::types::{first_text, TaxMode};

// =============================================================================
// Inputs
// =============================================================================

/// A discount or tax given either as a percentage or as a manual amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Adjustment {
    /// Percentage of the base amount (10 = 10%).
    Rate {
        #[ts(type = "string")]
        percent: Decimal,
    },
    /// Amount typed in by the user; the percentage is derived from it.
    Override { amount: Money },
}

impl Adjustment {
    pub fn rate(percent: Decimal) -> Self {
        Adjustment::Rate { percent }
    }

    pub fn override_amount(amount: Money) -> Self {
        Adjustment::Override { amount }
    }

    #[inline]
    pub fn is_override(&self) -> bool {
        matches!(self, Adjustment::Override { .. })
    }
}

impl Default for Adjustment {
    fn default() -> Self {
        Adjustment::Rate {
            percent: Decimal::ZERO,
        }
    }
}

/// Pricing inputs of a line. Quantity is supplied separately because GRN
/// lines price the received quantity and PO lines the ordered one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", from = "RawPricingInput")]
pub struct PricingInput {
    pub unit_price: Money,

    pub discount: Adjustment,

    pub tax: Adjustment,

    pub tax_mode: TaxMode,

    /// Transaction currency (ISO 4217).
    pub currency_code: Option<String>,

    /// Multiplier from transaction currency to base currency.
    #[ts(type = "string")]
    pub exchange_rate: Decimal,
}

fn default_exchange_rate() -> Decimal {
    Decimal::ONE
}

/// Pricing as sent by the forms; `unitPrice` is also spelled `price`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPricingInput {
    unit_price: Option<Money>,
    price: Option<Money>,
    #[serde(default)]
    discount: Adjustment,
    #[serde(default)]
    tax: Adjustment,
    #[serde(default)]
    tax_mode: TaxMode,
    currency_code: Option<String>,
    exchange_rate: Option<Decimal>,
}

impl From<RawPricingInput> for PricingInput {
    fn from(raw: RawPricingInput) -> Self {
        PricingInput {
            unit_price: [raw.unit_price, raw.price]
                .into_iter()
                .flatten()
                .find(|price| !price.is_zero())
                .unwrap_or_default(),
            discount: raw.discount,
            tax: raw.tax,
            tax_mode: raw.tax_mode,
            currency_code: first_text([raw.currency_code]),
            exchange_rate: raw.exchange_rate.unwrap_or_else(default_exchange_rate),
        }
    }
}

impl Default for PricingInput {
    fn default() -> Self {
        PricingInput {
            unit_price: Money::zero(),
            discount: Adjustment::default(),
            tax: Adjustment::default(),
            tax_mode: TaxMode::default(),
            currency_code: None,
            exchange_rate: default_exchange_rate(),
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// The six currency amounts of a line, in one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AmountSet {
    pub subtotal: Money,
    pub discount: Money,
    pub net_before_tax: Money,
    pub tax: Money,
    pub net: Money,
    pub total: Money,
}

impl AmountSet {
    /// Mirrors every amount into another currency, rounding each one.
    pub fn convert(&self, exchange_rate: Decimal) -> AmountSet {
        AmountSet {
            subtotal: self.subtotal.convert(exchange_rate),
            discount: self.discount.convert(exchange_rate),
            net_before_tax: self.net_before_tax.convert(exchange_rate),
            tax: self.tax.convert(exchange_rate),
            net: self.net.convert(exchange_rate),
            total: self.total.convert(exchange_rate),
        }
    }

    fn accumulate(&mut self, other: &AmountSet) {
        self.subtotal += other.subtotal;
        self.discount += other.discount;
        self.net_before_tax += other.net_before_tax;
        self.tax += other.tax;
        self.net += other.net;
        self.total += other.total;
    }
}

/// Derived monetary fields of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineAmounts {
    /// Effective discount percentage (given, or back-computed from an override).
    #[ts(type = "string")]
    pub discount_rate: Decimal,
    /// Effective tax percentage (given, or back-computed from an override).
    #[ts(type = "string")]
    pub tax_rate: Decimal,
    /// Amounts in the transaction currency.
    pub amounts: AmountSet,
    /// Same amounts in the base currency.
    pub base: AmountSet,
}

// =============================================================================
// Calculation
// =============================================================================

/// Computes every derived monetary field of a line.
///
/// ## Example
/// ```rust
/// use procura_core::money::Money;
/// use procura_core::pricing::{calculate_line_amounts, Adjustment, PricingInput};
/// use procura_core::types::TaxMode;
/// use rust_decimal::Decimal;
///
/// let input = PricingInput {
///     unit_price: Money::from_cents(1000),
///     discount: Adjustment::rate(Decimal::from(10)),
///     tax: Adjustment::rate(Decimal::from(10)),
///     tax_mode: TaxMode::Inclusive,
///     ..PricingInput::default()
/// };
/// let line = calculate_line_amounts(Decimal::from(10), &input);
///
/// assert_eq!(line.amounts.tax, Money::from_cents(818));
/// assert_eq!(line.amounts.net, Money::from_cents(8182));
/// assert_eq!(line.amounts.total, Money::from_cents(9000));
/// ```
pub fn calculate_line_amounts(quantity: Decimal, input: &PricingInput) -> LineAmounts {
    let subtotal = input.unit_price.mul_quantity(quantity);

    let (discount, discount_rate) = match input.discount {
        Adjustment::Override { amount } => (amount, amount.rate_of(subtotal)),
        Adjustment::Rate { percent } => (subtotal.percent(percent), percent),
    };

    let net_before_tax = subtotal - discount;

    let (tax, tax_rate) = match input.tax {
        Adjustment::Override { amount } => (amount, amount.rate_of(net_before_tax)),
        Adjustment::Rate { percent } => (
            tax_for_rate(net_before_tax, percent, input.tax_mode),
            percent,
        ),
    };

    let (net, total) = match input.tax_mode {
        TaxMode::Inclusive => (net_before_tax - tax, net_before_tax),
        TaxMode::Exclusive => (net_before_tax, net_before_tax + tax),
    };

    let amounts = AmountSet {
        subtotal,
        discount,
        net_before_tax,
        tax,
        net,
        total,
    };

    LineAmounts {
        discount_rate,
        tax_rate,
        base: amounts.convert(input.exchange_rate),
        amounts,
    }
}

fn tax_for_rate(net_before_tax: Money, percent: Decimal, mode: TaxMode) -> Money {
    match mode {
        TaxMode::Exclusive => net_before_tax.percent(percent),
        TaxMode::Inclusive => {
            let divisor = Decimal::ONE_HUNDRED + percent;
            (net_before_tax.amount().saturating_mul(percent))
                .checked_div(divisor)
                .map(Money::new)
                .unwrap_or_default()
        }
    }
}

// =============================================================================
// Priced Line
// =============================================================================

/// Inputs together with the amounts last computed from them.
///
/// Mirrors an item-detail form: the user edits inputs, the form calls
/// [`PricedLine::recalculate`], and the derived fields refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    #[ts(type = "string")]
    pub quantity: Decimal,
    pub input: PricingInput,
    pub computed: LineAmounts,
}

impl PricedLine {
    pub fn new(quantity: Decimal, input: PricingInput) -> Self {
        let computed = calculate_line_amounts(quantity, &input);
        PricedLine {
            quantity,
            input,
            computed,
        }
    }

    /// Recomputes the derived fields. Applying it twice changes nothing.
    pub fn recalculate(&self) -> PricedLine {
        PricedLine::new(self.quantity, self.input.clone())
    }
}

// =============================================================================
// Document Totals
// =============================================================================

/// Roll-up of several lines, as shown in a GRN or PO footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub line_count: u32,
    pub amounts: AmountSet,
    pub base: AmountSet,
}

impl DocumentTotals {
    /// Adds one line.
    pub fn add(&mut self, line: &LineAmounts) {
        self.line_count += 1;
        self.amounts.accumulate(&line.amounts);
        self.base.accumulate(&line.base);
    }

    /// Sums the already-rounded line amounts; no re-rounding at this level.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a LineAmounts>,
    {
        let mut totals = DocumentTotals::default();
        for line in lines {
            totals.add(line);
        }
        totals
    }
}

/// Percentage of `part` in `whole`, rounded to two places; zero when
/// `whole` is zero.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .map(|ratio| round2(ratio.saturating_mul(Decimal::ONE_HUNDRED)))
        .unwrap_or(Decimal::ZERO)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(mode: TaxMode) -> PricingInput {
        PricingInput {
            unit_price: Money::new(dec!(10)),
            discount: Adjustment::rate(dec!(10)),
            tax: Adjustment::rate(dec!(10)),
            tax_mode: mode,
            ..PricingInput::default()
        }
    }

    #[test]
    fn test_tax_inclusive_example() {
        let line = calculate_line_amounts(dec!(10), &input(TaxMode::Inclusive));

        assert_eq!(line.amounts.subtotal, Money::new(dec!(100)));
        assert_eq!(line.amounts.discount, Money::new(dec!(10)));
        assert_eq!(line.amounts.net_before_tax, Money::new(dec!(90)));
        assert_eq!(line.amounts.tax, Money::new(dec!(8.18)));
        assert_eq!(line.amounts.net, Money::new(dec!(81.82)));
        assert_eq!(line.amounts.total, Money::new(dec!(90.00)));
    }

    #[test]
    fn test_tax_exclusive_example() {
        let line = calculate_line_amounts(dec!(10), &input(TaxMode::Exclusive));

        assert_eq!(line.amounts.net_before_tax, Money::new(dec!(90)));
        assert_eq!(line.amounts.tax, Money::new(dec!(9.00)));
        assert_eq!(line.amounts.net, Money::new(dec!(90.00)));
        assert_eq!(line.amounts.total, Money::new(dec!(99.00)));
    }

    #[test]
    fn test_discount_override_back_computes_rate() {
        let input = PricingInput {
            unit_price: Money::new(dec!(20)),
            discount: Adjustment::override_amount(Money::new(dec!(15))),
            ..PricingInput::default()
        };
        let line = calculate_line_amounts(dec!(10), &input);

        assert_eq!(line.amounts.subtotal, Money::new(dec!(200)));
        assert_eq!(line.amounts.discount, Money::new(dec!(15)));
        assert_eq!(line.discount_rate, dec!(7.5));
        assert_eq!(line.amounts.net_before_tax, Money::new(dec!(185)));
    }

    #[test]
    fn test_tax_override_back_computes_rate() {
        let input = PricingInput {
            unit_price: Money::new(dec!(50)),
            tax: Adjustment::override_amount(Money::new(dec!(7))),
            ..PricingInput::default()
        };
        let line = calculate_line_amounts(dec!(2), &input);

        assert_eq!(line.tax_rate, dec!(7));
        assert_eq!(line.amounts.total, Money::new(dec!(107)));
    }

    #[test]
    fn test_inclusive_tax_override_back_computes_rate() {
        let input = PricingInput {
            unit_price: Money::new(dec!(25)),
            discount: Adjustment::rate(dec!(10)),
            tax: Adjustment::override_amount(Money::new(dec!(9))),
            tax_mode: TaxMode::Inclusive,
            ..PricingInput::default()
        };
        let line = calculate_line_amounts(dec!(4), &input);

        assert_eq!(line.amounts.net_before_tax, Money::new(dec!(90)));
        assert_eq!(line.amounts.tax, Money::new(dec!(9)));
        // 9 / 90 × 100
        assert_eq!(line.tax_rate, dec!(10));
        assert_eq!(line.amounts.net, Money::new(dec!(81)));
        assert_eq!(line.amounts.total, Money::new(dec!(90)));
    }

    #[test]
    fn test_huge_values_saturate() {
        let input = PricingInput {
            unit_price: Money::new(Decimal::from(1_000_000_000_000_000u64)),
            tax: Adjustment::rate(dec!(10)),
            ..PricingInput::default()
        };
        let line = calculate_line_amounts(Decimal::from(1_000_000_000_000_000u64), &input);

        assert_eq!(line.amounts.subtotal.amount(), Decimal::MAX);
        assert_eq!(line.amounts.total.amount(), Decimal::MAX);
        assert_eq!(line.base.total.amount(), Decimal::MAX);

        let totals = DocumentTotals::from_lines([&line, &line]);
        assert_eq!(totals.amounts.total.amount(), Decimal::MAX);
    }

    #[test]
    fn test_overrides_on_zero_subtotal_give_zero_rates() {
        let input = PricingInput {
            unit_price: Money::zero(),
            discount: Adjustment::override_amount(Money::new(dec!(5))),
            tax: Adjustment::override_amount(Money::new(dec!(1))),
            ..PricingInput::default()
        };
        let line = calculate_line_amounts(dec!(3), &input);

        assert_eq!(line.discount_rate, Decimal::ZERO);
        // net before tax is -5 here, so the tax rate is defined
        assert_eq!(line.tax_rate, dec!(-20));

        let input = PricingInput {
            tax: Adjustment::override_amount(Money::new(dec!(1))),
            ..PricingInput::default()
        };
        assert_eq!(calculate_line_amounts(dec!(3), &input).tax_rate, Decimal::ZERO);
    }

    #[test]
    fn test_base_currency_mirrors_every_amount() {
        let mut input = input(TaxMode::Exclusive);
        input.exchange_rate = dec!(35.5);
        let line = calculate_line_amounts(dec!(10), &input);

        assert_eq!(line.base.subtotal, Money::new(dec!(3550)));
        assert_eq!(line.base.discount, Money::new(dec!(355)));
        assert_eq!(line.base.net_before_tax, Money::new(dec!(3195)));
        assert_eq!(line.base.tax, Money::new(dec!(319.5)));
        assert_eq!(line.base.net, Money::new(dec!(3195)));
        assert_eq!(line.base.total, Money::new(dec!(3514.5)));
    }

    #[test]
    fn test_rounding_happens_per_step() {
        // 3.335 → 3.34; 3 × 3.34 = 10.02; 10.02 × 15% = 1.503 → 1.50
        let input = PricingInput {
            unit_price: Money::new(dec!(3.335)),
            discount: Adjustment::rate(dec!(15)),
            ..PricingInput::default()
        };
        assert_eq!(input.unit_price, Money::new(dec!(3.34)));

        let line = calculate_line_amounts(dec!(3), &input);
        assert_eq!(line.amounts.subtotal, Money::new(dec!(10.02)));
        assert_eq!(line.amounts.discount, Money::new(dec!(1.50)));
        assert_eq!(line.amounts.net_before_tax, Money::new(dec!(8.52)));
    }

    #[test]
    fn test_recalculate_is_a_fixed_point() {
        let cases = [
            PricedLine::new(dec!(10), input(TaxMode::Inclusive)),
            PricedLine::new(dec!(7.25), input(TaxMode::Exclusive)),
            PricedLine::new(
                dec!(3),
                PricingInput {
                    unit_price: Money::new(dec!(19.99)),
                    discount: Adjustment::override_amount(Money::new(dec!(4.5))),
                    tax: Adjustment::override_amount(Money::new(dec!(3.3))),
                    tax_mode: TaxMode::Inclusive,
                    exchange_rate: dec!(0.0281),
                    ..PricingInput::default()
                },
            ),
        ];

        for line in cases {
            let once = line.recalculate();
            assert_eq!(once.recalculate(), once);
            assert_eq!(once, line);
        }
    }

    #[test]
    fn test_document_totals() {
        let a = calculate_line_amounts(dec!(10), &input(TaxMode::Exclusive));
        let b = calculate_line_amounts(dec!(10), &input(TaxMode::Inclusive));
        let totals = DocumentTotals::from_lines([&a, &b]);

        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.amounts.subtotal, Money::new(dec!(200)));
        assert_eq!(totals.amounts.tax, Money::new(dec!(17.18)));
        assert_eq!(totals.amounts.total, Money::new(dec!(189)));
        assert_eq!(totals.base, totals.amounts);
    }

    #[test]
    fn test_adjustment_serde_shape() {
        let json = serde_json::to_value(Adjustment::rate(dec!(10))).unwrap();
        assert_eq!(json["kind"], "rate");

        let parsed: Adjustment =
            serde_json::from_str(r#"{"kind":"override","amount":15}"#).unwrap();
        assert_eq!(parsed, Adjustment::override_amount(Money::new(dec!(15))));
    }

    #[test]
    fn test_pricing_accepts_both_price_spellings() {
        let input: PricingInput =
            serde_json::from_str(r#"{"unitPrice":"0","price":"12.5","taxMode":"inclusive"}"#)
                .unwrap();
        assert_eq!(input.unit_price, Money::new(dec!(12.5)));
        assert_eq!(input.tax_mode, TaxMode::Inclusive);
        assert_eq!(input.exchange_rate, Decimal::ONE);

        let input: PricingInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input, PricingInput::default());
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(percentage_of(dec!(1), Decimal::ZERO), Decimal::ZERO);
    }
}
