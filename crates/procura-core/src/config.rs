//! # Core Configuration
//!
//! Organisation-level settings the calculations depend on.
//!
//! ## Configuration Sources
//! The host application owns loading; this crate only defines the shape
//! and its defaults:
//! 1. JSON document handed over by the host ([`CoreConfig::from_json_str`])
//! 2. Defaults (this file) for every missing key
//!
//! ## Example
//! ```json
//! {
//!   "baseCurrencyCode": "THB",
//!   "baseCurrencySymbol": "฿",
//!   "defaultTaxRate": "7",
//!   "aging": { "freshMaxDays": 30, "agingMaxDays": 60, "staleMaxDays": 90 },
//!   "expiringSoonDays": 14
//! }
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{Adjustment, PricingInput};
use crate::types::{TaxMode, UserRole};

/// Day boundaries of the inventory-aging buckets (inclusive upper bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingThresholds {
    pub fresh_max_days: i64,
    pub aging_max_days: i64,
    pub stale_max_days: i64,
}

impl Default for AgingThresholds {
    /// 0–30, 31–60, 61–90, 90+ days.
    fn default() -> Self {
        AgingThresholds {
            fresh_max_days: 30,
            aging_max_days: 60,
            stale_max_days: 90,
        }
    }
}

/// Settings shared by pricing, receiving and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Reporting currency (ISO 4217).
    pub base_currency_code: String,

    /// Symbol used when formatting base-currency amounts.
    pub base_currency_symbol: String,

    /// Decimal places shown for amounts.
    pub currency_decimals: u8,

    /// Tax mode for new lines.
    pub default_tax_mode: TaxMode,

    /// Tax percentage for new lines.
    pub default_tax_rate: Decimal,

    pub aging: AgingThresholds,

    /// Lots expiring within this many days count as "expiring soon".
    pub expiring_soon_days: i64,

    /// Roles that see every location regardless of their assignment.
    pub global_access_roles: Vec<UserRole>,

    /// Whether a receipt may exceed the quantity still open on the PO line.
    pub allow_over_receipt: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            base_currency_code: "USD".to_string(),
            base_currency_symbol: "$".to_string(),
            currency_decimals: 2,
            default_tax_mode: TaxMode::Exclusive,
            default_tax_rate: Decimal::ZERO,
            aging: AgingThresholds::default(),
            expiring_soon_days: 30,
            global_access_roles: vec![UserRole::Admin, UserRole::FinancialManager],
            allow_over_receipt: true,
        }
    }
}

impl CoreConfig {
    /// Parses a JSON document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: CoreConfig = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;

        if config.aging.fresh_max_days >= config.aging.aging_max_days
            || config.aging.aging_max_days >= config.aging.stale_max_days
        {
            return Err(CoreError::InvalidConfig(
                "aging thresholds must be strictly increasing".to_string(),
            ));
        }

        debug!(
            base_currency = %config.base_currency_code,
            expiring_soon_days = config.expiring_soon_days,
            "Loaded core configuration"
        );
        Ok(config)
    }

    /// Pricing inputs for a line created in add mode.
    pub fn default_pricing(&self) -> PricingInput {
        PricingInput {
            tax: Adjustment::rate(self.default_tax_rate),
            tax_mode: self.default_tax_mode,
            currency_code: Some(self.base_currency_code.clone()),
            ..PricingInput::default()
        }
    }

    /// Formats an amount with the base-currency symbol.
    ///
    /// ## Example
    /// ```rust
    /// use procura_core::config::CoreConfig;
    /// use procura_core::money::Money;
    ///
    /// let config = CoreConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(1234)), "$12.34");
    /// assert_eq!(config.format_currency(Money::from_cents(-50)), "-$0.50");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let decimals = self.currency_decimals as usize;
        let value = amount
            .amount()
            .abs()
            .round_dp_with_strategy(
                self.currency_decimals as u32,
                RoundingStrategy::MidpointAwayFromZero,
            );

        format!(
            "{}{}{:.*}",
            if amount.is_negative() { "-" } else { "" },
            self.base_currency_symbol,
            decimals,
            value
        )
    }
}
