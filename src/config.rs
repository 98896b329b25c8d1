use crate::domain::money::DEFAULT_WITHDRAWAL_FEE_PERCENTAGE;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Tunables of the engine. Every field has a default so a config file only
/// needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Commission withheld from each withdrawal, in percent.
    pub withdrawal_fee_percentage: Decimal,
    /// Precision the commission is rounded to.
    pub fee_decimal_places: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            withdrawal_fee_percentage: DEFAULT_WITHDRAWAL_FEE_PERCENTAGE,
            fee_decimal_places: 2,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()
    }

    pub fn with_fee_percentage(mut self, fee_percentage: Decimal) -> Result<Self> {
        self.withdrawal_fee_percentage = fee_percentage;
        self.validate()
    }

    pub fn validate(self) -> Result<Self> {
        if self.withdrawal_fee_percentage < Decimal::ZERO
            || self.withdrawal_fee_percentage > Decimal::ONE_HUNDRED
        {
            return Err(EngineError::Config(format!(
                "withdrawal_fee_percentage must be within 0..=100, got {}",
                self.withdrawal_fee_percentage
            )));
        }
        if self.fee_decimal_places > 8 {
            return Err(EngineError::Config(format!(
                "fee_decimal_places must be at most 8, got {}",
                self.fee_decimal_places
            )));
        }
        Ok(self)
    }
}
