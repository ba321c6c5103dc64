use crate::format::format_amount;
use crate::valuation::CompositeValuation;

/// Decimal places used for every amount in a notification.
pub const MESSAGE_DECIMALS: u32 = 2;

/// Pre-formatted amounts shared by every transport; each channel only decides
/// the markup around them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateLines {
    pub brokerage: String,
    pub crypto: String,
    pub bullion: String,
    pub total: String,
}

impl UpdateLines {
    pub fn from_valuation(valuation: &CompositeValuation) -> Self {
        let currency = valuation.reporting_currency();
        Self {
            brokerage: format_amount(valuation.brokerage_value(), currency, MESSAGE_DECIMALS),
            crypto: format_amount(valuation.crypto_value(), currency, MESSAGE_DECIMALS),
            bullion: format_amount(valuation.bullion_value(), currency, MESSAGE_DECIMALS),
            total: format_amount(valuation.total_value(), currency, MESSAGE_DECIMALS),
        }
    }
}
