use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Longest term or amortization horizon accepted (50 years)
pub const MAX_TERM_MONTHS: u32 = 600;

/// Months in a year, used to derive the periodic rate from an annual rate
pub const MONTHS_PER_YEAR: u32 = 12;

/// Decimal places kept on schedule amounts (cents)
pub const CURRENCY_SCALE: u32 = 2;

/// Largest ending balance still treated as fully amortized
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);
