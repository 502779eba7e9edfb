use crate::domain::plan::Risk;

/// Static description of one recommendable instrument. The engine picks a
/// spec from this catalog and attaches the computed amount/percentage.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentSpec {
    pub kind: &'static str,
    pub name: &'static str,
    pub reason: &'static str,
    pub holding_period: &'static str,
    pub risk: Risk,
    pub color: &'static str,
}

// Display palette carried over from the original product so saved plans keep
// rendering identically.
const LIGHT_GREEN: &str = "#9EE493";
const NYANZA: &str = "#DAF7DC";
const LAPIS_LAZULI: &str = "#336699";
const CAROLINA_BLUE: &str = "#86BBD8";
const CHARCOAL: &str = "#2F4858";
const MID_BLUE: &str = "#6B8CAE";

pub const GOVERNMENT_BONDS: InstrumentSpec = InstrumentSpec {
    kind: "Government Bonds",
    name: "National Savings Certificate",
    reason: "Government bonds offer guaranteed returns with virtually no risk. They're ideal for capital preservation.",
    holding_period: "2+ years",
    risk: Risk::Low,
    color: LIGHT_GREEN,
};

// The bank FD carries a different color depending on whether it shares the
// low bucket with government bonds or stands alone.
pub const BANK_FD_PAIRED: InstrumentSpec = InstrumentSpec {
    kind: "Fixed Deposits",
    name: "Bank FD",
    reason: "Fixed deposits provide stable returns with guaranteed principal safety and are very liquid.",
    holding_period: "1+ year",
    risk: Risk::Low,
    color: NYANZA,
};

pub const BANK_FD_SOLO: InstrumentSpec = InstrumentSpec {
    color: LIGHT_GREEN,
    ..BANK_FD_PAIRED
};

pub const INDEX_FUND: InstrumentSpec = InstrumentSpec {
    kind: "Index Funds",
    name: "Nifty 50 Index Fund",
    reason: "Index funds track market indices, offering moderate growth with lower fees than actively managed funds.",
    holding_period: "3-5 years",
    risk: Risk::Medium,
    color: LAPIS_LAZULI,
};

pub const LARGE_CAP_MUTUAL_FUND: InstrumentSpec = InstrumentSpec {
    kind: "Mutual Funds",
    name: "Large Cap Mutual Fund",
    reason: "Large-cap funds invest in established companies, offering a balance of growth and stability.",
    holding_period: "3+ years",
    risk: Risk::Medium,
    color: CAROLINA_BLUE,
};

pub const BLUE_CHIP_STOCKS: InstrumentSpec = InstrumentSpec {
    kind: "Blue-chip Stocks",
    name: "Large Cap Stocks",
    reason: "Blue-chip stocks are shares of well-established companies with stable earnings and dividends.",
    holding_period: "3+ years",
    risk: Risk::Medium,
    color: CAROLINA_BLUE,
};

pub const CRYPTO: InstrumentSpec = InstrumentSpec {
    kind: "Cryptocurrency",
    name: "Bitcoin / Ethereum",
    reason: "Cryptocurrencies offer high growth potential but come with significant volatility and regulatory risks.",
    holding_period: "1-3 years",
    risk: Risk::High,
    color: CHARCOAL,
};

pub const SMALL_CAP_STOCKS: InstrumentSpec = InstrumentSpec {
    kind: "Small Cap Stocks",
    name: "Small Cap Growth Stocks",
    reason: "Small-cap stocks have higher growth potential but greater volatility than larger companies.",
    holding_period: "3-5 years",
    risk: Risk::High,
    color: CHARCOAL,
};

pub const SMALL_CAP_ALONGSIDE_CRYPTO: InstrumentSpec = InstrumentSpec {
    color: MID_BLUE,
    ..SMALL_CAP_STOCKS
};

pub const SECTOR_ETF: InstrumentSpec = InstrumentSpec {
    kind: "Sector-specific ETFs",
    name: "Technology Sector ETF",
    reason: "Sector ETFs focus on specific industries, offering targeted exposure with concentrated risk.",
    holding_period: "2-4 years",
    risk: Risk::High,
    color: MID_BLUE,
};
