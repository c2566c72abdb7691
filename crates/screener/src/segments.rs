use configuration::MarketSegment;

const LARGE_CAP: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "BRK-B", "LLY", "V", "TSM", "UNH", "XOM",
    "JPM", "JNJ", "WMT", "MA", "PG", "HD", "AVGO", "MRK", "CVX", "KO", "PEP", "ABBV", "COST",
    "BAC", "ADBE", "MCD", "CRM", "CSCO",
];

const MID_CAP: &[&str] = &[
    "AMD", "UBER", "SNAP", "DASH", "RBLX", "COIN", "RIVN", "LCID", "ROKU", "CRWD", "FTNT", "DDOG",
    "ZS", "PANW", "SNOW", "NET", "AFRM", "U", "BILL", "TTD", "OKTA", "DOCN", "GTLB", "CFLT", "MDB",
    "HUBS", "TEAM", "ZI", "DKNG", "PINS",
];

const SMALL_CAP: &[&str] = &[
    "PLTR", "SOFI", "HOOD", "PLUG", "CHPT", "JOBY", "ENVX", "STEM", "PTRA", "EVGO", "IONQ", "DNA",
    "MTTR", "VLD", "DM", "MKFG", "ORGN", "LILM", "VORB", "SPCE", "ASTS", "RKLB", "ACHR", "GSAT",
    "OUST", "NNDM", "GOEV", "WKHS", "BLNK", "FSR",
];

/// The built-in symbol list for a segment.
pub fn universe(segment: MarketSegment) -> &'static [&'static str] {
    match segment {
        MarketSegment::Large => LARGE_CAP,
        MarketSegment::Mid => MID_CAP,
        MarketSegment::Small => SMALL_CAP,
    }
}

/// The first `count` symbols of a segment.
pub fn segment_symbols(segment: MarketSegment, count: usize) -> Vec<String> {
    universe(segment)
        .iter()
        .take(count)
        .map(|s| s.to_string())
        .collect()
}

pub fn segment_label(segment: MarketSegment) -> &'static str {
    match segment {
        MarketSegment::Large => "Large Cap",
        MarketSegment::Mid => "Mid Cap",
        MarketSegment::Small => "Small Cap",
    }
}
