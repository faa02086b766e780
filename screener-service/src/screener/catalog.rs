//! Static symbol catalog.
//!
//! Candidate lists keyed by screen type and sub-category. Swing lists are
//! large, liquid names per sector; growth lists are smaller thematic baskets.

use serde::{Deserialize, Serialize};

// ============================================================================
// Screen Type
// ============================================================================

/// Kind of screen requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenType {
    /// Sector-based swing trading candidates
    Swing,
    /// Thematic growth candidates
    Growth,
}

impl ScreenType {
    /// Sub-category used when none (or an unknown one) is requested.
    pub fn default_category(&self) -> &'static str {
        match self {
            Self::Swing => "tech",
            Self::Growth => "ai",
        }
    }

    fn lists(&self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            Self::Swing => SWING_LISTS,
            Self::Growth => GROWTH_LISTS,
        }
    }
}

impl std::fmt::Display for ScreenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Swing => write!(f, "swing"),
            Self::Growth => write!(f, "growth"),
        }
    }
}

impl std::str::FromStr for ScreenType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "swing" => Ok(Self::Swing),
            "growth" => Ok(Self::Growth),
            _ => Err(format!("Unknown screen type: {}", s)),
        }
    }
}

// ============================================================================
// Symbol Lists
// ============================================================================

const SWING_LISTS: &[(&str, &[&str])] = &[
    ("tech", &["NVDA", "AAPL", "MSFT", "META", "GOOGL", "AMD", "TSLA"]),
    ("finance", &["JPM", "BAC", "GS", "MS", "WFC", "C", "BLK"]),
    ("healthcare", &["JNJ", "UNH", "PFE", "ABBV", "TMO", "MRK", "LLY"]),
    ("energy", &["XOM", "CVX", "COP", "SLB", "EOG", "MPC"]),
    ("consumer", &["AMZN", "TSLA", "NKE", "SBUX", "MCD", "HD", "WMT"]),
    ("industrials", &["CAT", "BA", "GE", "HON", "UPS", "MMM"]),
    ("realestate", &["AMT", "PLD", "CCI", "EQIX", "PSA"]),
    ("utilities", &["NEE", "DUK", "SO", "D", "AEP"]),
    ("materials", &["LIN", "APD", "ECL", "SHW", "NEM"]),
];

const GROWTH_LISTS: &[(&str, &[&str])] = &[
    ("ai", &["PLTR", "AI", "SOUN", "BBAI", "PATH"]),
    ("cyber", &["CRWD", "PANW", "ZS", "FTNT", "S"]),
    ("fintech", &["SQ", "PYPL", "UPST", "AFRM", "SOFI", "COIN"]),
    ("saas", &["SNOW", "DDOG", "NET", "MDB", "DOCN", "HUBS"]),
    ("cleantech", &["ENPH", "SEDG", "RUN", "FSLR", "TSLA"]),
    ("biotech", &["MRNA", "BNTX", "NVAX", "CRSP", "EDIT"]),
    ("ecommerce", &["SHOP", "ETSY", "W", "CHWY", "DASH"]),
    ("gaming", &["RBLX", "U", "TTWO", "EA", "DKNG"]),
    ("semiconductor", &["NVDA", "AMD", "AVGO", "QCOM", "MRVL"]),
];

/// Look up a sub-category list.
pub fn lookup(screen_type: ScreenType, category: &str) -> Option<&'static [&'static str]> {
    screen_type
        .lists()
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, symbols)| *symbols)
}

/// Resolve the candidate list for a screen.
///
/// A missing, empty or unknown category falls back to the type's default.
/// Returns the category actually used along with its symbols.
pub fn resolve(
    screen_type: ScreenType,
    category: Option<&str>,
) -> (&'static str, &'static [&'static str]) {
    let requested = category.map(str::trim).filter(|c| !c.is_empty());

    if let Some(requested) = requested {
        if let Some((name, symbols)) = screen_type
            .lists()
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(requested))
        {
            return (*name, *symbols);
        }
    }

    let default = screen_type.default_category();
    (default, lookup(screen_type, default).unwrap_or(&[]))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_type_parsing() {
        assert_eq!("swing".parse::<ScreenType>(), Ok(ScreenType::Swing));
        assert_eq!("Growth".parse::<ScreenType>(), Ok(ScreenType::Growth));
        assert!("value".parse::<ScreenType>().is_err());
    }

    #[test]
    fn test_resolve_known_category() {
        let (name, symbols) = resolve(ScreenType::Swing, Some("finance"));
        assert_eq!(name, "finance");
        assert_eq!(symbols[0], "JPM");

        let (name, symbols) = resolve(ScreenType::Growth, Some("SEMICONDUCTOR"));
        assert_eq!(name, "semiconductor");
        assert_eq!(symbols, &["NVDA", "AMD", "AVGO", "QCOM", "MRVL"]);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        assert_eq!(resolve(ScreenType::Swing, None).0, "tech");
        assert_eq!(resolve(ScreenType::Swing, Some("")).0, "tech");
        assert_eq!(resolve(ScreenType::Swing, Some("crypto")).0, "tech");

        let (name, symbols) = resolve(ScreenType::Growth, Some("unknown"));
        assert_eq!(name, "ai");
        assert_eq!(symbols[0], "PLTR");
    }

    #[test]
    fn test_catalog_lists() {
        assert_eq!(ScreenType::Swing.lists().len(), 9);
        assert!(lookup(ScreenType::Growth, "fintech").is_some());
        assert!(lookup(ScreenType::Growth, "tech").is_none());
    }
}
