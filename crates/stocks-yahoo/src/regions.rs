//! Region names understood by the Yahoo screener

use stocks_core::{RegionKey, SourceError};

/// A screener region: display name and the code used in queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub code: &'static str,
}

const fn region(name: &'static str, code: &'static str) -> Region {
    Region { name, code }
}

/// Regions offered by the screener's country filter
pub const REGIONS: &[Region] = &[
    region("Argentina", "ar"),
    region("Australia", "au"),
    region("Austria", "at"),
    region("Belgium", "be"),
    region("Brazil", "br"),
    region("Canada", "ca"),
    region("Chile", "cl"),
    region("China", "cn"),
    region("Czech Republic", "cz"),
    region("Denmark", "dk"),
    region("Egypt", "eg"),
    region("Estonia", "ee"),
    region("Finland", "fi"),
    region("France", "fr"),
    region("Germany", "de"),
    region("Greece", "gr"),
    region("Hong Kong", "hk"),
    region("Hungary", "hu"),
    region("Iceland", "is"),
    region("India", "in"),
    region("Indonesia", "id"),
    region("Ireland", "ie"),
    region("Israel", "il"),
    region("Italy", "it"),
    region("Japan", "jp"),
    region("Kuwait", "kw"),
    region("Latvia", "lv"),
    region("Lithuania", "lt"),
    region("Malaysia", "my"),
    region("Mexico", "mx"),
    region("Netherlands", "nl"),
    region("New Zealand", "nz"),
    region("Norway", "no"),
    region("Pakistan", "pk"),
    region("Peru", "pe"),
    region("Philippines", "ph"),
    region("Poland", "pl"),
    region("Portugal", "pt"),
    region("Qatar", "qa"),
    region("Romania", "ro"),
    region("Russia", "ru"),
    region("Saudi Arabia", "sa"),
    region("Singapore", "sg"),
    region("South Africa", "za"),
    region("South Korea", "kr"),
    region("Spain", "es"),
    region("Sri Lanka", "lk"),
    region("Suriname", "sr"),
    region("Sweden", "se"),
    region("Switzerland", "ch"),
    region("Taiwan", "tw"),
    region("Thailand", "th"),
    region("Turkey", "tr"),
    region("United Kingdom", "gb"),
    region("United States", "us"),
    region("Venezuela", "ve"),
    region("Vietnam", "vn"),
];

/// Find the single region matching `key`
///
/// An exact (case-insensitive) name wins; otherwise the key must be a
/// substring of exactly one region name. No match and several matches are
/// both reported as [`SourceError::RegionNotFound`].
pub fn lookup(key: &RegionKey) -> Result<Region, SourceError> {
    let needle = key.as_str();

    if let Some(exact) = REGIONS.iter().find(|r| r.name.eq_ignore_ascii_case(needle)) {
        return Ok(*exact);
    }

    let mut matches = REGIONS
        .iter()
        .filter(|r| r.name.to_lowercase().contains(needle));

    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(*found),
        (None, _) => Err(SourceError::RegionNotFound(needle.to_string())),
        (Some(_), Some(_)) => {
            tracing::debug!(region = needle, "Region name is ambiguous");
            Err(SourceError::RegionNotFound(needle.to_string()))
        },
    }
}
