//! Screener request bodies and response payloads

use serde::Deserialize;
use serde_json::{Value, json};
use stocks_core::RawRow;

/// Column headers of the table built from screener quotes
pub const COLUMNS: [&str; 7] = [
    "Symbol",
    "Name",
    "Price (Intraday)",
    "Change",
    "% Change",
    "Volume",
    "Market Cap",
];

/// Placeholder for cells the screener left empty
const MISSING: &str = "N/A";

/// Query body for one page of equities listed in `region_code`
pub fn screener_query(region_code: &str, offset: usize, size: usize) -> Value {
    json!({
        "offset": offset,
        "size": size,
        "sortField": "intradaymarketcap",
        "sortType": "DESC",
        "quoteType": "EQUITY",
        "query": {
            "operator": "AND",
            "operands": [
                {
                    "operator": "or",
                    "operands": [
                        { "operator": "EQ", "operands": ["region", region_code] }
                    ]
                }
            ]
        },
        "userId": "",
        "userIdType": "guid"
    })
}

#[derive(Debug, Deserialize)]
pub struct ScreenerEnvelope {
    pub finance: Finance,
}

#[derive(Debug, Deserialize)]
pub struct Finance {
    #[serde(default)]
    pub result: Option<Vec<ScreenerPage>>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// One page of screener results
#[derive(Debug, Default, Deserialize)]
pub struct ScreenerPage {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub quotes: Vec<ScreenerQuote>,
}

/// A formatted screener field (`formatted=true` responses)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Formatted {
        #[serde(default)]
        raw: Option<Value>,
        #[serde(default)]
        fmt: Option<String>,
    },
    Plain(Value),
}

impl Field {
    /// Text as the screener displays it
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Formatted { fmt: Some(fmt), .. } => Some(fmt.clone()),
            Self::Formatted { raw: Some(raw), .. } | Self::Plain(raw) => value_text(raw),
            Self::Formatted { .. } => None,
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerQuote {
    pub symbol: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<Field>,
    #[serde(default)]
    pub regular_market_change: Option<Field>,
    #[serde(default)]
    pub regular_market_change_percent: Option<Field>,
    #[serde(default)]
    pub regular_market_volume: Option<Field>,
    #[serde(default)]
    pub market_cap: Option<Field>,
}

impl ScreenerQuote {
    /// Table row aligned with [`COLUMNS`]
    pub fn to_row(&self) -> RawRow {
        let cell = |field: &Option<Field>| {
            field
                .as_ref()
                .and_then(Field::display)
                .unwrap_or_else(|| MISSING.to_string())
        };

        let name = self
            .short_name
            .clone()
            .or_else(|| self.long_name.clone())
            .unwrap_or_else(|| self.symbol.clone());

        vec![
            self.symbol.clone(),
            name,
            cell(&self.regular_market_price),
            cell(&self.regular_market_change),
            cell(&self.regular_market_change_percent),
            cell(&self.regular_market_volume),
            cell(&self.market_cap),
        ]
    }
}
