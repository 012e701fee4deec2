use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// One row as it arrives from the record source.
///
/// Every field is kept as a raw JSON value so that a number stored as a
/// string (or a label stored as a number) never rejects the row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "campanha", alias = "campaign_name")]
    pub campaign: Option<Value>,
    #[serde(default, alias = "gasto", alias = "investimento")]
    pub spend: Option<Value>,
    #[serde(default, alias = "resultados")]
    pub leads: Option<Value>,
    #[serde(
        default,
        alias = "periodStart",
        alias = "date_start",
        alias = "data_inicio"
    )]
    pub period_start: Option<Value>,
    #[serde(default, alias = "cliente")]
    pub client: Option<Value>,
    #[serde(default, alias = "gestor")]
    pub manager: Option<Value>,
    #[serde(
        default,
        alias = "targetCostPerLead",
        alias = "cpl_meta",
        alias = "meta_cpl"
    )]
    pub target_cost_per_lead: Option<Value>,
}

/// A normalized ad-spend row. Built once by `AdRecord::from_raw` and never
/// mutated afterwards. `spend` is already rounded to whole cents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdRecord {
    pub campaign: String,
    pub spend: f64,
    pub leads: u64,
    pub period_start: NaiveDate,
    pub client: Option<String>,
    pub manager: Option<String>,
    pub target_cost_per_lead: f64,
}

/// Categorical filter value. `All` is the `"all"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    #[default]
    All,
    Only(String),
}

pub const ALL_SENTINEL: &str = "all";

impl Selector {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some(ALL_SENTINEL) => Selector::All,
            Some(label) => Selector::Only(label.to_string()),
        }
    }

    /// Record values are stored trimmed, so a plain comparison is enough.
    /// An absent value only ever matches `All`.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => value == Some(wanted.as_str()),
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selector::All => serializer.serialize_str(ALL_SENTINEL),
            Selector::Only(label) => serializer.serialize_str(label),
        }
    }
}

/// Explicit bounds win over `last_n_days` when either bound is set. With
/// nothing set the window is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub last_n_days: Option<u32>,
}

impl DateRange {
    pub fn between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start,
            end,
            last_n_days: None,
        }
    }

    pub fn last_days(days: u32) -> Self {
        Self {
            start: None,
            end: None,
            last_n_days: Some(days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterCriteria {
    pub date_range: DateRange,
    pub client: Selector,
    pub manager: Selector,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    pub total_spend: f64,
    pub total_leads: u64,
    pub average_cost_per_lead: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub day: NaiveDate,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    pub client: String,
    pub spend: f64,
    pub leads: u64,
    pub cost_per_lead: f64,
    pub target: f64,
    pub exceeds_target: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    pub undated_rows: usize,
}

/// Query string accepted by the dashboard endpoints. Everything arrives as
/// text and is validated by the handler.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub last_n_days: Option<String>,
    pub client: Option<String>,
    pub manager: Option<String>,
    pub today: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub today: NaiveDate,
    pub criteria: FilterCriteria,
    pub totals: Totals,
    pub series: Vec<DailyTotal>,
    pub ranking: Vec<ClientSummary>,
    pub records: Vec<AdRecord>,
}

#[derive(Debug, Serialize)]
pub struct FilterOptionsResponse {
    pub clients: Vec<String>,
    pub managers: Vec<String>,
}
