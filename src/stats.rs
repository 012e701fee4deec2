use crate::filter::{filter_records, scope_by_manager};
use crate::ingest::{from_cents, to_cents};
use crate::models::{
    AdRecord, ClientSummary, DailyTotal, DashboardResponse, FilterCriteria,
    FilterOptionsResponse, Selector, Totals,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Run the whole pipeline for one query against a snapshot.
pub fn build_dashboard(
    snapshot: &[AdRecord],
    criteria: &FilterCriteria,
    today: NaiveDate,
) -> DashboardResponse {
    let filtered = filter_records(snapshot, criteria, today);
    DashboardResponse {
        today,
        criteria: criteria.clone(),
        totals: aggregate_totals(&filtered),
        series: build_daily_series(&filtered),
        ranking: rank_clients(snapshot, &filtered, &criteria.manager),
        records: filtered,
    }
}

/// Spend over leads; with no leads the raw spend stands in as a nominal
/// per-lead cost (zero when nothing was spent either).
pub fn cost_per_lead(spend: f64, leads: u64) -> f64 {
    if leads > 0 {
        spend / leads as f64
    } else {
        spend
    }
}

/// Spend is summed in whole cents, so the totals do not depend on record
/// order.
pub fn aggregate_totals(filtered: &[AdRecord]) -> Totals {
    let (cents, total_leads) = filtered.iter().fold((0u64, 0u64), |(cents, leads), r| {
        (
            cents.saturating_add(to_cents(r.spend)),
            leads.saturating_add(r.leads),
        )
    });
    let total_spend = from_cents(cents);
    let average_cost_per_lead = if total_leads > 0 {
        total_spend / total_leads as f64
    } else {
        0.0
    };
    Totals {
        total_spend,
        total_leads,
        average_cost_per_lead,
    }
}

/// Spend per calendar day, ascending.
pub fn build_daily_series(filtered: &[AdRecord]) -> Vec<DailyTotal> {
    let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in filtered {
        let cents = days.entry(record.period_start).or_default();
        *cents = cents.saturating_add(to_cents(record.spend));
    }
    days.into_iter()
        .map(|(day, cents)| DailyTotal {
            day,
            spend: from_cents(cents),
        })
        .collect()
}

/// First non-zero target per client, in snapshot order.
pub fn resolve_targets(full_set: &[AdRecord]) -> HashMap<&str, f64> {
    let mut targets = HashMap::new();
    for record in full_set {
        if let Some(client) = record.client.as_deref() {
            if record.target_cost_per_lead > 0.0 {
                targets.entry(client).or_insert(record.target_cost_per_lead);
            }
        }
    }
    targets
}

/// Per-client roll-up with breach flag.
///
/// The client list comes from `full_set` under the manager selector, so idle
/// clients still show up with zero figures. Spend and leads come only from
/// `filtered`; targets come from `full_set` regardless of any filter.
pub fn rank_clients(
    full_set: &[AdRecord],
    filtered: &[AdRecord],
    manager: &Selector,
) -> Vec<ClientSummary> {
    let universe: BTreeSet<&str> = scope_by_manager(full_set, manager)
        .filter_map(|r| r.client.as_deref())
        .collect();
    let targets = resolve_targets(full_set);

    let mut figures: HashMap<&str, (u64, u64)> = HashMap::new();
    for record in filtered {
        if let Some(client) = record.client.as_deref() {
            let e = figures.entry(client).or_default();
            e.0 = e.0.saturating_add(to_cents(record.spend));
            e.1 = e.1.saturating_add(record.leads);
        }
    }

    let mut ranking: Vec<ClientSummary> = universe
        .into_iter()
        .map(|client| {
            let (cents, leads) = figures.get(client).copied().unwrap_or_default();
            let spend = from_cents(cents);
            let target = targets.get(client).copied().unwrap_or(0.0);
            let cost_per_lead = cost_per_lead(spend, leads);
            ClientSummary {
                client: client.to_string(),
                spend,
                leads,
                cost_per_lead,
                target,
                exceeds_target: target > 0.0 && cost_per_lead > target,
            }
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.exceeds_target
            .cmp(&a.exceeds_target)
            .then_with(|| b.spend.total_cmp(&a.spend))
            .then_with(|| a.client.cmp(&b.client))
    });
    ranking
}

/// Labels for the client and manager selectors. Managers are always listed in
/// full; clients follow the manager selector.
pub fn filter_options(snapshot: &[AdRecord], manager: &Selector) -> FilterOptionsResponse {
    let managers: BTreeSet<&str> = snapshot
        .iter()
        .filter_map(|r| r.manager.as_deref())
        .collect();
    let clients: BTreeSet<&str> = scope_by_manager(snapshot, manager)
        .filter_map(|r| r.client.as_deref())
        .collect();
    FilterOptionsResponse {
        clients: clients.into_iter().map(str::to_string).collect(),
        managers: managers.into_iter().map(str::to_string).collect(),
    }
}
