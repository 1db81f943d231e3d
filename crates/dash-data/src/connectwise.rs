//! ConnectWise Manage ticket source.
//!
//! Maps service tickets returned by the ConnectWise REST API onto the same
//! columns a CSV board export uses, so the result goes through the regular
//! cleaner and dashboard pipeline.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, FixedOffset, Utc};
use dash_core::error::{DashboardError, Result};
use dash_core::models::{columns, Cell, Table, SECONDS_FORMAT};
use dash_core::settings::ConnectWiseCredentials;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

/// API path below the site URL.
const TICKETS_PATH: &str = "/v4_6_release/apis/3.0/service/tickets";

/// Columns of a table built from API tickets.
pub const TICKET_COLUMNS: &[&str] = &[
    columns::TICKET,
    columns::SUMMARY,
    columns::STATUS,
    columns::PRIORITY,
    columns::COMPANY,
    columns::RESOURCES,
    columns::TEAM,
    columns::SUBTYPE,
    columns::LAST_UPDATE,
    columns::SLA_STATUS,
    columns::AGE,
];

// ── Field mapping ─────────────────────────────────────────────────────────────

/// Map a ConnectWise priority name onto the dashboard levels.
/// Unknown names are returned unchanged.
pub fn map_priority_level(name: &str) -> &str {
    match name {
        "Critical" | "Emergency" | "Priority 1" => "Urgent",
        "Priority 2" => "High",
        "Priority 3" => "Medium",
        "Priority 4" | "Priority 5" => "Low",
        other => other,
    }
}

fn parse_api_datetime(raw: &str) -> Option<DateTime<FixedOffset>> {
    let normalised = match raw.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => raw.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalised).ok()
}

/// Reformat an API timestamp as `%Y-%m-%d %H:%M:%S`, keeping its wall-clock
/// time. Unparseable input is returned as-is.
pub fn format_datetime(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match parse_api_datetime(raw) {
        Some(dt) => dt.naive_local().format(SECONDS_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// `"N days"` since `date_entered`, or `"N/A"` when it is absent or
/// unparseable. An entry date after `now` counts as `0 days`.
pub fn age_label(date_entered: Option<&str>, now: DateTime<Utc>) -> String {
    date_entered
        .filter(|s| !s.is_empty())
        .and_then(parse_api_datetime)
        .map(|entered| {
            let days = (now - entered.with_timezone(&Utc)).num_days().max(0);
            format!("{} days", days)
        })
        .unwrap_or_else(|| "N/A".to_string())
}

/// `Overdue` when the SLA is past due, `Responded` when responded to,
/// `Within SLA` otherwise.
pub fn sla_status(ticket: &Value) -> &'static str {
    let sla = &ticket["sla"];
    if sla["pastDue"].as_bool().unwrap_or(false) {
        "Overdue"
    } else if sla["responded"].as_bool().unwrap_or(false) {
        "Responded"
    } else {
        "Within SLA"
    }
}

/// `ticket[key].name`, or an empty string.
fn nested_name(ticket: &Value, key: &str) -> String {
    ticket[key]["name"].as_str().unwrap_or_default().to_string()
}

/// Text form of a scalar field; numbers are written without quotes.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// `resources` is a comma separated string in the API, older payloads use
/// an object with a `name`.
fn resources(ticket: &Value) -> String {
    match &ticket["resources"] {
        Value::Object(_) => nested_name(ticket, "resources"),
        other => scalar(other),
    }
}

/// Map one API ticket onto a row in [`TICKET_COLUMNS`] order.
/// Empty fields become null cells.
pub fn map_ticket(ticket: &Value, now: DateTime<Utc>) -> Vec<Cell> {
    let priority = nested_name(ticket, "priority");
    [
        scalar(&ticket["id"]),
        scalar(&ticket["summary"]),
        nested_name(ticket, "status"),
        map_priority_level(&priority).to_string(),
        nested_name(ticket, "company"),
        resources(ticket),
        nested_name(ticket, "team"),
        nested_name(ticket, "subType"),
        format_datetime(ticket["lastUpdated"].as_str().unwrap_or_default()),
        sla_status(ticket).to_string(),
        age_label(ticket["dateEntered"].as_str(), now),
    ]
    .iter()
    .map(|field| Cell::from_raw(field))
    .collect()
}

/// Build a raw ticket table from API tickets.
pub fn tickets_to_table(tickets: &[Value], now: DateTime<Utc>) -> Table {
    Table::from_rows(
        TICKET_COLUMNS.iter().copied(),
        tickets.iter().map(|t| map_ticket(t, now)).collect(),
    )
}

// ── Client ────────────────────────────────────────────────────────────────────

/// HTTP client for the ConnectWise service tickets endpoint.
pub struct ConnectWiseClient {
    http: Client,
    credentials: ConnectWiseCredentials,
}

impl ConnectWiseClient {
    pub fn new(credentials: ConnectWiseCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DashboardError::Http(e.to_string()))?;
        Ok(Self { http, credentials })
    }

    pub fn tickets_url(&self) -> String {
        format!("{}{}", self.credentials.site_url, TICKETS_PATH)
    }

    /// `Basic base64("{company}+{public}:{private}")`.
    pub fn auth_header(&self) -> String {
        let c = &self.credentials;
        let raw = format!("{}+{}:{}", c.company_id, c.public_key, c.private_key);
        format!("Basic {}", BASE64.encode(raw))
    }

    /// The `clientId` header value; defaults to the company id.
    pub fn client_id(&self) -> &str {
        self.credentials
            .client_id
            .as_deref()
            .unwrap_or(&self.credentials.company_id)
    }

    /// Fetch one page of tickets and map them into a raw table.
    ///
    /// A non-success response is returned as [`DashboardError::Api`].
    pub async fn fetch_tickets(&self, conditions: Option<&str>, page_size: u32) -> Result<Table> {
        let url = self.tickets_url();
        let mut query: Vec<(&str, String)> = vec![("pageSize", page_size.to_string())];
        if let Some(conditions) = conditions.filter(|c| !c.is_empty()) {
            query.push(("conditions", conditions.to_string()));
        }

        info!("Fetching tickets from {}", url);
        debug!("ConnectWise query: {:?}", query);

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .header("clientId", self.client_id())
            .query(&query)
            .send()
            .await
            .map_err(|e| DashboardError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let tickets: Vec<Value> = response
            .json()
            .await
            .map_err(|e| DashboardError::Http(e.to_string()))?;

        info!("Received {} tickets", tickets.len());
        Ok(tickets_to_table(&tickets, Utc::now()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
