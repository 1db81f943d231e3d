use chrono::NaiveDate;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{DashboardError, Result};
use crate::models::{Filters, Granularity};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Clean helpdesk ticket exports and build dashboard views
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ticket-dash",
    about = "Clean helpdesk ticket exports and build dashboard views",
    version
)]
pub struct Settings {
    /// Ticket export CSV file
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Time bucket width for trend counts
    #[arg(long, value_enum, default_value_t = Granularity::Daily)]
    pub granularity: Granularity,

    /// Timezone of the export's timestamps (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Only keep tickets with this status
    #[arg(long)]
    pub status: Option<String>,

    /// Only keep tickets for this company
    #[arg(long)]
    pub company: Option<String>,

    /// Earliest Last Update date to keep (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Latest Last Update date to keep (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// Write the dashboard document as JSON
    #[arg(long)]
    pub json_out: Option<PathBuf>,

    /// Write the filtered, cleaned table as CSV
    #[arg(long)]
    pub csv_out: Option<PathBuf>,

    /// Write the paginated text report
    #[arg(long)]
    pub report_out: Option<PathBuf>,

    /// Lines per report page
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u16).range(10..=500))]
    pub page_height: u16,

    /// ConnectWise site URL; fetches tickets from the API instead of a file
    #[arg(long, env = "CW_SITE_URL")]
    pub cw_site: Option<String>,

    /// ConnectWise company id
    #[arg(long, env = "CW_COMPANY_ID")]
    pub cw_company: Option<String>,

    /// ConnectWise API public key
    #[arg(long, env = "CW_PUBLIC_KEY")]
    pub cw_public_key: Option<String>,

    /// ConnectWise API private key
    #[arg(long, env = "CW_PRIVATE_KEY", hide_env_values = true)]
    pub cw_private_key: Option<String>,

    /// ConnectWise client id (defaults to the company id)
    #[arg(long, env = "CW_CLIENT_ID")]
    pub cw_client_id: Option<String>,

    /// ConnectWise query conditions
    #[arg(long)]
    pub cw_conditions: Option<String>,

    /// ConnectWise page size
    #[arg(long, default_value = "1000")]
    pub cw_page_size: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Credentials for the ConnectWise ticket API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectWiseCredentials {
    pub site_url: String,
    pub company_id: String,
    pub public_key: String,
    pub private_key: String,
    pub client_id: Option<String>,
}

/// Where the ticket table comes from for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketSource {
    File(PathBuf),
    ConnectWise(ConnectWiseCredentials),
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and resolve `"auto"` values.
    pub fn load() -> Self {
        Self::resolve_auto_values(Settings::parse())
    }

    /// Same as [`Settings::load`] but from an explicit argument list.
    pub fn try_load_from<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::resolve_auto_values)
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Row filters requested on the command line.
    pub fn filters(&self) -> Filters {
        Filters {
            status: self.status.clone(),
            company: self.company.clone(),
            date_from: self.from,
            date_to: self.to,
        }
    }

    /// Decide where tickets are read from.
    ///
    /// The API is used as soon as a site URL is given; it then needs the
    /// company id and both keys. Otherwise an input file is required.
    pub fn source(&self) -> Result<TicketSource> {
        if let Some(site_url) = &self.cw_site {
            let required = |value: &Option<String>, flag: &str| {
                value
                    .clone()
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| DashboardError::Config(format!("{} is required", flag)))
            };
            return Ok(TicketSource::ConnectWise(ConnectWiseCredentials {
                site_url: site_url.trim_end_matches('/').to_string(),
                company_id: required(&self.cw_company, "--cw-company")?,
                public_key: required(&self.cw_public_key, "--cw-public-key")?,
                private_key: required(&self.cw_private_key, "--cw-private-key")?,
                client_id: self.cw_client_id.clone(),
            }));
        }

        match &self.input {
            Some(path) => Ok(TicketSource::File(path.clone())),
            None => Err(DashboardError::Config(
                "either --input or --cw-site must be given".to_string(),
            )),
        }
    }

    /// Check cross-field constraints clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(DashboardError::Config(format!(
                    "--from {} is after --to {}",
                    from, to
                )));
            }
        }
        self.source().map(|_| ())
    }
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    crate::time_utils::parse_date_arg(s).map_err(|e| e.to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
