mod bootstrap;

use std::path::Path;

use anyhow::{Context, Result};
use dash_core::models::Table;
use dash_core::settings::{Settings, TicketSource};
use dash_core::time_utils::TimezoneHandler;
use dash_data::analysis::{build_dashboard, Dashboard, DashboardRequest};
use dash_data::cleaner::TableCleaner;
use dash_data::connectwise::ConnectWiseClient;
use dash_data::export::export_csv;
use dash_data::reader::load_table;
use dash_data::report::{render_report, ReportOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;
    settings.validate()?;

    tracing::info!("Ticket dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Granularity: {}, Timezone: {}",
        settings.granularity,
        settings.timezone
    );

    let timezone = TimezoneHandler::new(&settings.timezone);
    let raw = load_source(&settings).await?;

    let (table, cleaning) = TableCleaner::new(timezone).clean_with_report(&raw);
    if cleaning.total_nulled() > 0 {
        tracing::warn!(
            "{} cells could not be interpreted and were cleared: {:?}",
            cleaning.total_nulled(),
            cleaning.nulled_cells
        );
    }

    let request = DashboardRequest::new(table, settings.granularity, settings.filters());
    let dashboard = build_dashboard(&request, timezone.now_local());

    write_outputs(&settings, &dashboard)?;
    Ok(())
}

/// Load the raw ticket table from the configured source.
async fn load_source(settings: &Settings) -> Result<Table> {
    match settings.source()? {
        TicketSource::File(path) => {
            load_table(&path).with_context(|| format!("Failed to load {}", path.display()))
        }
        TicketSource::ConnectWise(credentials) => {
            let client = ConnectWiseClient::new(credentials)?;
            client
                .fetch_tickets(settings.cw_conditions.as_deref(), settings.cw_page_size)
                .await
                .context("Failed to fetch tickets from ConnectWise")
        }
    }
}

/// Write every requested output; print the report when none was requested.
fn write_outputs(settings: &Settings, dashboard: &Dashboard) -> Result<()> {
    let options = ReportOptions {
        page_height: usize::from(settings.page_height),
        ..ReportOptions::default()
    };

    let mut wrote_any = false;

    if let Some(path) = &settings.json_out {
        write_file(path, &serde_json::to_string_pretty(dashboard)?)?;
        tracing::info!("Dashboard written to {}", path.display());
        wrote_any = true;
    }

    if let Some(path) = &settings.csv_out {
        bootstrap::ensure_parent_dir(path)?;
        export_csv(&dashboard.table, path)?;
        wrote_any = true;
    }

    if let Some(path) = &settings.report_out {
        write_file(path, &render_report(dashboard, &options))?;
        tracing::info!("Report written to {}", path.display());
        wrote_any = true;
    }

    if !wrote_any {
        print!("{}", render_report(dashboard, &options));
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    bootstrap::ensure_parent_dir(path)?;
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
