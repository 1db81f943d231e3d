use std::io::Write;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use dash_core::models::{Cell, Filters, Granularity, View};
use dash_data::aggregator::TicketAggregator;
use dash_data::analysis::{build_dashboard, DashboardRequest};
use dash_data::cleaner::TableCleaner;
use dash_data::export::export_csv;
use dash_data::reader::load_and_clean;
use dash_data::report::{render_report, ReportOptions};
use tempfile::TempDir;

const BOARD_EXPORT: &str = "\u{feff}Ticket #,Summary Description,Status,Priority,Company,Resources,Last Update,Age,SLA Status
1001,Printer offline,New,/i/common/images/lime.gif,Acme,Jane,2024-01-15 09:00:00,3 days,Resolve by 1/20
1002,Critical: firewall down,In Progress,/i/common/images/purple.gif,Acme,Raj,01/16/2024 10:30 AM,2.5,Plan by 1/18
1003,New starter laptop,New,Medium,Globex,Jane,,10 days,
1004,VPN slow,Waiting,High,Globex,Raj,2024-01-17 14:00:00,1,Waiting on customer
1005,Mailbox full,Closed,Low,Initech,Jane,2024-01-10 08:15:00,n/a,Responded
1006,Server warning disk,New,Urgent,Acme,,,7 days,Resolve by 1/16
1007,Password reset,Closed,Low,Initech,Raj,2024-01-17 16:45:00,0.5,Responded
1008,Licence renewal,New,Medium,Umbrella,Jane,,,
1009,Backup failure alert,In Progress,High,Acme,Raj,2024-01-12 11:00:00,12 days,Overdue
1010,Phone handset,Waiting,Low,Globex,Jane,2024-01-16 12:00:00,4,Within SLA
";

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 18)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn write_export(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("service_board.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(BOARD_EXPORT.as_bytes()).unwrap();
    path
}

#[test]
fn test_board_export_cleans_and_buckets() {
    let dir = TempDir::new().unwrap();
    let table = load_and_clean(&write_export(&dir), &TableCleaner::default()).unwrap();

    assert_eq!(table.len(), 10);
    assert_eq!(table.columns()[0], "Ticket #");

    let null_dates = table
        .column("Last Update")
        .unwrap()
        .filter(|c| c.is_null())
        .count();
    assert_eq!(null_dates, 3);

    let priorities: Vec<String> = table
        .column("Priority")
        .unwrap()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(&priorities[..2], &["Low", "Urgent"]);
    assert!(priorities
        .iter()
        .all(|p| ["Low", "Medium", "High", "Urgent"].contains(&p.as_str())));

    assert_eq!(table.cell(1, "Age"), Some(&Cell::Number(2.5)));
    assert_eq!(table.cell(4, "Age"), Some(&Cell::Null));
    assert_eq!(table.cell(2, "SLA Status"), Some(&Cell::from("No SLA")));
    assert_eq!(table.cell(3, "SLA Status"), Some(&Cell::from("Waiting")));

    let series = TicketAggregator::trend(&table, Granularity::Daily, now())
        .available()
        .unwrap();
    let today = series
        .iter()
        .find(|p| p.label == "2024-01-18")
        .expect("bucket for today");
    assert_eq!(today.count, 3);
    assert_eq!(series.total(), 10);
}

#[test]
fn test_board_export_dashboard() {
    let dir = TempDir::new().unwrap();
    let table = load_and_clean(&write_export(&dir), &TableCleaner::default()).unwrap();
    let request = DashboardRequest::new(table, Granularity::Weekly, Filters::default());
    let dashboard = build_dashboard(&request, now());

    assert_eq!(dashboard.metrics.total_tickets, 10);
    match dashboard.metrics.unassigned {
        View::Available(share) => {
            assert_eq!(share.count, 1);
            assert_eq!(share.percent, 10.0);
        }
        View::Unavailable { .. } => panic!("Resources column is present"),
    }

    let resources = dashboard.resources.clone().available().unwrap();
    assert_eq!(resources[0].label, "Jane");
    assert_eq!(resources[0].count, 5);
    assert!(resources.iter().any(|r| r.label == "Unassigned" && r.count == 1));

    let companies = dashboard.companies.clone().available().unwrap();
    assert_eq!(companies[0].label, "Acme");
    assert_eq!(companies[0].count, 4);
    let tail: Vec<&str> = companies[2..].iter().map(|c| c.label.as_str()).collect();
    assert_eq!(tail, vec!["Initech", "Umbrella"]);

    let alerts = dashboard.alerts.clone().available().unwrap();
    assert_eq!(alerts.len(), 3);

    let report = render_report(&dashboard, &ReportOptions::default());
    assert!(report.contains("Weekly ticket trend"));
    assert!(report.contains("Backup failure alert"));
}

#[test]
fn test_filtered_export_reloads_identically() {
    let dir = TempDir::new().unwrap();
    let table = load_and_clean(&write_export(&dir), &TableCleaner::default()).unwrap();
    let filters = Filters {
        company: Some("Acme".to_string()),
        ..Filters::default()
    };
    let filtered = dash_data::analysis::apply_filters(&table, &filters);
    assert_eq!(filtered.len(), 4);

    let out = dir.path().join("acme.csv");
    export_csv(&filtered, &out).unwrap();
    let reloaded = load_and_clean(&out, &TableCleaner::default()).unwrap();
    assert_eq!(reloaded, filtered);
}
