//! Output formatting for scenario verdicts.

use colored::Colorize;
use kimg_image::{ScenarioReport, ScenarioSpec};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "SCENARIO")]
    name: &'static str,
    #[tabled(rename = "TITLE")]
    title: &'static str,
    #[tabled(rename = "VERDICT")]
    verdict: String,
    #[tabled(rename = "ERROR")]
    error: String,
}

#[derive(Tabled)]
struct SpecRow {
    #[tabled(rename = "SCENARIO")]
    name: &'static str,
    #[tabled(rename = "TITLE")]
    title: &'static str,
}

/// Print scenario verdicts in the specified format.
pub fn print_reports(reports: &[ScenarioReport], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<ReportRow> = reports
                .iter()
                .map(|report| ReportRow {
                    name: report.name,
                    title: report.title,
                    verdict: if report.passed {
                        "PASS".green().bold().to_string()
                    } else {
                        "FAIL".red().bold().to_string()
                    },
                    error: report.error.clone().unwrap_or_default(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        OutputFormat::Json => print_json(reports),
    }
}

/// Print the scenario registry in the specified format.
pub fn print_specs(specs: &[ScenarioSpec], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<SpecRow> = specs
                .iter()
                .map(|spec| SpecRow {
                    name: spec.name,
                    title: spec.title,
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        OutputFormat::Json => print_json(specs),
    }
}

fn print_json<T: Serialize>(data: &[T]) {
    let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string());
    println!("{}", json);
}
