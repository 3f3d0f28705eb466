use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Rows that can be rendered as JSON, a table, or `key=value` lines.
pub trait Listing: Serialize {
    fn headers(&self) -> Vec<&'static str>;
    fn rows(&self) -> Vec<Vec<String>>;
}

pub fn print_listing<L: Listing>(listing: &L, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(listing),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(listing.headers());
            for row in listing.rows() {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let headers = listing.headers();
            for row in listing.rows() {
                let line = headers
                    .iter()
                    .zip(&row)
                    .map(|(h, v)| format!("{}={}", h.to_lowercase(), v))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{line}");
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// First line of a documentation string.
pub fn summary(doc: &str) -> String {
    doc.lines().next().unwrap_or_default().to_string()
}
