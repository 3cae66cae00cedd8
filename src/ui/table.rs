use tabled::{settings::Style, Table, Tabled};

use crate::entity::FileEntity;
use crate::ui::output::human_bytes;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Etag")]
    etag: String,
}

/// Folder listing as a table
pub fn entries_table(entries: &[FileEntity]) -> String {
    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id.map(|id| id.to_string()).unwrap_or_default(),
            name: e.name().to_string(),
            kind: if e.is_folder { "folder" } else { "file" },
            size: if e.is_folder { String::new() } else { human_bytes(e.size) },
            etag: e.etag.clone().unwrap_or_default(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
