use maud::html;

use crate::database::{Row, Value};

pub const NULL_CELL: &str = "n/a";

fn cell(value: &Value) -> String {
    if value.is_null() {
        NULL_CELL.to_string()
    } else {
        value.to_string()
    }
}

/// Renders rows as an HTML table, with `header` split on commas into the first row.
///
/// Empty input renders as an empty string so callers can show a message instead.
pub fn render_html(rows: &[Row], header: &str) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let markup = html! {
        table {
            @if !header.is_empty() {
                tr {
                    @for name in header.split(',') {
                        th { (name) }
                    }
                }
            }
            @for row in rows {
                tr {
                    @for value in row {
                        td { (cell(value)) }
                    }
                }
            }
        }
    };

    markup.into_string()
}

/// Renders rows as comma-separated lines broken with `<br>`, ready to copy out of a browser.
pub fn render_csv(rows: &[Row], header: &str) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let markup = html! {
        @if !header.is_empty() {
            (header) br;
        }
        @for row in rows {
            (csv_line(row)) br;
        }
    };

    markup.into_string()
}

fn csv_line(row: &Row) -> String {
    row.iter().map(cell).collect::<Vec<_>>().join(",")
}
