//! Terminal front end: command parsing, dispatch and result rendering.

pub mod command;
pub mod repl;

pub use command::{parse_command, Command, UsageError};
pub use repl::{Flow, Repl};

use serde_json::Value;

const MAX_COL_WIDTH: usize = 48;

/// Render an API result as an ASCII table when it is tabular: a page
/// (`{content, totalPages, ...}`) or an array. Returns `None` for anything
/// else and for empty results, which print as JSON instead.
pub fn render_table(val: &Value) -> Option<String> {
    let (items, footer) = match val {
        Value::Object(map) if map.get("content").map(Value::is_array).unwrap_or(false) => {
            let items = map.get("content")?.as_array()?;
            (items, page_footer(val))
        }
        Value::Array(items) => (items, None),
        _ => return None,
    };
    if items.is_empty() {
        return None;
    }
    let (cols, rows) = columns_and_rows(items);

    let mut widths: Vec<usize> = cols.iter().map(|s| display_len(s).min(MAX_COL_WIDTH)).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] {
                widths[i] = w.min(MAX_COL_WIDTH);
            }
        }
    }

    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 5);
    out.push(sep.clone());
    out.push(build_row(&cols, &widths));
    out.push(sep.clone());
    for r in &rows {
        out.push(build_row(r, &widths));
    }
    out.push(sep);
    out.push(footer.unwrap_or_else(|| format!("rows: {}", rows.len())));
    Some(out.join("\n"))
}

/// Table if tabular, pretty JSON otherwise.
pub fn render_result(val: &Value) -> String {
    render_table(val).unwrap_or_else(|| serde_json::to_string_pretty(val).unwrap_or_else(|_| val.to_string()))
}

fn page_footer(val: &Value) -> Option<String> {
    let number = val.get("number")?.as_u64()?;
    let total_pages = val.get("totalPages")?.as_u64()?;
    let total = val.get("totalElements").and_then(Value::as_u64).unwrap_or(0);
    Some(format!("page {} of {}, {} total", number + 1, total_pages.max(1), total))
}

// Objects: sorted union of keys. Anything else: one "value" column.
fn columns_and_rows(items: &[Value]) -> (Vec<String>, Vec<Vec<String>>) {
    let all_objects = items.iter().all(Value::is_object);
    if !all_objects {
        let rows = items.iter().map(|v| vec![to_cell_string(v)]).collect();
        return (vec!["value".to_string()], rows);
    }
    let mut cols: Vec<String> = Vec::new();
    for item in items {
        if let Value::Object(map) = item {
            for k in map.keys() {
                if !cols.contains(k) {
                    cols.push(k.clone());
                }
            }
        }
    }
    cols.sort();
    let rows = items
        .iter()
        .map(|item| cols.iter().map(|c| item.get(c).map(to_cell_string).unwrap_or_default()).collect())
        .collect();
    (cols, rows)
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", ")
        }
        other => other.to_string(),
    }
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(display_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if display_len(s) <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    s.chars().take(max - 1).collect::<String>() + "…"
}

// numbers are right-aligned
fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().any(|c| c.is_ascii_digit()) && st.chars().all(|c| c.is_ascii_digit() || ".-+eE".contains(c))
}
