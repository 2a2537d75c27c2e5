use scraper::ElementRef;

use crate::dom::collapse_whitespace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Split a `<table>` into header names and body rows.
///
/// The header row is the last row of `<thead>`, or the first row when every cell
/// in it is a `<th>`. Without a header row the result is empty. Rows keep the cell
/// count they have in the markup; rows of nested tables are ignored.
pub fn parse_table(table: ElementRef) -> ParsedTable {
    let rows = own_rows(table);

    let head_rows: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| in_thead(**row, table))
        .map(|(idx, _)| idx)
        .collect();

    let header_idx = match head_rows.last() {
        Some(&idx) => Some(idx),
        None => rows
            .first()
            .filter(|row| is_all_th_row(**row))
            .map(|_| 0),
    };
    let Some(header_idx) = header_idx else {
        return ParsedTable::default();
    };

    let headers = dedupe_headers(cell_texts(rows[header_idx]));
    let body = rows
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != header_idx && !head_rows.contains(idx))
        .map(|(_, row)| cell_texts(*row))
        .filter(|cells| !cells.is_empty())
        .collect();

    ParsedTable { headers, rows: body }
}

fn own_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .filter(|row| closest_table(*row).map(|t| t.id()) == Some(table.id()))
        .collect()
}

fn closest_table<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

fn in_thead(row: ElementRef, table: ElementRef) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|ancestor| ancestor.id() != table.id())
        .any(|ancestor| ancestor.value().name() == "thead")
}

fn cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
}

fn is_all_th_row(row: ElementRef) -> bool {
    let mut any = false;
    for cell in cells(row) {
        if cell.value().name() != "th" {
            return false;
        }
        any = true;
    }
    any
}

fn cell_texts(row: ElementRef) -> Vec<String> {
    cells(row).map(|cell| collapse_whitespace(cell.text())).collect()
}

/// Repeated header names get a ` (n)` suffix so every column keeps a unique key.
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        let mut candidate = name.clone();
        let mut n = 2;
        while headers.contains(&candidate) {
            candidate = format!("{name} ({n})");
            n += 1;
        }
        headers.push(candidate);
    }
    headers
}
