use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::parser::{RowCell, TableRow};

static ROWS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".list-board table tbody > tr").expect("valid row selector")
});
static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"));

/// Rows of the map stats board table, in page order.
pub fn extract_rows(html: &str) -> Vec<TableRow> {
    let doc = Html::parse_document(html);
    doc.select(&ROWS).map(row_from_element).collect()
}

fn row_from_element(row: ElementRef<'_>) -> TableRow {
    let cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .map(cell_from_element)
        .collect();
    TableRow::new(cells)
}

fn cell_from_element(cell: ElementRef<'_>) -> RowCell {
    let text = cell.text().collect::<String>().trim().to_string();
    let lines = LINE_BREAK
        .split(&cell.inner_html())
        .map(fragment_text)
        .filter(|line| !line.is_empty())
        .collect();
    RowCell {
        text,
        plain_text: text_without_emphasis(cell),
        lines,
    }
}

fn fragment_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

fn text_without_emphasis(cell: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in cell.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let emphasized = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != cell.id())
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().name() == "strong");
        if !emphasized {
            out.push_str(text);
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<div class="list-board"><table>
<thead><tr><th>맵</th><th>저그</th><th>프로토스</th><th>테란</th></tr></thead>
<tbody>
<tr><td> 투혼(95) </td><td><strong>52%</strong> 10승 9패</td><td>8승7패</td><td>20승0패</td></tr>
<tr><td></td><td>z-p 4승3패<br>z-t 6승6패</td><td>p-t 1승&nbsp;2패<br/></td><td>t-z 0승0패</td></tr>
<tr><td></td><td></td><td></td><td></td></tr>
</tbody>
</table></div>
<table><tbody><tr><td>unrelated(1)</td></tr></tbody></table>
</body></html>"#;

    #[test]
    fn selects_only_board_rows() {
        let rows = extract_rows(PAGE);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.cells.len() == 4));
    }

    #[test]
    fn header_cells_drop_emphasis() {
        let rows = extract_rows(PAGE);
        assert_eq!(rows[0].cells[0].text, "투혼(95)");
        assert_eq!(rows[0].cells[1].text, "52% 10승 9패");
        assert_eq!(rows[0].cells[1].plain_text, "10승 9패");
    }

    #[test]
    fn matchup_cells_split_on_line_breaks() {
        let rows = extract_rows(PAGE);
        assert_eq!(rows[1].cells[1].lines, vec!["z-p 4승3패", "z-t 6승6패"]);
        assert_eq!(rows[1].cells[2].lines, vec!["p-t 1승\u{a0}2패"]);
        assert!(rows[2].cells[1].lines.is_empty());
    }

    #[test]
    fn empty_document_has_no_rows() {
        assert!(extract_rows("").is_empty());
    }
}
