//! Delimited historical spend/revenue text.
//!
//! Accepts comma, semicolon or tab separated rows with an optional header. Rows that cannot
//! yield a positive spend plus revenue or ROAS are skipped individually.

use roas_core::HistoricalDataPoint;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Field separator found in the first data row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
        }
    }

    /// Separator used by `line`: tab if present, then semicolon, then comma.
    ///
    /// Commas rank last because they double as decimal separators in semicolon files.
    /// Characters inside double quotes are ignored.
    pub fn detect(line: &str) -> Self {
        let mut quoted = false;
        let mut seen = (false, false);
        for ch in line.chars() {
            match ch {
                '"' => quoted = !quoted,
                '\t' if !quoted => return Delimiter::Tab,
                ';' if !quoted => seen.0 = true,
                ',' if !quoted => seen.1 = true,
                _ => {}
            }
        }
        if seen.0 {
            Delimiter::Semicolon
        } else {
            Delimiter::Comma
        }
    }
}

/// A row the parser dropped, with a 1-based line number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

/// Result of parsing a block of history text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedHistory {
    pub points: Vec<HistoricalDataPoint>,
    pub delimiter: Delimiter,
    pub header: bool,
    pub skipped: Vec<SkippedRow>,
}

const DATE_TOKENS: &[&str] = &[
    "date", "datum", "month", "månad", "period", "week", "vecka", "day", "dag",
];
const SPEND_TOKENS: &[&str] = &["spend", "cost", "kostnad", "budget", "investering"];
const REVENUE_TOKENS: &[&str] = &[
    "revenue", "sales", "income", "intäkt", "omsättning", "försäljning",
];
const ROAS_TOKENS: &[&str] = &["roas"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Column {
    Date,
    Spend,
    Revenue,
    Roas,
}

fn classify_header(field: &str) -> Option<Column> {
    let f = field.to_lowercase();
    let has = |tokens: &[&str]| tokens.iter().any(|t| f.contains(t));
    if has(ROAS_TOKENS) {
        Some(Column::Roas)
    } else if has(REVENUE_TOKENS) {
        Some(Column::Revenue)
    } else if has(SPEND_TOKENS) {
        Some(Column::Spend)
    } else if has(DATE_TOKENS) {
        Some(Column::Date)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct HeaderMap {
    date: Option<usize>,
    spend: Option<usize>,
    revenue: Option<usize>,
    roas: Option<usize>,
}

impl HeaderMap {
    fn from_fields(fields: &[String]) -> Self {
        let mut map = HeaderMap::default();
        for (i, f) in fields.iter().enumerate() {
            let slot = match classify_header(f) {
                Some(Column::Date) => &mut map.date,
                Some(Column::Spend) => &mut map.spend,
                Some(Column::Revenue) => &mut map.revenue,
                Some(Column::Roas) => &mut map.roas,
                None => continue,
            };
            if slot.is_none() {
                *slot = Some(i);
            }
        }
        map
    }

    fn is_usable(&self) -> bool {
        self.spend.is_some() && (self.revenue.is_some() || self.roas.is_some())
    }
}

/// Split one line on `delim`, honouring double quotes.
fn split_fields(line: &str, delim: Delimiter) -> Vec<String> {
    let sep = delim.as_char();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in line.chars() {
        match ch {
            '"' => quoted = !quoted,
            c if c == sep && !quoted => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    while fields.last().is_some_and(|f| f.trim().is_empty()) && fields.len() > 1 {
        fields.pop();
    }
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

/// Parse a number written with either decimal separator and optional grouping or currency text.
pub fn parse_number(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let last_dot = kept.rfind('.');
    let last_comma = kept.rfind(',');
    let normalized = match (last_dot, last_comma) {
        // both present: the later one is the decimal separator
        (Some(d), Some(c)) if c > d => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        (None, Some(_)) if kept.matches(',').count() == 1 => kept.replace(',', "."),
        (None, Some(_)) => kept.replace(',', ""),
        (Some(_), None) if kept.matches('.').count() > 1 => kept.replace('.', ""),
        _ => kept,
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn looks_like_header(fields: &[String]) -> bool {
    let named = fields.iter().any(|f| classify_header(f).is_some());
    let numeric = fields.iter().filter(|f| parse_number(f).is_some()).count();
    named && numeric < 2
}

/// Fields of one data row, before spend/revenue/ROAS are reconciled.
struct RawRow {
    date: Option<String>,
    spend: Option<f64>,
    revenue: Option<f64>,
    roas: Option<f64>,
}

fn field(fields: &[String], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| fields.get(i)).map(String::as_str)
}

fn read_named(fields: &[String], map: &HeaderMap) -> RawRow {
    RawRow {
        date: field(fields, map.date).map(str::to_string),
        spend: field(fields, map.spend).and_then(parse_number),
        revenue: field(fields, map.revenue).and_then(parse_number),
        roas: field(fields, map.roas).and_then(parse_number),
    }
}

fn read_positional(fields: &[String], revenue_header: bool) -> Option<RawRow> {
    // A lone third value is revenue when a revenue header was seen or it is too large for a ROAS.
    let revenue_or_roas = |raw: &str| {
        let v = parse_number(raw);
        match v {
            Some(x) if revenue_header || x > 100.0 => (Some(x), None),
            other => (None, other),
        }
    };
    match fields.len() {
        2 => {
            let (revenue, roas) = revenue_or_roas(&fields[1]);
            Some(RawRow {
                date: None,
                spend: parse_number(&fields[0]),
                revenue,
                roas,
            })
        }
        3 => {
            let (revenue, roas) = revenue_or_roas(&fields[2]);
            Some(RawRow {
                date: Some(fields[0].clone()),
                spend: parse_number(&fields[1]),
                revenue,
                roas,
            })
        }
        n if n >= 4 => Some(RawRow {
            date: Some(fields[0].clone()),
            spend: parse_number(&fields[1]),
            revenue: parse_number(&fields[2]),
            roas: parse_number(&fields[3]),
        }),
        _ => None,
    }
}

fn reconcile(row: RawRow, line: usize) -> Result<HistoricalDataPoint, String> {
    let spend = match row.spend {
        Some(s) if s > 0.0 => s,
        Some(s) => return Err(format!("spend must be positive (got {s})")),
        None => return Err("spend is missing or not a number".to_string()),
    };
    let date = row
        .date
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("row {line}"));
    match (row.revenue, row.roas) {
        (Some(revenue), Some(roas)) => Ok(HistoricalDataPoint {
            date,
            spend,
            revenue,
            roas,
        }),
        (Some(revenue), None) => Ok(HistoricalDataPoint::from_revenue(date, spend, revenue)),
        (None, Some(roas)) => Ok(HistoricalDataPoint::from_roas(date, spend, roas)),
        (None, None) => Err("neither revenue nor ROAS could be read".to_string()),
    }
}

/// Parse free-form history text into data points.
pub fn parse_history(text: &str) -> ParsedHistory {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();

    // Detect on the first row that is not a header.
    let first_is_header = lines.first().is_some_and(|(_, l)| {
        let d = Delimiter::detect(l);
        looks_like_header(&split_fields(l, d))
    });
    let sample = if first_is_header { lines.get(1) } else { lines.first() };
    let delimiter = sample
        .or(lines.first())
        .map(|(_, l)| Delimiter::detect(l))
        .unwrap_or(Delimiter::Comma);

    let mut header_map = None;
    let mut revenue_header = false;
    let mut points = Vec::new();
    let mut skipped = Vec::new();

    for (idx, (line_no, line)) in lines.iter().enumerate() {
        let fields = split_fields(line, delimiter);
        if idx == 0 && first_is_header {
            let map = HeaderMap::from_fields(&fields);
            revenue_header = map.revenue.is_some();
            header_map = map.is_usable().then_some(map);
            continue;
        }
        let raw = match &header_map {
            Some(map) => Some(read_named(&fields, map)),
            None => read_positional(&fields, revenue_header),
        };
        let outcome = match raw {
            Some(row) => reconcile(row, *line_no),
            None => Err(format!("expected 2 to 4 fields, found {}", fields.len())),
        };
        match outcome {
            Ok(p) => points.push(p),
            Err(reason) => {
                warn!(line = *line_no, %reason, "skipping history row");
                skipped.push(SkippedRow {
                    line: *line_no,
                    reason,
                });
            }
        }
    }

    debug!(
        points = points.len(),
        skipped = skipped.len(),
        ?delimiter,
        "parsed history"
    );
    ParsedHistory {
        points,
        delimiter,
        header: first_is_header,
        skipped,
    }
}

/// Render points as delimited text with a header row.
pub fn to_delimited(points: &[HistoricalDataPoint], delimiter: Delimiter) -> String {
    let sep = delimiter.as_char();
    let mut out = format!("date{sep}spend{sep}revenue{sep}roas\n");
    for p in points {
        out.push_str(&format!(
            "{}{sep}{:.2}{sep}{:.2}{sep}{:.4}\n",
            p.date, p.spend, p.revenue, p.roas
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_delimiters() {
        assert_eq!(Delimiter::detect("a,b,c"), Delimiter::Comma);
        assert_eq!(Delimiter::detect("2024-01;1000,5;4000"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("2024-01\t1000\t4000"), Delimiter::Tab);
        assert_eq!(Delimiter::detect("single"), Delimiter::Comma);
        // commas outnumber the semicolon here
        assert_eq!(Delimiter::detect("1000,50;4002,50"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("1,5\t2,5,0"), Delimiter::Tab);
        assert_eq!(Delimiter::detect("2024-01,\"a;b\",3"), Delimiter::Comma);
    }

    #[test]
    fn two_column_semicolon_with_decimal_commas() {
        let parsed = parse_history("1000,50;4002,50\n2000,25;7000,75\n");
        assert_eq!(parsed.delimiter, Delimiter::Semicolon);
        assert!(!parsed.header);
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.points[0].spend, 1000.5);
        assert_eq!(parsed.points[0].revenue, 4002.5);
        assert_eq!(parsed.points[1].spend, 2000.25);
        assert_eq!(parsed.points[1].revenue, 7000.75);
    }

    #[test]
    fn headed_two_column_semicolon_with_decimal_commas() {
        let parsed = parse_history("Kostnad;Omsättning\n1000,50;4002,50\n2000,25;7000,75\n");
        assert_eq!(parsed.delimiter, Delimiter::Semicolon);
        assert!(parsed.header);
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.points[0].spend, 1000.5);
        assert_eq!(parsed.points[0].revenue, 4002.5);
        assert_eq!(parsed.points[1].revenue, 7000.75);
    }

    #[test]
    fn tab_rows_with_decimal_commas() {
        let parsed = parse_history("2024-01\t1000,50\t4,5\n2024-02\t2000,00\t3,25\n");
        assert_eq!(parsed.delimiter, Delimiter::Tab);
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.points[0].spend, 1000.5);
        assert_eq!(parsed.points[0].roas, 4.5);
        assert_eq!(parsed.points[1].roas, 3.25);
    }

    #[test]
    fn numbers_with_regional_formats() {
        assert_eq!(parse_number("1000,5"), Some(1000.5));
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_number("1 500 kr"), Some(1500.0));
        assert_eq!(parse_number("$2,500,000"), Some(2_500_000.0));
        assert_eq!(parse_number("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn three_columns_with_revenue_header() {
        let text = "Date;Spend;Revenue\n2024-01;1000;40\n2024-02;2000;70\n";
        let parsed = parse_history(text);
        assert!(parsed.header);
        assert_eq!(parsed.delimiter, Delimiter::Semicolon);
        assert_eq!(parsed.points.len(), 2);
        // header says revenue, so 40 is revenue even though it is small
        assert_eq!(parsed.points[0].revenue, 40.0);
        assert_eq!(parsed.points[0].roas, 0.04);
    }

    #[test]
    fn three_columns_without_header_use_magnitude() {
        let text = "2024-01,1000,4.5\n2024-02,2000,8000\n";
        let parsed = parse_history(text);
        assert!(!parsed.header);
        assert_eq!(parsed.points[0].roas, 4.5);
        assert_eq!(parsed.points[0].revenue, 4500.0);
        assert_eq!(parsed.points[1].revenue, 8000.0);
        assert_eq!(parsed.points[1].roas, 4.0);
    }

    #[test]
    fn decimal_commas_in_semicolon_rows() {
        let text = "datum;kostnad;omsättning\n2024-01;1000,50;4002,00\n";
        let parsed = parse_history(text);
        assert_eq!(parsed.points.len(), 1);
        assert_eq!(parsed.points[0].spend, 1000.5);
        assert_eq!(parsed.points[0].revenue, 4002.0);
    }

    #[test]
    fn named_columns_in_any_order() {
        let text = "roas\tmonth\tad spend\nxx\tjan\t1000\n3.5\tfeb\t2000\n";
        let parsed = parse_history(text);
        assert_eq!(parsed.delimiter, Delimiter::Tab);
        assert_eq!(parsed.points.len(), 1);
        assert_eq!(parsed.points[0].date, "feb");
        assert_eq!(parsed.points[0].revenue, 7000.0);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 2);
    }

    #[test]
    fn two_columns_and_four_columns() {
        let parsed = parse_history("1000,4000\n500,3\n");
        assert_eq!(parsed.points[0].revenue, 4000.0);
        assert_eq!(parsed.points[1].roas, 3.0);
        assert_eq!(parsed.points[1].date, "row 2");

        let parsed = parse_history("2024-01;1000;;4\n2024-02;1000;3000;\n");
        assert_eq!(parsed.points.len(), 2);
        assert_eq!(parsed.points[0].revenue, 4000.0);
        assert_eq!(parsed.points[1].roas, 3.0);
    }

    #[test]
    fn bad_rows_are_dropped_not_fatal() {
        let text = "date,spend,revenue\n\
                    2024-01,0,5000\n\
                    2024-02,abc,5000\n\
                    2024-03,1000,\n\
                    2024-04,1000,5000\n";
        let parsed = parse_history(text);
        assert_eq!(parsed.points.len(), 1);
        assert_eq!(parsed.skipped.len(), 3);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let parsed = parse_history("2024-01,\"1,000.50\",\"4,000.00\"\n");
        assert_eq!(parsed.points.len(), 1);
        assert_eq!(parsed.points[0].spend, 1000.5);
        assert_eq!(parsed.points[0].revenue, 4000.0);
    }

    #[test]
    fn rendered_text_parses_back() {
        let pts = vec![
            HistoricalDataPoint::from_revenue("2024-01", 1000.0, 4000.0),
            HistoricalDataPoint::from_revenue("2024-02", 2500.0, 8000.0),
        ];
        let parsed = parse_history(&to_delimited(&pts, Delimiter::Tab));
        assert!(parsed.header);
        assert_eq!(parsed.points, pts);
    }

    #[test]
    fn empty_input() {
        let parsed = parse_history("\n\n");
        assert!(parsed.points.is_empty());
        assert!(!parsed.header);
    }
}
