//! Label generation from tabular text.
//!
//! Input is CSV, one record per line, whose first line is a header. Each data
//! row carries at least `code, latitude, longitude, name`; extra columns are
//! ignored. Every line is parsed on its own, so a malformed row (unusable
//! coordinates, unbalanced quotes, a reserved code) is dropped individually
//! and never fails the batch.

use foundation::Cartographic;
use serde::Serialize;
use serde_json::json;
use streaming::{DOCUMENT_PACKET_ID, Packet};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Origin {
    Center,
}

/// Opacity that falls off with camera distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TranslucencyByDistance {
    pub near_m: f64,
    pub near_opacity: f64,
    pub far_m: f64,
    pub far_opacity: f64,
}

impl TranslucencyByDistance {
    pub fn to_packet_value(&self) -> serde_json::Value {
        json!({
            "nearFarScalar": [self.near_m, self.near_opacity, self.far_m, self.far_opacity]
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size_px: f32,
    pub font_family: String,
    pub horizontal_origin: Origin,
    pub vertical_origin: Origin,
    pub translucency: TranslucencyByDistance,
}

impl LabelStyle {
    pub fn font(&self) -> String {
        format!("{}px {}", self.font_size_px, self.font_family)
    }
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size_px: 14.0,
            font_family: "sans-serif".to_string(),
            horizontal_origin: Origin::Center,
            vertical_origin: Origin::Center,
            translucency: TranslucencyByDistance {
                near_m: 1.5e6,
                near_opacity: 1.0,
                far_m: 8.0e6,
                far_opacity: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    pub id: String,
    pub position: Cartographic,
    pub text: String,
    pub style: LabelStyle,
}

impl LabelRecord {
    pub fn to_packet(&self) -> Packet {
        Packet::new(self.id.clone())
            .with_name(self.text.clone())
            .with_property("position", self.position.to_packet_value())
            .with_property(
                "label",
                json!({
                    "text": self.text,
                    "font": self.style.font(),
                    "horizontalOrigin": self.style.horizontal_origin,
                    "verticalOrigin": self.style.vertical_origin,
                    "translucencyByDistance": self.style.translucency.to_packet_value(),
                }),
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RowSkip {
    UnbalancedQuotes,
    Unreadable(String),
    TooFewColumns(usize),
    ReservedCode(String),
    MissingCoordinate,
    InvalidCoordinate(String),
}

impl std::fmt::Display for RowSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSkip::UnbalancedQuotes => write!(f, "quote opened but never closed"),
            RowSkip::Unreadable(err) => write!(f, "unreadable row: {err}"),
            RowSkip::TooFewColumns(n) => write!(f, "expected at least 4 columns, got {n}"),
            RowSkip::ReservedCode(code) => write!(f, "code {code:?} is reserved"),
            RowSkip::MissingCoordinate => write!(f, "latitude or longitude is empty"),
            RowSkip::InvalidCoordinate(raw) => write!(f, "coordinate {raw:?} is not a number"),
        }
    }
}

/// Turns rows of `code, latitude, longitude, name` into label records.
///
/// Pure: the same input always yields the same records.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LabelGenerator {
    pub style: LabelStyle,
}

impl LabelGenerator {
    pub fn generate(&self, table: &str) -> Vec<LabelRecord> {
        self.generate_rows(table.lines())
    }

    /// Same as [`LabelGenerator::generate`] for input already split into
    /// rows. The first row is the header and is skipped by position, even
    /// when empty.
    pub fn generate_rows<I, S>(&self, rows: I) -> Vec<LabelRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Vec::new();
        for (i, row) in rows.into_iter().enumerate().skip(1) {
            // 1-based line number.
            let line = i + 1;
            match parse_row(row.as_ref()).and_then(|record| self.label_for_row(&record)) {
                Ok(label) => out.push(label),
                Err(reason) => debug!("skipping label row {line}: {reason}"),
            }
        }
        out
    }

    fn label_for_row(&self, record: &csv::StringRecord) -> Result<LabelRecord, RowSkip> {
        if record.len() < 4 {
            return Err(RowSkip::TooFewColumns(record.len()));
        }
        let code = &record[0];
        if code.is_empty() || code == DOCUMENT_PACKET_ID {
            return Err(RowSkip::ReservedCode(code.to_string()));
        }
        let lat_raw = &record[1];
        let lon_raw = &record[2];
        if lat_raw.is_empty() || lon_raw.is_empty() {
            return Err(RowSkip::MissingCoordinate);
        }
        let lat = parse_degrees(lat_raw)?;
        let lon = parse_degrees(lon_raw)?;
        let name = record[3].replace('"', "");

        Ok(LabelRecord {
            id: code.to_string(),
            position: Cartographic::on_surface(lon, lat),
            text: format!("{name} ({code})"),
            style: self.style.clone(),
        })
    }
}

/// Parses one line as a single CSV record.
fn parse_row(row: &str) -> Result<csv::StringRecord, RowSkip> {
    // Escaped quotes come in pairs, so an odd count means an open quote.
    if row.matches('"').count() % 2 != 0 {
        return Err(RowSkip::UnbalancedQuotes);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(row.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(err)) => Err(RowSkip::Unreadable(err.to_string())),
        None => Err(RowSkip::TooFewColumns(0)),
    }
}

fn parse_degrees(raw: &str) -> Result<f64, RowSkip> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RowSkip::InvalidCoordinate(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "code,latitude,longitude,name";

    #[test]
    fn generates_record_from_row() {
        let labels = LabelGenerator::default()
            .generate_rows([HEADER, r#"US,38.9,-77.0,"United States""#]);

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].id, "US");
        assert_eq!(labels[0].position.to_degrees_array(), [-77.0, 38.9, 0.0]);
        assert_eq!(labels[0].text, "United States (US)");
        assert_eq!(labels[0].style, LabelStyle::default());
    }

    #[test]
    fn skips_rows_without_coordinates() {
        let labels = LabelGenerator::default().generate_rows([HEADER, r#"XX,,,"Nowhere""#]);
        assert!(labels.is_empty());
    }

    #[test]
    fn bad_rows_do_not_fail_the_batch() {
        let table = [
            HEADER,
            "AA,1.0,2.0,Alpha",
            "BB,north,2.0,Bravo",
            "CC,3.0",
            "DD,inf,4.0,Delta",
            "EE,5.0,6.0,Echo,extra,columns",
        ];
        let ids: Vec<String> = LabelGenerator::default()
            .generate_rows(table)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["AA", "EE"]);
    }

    #[test]
    fn header_is_always_skipped() {
        let labels = LabelGenerator::default().generate("US,38.9,-77.0,United States\n");
        assert!(labels.is_empty());
        assert!(LabelGenerator::default().generate("").is_empty());
    }

    #[test]
    fn quoted_names_keep_commas_and_lose_quotes() {
        let labels = LabelGenerator::default().generate_rows([
            HEADER,
            r#"KR,37.5,127.0,"Korea, Republic of""#,
            r#"CI,7.5,-5.5,"Cote d""Ivoire""#,
        ]);
        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Korea, Republic of (KR)", "Cote dIvoire (CI)"]);
    }

    #[test]
    fn unclosed_quote_drops_only_its_row() {
        let labels = LabelGenerator::default().generate_rows([
            HEADER,
            "AA,1.0,2.0,\"Alpha",
            "BB,3.0,4.0,Bravo",
            "CC,5.0,6.0,Charlie",
        ]);
        let ids: Vec<&str> = labels.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["BB", "CC"]);
        assert!(labels.iter().all(|l| !l.text.contains('\n')));

        let table = format!("{HEADER}\nAA,1.0,2.0,\"Alpha\nBB,3.0,4.0,Bravo\n");
        let ids: Vec<String> = LabelGenerator::default()
            .generate(&table)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["BB"]);
    }

    #[test]
    fn empty_first_row_is_still_the_header() {
        let labels = LabelGenerator::default().generate_rows([
            "",
            "US,38.9,-77.0,United States",
            "FR,46.2,2.2,France",
        ]);
        let ids: Vec<&str> = labels.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["US", "FR"]);
    }

    #[test]
    fn blank_rows_between_data_are_skipped() {
        let table = format!("{HEADER}\nUS,38.9,-77.0,United States\n\nFR,46.2,2.2,France\n");
        let ids: Vec<String> = LabelGenerator::default()
            .generate(&table)
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["US", "FR"]);
    }

    #[test]
    fn reserved_and_empty_codes_are_skipped() {
        let labels = LabelGenerator::default().generate_rows([
            HEADER,
            "document,1.0,2.0,Doc",
            ",1.0,2.0,Anonymous",
            "US,38.9,-77.0,United States",
        ]);
        let ids: Vec<&str> = labels.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["US"]);
    }

    #[test]
    fn generation_is_idempotent() {
        let table = format!("{HEADER}\nUS,38.9,-77.0,United States\nFR,46.2,2.2,France\n");
        let generator = LabelGenerator::default();
        assert_eq!(generator.generate(&table), generator.generate(&table));
    }

    #[test]
    fn packet_carries_position_and_label_style() {
        let label = LabelGenerator::default()
            .generate_rows([HEADER, "US,38.9,-77.0,United States"])
            .remove(0);
        let packet = serde_json::to_value(label.to_packet()).unwrap();
        assert_eq!(
            packet,
            json!({
                "id": "US",
                "name": "United States (US)",
                "position": {"cartographicDegrees": [-77.0, 38.9, 0.0]},
                "label": {
                    "text": "United States (US)",
                    "font": "14px sans-serif",
                    "horizontalOrigin": "CENTER",
                    "verticalOrigin": "CENTER",
                    "translucencyByDistance": {"nearFarScalar": [1.5e6, 1.0, 8.0e6, 0.0]}
                }
            })
        );
    }
}
