//! Feed parser: normalize a JSON or XML payload into per-date entries.
//!
//! JSON is the primary format. When the payload is not JSON at all the XML
//! reader gets a chance before the payload is rejected.

use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const UNIT_COLLECTION_KEYS: [&str; 4] = ["data", "types", "rooms", "units"];
const UNIT_ID_KEYS: [&str; 3] = ["type_id", "room_id", "id"];
const XML_UNIT_ELEMENTS: [&str; 3] = ["type", "room", "unit"];
const XML_ENTRY_ELEMENTS: [&str; 3] = ["date", "day", "entry"];
const XML_UNIT_ID_ELEMENTS: [&str; 2] = ["type_id", "room_id"];

/// One `(external unit, date, availability)` observation from the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Unit identifier as assigned by the feed (trimmed)
    pub external_unit_id: String,
    pub date: NaiveDate,
    pub available: bool,
}

/// Parse a raw feed payload.
pub fn parse(raw: &str) -> Result<Vec<FeedEntry>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(document) => parse_json(&document),
        Err(json_error) => parse_xml(raw).map_err(|xml_error| {
            Error::ParseFailed(format!(
                "payload is neither JSON ({json_error}) nor XML ({xml_error})"
            ))
        }),
    }
}

/// JSON availability flag: `true`, `1` and `"1"` mean available.
pub fn decode_availability(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number
            .as_i64()
            .map_or_else(|| number.as_f64() == Some(1.0), |n| n == 1),
        Value::String(text) => text.trim() == "1",
        _ => false,
    }
}

fn decode_xml_availability(text: &str) -> bool {
    let text = text.trim();
    text == "1" || text.eq_ignore_ascii_case("true")
}

fn parse_date(raw: &str, unit_id: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(error) => {
            tracing::warn!(unit = unit_id, date = raw, %error, "Skipping feed entry with invalid date");
            None
        }
    }
}

fn parse_json(document: &Value) -> Result<Vec<FeedEntry>> {
    let units: Vec<&Value> = match document {
        Value::Array(items) => items.iter().collect(),
        Value::Object(object) => {
            if let Some(items) = UNIT_COLLECTION_KEYS
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_array))
            {
                items.iter().collect()
            } else if object.contains_key("dates") {
                vec![document]
            } else {
                return Err(Error::ParseFailed(
                    "JSON object holds no unit list and is not a unit".to_string(),
                ));
            }
        }
        _ => {
            return Err(Error::ParseFailed(
                "JSON payload is not an array or object".to_string(),
            ))
        }
    };

    let mut entries = Vec::new();
    for (index, unit) in units.into_iter().enumerate() {
        let object = unit
            .as_object()
            .ok_or_else(|| Error::ParseFailed(format!("unit #{index} is not a JSON object")))?;
        parse_json_unit(object, index, &mut entries)?;
    }
    Ok(entries)
}

fn json_unit_id(object: &Map<String, Value>) -> Option<String> {
    UNIT_ID_KEYS.iter().find_map(|key| match object.get(*key) {
        Some(Value::String(text)) => Some(text.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn parse_json_unit(
    object: &Map<String, Value>,
    index: usize,
    entries: &mut Vec<FeedEntry>,
) -> Result<()> {
    let dates = object
        .get("dates")
        .ok_or_else(|| Error::ParseFailed(format!("unit #{index} has no dates")))?;

    let Some(unit_id) = json_unit_id(object).filter(|id| !id.is_empty()) else {
        tracing::warn!(unit_index = index, "Skipping feed unit without identifier");
        return Ok(());
    };

    match dates {
        Value::Array(items) => {
            for item in items {
                let Some(raw_date) = item.get("date").and_then(Value::as_str) else {
                    tracing::warn!(unit = %unit_id, "Skipping feed entry without date");
                    continue;
                };
                if let Some(date) = parse_date(raw_date, &unit_id) {
                    entries.push(FeedEntry {
                        external_unit_id: unit_id.clone(),
                        date,
                        available: item.get("available").is_some_and(decode_availability),
                    });
                }
            }
        }
        Value::Object(map) => {
            for (raw_date, flag) in map {
                if let Some(date) = parse_date(raw_date, &unit_id) {
                    entries.push(FeedEntry {
                        external_unit_id: unit_id.clone(),
                        date,
                        available: decode_availability(flag),
                    });
                }
            }
        }
        _ => {
            return Err(Error::ParseFailed(format!(
                "dates of unit '{unit_id}' are neither a list nor a map"
            )))
        }
    }
    Ok(())
}

#[derive(Default)]
struct XmlUnit {
    id: Option<String>,
    depth: usize,
    pending: Vec<(String, Option<String>)>,
}

#[derive(Default)]
struct XmlEntry {
    date: Option<String>,
    available: Option<String>,
    depth: usize,
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).to_ascii_lowercase()
}

fn attribute(element: &BytesStart<'_>, names: &[&str]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|error| Error::ParseFailed(error.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
        if names.contains(&key.as_str()) {
            let value = attr
                .unescape_value()
                .map_err(|error| Error::ParseFailed(error.to_string()))?;
            return Ok(Some(value.trim().to_string()));
        }
    }
    Ok(None)
}

fn flush_unit(unit: XmlUnit, entries: &mut Vec<FeedEntry>) {
    let Some(unit_id) = unit.id.filter(|id| !id.is_empty()) else {
        if !unit.pending.is_empty() {
            tracing::warn!("Skipping feed unit without identifier");
        }
        return;
    };

    for (raw_date, available) in unit.pending {
        if let Some(date) = parse_date(&raw_date, &unit_id) {
            entries.push(FeedEntry {
                external_unit_id: unit_id.clone(),
                date,
                available: available.as_deref().is_some_and(decode_xml_availability),
            });
        }
    }
}

fn finish_entry(entry: XmlEntry, unit: &mut XmlUnit) {
    match entry.date {
        Some(date) => unit.pending.push((date, entry.available)),
        None => tracing::warn!("Skipping feed entry without date"),
    }
}

fn parse_xml(raw: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut unit: Option<XmlUnit> = None;
    let mut entry: Option<XmlEntry> = None;
    let mut units_seen = 0_usize;
    let mut entries = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|error| Error::ParseFailed(format!("invalid XML: {error}")))?;

        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(element) | Event::Empty(element) => {
                let name = local_name(&element);
                stack.push(name.clone());
                let depth = stack.len();

                if unit.is_none() && XML_UNIT_ELEMENTS.contains(&name.as_str()) {
                    units_seen += 1;
                    unit = Some(XmlUnit {
                        id: attribute(&element, &UNIT_ID_KEYS)?,
                        depth,
                        pending: Vec::new(),
                    });
                } else if unit.is_some()
                    && entry.is_none()
                    && XML_ENTRY_ELEMENTS.contains(&name.as_str())
                {
                    entry = Some(XmlEntry {
                        date: attribute(&element, &["date"])?,
                        available: attribute(&element, &["available"])?,
                        depth,
                    });
                }

                if is_empty {
                    close_element(&mut stack, &mut unit, &mut entry, &mut entries);
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|error| Error::ParseFailed(error.to_string()))?;
                let field = stack.last().map(String::as_str);
                match (entry.as_mut(), unit.as_mut(), field) {
                    (Some(current), _, Some("date")) => {
                        current.date = Some(text.trim().to_string());
                    }
                    (Some(current), _, Some("available")) => {
                        current.available = Some(text.trim().to_string());
                    }
                    (None, Some(current), Some(name)) if XML_UNIT_ID_ELEMENTS.contains(&name) => {
                        current.id = Some(text.trim().to_string());
                    }
                    _ => {}
                }
            }
            Event::End(_) => close_element(&mut stack, &mut unit, &mut entry, &mut entries),
            Event::Eof => break,
            _ => {}
        }
    }

    if units_seen == 0 {
        return Err(Error::ParseFailed(
            "XML payload contains no unit elements".to_string(),
        ));
    }
    Ok(entries)
}

fn close_element(
    stack: &mut Vec<String>,
    unit: &mut Option<XmlUnit>,
    entry: &mut Option<XmlEntry>,
    entries: &mut Vec<FeedEntry>,
) {
    let depth = stack.len();
    if entry.as_ref().is_some_and(|e| e.depth == depth) {
        if let (Some(finished), Some(current)) = (entry.take(), unit.as_mut()) {
            finish_entry(finished, current);
        }
    } else if unit.as_ref().is_some_and(|u| u.depth == depth) {
        if let Some(finished) = unit.take() {
            flush_unit(finished, entries);
        }
    }
    stack.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    fn entry(unit: &str, date: &str, available: bool) -> FeedEntry {
        FeedEntry {
            external_unit_id: unit.to_string(),
            date: day(date),
            available,
        }
    }

    #[test]
    fn parses_single_unit_object() {
        let entries =
            parse(r#"{"type_id":"5","dates":[{"date":"2026-03-01","available":"0"}]}"#).unwrap();
        assert_eq!(entries, vec![entry("5", "2026-03-01", false)]);
    }

    #[test]
    fn availability_accepts_bool_number_and_string() {
        assert!(decode_availability(&json!(true)));
        assert!(decode_availability(&json!(1)));
        assert!(decode_availability(&json!("1")));
        assert!(!decode_availability(&json!(false)));
        assert!(!decode_availability(&json!(0)));
        assert!(!decode_availability(&json!("0")));
        assert!(!decode_availability(&json!("true")));
        assert!(!decode_availability(&json!(null)));
    }

    #[test]
    fn parses_wrapped_list_with_date_map_and_numeric_ids() {
        let payload = r#"{
            "rooms": [
                {"room_id": 7, "dates": {"2026-03-01": 1, "2026-03-02": 0}},
                {"id": " 8 ", "dates": [{"date": "2026-03-01", "available": true}]}
            ]
        }"#;
        let entries = parse(payload).unwrap();
        assert_eq!(
            entries,
            vec![
                entry("7", "2026-03-01", true),
                entry("7", "2026-03-02", false),
                entry("8", "2026-03-01", true),
            ]
        );
    }

    #[test]
    fn skips_invalid_dates_and_blank_ids() {
        let payload = r#"[
            {"type_id": "5", "dates": [{"date": "2026-02-30", "available": 0}, {"date": "2026-03-01", "available": 0}]},
            {"type_id": "  ", "dates": [{"date": "2026-03-01", "available": 0}]}
        ]"#;
        assert_eq!(parse(payload).unwrap(), vec![entry("5", "2026-03-01", false)]);
    }

    #[test]
    fn rejects_json_of_unknown_shape() {
        assert!(matches!(parse(r#"{"status":"ok"}"#), Err(Error::ParseFailed(_))));
        assert!(matches!(parse("42"), Err(Error::ParseFailed(_))));
        assert!(matches!(parse("[1, 2]"), Err(Error::ParseFailed(_))));
    }

    #[test]
    fn parses_xml_attribute_form() {
        let payload = r#"<?xml version="1.0"?>
            <rooms>
                <type type_id="5">
                    <date date="2026-03-01" available="0"/>
                    <date date="2026-03-02" available="true"/>
                </type>
            </rooms>"#;
        assert_eq!(
            parse(payload).unwrap(),
            vec![entry("5", "2026-03-01", false), entry("5", "2026-03-02", true)]
        );
    }

    #[test]
    fn parses_xml_child_form() {
        let payload = r"<rooms>
                <room>
                    <room_id>12</room_id>
                    <day><date>2026-03-01</date><available>1</available></day>
                    <day><date>2026-03-02</date><available>0</available></day>
                </room>
            </rooms>";
        assert_eq!(
            parse(payload).unwrap(),
            vec![entry("12", "2026-03-01", true), entry("12", "2026-03-02", false)]
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse("not a feed"), Err(Error::ParseFailed(_))));
        assert!(matches!(parse("<html><body/></html>"), Err(Error::ParseFailed(_))));
        assert!(matches!(parse(""), Err(Error::ParseFailed(_))));
    }
}
