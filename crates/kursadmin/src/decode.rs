//! Decoders from raw store snapshots into typed records.
//!
//! Snapshots arrive as untyped JSON trees. Each decoder checks the shape it
//! needs and fails with [`Error::Decode`] naming the offending path, instead
//! of letting missing fields through as defaults.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{CandidateCounterSet, ClassCode, LicenseFeeTable, School, SchoolRecord, SchoolSummary};

fn as_object<'a>(path: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::decode(path, format!("expected an object, found {}", kind(value))))
}

fn string_field(path: &str, object: &Map<String, Value>, field: &str) -> Result<String> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::decode(
            format!("{path}/{field}"),
            format!("expected a string, found {}", kind(other)),
        )),
        None => Err(Error::decode(path, format!("missing field '{field}'"))),
    }
}

fn class_code(path: &str, key: &str) -> Result<ClassCode> {
    ClassCode::from_wire(key)
        .ok_or_else(|| Error::decode(path, format!("unknown class code '{key}'")))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode the `schools` collection into selection rows, keyed by id.
///
/// Each school is decoded on its own: malformed entries are returned in the
/// second element and left out of the rows, so one bad record does not hide
/// the others. Only `name` and `email` are required here; counters are
/// checked by [`decode_schools`].
///
/// # Errors
///
/// Returns a decode error if the collection itself is not an object.
pub fn decode_school_summaries(
    value: &Value,
) -> Result<(BTreeMap<String, SchoolSummary>, Vec<Error>)> {
    let schools = as_object("schools", value)?;
    let mut summaries = BTreeMap::new();
    let mut rejected = Vec::new();
    for (id, school) in schools {
        match decode_school_summary(id, school) {
            Ok(summary) => {
                summaries.insert(id.clone(), summary);
            }
            Err(err) => rejected.push(err),
        }
    }
    Ok((summaries, rejected))
}

/// Decode the selection row of the school stored at `schools/{id}`.
///
/// # Errors
///
/// Returns a decode error if the record lacks a string `name` or `email`.
pub fn decode_school_summary(id: &str, value: &Value) -> Result<SchoolSummary> {
    let path = format!("schools/{id}");
    let object = as_object(&path, value)?;
    Ok(SchoolSummary {
        id: id.to_string(),
        name: string_field(&path, object, "name")?,
        email: string_field(&path, object, "email")?,
    })
}

/// Decode the `schools` collection strictly, counters included.
///
/// # Errors
///
/// Returns a decode error if any school is missing a field or any counter
/// set does not hold exactly the eight class codes.
pub fn decode_schools(value: &Value) -> Result<Vec<School>> {
    let schools = as_object("schools", value)?;
    schools
        .iter()
        .map(|(id, school)| decode_school(id, school))
        .collect()
}

/// Decode a single school stored at `schools/{id}`.
///
/// # Errors
///
/// Returns a decode error if the record is malformed.
pub fn decode_school(id: &str, value: &Value) -> Result<School> {
    let path = format!("schools/{id}");
    let object = as_object(&path, value)?;
    let candidates = object
        .get("candidates")
        .ok_or_else(|| Error::decode(&path, "missing field 'candidates'"))?;
    Ok(School {
        id: id.to_string(),
        record: SchoolRecord {
            name: string_field(&path, object, "name")?,
            email: string_field(&path, object, "email")?,
            candidates: decode_candidates(&format!("{path}/candidates"), candidates)?,
        },
    })
}

/// Decode a candidate counter set.
///
/// # Errors
///
/// Returns a decode error on unknown or missing class codes, or counts that
/// are not non-negative integers.
pub fn decode_candidates(path: &str, value: &Value) -> Result<CandidateCounterSet> {
    let object = as_object(path, value)?;
    let mut counts = BTreeMap::new();
    for (key, count) in object {
        let code = class_code(path, key)?;
        let count = count
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                Error::decode(
                    format!("{path}/{key}"),
                    format!("expected a non-negative count, found {count}"),
                )
            })?;
        counts.insert(code, count);
    }
    CandidateCounterSet::from_counts(counts).map_err(|err| match err {
        Error::Decode { message, .. } => Error::decode(path, message),
        other => other,
    })
}

/// Decode the `licenseFees` table.
///
/// # Errors
///
/// Returns a decode error on unknown class codes or fees that are not
/// finite, non-negative numbers.
pub fn decode_fee_table(value: &Value) -> Result<LicenseFeeTable> {
    const PATH: &str = "licenseFees";
    let object = as_object(PATH, value)?;
    let mut table = LicenseFeeTable::new();
    for (key, fee) in object {
        let code = class_code(PATH, key)?;
        let amount = fee.as_f64().ok_or_else(|| {
            Error::decode(
                format!("{PATH}/{key}"),
                format!("expected a number, found {}", kind(fee)),
            )
        })?;
        table
            .set(code, amount)
            .map_err(|err| Error::decode(format!("{PATH}/{key}"), err.to_string()))?;
    }
    Ok(table)
}
