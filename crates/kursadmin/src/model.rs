//! Core record types for kursadmin.
//!
//! These are the typed views of what the store holds: schools with their
//! candidate counters, announcements and the license fee table. The store
//! owns the data; the panel only keeps transient copies of it.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A license or difference class.
///
/// The same eight codes key both the per-school candidate counters and the
/// global fee table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassCode {
    /// Passenger car license.
    #[serde(rename = "B")]
    B,
    /// Light motorcycle license.
    #[serde(rename = "A1")]
    A1,
    /// Medium motorcycle license.
    #[serde(rename = "A2")]
    A2,
    /// Truck license.
    #[serde(rename = "C")]
    C,
    /// Bus license.
    #[serde(rename = "D")]
    D,
    /// Difference course towards A1.
    #[serde(rename = "FARK_A1")]
    FarkA1,
    /// Difference course towards A2.
    #[serde(rename = "FARK_A2")]
    FarkA2,
    /// Ministry-run A1 course.
    #[serde(rename = "BAKANLIK_A1")]
    BakanlikA1,
}

impl ClassCode {
    /// Every class code, in display order.
    pub const ALL: [ClassCode; 8] = [
        Self::B,
        Self::A1,
        Self::A2,
        Self::C,
        Self::D,
        Self::FarkA1,
        Self::FarkA2,
        Self::BakanlikA1,
    ];

    /// The wire name used as a key in the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::C => "C",
            Self::D => "D",
            Self::FarkA1 => "FARK_A1",
            Self::FarkA2 => "FARK_A2",
            Self::BakanlikA1 => "BAKANLIK_A1",
        }
    }

    /// Look up a class code by its exact wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == name)
    }
}

impl std::fmt::Display for ClassCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassCode {
    type Err = Error;

    /// Case-insensitive parse, for operator input.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Self::from_wire(&upper)
            .ok_or_else(|| Error::validation("class_code", format!("unknown class code: {s}")))
    }
}

/// Per-school count of registered candidates for each class code.
///
/// Always holds exactly the eight class codes, deserialization included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<ClassCode, u32>")]
pub struct CandidateCounterSet(BTreeMap<ClassCode, u32>);

impl CandidateCounterSet {
    /// A counter set with every class code at zero.
    #[must_use]
    pub fn zeroed() -> Self {
        Self(ClassCode::ALL.into_iter().map(|code| (code, 0)).collect())
    }

    /// Build a counter set from a complete mapping.
    ///
    /// # Errors
    ///
    /// Returns a decode error naming the first class code missing from
    /// `counts`.
    pub fn from_counts(counts: BTreeMap<ClassCode, u32>) -> Result<Self> {
        if let Some(missing) = ClassCode::ALL
            .into_iter()
            .find(|code| !counts.contains_key(code))
        {
            return Err(Error::decode(
                "candidates",
                format!("missing class code {missing}"),
            ));
        }
        Ok(Self(counts))
    }

    /// Count for a class code.
    #[must_use]
    pub fn get(&self, code: ClassCode) -> u32 {
        self.0.get(&code).copied().unwrap_or_default()
    }

    /// Sum of all counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().map(|&count| u64::from(count)).sum()
    }

    /// Check if every counter is zero.
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.0.values().all(|&count| count == 0)
    }

    /// Iterate over `(code, count)` pairs in class code order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassCode, u32)> + '_ {
        self.0.iter().map(|(&code, &count)| (code, count))
    }
}

impl TryFrom<BTreeMap<ClassCode, u32>> for CandidateCounterSet {
    type Error = Error;

    fn try_from(counts: BTreeMap<ClassCode, u32>) -> Result<Self> {
        Self::from_counts(counts)
    }
}

impl Default for CandidateCounterSet {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// A school record as stored under `schools/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolRecord {
    /// Display name.
    pub name: String,
    /// Contact email, also the school's sign-in identity.
    pub email: String,
    /// Candidate counters.
    pub candidates: CandidateCounterSet,
}

impl SchoolRecord {
    /// A freshly provisioned school with zeroed counters.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            candidates: CandidateCounterSet::zeroed(),
        }
    }
}

/// A fully decoded school, with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct School {
    /// Store-assigned id.
    pub id: String,
    /// The stored record.
    pub record: SchoolRecord,
}

/// The row the panel keeps per school for selection lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolSummary {
    /// Store-assigned id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Category of an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementType {
    /// A meeting notice.
    #[default]
    Meeting,
    /// A fee collection notice.
    FeeCollection,
    /// A license price update notice.
    PriceUpdate,
}

impl std::fmt::Display for AnnouncementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Meeting => write!(f, "meeting"),
            Self::FeeCollection => write!(f, "fee_collection"),
            Self::PriceUpdate => write!(f, "price_update"),
        }
    }
}

/// An announcement as stored under `announcements/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Free-text body.
    pub content: String,
    /// Category tag.
    #[serde(rename = "type")]
    pub kind: AnnouncementType,
    /// Creation time in epoch milliseconds, assigned by the store.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl Announcement {
    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// The global class code to fee mapping stored at `licenseFees`.
///
/// May hold a subset of the class codes; fees are non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<ClassCode, f64>")]
pub struct LicenseFeeTable(BTreeMap<ClassCode, f64>);

impl LicenseFeeTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fee for a class code, if set.
    #[must_use]
    pub fn get(&self, code: ClassCode) -> Option<f64> {
        self.0.get(&code).copied()
    }

    /// Set the fee for a class code.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `fee` is negative or not finite.
    pub fn set(&mut self, code: ClassCode, fee: f64) -> Result<()> {
        validate_fee(fee)?;
        self.0.insert(code, fee);
        Ok(())
    }

    /// Number of class codes with a fee.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no fee is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(code, fee)` pairs in class code order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassCode, f64)> + '_ {
        self.0.iter().map(|(&code, &fee)| (code, fee))
    }
}

impl TryFrom<BTreeMap<ClassCode, f64>> for LicenseFeeTable {
    type Error = Error;

    fn try_from(fees: BTreeMap<ClassCode, f64>) -> Result<Self> {
        for &fee in fees.values() {
            validate_fee(fee)?;
        }
        Ok(Self(fees))
    }
}

impl FromIterator<(ClassCode, f64)> for LicenseFeeTable {
    fn from_iter<I: IntoIterator<Item = (ClassCode, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Check that a fee is a finite, non-negative amount.
///
/// # Errors
///
/// Returns a validation error otherwise.
pub fn validate_fee(fee: f64) -> Result<()> {
    if !fee.is_finite() {
        return Err(Error::validation("fee", "must be a number"));
    }
    if fee < 0.0 {
        return Err(Error::validation("fee", "must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_code_wire_names() {
        let names: Vec<_> = ClassCode::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            ["B", "A1", "A2", "C", "D", "FARK_A1", "FARK_A2", "BAKANLIK_A1"]
        );
    }

    #[test]
    fn test_class_code_serde_matches_wire_name() {
        for code in ClassCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_class_code_parse_case_insensitive() {
        assert_eq!("fark_a1".parse::<ClassCode>().unwrap(), ClassCode::FarkA1);
        assert_eq!(" b ".parse::<ClassCode>().unwrap(), ClassCode::B);
        assert!("E".parse::<ClassCode>().unwrap_err().is_validation());
    }

    #[test]
    fn test_from_wire_is_exact() {
        assert_eq!(ClassCode::from_wire("BAKANLIK_A1"), Some(ClassCode::BakanlikA1));
        assert_eq!(ClassCode::from_wire("bakanlik_a1"), None);
    }

    #[test]
    fn test_zeroed_counter_set_covers_all_codes() {
        let set = CandidateCounterSet::zeroed();
        assert_eq!(set.iter().count(), 8);
        assert!(set.is_zeroed());
        assert_eq!(set.total(), 0);
    }

    #[test]
    fn test_zeroed_counter_set_json() {
        let json = serde_json::to_value(CandidateCounterSet::zeroed()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "B": 0, "A1": 0, "A2": 0, "C": 0, "D": 0,
                "FARK_A1": 0, "FARK_A2": 0, "BAKANLIK_A1": 0
            })
        );
    }

    #[test]
    fn test_counter_set_rejects_missing_code() {
        let mut counts: BTreeMap<_, _> = ClassCode::ALL.into_iter().map(|c| (c, 3)).collect();
        counts.remove(&ClassCode::D);
        let err = CandidateCounterSet::from_counts(counts).unwrap_err();
        assert!(err.to_string().contains("missing class code D"));
    }

    #[test]
    fn test_deserialize_rejects_partial_counter_set() {
        let partial = serde_json::json!({"name": "x", "email": "y", "candidates": {"B": 3}});
        let err = serde_json::from_value::<SchoolRecord>(partial).unwrap_err();
        assert!(err.to_string().contains("missing class code"));

        let full = serde_json::json!({
            "name": "x", "email": "y",
            "candidates": {
                "B": 3, "A1": 0, "A2": 0, "C": 0, "D": 0,
                "FARK_A1": 0, "FARK_A2": 0, "BAKANLIK_A1": 0
            }
        });
        let record = serde_json::from_value::<SchoolRecord>(full).unwrap();
        assert_eq!(record.candidates.iter().count(), 8);
        assert_eq!(record.candidates.get(ClassCode::B), 3);
    }

    #[test]
    fn test_counter_set_total() {
        let counts = ClassCode::ALL.into_iter().map(|c| (c, 2)).collect();
        let set = CandidateCounterSet::from_counts(counts).unwrap();
        assert_eq!(set.total(), 16);
        assert_eq!(set.get(ClassCode::C), 2);
        assert!(!set.is_zeroed());
    }

    #[test]
    fn test_school_record_new_is_zeroed() {
        let record = SchoolRecord::new("Kurs", "kurs@example.com");
        assert!(record.candidates.is_zeroed());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Kurs");
        assert_eq!(json["candidates"]["BAKANLIK_A1"], 0);
    }

    #[test]
    fn test_announcement_type_wire_names() {
        assert_eq!(AnnouncementType::default(), AnnouncementType::Meeting);
        assert_eq!(AnnouncementType::FeeCollection.to_string(), "fee_collection");
        assert_eq!(
            serde_json::to_value(AnnouncementType::PriceUpdate).unwrap(),
            "price_update"
        );
    }

    #[test]
    fn test_announcement_field_names() {
        let announcement = Announcement {
            content: "Toplantı".to_string(),
            kind: AnnouncementType::Meeting,
            created_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&announcement).unwrap();
        assert_eq!(json["type"], "meeting");
        assert_eq!(json["createdAt"], 1_700_000_000_000_i64);
        assert!(announcement.created_at_utc().is_some());
    }

    #[test]
    fn test_fee_table_set_and_get() {
        let mut table = LicenseFeeTable::new();
        assert!(table.is_empty());
        table.set(ClassCode::B, 100.0).unwrap();
        assert_eq!(table.get(ClassCode::B), Some(100.0));
        assert_eq!(table.get(ClassCode::A1), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_fee_table_rejects_invalid_fees() {
        let mut table = LicenseFeeTable::new();
        assert!(table.set(ClassCode::B, -1.0).is_err());
        assert!(table.set(ClassCode::B, f64::NAN).is_err());
        assert!(table.set(ClassCode::B, f64::INFINITY).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_deserialize_fee_table_validates_fees() {
        assert!(serde_json::from_value::<LicenseFeeTable>(serde_json::json!({"B": -5})).is_err());
        let table: LicenseFeeTable =
            serde_json::from_value(serde_json::json!({"B": 100, "A1": 12.5})).unwrap();
        assert_eq!(table.get(ClassCode::A1), Some(12.5));
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            serde_json::json!({"B": 100.0, "A1": 12.5})
        );
    }

    #[test]
    fn test_validate_fee_accepts_zero() {
        assert!(validate_fee(0.0).is_ok());
    }
}
