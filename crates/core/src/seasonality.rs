use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calendar::MonthName;

/// One externally supplied seasonality record. The wire format keeps the
/// historical `plat` field name for the plant code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityEntry {
    pub state: String,
    pub category: String,
    #[serde(rename = "plat")]
    pub plant: String,
    pub product_name: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub trend_peaks: Vec<MonthName>,
    #[serde(default)]
    pub dips: Vec<MonthName>,
}

/// In-memory seasonality table with exact-match lookup. Absence of the
/// backing file is a degraded mode, not an error: estimation falls back to
/// the catalog's default entry.
#[derive(Clone, Debug, Default)]
pub struct SeasonalityTable {
    entries: Vec<SeasonalityEntry>,
}

impl SeasonalityTable {
    pub fn new(entries: Vec<SeasonalityEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads a JSON array of entries. A missing or unparsable file yields an
    /// empty table with a warning; generation continues on defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "could not read seasonality file, using defaults"
                );
                return Self::empty();
            }
        };

        match serde_json::from_str::<Vec<SeasonalityEntry>>(&raw) {
            Ok(entries) => Self::new(entries),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "could not parse seasonality file, using defaults"
                );
                Self::empty()
            }
        }
    }

    /// Exact match on the (state, category, plant, product_name) 4-tuple.
    pub fn lookup(
        &self,
        state: &str,
        category: &str,
        plant: &str,
        product_name: &str,
    ) -> Option<&SeasonalityEntry> {
        self.entries.iter().find(|entry| {
            entry.state == state
                && entry.category == category
                && entry.plant == plant
                && entry.product_name == product_name
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::calendar::MonthName;

    use super::{SeasonalityEntry, SeasonalityTable};

    fn sample_entry() -> SeasonalityEntry {
        SeasonalityEntry {
            state: "Karnataka".to_string(),
            category: "Masala".to_string(),
            plant: "Kar123".to_string(),
            product_name: "Sambhar Powder - 100gm".to_string(),
            min: 2500.0,
            max: 4000.0,
            trend_peaks: vec![MonthName::May, MonthName::October],
            dips: vec![],
        }
    }

    #[test]
    fn lookup_requires_all_four_dimensions_to_match() {
        let table = SeasonalityTable::new(vec![sample_entry()]);
        assert!(table
            .lookup("Karnataka", "Masala", "Kar123", "Sambhar Powder - 100gm")
            .is_some());
        assert!(table.lookup("Karnataka", "Masala", "Kar124", "Sambhar Powder - 100gm").is_none());
        assert!(table.lookup("Karnataka", "Beverages", "Kar123", "Sambhar Powder - 100gm").is_none());
    }

    #[test]
    fn entry_round_trips_the_wire_shape_with_plat_field() {
        let json = serde_json::to_value(sample_entry()).unwrap();
        assert_eq!(json["plat"], "Kar123");
        assert_eq!(json["trend_peaks"][0], "May");

        let parsed: SeasonalityEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, sample_entry());
    }

    #[test]
    fn missing_file_yields_empty_table() {
        let table = SeasonalityTable::load(std::path::Path::new("/nonexistent/output.json"));
        assert!(table.is_empty());
    }

    #[test]
    fn corrupt_file_yields_empty_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let table = SeasonalityTable::load(file.path());
        assert!(table.is_empty());
    }

    #[test]
    fn valid_file_loads_all_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let payload = serde_json::to_string(&vec![sample_entry()]).unwrap();
        write!(file, "{payload}").unwrap();
        let table = SeasonalityTable::load(file.path());
        assert_eq!(table.len(), 1);
    }
}
