//! The host record, as seen by the pipeline.
//!
//! The pipeline never owns records. The persistence layer hands it a value
//! implementing [`Record`] at each lifecycle point and the pipeline reads the
//! scenario and attributes, and writes two attributes during `before_save`.

use std::collections::BTreeMap;

/// Current attribute values of a record, keyed by attribute name.
///
/// Values are the string forms used in paths (`{id}` placeholders, dynamic
/// path functions), so hosts render numeric ids and the like as text.
pub type Attributes = BTreeMap<String, String>;

/// Access the pipeline needs to a host record.
pub trait Record {
    /// Named mode the record is being saved under (e.g. `"insert"`, `"admin-edit"`).
    fn scenario(&self) -> &str;

    /// `true` until the record has been inserted.
    fn is_new_record(&self) -> bool;

    /// Snapshot of the current attribute values.
    fn attributes(&self) -> Attributes;

    fn set_attribute(&mut self, name: &str, value: String);
}

/// A plain in-memory record.
///
/// Used by the CLI and by tests; hosts with their own models implement
/// [`Record`] directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRecord {
    pub scenario: String,
    pub is_new: bool,
    pub attributes: Attributes,
}

impl MemoryRecord {
    /// A record that has not been inserted yet.
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            is_new: true,
            attributes: Attributes::new(),
        }
    }

    /// A record that already exists in storage.
    pub fn existing(scenario: impl Into<String>) -> Self {
        Self {
            is_new: false,
            ..Self::new(scenario)
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

impl Record for MemoryRecord {
    fn scenario(&self) -> &str {
        &self.scenario
    }

    fn is_new_record(&self) -> bool {
        self.is_new
    }

    fn attributes(&self) -> Attributes {
        self.attributes.clone()
    }

    fn set_attribute(&mut self, name: &str, value: String) {
        self.attributes.insert(name.to_string(), value);
    }
}
