//! Test fixtures for scheduler integration tests.

use std::collections::HashMap;

use meridian_scheduler::keys;

/// Builder for task description hashes as the client library writes them.
pub struct TaskDescriptionBuilder {
    fields: HashMap<String, String>,
    next_slot: usize,
}

impl TaskDescriptionBuilder {
    /// Creates a description for a function with export counter 0.
    pub fn new(function_id: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(keys::FIELD_FUNCTION_ID.to_owned(), function_id.to_owned());
        fields.insert(keys::FIELD_EXPORT_COUNTER.to_owned(), "0".to_owned());
        Self {
            fields,
            next_slot: 0,
        }
    }

    /// Sets the required export generation.
    pub fn requires_export(mut self, version: u64) -> Self {
        self.fields
            .insert(keys::FIELD_EXPORT_COUNTER.to_owned(), version.to_string());
        self
    }

    /// Adds a by-reference argument in the next slot.
    pub fn by_ref_arg(mut self, object_id: &str) -> Self {
        self.fields
            .insert(keys::arg_id_field(self.next_slot), object_id.to_owned());
        self.next_slot += 1;
        self
    }

    /// Adds a by-value argument in the next slot.
    pub fn by_value_arg(mut self, value: &str) -> Self {
        self.fields
            .insert(keys::arg_val_field(self.next_slot), value.to_owned());
        self.next_slot += 1;
        self
    }

    /// Builds the field map.
    pub fn build(self) -> HashMap<String, String> {
        self.fields
    }
}
