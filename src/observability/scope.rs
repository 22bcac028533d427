//! ObservationScope for paired begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` when `complete()` is called
//! - Logs `{name}_ABORTED` at ERROR if dropped without completing

use std::time::Instant;

use super::logger::Logger;

/// ```ignore
/// let scope = ObservationScope::new("MIGRATE", &[("steps", "4")]);
/// // ... work; early returns log MIGRATE_ABORTED ...
/// scope.complete(&[("applied", "4")]);
/// ```
pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    started: Instant,
    completed: bool,
}

impl ObservationScope {
    pub fn new(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        let scope = Self {
            name,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
            completed: false,
        };
        scope.emit("BEGIN", &[], false);
        scope
    }

    /// Marks success, logging elapsed time and any extra fields.
    pub fn complete(mut self, extra: &[(&str, &str)]) {
        self.completed = true;
        self.emit("COMPLETE", extra, false);
    }

    fn emit(&self, suffix: &str, extra: &[(&str, &str)], failed: bool) {
        let event = format!("{}_{}", self.name, suffix);
        let elapsed = self.started.elapsed().as_micros().to_string();

        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra);
        if suffix != "BEGIN" {
            fields.push(("elapsed_us", &elapsed));
        }

        if failed {
            Logger::error(&event, &fields);
        } else {
            Logger::info(&event, &fields);
        }
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            self.emit("ABORTED", &[], true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_does_not_panic() {
        let scope = ObservationScope::new("TEST_SCOPE", &[("k", "v")]);
        scope.complete(&[("extra", "1")]);
    }

    #[test]
    fn test_drop_without_complete_does_not_panic() {
        let _scope = ObservationScope::new("TEST_SCOPE", &[]);
    }
}
