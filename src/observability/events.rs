//! Observable lifecycle events
//!
//! Events are explicit and typed; the string form is what appears in the
//! `event` key of a log line.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Startup
    /// Configuration file loaded and validated
    ConfigLoaded,
    /// Migration history built and validated
    HistoryLoaded,
    /// Migration history rejected (FATAL)
    HistoryInvalid,

    // State
    /// State file loaded
    StateLoaded,
    /// State file written
    StateSaved,
    /// State file failed checksum or framing (FATAL)
    StateCorruption,
    /// Ledger disagrees with the history (FATAL)
    LedgerInconsistent,

    // Migration run
    /// Plan computed
    PlanBuilt,
    /// Migration operations applied and recorded
    MigrationApplied,
    /// Migration operations reversed and unrecorded
    MigrationUnapplied,
    /// Migration recorded without running operations
    MigrationFaked,
    /// Migration rejected; run halted
    MigrationFailed,

    // Data
    /// Row inserted through the CLI
    RowInserted,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::HistoryLoaded => "HISTORY_LOADED",
            Event::HistoryInvalid => "HISTORY_INVALID",
            Event::StateLoaded => "STATE_LOADED",
            Event::StateSaved => "STATE_SAVED",
            Event::StateCorruption => "STATE_CORRUPTION",
            Event::LedgerInconsistent => "LEDGER_INCONSISTENT",
            Event::PlanBuilt => "PLAN_BUILT",
            Event::MigrationApplied => "MIGRATION_APPLIED",
            Event::MigrationUnapplied => "MIGRATION_UNAPPLIED",
            Event::MigrationFaked => "MIGRATION_FAKED",
            Event::MigrationFailed => "MIGRATION_FAILED",
            Event::RowInserted => "ROW_INSERTED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Event::HistoryInvalid | Event::StateCorruption | Event::LedgerInconsistent
        )
    }

    /// Failure that is not fatal to the process
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::MigrationFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_strings_are_upper_snake() {
        let events = [
            Event::ConfigLoaded,
            Event::HistoryLoaded,
            Event::HistoryInvalid,
            Event::StateLoaded,
            Event::StateSaved,
            Event::StateCorruption,
            Event::LedgerInconsistent,
            Event::PlanBuilt,
            Event::MigrationApplied,
            Event::MigrationUnapplied,
            Event::MigrationFaked,
            Event::MigrationFailed,
            Event::RowInserted,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::StateCorruption.is_fatal());
        assert!(Event::LedgerInconsistent.is_fatal());
        assert!(!Event::MigrationFailed.is_fatal());
        assert!(Event::MigrationFailed.is_failure());
    }
}
