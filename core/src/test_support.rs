//! Record builders shared by unit tests.

use runlens_types::{Issue, Record, RunStatus};

fn issue(value: &str, message: &str) -> Issue {
    Issue {
        value: value.to_string(),
        message: message.to_string(),
        category: value.to_string(),
        priority: "high".to_string(),
    }
}

pub fn error(id: &str, value: &str, message: &str) -> Record {
    Record::new(id, RunStatus::Error(issue(value, message)))
}

pub fn warning(id: &str, value: &str, message: &str) -> Record {
    Record::new(id, RunStatus::Warning(issue(value, message)))
}

pub fn success(id: &str) -> Record {
    Record::new(
        id,
        RunStatus::Success {
            value: "completed".to_string(),
            message: String::new(),
        },
    )
}

pub fn pending(id: &str) -> Record {
    Record::new(
        id,
        RunStatus::Pending {
            value: "queued".to_string(),
            message: String::new(),
        },
    )
}

/// 10 records: 6 in `A` (3 "timeout", 3 "denied") and 4 in `B` (all "denied")
pub fn scenario_records() -> Vec<Record> {
    let mut records = Vec::new();
    for i in 0..3 {
        records.push(error(&format!("a-timeout-{i}"), "A", "timeout"));
        records.push(error(&format!("a-denied-{i}"), "A", "denied"));
    }
    for i in 0..4 {
        records.push(warning(&format!("b-denied-{i}"), "B", "denied"));
    }
    records
}
