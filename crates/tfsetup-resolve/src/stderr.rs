//! Classification of probe subprocess output.
//!
//! The guesser distinguishes outcomes by matching on the wording of the
//! CLI's error messages. That wording belongs to the upstream tools and can
//! change between releases, so every pattern lives in this one table.

use std::sync::LazyLock;

use regex::Regex;

/// What a failed (or succeeded-with-caveats) probe command told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeMessage {
    /// The state names the exact version that wrote it.
    StateWrittenBy(String),
    /// The tried binary is too old to read the state format at all.
    UnsupportedStateVersion,
    /// The workspace does not exist, so there is no state to version.
    NoWorkspace,
    /// The backend reports an empty state.
    NoState,
    /// Nothing recognizable.
    Other,
}

static STATE_WRITTEN_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"state snapshot was created by Terraform v([0-9][0-9A-Za-z._-]*)")
        .expect("writer version pattern compiles")
});

/// Fixed-substring patterns, checked in order after the writer-version
/// pattern.
static SUBSTRINGS: &[(&str, ProbeMessage)] = &[
    ("does not support state version 4", ProbeMessage::UnsupportedStateVersion),
    ("Failed to select workspace", ProbeMessage::NoWorkspace),
    ("no state", ProbeMessage::NoState),
];

#[must_use]
pub fn classify(stderr: &str) -> ProbeMessage {
    if let Some(captures) = STATE_WRITTEN_BY.captures(stderr) {
        if let Some(version) = captures.get(1) {
            return ProbeMessage::StateWrittenBy(
                version.as_str().trim_end_matches(['.', ',']).to_string(),
            );
        }
    }

    for (needle, message) in SUBSTRINGS {
        if stderr.contains(needle) {
            return message.clone();
        }
    }

    ProbeMessage::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_writer_version() {
        let stderr = "Error: state snapshot was created by Terraform v1.3.9, which is newer\n";
        assert_eq!(
            classify(stderr),
            ProbeMessage::StateWrittenBy("1.3.9".to_string())
        );
    }

    #[test]
    fn recognizes_too_old_binaries() {
        assert_eq!(
            classify("Error loading state: does not support state version 4"),
            ProbeMessage::UnsupportedStateVersion
        );
    }

    #[test]
    fn recognizes_missing_workspaces_and_empty_state() {
        assert_eq!(
            classify("Initializing...\nFailed to select workspace \"staging\"."),
            ProbeMessage::NoWorkspace
        );
        assert_eq!(
            classify("The state file is empty. No state to pull. no state"),
            ProbeMessage::NoState
        );
    }

    #[test]
    fn anything_else_is_other() {
        assert_eq!(classify("Error: connection refused"), ProbeMessage::Other);
        assert_eq!(classify(""), ProbeMessage::Other);
    }
}
