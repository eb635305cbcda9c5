//! Closed status enumerations for the three persisted state machines.
//!
//! The string literals are the persistence encoding and must never change.
//! Decoding an unknown literal is an error rather than a silent default.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle of an analyzer run.
///
/// `Queued -> DownloadingSourceCode -> AnalyzingDependencies`, then
/// `Success` or `Failed`.
/// `Running` is part of the persisted vocabulary but no worker moves a run
/// into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyzerRunStatus {
    Queued,
    AnalyzingDependencies,
    DownloadingSourceCode,
    Running,
    Failed,
    Success,
}

impl AnalyzerRunStatus {
    pub const ALL: [AnalyzerRunStatus; 6] = [
        AnalyzerRunStatus::Queued,
        AnalyzerRunStatus::AnalyzingDependencies,
        AnalyzerRunStatus::DownloadingSourceCode,
        AnalyzerRunStatus::Running,
        AnalyzerRunStatus::Failed,
        AnalyzerRunStatus::Success,
    ];

    /// Statuses a worker has claimed but not yet finished.
    pub const IN_FLIGHT: [AnalyzerRunStatus; 2] = [
        AnalyzerRunStatus::DownloadingSourceCode,
        AnalyzerRunStatus::AnalyzingDependencies,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AnalyzerRunStatus::Queued => "QUEUED",
            AnalyzerRunStatus::AnalyzingDependencies => {
                "ANALYZING_DEPENDENCIES"
            }
            AnalyzerRunStatus::DownloadingSourceCode => {
                "DOWNLOADING_SOURCE_CODE"
            }
            AnalyzerRunStatus::Running => "RUNNING",
            AnalyzerRunStatus::Failed => "FAILED",
            AnalyzerRunStatus::Success => "SUCCESS",
        }
    }

    /// Position in the state machine. Observed statuses never decrease.
    pub const fn stage(&self) -> u8 {
        match self {
            AnalyzerRunStatus::Queued => 0,
            AnalyzerRunStatus::DownloadingSourceCode => 1,
            AnalyzerRunStatus::AnalyzingDependencies => 2,
            AnalyzerRunStatus::Running => 3,
            AnalyzerRunStatus::Failed | AnalyzerRunStatus::Success => 4,
        }
    }

    pub fn can_transition_to(&self, next: AnalyzerRunStatus) -> bool {
        use AnalyzerRunStatus::*;
        matches!(
            (self, next),
            (Queued, DownloadingSourceCode)
                | (DownloadingSourceCode, AnalyzingDependencies)
                | (DownloadingSourceCode, Failed)
                | (AnalyzingDependencies, Success)
                | (AnalyzingDependencies, Failed)
        )
    }
}

/// Lifecycle of an ephemeral scan job. Jobs are deleted after processing,
/// there is no terminal status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanJobStatus {
    Queued,
    InProgress,
}

impl ScanJobStatus {
    pub const ALL: [ScanJobStatus; 2] =
        [ScanJobStatus::Queued, ScanJobStatus::InProgress];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ScanJobStatus::Queued => "QUEUED",
            ScanJobStatus::InProgress => "IN_PROGRESS",
        }
    }

    pub fn can_transition_to(&self, next: ScanJobStatus) -> bool {
        matches!(
            (self, next),
            (ScanJobStatus::Queued, ScanJobStatus::InProgress)
        )
    }
}

/// Lifecycle of a scanner run: `Queued -> Scanning -> {Success, Failed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScannerRunStatus {
    Queued,
    Scanning,
    Failed,
    Success,
}

impl ScannerRunStatus {
    pub const ALL: [ScannerRunStatus; 4] = [
        ScannerRunStatus::Queued,
        ScannerRunStatus::Scanning,
        ScannerRunStatus::Failed,
        ScannerRunStatus::Success,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ScannerRunStatus::Queued => "QUEUED",
            ScannerRunStatus::Scanning => "SCANNING",
            ScannerRunStatus::Failed => "FAILED",
            ScannerRunStatus::Success => "SUCCESS",
        }
    }

    pub const fn stage(&self) -> u8 {
        match self {
            ScannerRunStatus::Queued => 0,
            ScannerRunStatus::Scanning => 1,
            ScannerRunStatus::Failed | ScannerRunStatus::Success => 2,
        }
    }

    pub fn can_transition_to(&self, next: ScannerRunStatus) -> bool {
        use ScannerRunStatus::*;
        matches!(
            (self, next),
            (Queued, Scanning) | (Scanning, Success) | (Scanning, Failed)
        )
    }
}

macro_rules! status_codec {
    ($ty:ty, $entity:literal) => {
        impl FromStr for $ty {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|status| status.as_str() == s)
                    .ok_or_else(|| ModelError::UnknownStatus {
                        entity: $entity,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_codec!(AnalyzerRunStatus, "analyzer run");
status_codec!(ScanJobStatus, "scan job");
status_codec!(ScannerRunStatus, "scanner run");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_round_trip_through_string_encoding() {
        for status in AnalyzerRunStatus::ALL {
            assert_eq!(
                status.as_str().parse::<AnalyzerRunStatus>(),
                Ok(status)
            );
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        for status in ScanJobStatus::ALL {
            assert_eq!(status.as_str().parse::<ScanJobStatus>(), Ok(status));
        }
        for status in ScannerRunStatus::ALL {
            assert_eq!(status.as_str().parse::<ScannerRunStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_literals_are_rejected() {
        assert!("queued".parse::<AnalyzerRunStatus>().is_err());
        assert!("DONE".parse::<ScanJobStatus>().is_err());
        let err = "PAUSED".parse::<ScannerRunStatus>().unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownStatus {
                entity: "scanner run",
                value: "PAUSED".into()
            }
        );
    }

    #[test]
    fn analyzer_transitions_only_move_forward() {
        for from in AnalyzerRunStatus::ALL {
            for to in AnalyzerRunStatus::ALL {
                if from.can_transition_to(to) {
                    assert!(to.stage() > from.stage(), "{from} -> {to}");
                }
            }
        }
        assert!(
            AnalyzerRunStatus::Queued
                .can_transition_to(AnalyzerRunStatus::DownloadingSourceCode)
        );
        assert!(
            !AnalyzerRunStatus::Queued
                .can_transition_to(AnalyzerRunStatus::AnalyzingDependencies)
        );
        assert!(
            !AnalyzerRunStatus::Success
                .can_transition_to(AnalyzerRunStatus::Failed)
        );
    }

    #[test]
    fn running_is_reserved() {
        for status in AnalyzerRunStatus::ALL {
            assert!(!status.can_transition_to(AnalyzerRunStatus::Running));
            assert!(!AnalyzerRunStatus::Running.can_transition_to(status));
        }
    }

    #[test]
    fn scanner_transitions_only_move_forward() {
        for from in ScannerRunStatus::ALL {
            for to in ScannerRunStatus::ALL {
                if from.can_transition_to(to) {
                    assert!(to.stage() > from.stage(), "{from} -> {to}");
                }
            }
        }
        assert!(
            !ScannerRunStatus::Failed
                .can_transition_to(ScannerRunStatus::Queued)
        );
    }
}
