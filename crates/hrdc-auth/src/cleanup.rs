use std::fmt;

/// One remote or local step of account deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    Conversations,
    Profile,
    AuthRecord,
    SignOut,
    Artifacts,
}

impl CleanupStep {
    pub const ORDER: [CleanupStep; 5] = [
        CleanupStep::Conversations,
        CleanupStep::Profile,
        CleanupStep::AuthRecord,
        CleanupStep::SignOut,
        CleanupStep::Artifacts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupStep::Conversations => "conversations",
            CleanupStep::Profile => "profile",
            CleanupStep::AuthRecord => "auth_record",
            CleanupStep::SignOut => "sign_out",
            CleanupStep::Artifacts => "artifacts",
        }
    }
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanupWarning {
    pub step: CleanupStep,
    pub message: String,
}

/// Outcome of a best-effort cleanup chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub completed: Vec<CleanupStep>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    pub fn record<E: fmt::Display>(&mut self, step: CleanupStep, result: Result<(), E>) {
        match result {
            Ok(()) => self.completed.push(step),
            Err(e) => {
                tracing::warn!(step = %step, error = %e, "Cleanup step failed");
                self.warnings.push(CleanupWarning {
                    step,
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn failed(&self, step: CleanupStep) -> bool {
        self.warnings.iter().any(|w| w.step == step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_splits_outcomes() {
        let mut report = CleanupReport::default();
        report.record::<String>(CleanupStep::Conversations, Ok(()));
        report.record(CleanupStep::Profile, Err("row locked"));

        assert_eq!(report.completed, vec![CleanupStep::Conversations]);
        assert!(report.failed(CleanupStep::Profile));
        assert!(!report.is_clean());
        assert_eq!(report.warnings[0].message, "row locked");
    }
}
