use thiserror::Error;

use crate::domain::types::JobStatus;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("job status cannot move from `{from}` to `{to}`")]
    IllegalTransition { from: JobStatus, to: JobStatus },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Check an edge against the lifecycle graph.
    pub fn check_transition(from: JobStatus, to: JobStatus) -> Result<(), Self> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(Self::IllegalTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            for to in JobStatus::ALL {
                assert_eq!(
                    DomainError::check_transition(terminal, to),
                    Err(DomainError::IllegalTransition { from: terminal, to })
                );
            }
        }
        assert!(DomainError::check_transition(JobStatus::Queued, JobStatus::Cancelled).is_ok());
        assert!(DomainError::check_transition(JobStatus::Queued, JobStatus::Failed).is_err());
    }
}
