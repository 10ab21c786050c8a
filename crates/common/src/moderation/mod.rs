//! Moderation state machine
//!
//! Governs the `status` field of a paper record and who may change it.
//! A paper enters the catalog as `pending`, may pass through
//! `plagiarism_check`, and ends in `approved` or `rejected` (both
//! terminal). Every applied transition produces an append-only
//! [`ModerationTransition`] audit entry attributing the action to an
//! admin.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::store::{bounded, PaperRecord, PaperStore};

/// Review status of a submitted paper
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Pending,
    PlagiarismCheck,
    Approved,
    Rejected,
}

impl PaperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Pending => "pending",
            PaperStatus::PlagiarismCheck => "plagiarism_check",
            PaperStatus::Approved => "approved",
            PaperStatus::Rejected => "rejected",
        }
    }

    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaperStatus::Approved | PaperStatus::Rejected)
    }

    /// The permitted transition table.
    ///
    /// pending -> plagiarism_check | approved | rejected
    /// plagiarism_check -> approved | rejected
    ///
    /// Everything else is rejected, including any transition out of a
    /// terminal state and any transition back to `pending`.
    pub fn can_transition(&self, to: PaperStatus) -> bool {
        use PaperStatus::*;
        matches!(
            (self, to),
            (Pending, PlagiarismCheck)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (PlagiarismCheck, Approved)
                | (PlagiarismCheck, Rejected)
        )
    }
}

impl fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PaperStatus::Pending),
            "plagiarism_check" => Ok(PaperStatus::PlagiarismCheck),
            "approved" => Ok(PaperStatus::Approved),
            "rejected" => Ok(PaperStatus::Rejected),
            other => Err(AppError::InvalidQuery {
                message: format!("unknown status '{}'", other),
            }),
        }
    }
}

/// Append-only audit record of one applied moderation action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationTransition {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub from_status: PaperStatus,
    pub to_status: PaperStatus,
    /// Admin identifier (email or user id) the action is attributed to
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

impl ModerationTransition {
    pub fn new(
        paper_id: Uuid,
        from_status: PaperStatus,
        to_status: PaperStatus,
        actor: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            paper_id,
            from_status,
            to_status,
            actor: actor.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Moderation service over an injected paper store.
///
/// Exclusively owns the validity of status transitions; the store owns
/// durable persistence of the resulting value. One store round trip per
/// call, bounded by the configured upstream timeout.
pub struct ModerationService {
    store: Arc<dyn PaperStore>,
    upstream_timeout: Duration,
}

impl ModerationService {
    pub fn new(store: Arc<dyn PaperStore>, upstream_timeout: Duration) -> Self {
        Self {
            store,
            upstream_timeout,
        }
    }

    /// Apply a moderation transition to a paper.
    ///
    /// Re-applying the paper's current status is an idempotent no-op and
    /// records no audit entry. An illegal transition fails with
    /// `InvalidTransition` and mutates nothing. On store failure the audit
    /// entry is not committed (the store applies status + audit in one
    /// atomic operation).
    pub async fn transition(
        &self,
        paper_id: Uuid,
        to: PaperStatus,
        actor: &str,
    ) -> Result<PaperRecord> {
        let paper = bounded(self.upstream_timeout, self.store.find_paper(paper_id))
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                id: paper_id.to_string(),
            })?;

        if paper.status == to {
            tracing::debug!(
                paper_id = %paper_id,
                status = %to,
                "Transition is a no-op, status unchanged"
            );
            return Ok(paper);
        }

        if !paper.status.can_transition(to) {
            crate::metrics::record_transition(to.as_str(), false);
            return Err(AppError::InvalidTransition {
                from: paper.status,
                to,
            });
        }

        let transition = ModerationTransition::new(paper_id, paper.status, to, actor);
        let updated = bounded(
            self.upstream_timeout,
            self.store.apply_transition(&transition),
        )
        .await?;

        crate::metrics::record_transition(to.as_str(), true);
        tracing::info!(
            paper_id = %paper_id,
            from = %transition.from_status,
            to = %transition.to_status,
            actor = %transition.actor,
            "Paper status transitioned"
        );

        Ok(updated)
    }

    /// Audit trail for a paper, oldest first
    pub async fn history(&self, paper_id: Uuid) -> Result<Vec<ModerationTransition>> {
        bounded(self.upstream_timeout, self.store.transitions_for(paper_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permitted_transitions() {
        use PaperStatus::*;

        assert!(Pending.can_transition(PlagiarismCheck));
        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Rejected));
        assert!(PlagiarismCheck.can_transition(Approved));
        assert!(PlagiarismCheck.can_transition(Rejected));
    }

    #[test]
    fn test_terminal_states_admit_nothing() {
        use PaperStatus::*;

        for to in [Pending, PlagiarismCheck, Approved, Rejected] {
            assert!(!Approved.can_transition(to));
            assert!(!Rejected.can_transition(to));
        }
        assert!(Approved.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_no_transition_back_to_pending() {
        assert!(!PaperStatus::PlagiarismCheck.can_transition(PaperStatus::Pending));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PaperStatus::Pending,
            PaperStatus::PlagiarismCheck,
            PaperStatus::Approved,
            PaperStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<PaperStatus>().unwrap(), status);
        }
        assert!("published".parse::<PaperStatus>().is_err());
    }
}
