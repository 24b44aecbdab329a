//! Document status transitions.
//!
//! Stateless: callers load the document, ask the service for the action and
//! persist the result in the same transaction as the stock movements.

use chrono::{DateTime, Utc};
use stockledger_shared::types::ActorId;

use super::types::{DocumentStatus, StockDocument};
use crate::error::{LedgerError, LedgerResult};

/// A validated status change with its audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentAction {
    /// Draft → Completed.
    Complete {
        /// Always `Completed`.
        new_status: DocumentStatus,
        /// User completing the document.
        completed_by: ActorId,
        /// When it was completed.
        completed_at: DateTime<Utc>,
    },
    /// Draft → Cancelled.
    Cancel {
        /// Always `Cancelled`.
        new_status: DocumentStatus,
        /// User cancelling the document.
        cancelled_by: ActorId,
        /// When it was cancelled.
        cancelled_at: DateTime<Utc>,
    },
}

impl DocumentAction {
    /// Status the document moves to.
    #[must_use]
    pub fn new_status(&self) -> DocumentStatus {
        match self {
            Self::Complete { new_status, .. } | Self::Cancel { new_status, .. } => *new_status,
        }
    }

    /// Writes the new status and its audit fields onto `document`.
    pub fn apply(self, document: &mut StockDocument) {
        match self {
            Self::Complete {
                new_status,
                completed_by,
                completed_at,
            } => {
                document.status = new_status;
                document.completed_by = Some(completed_by);
                document.completed_at = Some(completed_at);
            }
            Self::Cancel {
                new_status,
                cancelled_by,
                cancelled_at,
            } => {
                document.status = new_status;
                document.cancelled_by = Some(cancelled_by);
                document.cancelled_at = Some(cancelled_at);
            }
        }
    }
}

/// Stateless service for document status transitions.
pub struct DocumentService;

impl DocumentService {
    /// Complete a draft document.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the document is a draft.
    pub fn complete(
        current_status: DocumentStatus,
        completed_by: ActorId,
    ) -> LedgerResult<DocumentAction> {
        Self::ensure_transition(current_status, DocumentStatus::Completed)?;
        Ok(DocumentAction::Complete {
            new_status: DocumentStatus::Completed,
            completed_by,
            completed_at: Utc::now(),
        })
    }

    /// Cancel a draft document.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the document is a draft. Completed
    /// documents are undone with a return note, never cancelled.
    pub fn cancel(
        current_status: DocumentStatus,
        cancelled_by: ActorId,
    ) -> LedgerResult<DocumentAction> {
        Self::ensure_transition(current_status, DocumentStatus::Cancelled)?;
        Ok(DocumentAction::Cancel {
            new_status: DocumentStatus::Cancelled,
            cancelled_by,
            cancelled_at: Utc::now(),
        })
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: DocumentStatus, to: DocumentStatus) -> bool {
        matches!(
            (from, to),
            (
                DocumentStatus::Draft,
                DocumentStatus::Completed | DocumentStatus::Cancelled
            )
        )
    }

    fn ensure_transition(from: DocumentStatus, to: DocumentStatus) -> LedgerResult<()> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(LedgerError::InvalidTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKind;
    use chrono::NaiveDate;
    use rstest::rstest;
    use stockledger_shared::types::{DocumentId, LocationId};

    fn draft() -> StockDocument {
        StockDocument {
            id: DocumentId::new(),
            kind: DocumentKind::Invoice,
            series_name: "FACT".into(),
            year: 2025,
            number: 1,
            document_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            status: DocumentStatus::Draft,
            location: LocationId::new(),
            partner_reference: None,
            original_document_id: None,
            lines: Vec::new(),
            actor_id: ActorId::new(),
            created_at: Utc::now(),
            completed_by: None,
            completed_at: None,
            cancelled_by: None,
            cancelled_at: None,
            version: 0,
        }
    }

    #[test]
    fn test_complete_from_draft() {
        let action = DocumentService::complete(DocumentStatus::Draft, ActorId::new()).unwrap();
        assert_eq!(action.new_status(), DocumentStatus::Completed);
    }

    #[test]
    fn test_cancel_from_draft() {
        let action = DocumentService::cancel(DocumentStatus::Draft, ActorId::new()).unwrap();
        assert_eq!(action.new_status(), DocumentStatus::Cancelled);
    }

    #[test]
    fn test_apply_complete_records_who_and_when() {
        let mut doc = draft();
        let clerk = ActorId::new();
        let before = Utc::now();

        DocumentService::complete(doc.status, clerk).unwrap().apply(&mut doc);

        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(doc.completed_by, Some(clerk));
        assert!(doc.completed_at.is_some_and(|at| at >= before));
        assert_eq!(doc.cancelled_by, None);
        assert_eq!(doc.cancelled_at, None);
    }

    #[test]
    fn test_apply_cancel_records_who_and_when() {
        let mut doc = draft();
        let clerk = ActorId::new();

        DocumentService::cancel(doc.status, clerk).unwrap().apply(&mut doc);

        assert_eq!(doc.status, DocumentStatus::Cancelled);
        assert_eq!(doc.cancelled_by, Some(clerk));
        assert!(doc.cancelled_at.is_some());
        assert_eq!(doc.completed_by, None);
    }

    #[rstest]
    #[case(DocumentStatus::Completed)]
    #[case(DocumentStatus::Cancelled)]
    fn test_immutable_documents_reject_transitions(#[case] status: DocumentStatus) {
        assert!(matches!(
            DocumentService::complete(status, ActorId::new()),
            Err(LedgerError::InvalidTransition { from, to: DocumentStatus::Completed })
                if from == status
        ));
        assert!(matches!(
            DocumentService::cancel(status, ActorId::new()),
            Err(LedgerError::InvalidTransition { from, to: DocumentStatus::Cancelled })
                if from == status
        ));
    }

    #[rstest]
    #[case(DocumentStatus::Draft, DocumentStatus::Completed, true)]
    #[case(DocumentStatus::Draft, DocumentStatus::Cancelled, true)]
    #[case(DocumentStatus::Completed, DocumentStatus::Draft, false)]
    #[case(DocumentStatus::Completed, DocumentStatus::Cancelled, false)]
    #[case(DocumentStatus::Cancelled, DocumentStatus::Draft, false)]
    #[case(DocumentStatus::Draft, DocumentStatus::Draft, false)]
    fn test_is_valid_transition(
        #[case] from: DocumentStatus,
        #[case] to: DocumentStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(DocumentService::is_valid_transition(from, to), expected);
    }
}
