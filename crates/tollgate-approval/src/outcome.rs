//! The outcome of asking a human.

/// How a suspended request was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// A human approved; a permanent grant was committed for the scope.
    Approved,
    /// Rejected, by a human decision or by timeout.
    Rejected {
        /// Why the request was rejected.
        reason: String,
    },
    /// No approver is connected; standalone mode executes immediately.
    Bypassed,
}

impl ApprovalOutcome {
    /// Whether the suspended request may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Approved | Self::Bypassed)
    }

    /// The rejection reason, when rejected.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason } => Some(reason),
            Self::Approved | Self::Bypassed => None,
        }
    }
}
