//! Moderation state machine for word submissions.
//!
//! ```text
//!            approve              hide
//! Pending ───────────▶ Approved ◀──────▶ Hidden
//!    │                    ▲                │
//!    └──── hide ──────────┼────────────────┘
//!                         │
//!              move (from any state)
//! ```
//!
//! There is no action leading back to `Pending`; a submission only starts
//! there. Every action requires the admin role.

use thiserror::Error;

use crate::model::{DocId, ModerationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Contributor,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Role claim as carried in tokens. Anything but `admin` is a contributor.
    pub fn from_claim(claim: &str) -> Self {
        if claim.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Contributor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Hide,
    Move { category: DocId },
}

impl ModerationAction {
    pub fn name(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Hide => "hide",
            ModerationAction::Move { .. } => "move",
        }
    }
}

/// Outcome of applying an action to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: ModerationStatus,
    pub to: ModerationStatus,
    /// New category, for `move`.
    pub category: Option<DocId>,
}

impl Transition {
    pub fn status_changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModerationError {
    #[error("Only administrators may {action} words")]
    Forbidden { action: &'static str },

    #[error("The {view} listing requires administrator access")]
    ViewForbidden { view: &'static str },
}

/// Status assigned to every new submission, whoever submits it.
pub fn initial_status() -> ModerationStatus {
    ModerationStatus::Pending
}

pub fn transition(
    current: ModerationStatus,
    action: &ModerationAction,
    role: Role,
) -> Result<Transition, ModerationError> {
    if !role.is_admin() {
        return Err(ModerationError::Forbidden {
            action: action.name(),
        });
    }

    let (to, category) = match action {
        ModerationAction::Approve => (ModerationStatus::Approved, None),
        ModerationAction::Hide => (ModerationStatus::Hidden, None),
        ModerationAction::Move { category } => (ModerationStatus::Approved, Some(category.clone())),
    };

    Ok(Transition {
        from: current,
        to,
        category,
    })
}

/// Status-filtered listings of words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusView {
    All,
    Approved,
    Hidden,
    Pending,
}

impl StatusView {
    pub fn status(&self) -> Option<ModerationStatus> {
        match self {
            StatusView::All => None,
            StatusView::Approved => Some(ModerationStatus::Approved),
            StatusView::Hidden => Some(ModerationStatus::Hidden),
            StatusView::Pending => Some(ModerationStatus::Pending),
        }
    }

    pub fn authorize(&self, role: Option<Role>) -> Result<(), ModerationError> {
        match self {
            StatusView::Pending if !role.is_some_and(|r| r.is_admin()) => {
                Err(ModerationError::ViewForbidden { view: "pending" })
            }
            _ => Ok(()),
        }
    }
}
