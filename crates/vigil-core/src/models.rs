//! Model catalogue of the educational data store.
//!
//! The engine is schema-generic: it talks to the store through model names and
//! JSON rows. This module names the models the checks reason about, the field
//! names they read, and the ownership rules that drive orphan detection.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A model (table) known to the maintenance engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    Users,
    Profiles,
    Assessments,
    AssessmentResults,
    AccountLinks,
    Resources,
    CurriculumPlans,
    SemhAssessments,
    BiofeedbackSessions,
    EmotionalPatterns,
}

impl Model {
    /// Every model, in the order health statistics report them.
    pub const ALL: [Self; 10] = [
        Self::Users,
        Self::Profiles,
        Self::Assessments,
        Self::AssessmentResults,
        Self::AccountLinks,
        Self::Resources,
        Self::CurriculumPlans,
        Self::SemhAssessments,
        Self::BiofeedbackSessions,
        Self::EmotionalPatterns,
    ];

    /// Store-level name of the model.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Profiles => "profiles",
            Self::Assessments => "assessments",
            Self::AssessmentResults => "assessment_results",
            Self::AccountLinks => "account_links",
            Self::Resources => "resources",
            Self::CurriculumPlans => "curriculum_plans",
            Self::SemhAssessments => "semh_assessments",
            Self::BiofeedbackSessions => "biofeedback_sessions",
            Self::EmotionalPatterns => "emotional_patterns",
        }
    }

    /// Look up a model by its store-level name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Records holding emotional/health data about learners. Operations on
    /// these are mirrored into the educational log stream.
    #[must_use]
    pub const fn is_domain_sensitive(self) -> bool {
        matches!(
            self,
            Self::SemhAssessments | Self::BiofeedbackSessions | Self::EmotionalPatterns
        )
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `model` names a domain-sensitive model.
#[must_use]
pub fn is_domain_sensitive_name(model: &str) -> bool {
    Model::from_name(model).is_some_and(Model::is_domain_sensitive)
}

/// Field names read or written by the engine.
pub mod fields {
    pub const ID: &str = "id";
    pub const EMAIL: &str = "email";
    pub const NAME: &str = "name";
    pub const ROLE: &str = "role";
    pub const CREATED_AT: &str = "created_at";
    pub const USER_ID: &str = "user_id";
    pub const ASSESSMENT_ID: &str = "assessment_id";
    pub const STUDENT_ID: &str = "student_id";
    pub const ACCOUNT_ID: &str = "account_id";
    pub const LINKED_ID: &str = "linked_id";
    pub const RELATION: &str = "relation";
}

// ---------------------------------------------------------------------------
// LinkRelation
// ---------------------------------------------------------------------------

/// Direction of a declared account link.
///
/// A row `(account_id = A, linked_id = B, relation = parent)` reads "A lists B
/// as parent"; its reciprocal is `(B, A, child)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkRelation {
    Parent,
    Child,
}

impl LinkRelation {
    /// The relation the other side must declare.
    #[must_use]
    pub const fn reciprocal(self) -> Self {
        match self {
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" => Some(Self::Parent),
            "child" => Some(Self::Child),
            _ => None,
        }
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ownership rules
// ---------------------------------------------------------------------------

/// A required reference from an owned model to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef {
    pub field: &'static str,
    pub parent: Model,
}

/// An owned model and every reference that must resolve for a row to be live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipRule {
    pub child: Model,
    pub refs: &'static [ParentRef],
}

/// Ownership rules checked by orphan detection, in repair order.
pub const OWNERSHIP_RULES: &[OwnershipRule] = &[
    OwnershipRule {
        child: Model::Profiles,
        refs: &[ParentRef {
            field: fields::USER_ID,
            parent: Model::Users,
        }],
    },
    OwnershipRule {
        child: Model::AssessmentResults,
        refs: &[
            ParentRef {
                field: fields::ASSESSMENT_ID,
                parent: Model::Assessments,
            },
            ParentRef {
                field: fields::STUDENT_ID,
                parent: Model::Users,
            },
        ],
    },
    OwnershipRule {
        child: Model::AccountLinks,
        refs: &[
            ParentRef {
                field: fields::ACCOUNT_ID,
                parent: Model::Users,
            },
            ParentRef {
                field: fields::LINKED_ID,
                parent: Model::Users,
            },
        ],
    },
];

/// Rules whose refs point at accounts, used to cascade account deletion.
pub fn account_dependents() -> impl Iterator<Item = (Model, &'static str)> {
    OWNERSHIP_RULES.iter().flat_map(|rule| {
        rule.refs
            .iter()
            .filter(|r| r.parent == Model::Users)
            .map(move |r| (rule.child, r.field))
    })
}
