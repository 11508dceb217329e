//! Domain models for content items, summaries, claims, and prompts.

mod claim;
mod content;
mod domain;
mod moderation;
mod preference;
mod prompt;
mod summary;

pub use claim::{Claim, ClaimSeverity, ClaimStatus};
pub use content::{ContentItem, FailureCategory, SourceType, FAILURE_SENTINEL_PREFIX};
pub use domain::DomainStats;
pub use moderation::ModerationFlag;
pub use preference::UserPreferences;
pub use prompt::AnalysisPrompt;
pub use summary::{ProcessingStatus, SectionKind, Summary};
