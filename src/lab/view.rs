//! View models for front ends
//!
//! Plain data derived from a [`Lab`]; the TUI and the plain mode both
//! render from these.

use super::session::Lab;
use super::turn::TurnRole;
use super::variant::{Variant, VariantId};
use crate::prompt::extract_response_content;

pub const NO_CONTENT: &str = "No content";
pub const NO_ACTION_ITEMS: &str = "No action items found in the latest response.";
pub const NO_ACTION_ITEMS_SHORT: &str = "_No action items found_";

/// One transcript line: role label and display text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: TurnRole,
    pub text: String,
}

/// Transcript of a variant. Model turns show the `<response>` content
/// instead of the raw tagged text. Only a turn with no content at all is
/// shown as `No content`; an empty `<response>` block stays empty.
pub fn transcript(variant: &Variant) -> Vec<TranscriptEntry> {
    variant
        .history
        .iter()
        .map(|turn| {
            let text = if turn.content.is_empty() {
                NO_CONTENT.to_string()
            } else {
                match turn.role {
                    TurnRole::Model => extract_response_content(&turn.content),
                    TurnRole::User => turn.content.clone(),
                }
            };
            TranscriptEntry {
                role: turn.role,
                text,
            }
        })
        .collect()
}

/// Result of asking for a variant's action items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionItemsReveal {
    Items(String),
    NoneFound,
}

impl ActionItemsReveal {
    pub fn of(variant: &Variant) -> Self {
        if variant.last_action_items.is_empty() {
            ActionItemsReveal::NoneFound
        } else {
            ActionItemsReveal::Items(variant.last_action_items.clone())
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ActionItemsReveal::Items(items) => items,
            ActionItemsReveal::NoneFound => NO_ACTION_ITEMS,
        }
    }
}

/// One column of the comparison view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonColumn {
    pub id: VariantId,
    pub last_reply: String,
    /// Action items, or the "none found" placeholder
    pub action_items: String,
    pub has_action_items: bool,
}

/// Both variants' latest results next to each other
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub columns: [ComparisonColumn; 2],
}

pub fn comparison(lab: &Lab) -> Comparison {
    Comparison {
        columns: VariantId::ALL.map(|id| {
            let v = lab.variant(id);
            let has_action_items = !v.last_action_items.is_empty();
            ComparisonColumn {
                id,
                last_reply: v.last_reply.clone(),
                action_items: if has_action_items {
                    v.last_action_items.clone()
                } else {
                    NO_ACTION_ITEMS_SHORT.to_string()
                },
                has_action_items,
            }
        }),
    }
}

impl Comparison {
    /// Plain-text rendering used by the line mode
    pub fn to_text(&self) -> String {
        let mut out = String::from("## Latest replies comparison\n");
        for col in &self.columns {
            out.push_str(&format!("\n### {}\n{}\n", col.id, col.last_reply));
        }
        out.push_str("\n## Action Items comparison\n");
        for col in &self.columns {
            out.push_str(&format!("\n### {} - Action Items\n{}\n", col.id, col.action_items));
        }
        out
    }
}
