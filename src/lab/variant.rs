//! Prompt variants under comparison

use std::fmt;

use super::turn::{Turn, TurnRole};

pub const DEFAULT_TEMPLATE_A: &str =
    "<>Userinfo</>\n\nYou are a friendly coach. Answer in <=50 words.";
pub const DEFAULT_TEMPLATE_B: &str =
    "<>Userinfo</>\n\nYou are a concise coach. Answer in <=30 words and end with 🎯.";

/// Identifier of one of the two fixed variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantId {
    A,
    B,
}

impl VariantId {
    pub const ALL: [VariantId; 2] = [VariantId::A, VariantId::B];

    pub fn label(&self) -> &'static str {
        match self {
            VariantId::A => "Prompt-A",
            VariantId::B => "Prompt-B",
        }
    }

    /// Key under `[templates]` in the config file
    pub fn config_key(&self) -> &'static str {
        match self {
            VariantId::A => "prompt_a",
            VariantId::B => "prompt_b",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            VariantId::A => DEFAULT_TEMPLATE_A,
            VariantId::B => DEFAULT_TEMPLATE_B,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            VariantId::A => 0,
            VariantId::B => 1,
        }
    }

    pub fn other(&self) -> VariantId {
        match self {
            VariantId::A => VariantId::B,
            VariantId::B => VariantId::A,
        }
    }

    /// Parse `a`, `b`, `prompt-a` or `prompt-b` (any case)
    pub fn parse(s: &str) -> Option<VariantId> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "prompt-a" => Some(VariantId::A),
            "b" | "prompt-b" => Some(VariantId::B),
            _ => None,
        }
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One prompt configuration and its conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub id: VariantId,
    pub template: String,
    pub history: Vec<Turn>,
    /// Tag-stripped text of the most recent model turn
    pub last_reply: String,
    pub last_action_items: String,
}

impl Variant {
    pub fn new(id: VariantId, template: impl Into<String>) -> Self {
        Self {
            id,
            template: template.into(),
            history: Vec::new(),
            last_reply: String::new(),
            last_action_items: String::new(),
        }
    }

    /// Number of completed user/model exchanges
    pub fn exchange_count(&self) -> usize {
        self.history
            .iter()
            .filter(|t| t.role == TurnRole::Model)
            .count()
    }
}
