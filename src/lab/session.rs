//! Lab session state
//!
//! All state for one interactive session: the user info inputs and the two
//! variants. A send only touches a variant after the provider answered.

use tracing::{info, warn};

use super::turn::Turn;
use super::variant::{Variant, VariantId};
use crate::config::LabConfig;
use crate::gemini::ChatProvider;
use crate::prompt::{extract_action_items, extract_response_content, merge_prompt, UserContext};
use crate::{LabError, Result};

pub const MIN_SESSION_MINUTES: u32 = 1;
pub const MAX_SESSION_MINUTES: u32 = 120;
pub const DEFAULT_SESSION_MINUTES: u32 = 5;

/// Live user info inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    session_minutes: u32,
    pub summaries: String,
}

impl UserInfo {
    pub fn new(
        name: impl Into<String>,
        session_minutes: u32,
        summaries: impl Into<String>,
    ) -> Self {
        let mut info = Self {
            name: name.into(),
            session_minutes: DEFAULT_SESSION_MINUTES,
            summaries: summaries.into(),
        };
        info.set_session_minutes(session_minutes);
        info
    }

    pub fn session_minutes(&self) -> u32 {
        self.session_minutes
    }

    /// Set the session length, clamped to 1..=120 minutes
    pub fn set_session_minutes(&mut self, minutes: u32) {
        self.session_minutes = minutes.clamp(MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
    }

    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.session_minutes) * 60
    }

    pub fn context(&self) -> UserContext {
        UserContext::new(self.name.clone(), self.duration_seconds(), self.summaries.clone())
    }
}

impl Default for UserInfo {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_USER_NAME, DEFAULT_SESSION_MINUTES, "")
    }
}

/// One comparison session: user info plus exactly two variants
#[derive(Debug, Clone)]
pub struct Lab {
    pub user: UserInfo,
    variants: [Variant; 2],
    seed_templates: [String; 2],
}

impl Lab {
    pub fn new(user: UserInfo, templates: [String; 2]) -> Self {
        let variants = Self::fresh_variants(&templates);
        Self {
            user,
            variants,
            seed_templates: templates,
        }
    }

    pub fn from_config(config: &LabConfig) -> Self {
        Self::new(
            UserInfo::new(
                config.user_name.clone(),
                config.session_minutes,
                config.summaries.clone(),
            ),
            config.templates.clone(),
        )
    }

    fn fresh_variants(templates: &[String; 2]) -> [Variant; 2] {
        VariantId::ALL.map(|id| Variant::new(id, templates[id.index()].clone()))
    }

    pub fn variant(&self, id: VariantId) -> &Variant {
        &self.variants[id.index()]
    }

    pub(crate) fn variant_mut(&mut self, id: VariantId) -> &mut Variant {
        &mut self.variants[id.index()]
    }

    pub fn variants(&self) -> &[Variant; 2] {
        &self.variants
    }

    pub fn set_template(&mut self, id: VariantId, template: impl Into<String>) {
        self.variant_mut(id).template = template.into();
    }

    /// Context block from the current user info. Rebuilt on every call, so
    /// edits apply to the next message sent.
    pub fn context_block(&self) -> String {
        self.user.context().block()
    }

    /// The system instruction the next message to `id` would be sent with
    pub fn system_instruction(&self, id: VariantId) -> String {
        merge_prompt(&self.context_block(), &self.variant(id).template)
    }

    /// Send `message` to one variant and record the exchange.
    ///
    /// On any error the variant is left exactly as it was.
    pub async fn send<P: ChatProvider>(
        &mut self,
        id: VariantId,
        message: &str,
        provider: &P,
    ) -> Result<()> {
        if message.trim().is_empty() {
            return Err(LabError::EmptyMessage);
        }

        let system_instruction = self.system_instruction(id);
        let reply = {
            let variant = self.variant(id);
            provider
                .send_message(&system_instruction, &variant.history, message)
                .await
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{id}: send failed, state unchanged: {e}");
                return Err(e);
            }
        };

        let variant = self.variant_mut(id);
        variant.last_reply = extract_response_content(&reply.text);
        variant.last_action_items = extract_action_items(&reply.text);
        variant.history = reply.history;
        info!(
            "{id}: exchange #{} recorded ({} chars reply)",
            variant.exchange_count(),
            reply.text.len()
        );

        Ok(())
    }

    /// Discard the session: both variants go back to their seed templates
    /// with empty conversations. User info is kept.
    pub fn reset(&mut self) {
        self.variants = Self::fresh_variants(&self.seed_templates);
        info!("Session discarded");
    }

    /// Turns of one variant, oldest first
    pub fn history(&self, id: VariantId) -> &[Turn] {
        &self.variant(id).history
    }
}
