//! Prompt text handling
//!
//! Builds the user context block, merges it into coach templates and pulls
//! tagged sections back out of model replies.

mod context;
mod tags;
mod template;

pub use context::{build_user_context, UserContext, NO_PREVIOUS_SESSIONS};
pub use tags::{extract_action_items, extract_response_content};
pub use template::{merge_prompt, USERINFO_PLACEHOLDER};
