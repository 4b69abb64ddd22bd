//! Template merging

/// Marker in a coach template that is replaced by the context block.
pub const USERINFO_PLACEHOLDER: &str = "<>Userinfo</>";

/// Insert the context block into a coach template.
///
/// Templates without the marker still get the context, prepended on its own
/// line.
pub fn merge_prompt(context_block: &str, template: &str) -> String {
    if template.contains(USERINFO_PLACEHOLDER) {
        template.replace(USERINFO_PLACEHOLDER, context_block)
    } else {
        format!("{context_block}\n{template}")
    }
}
