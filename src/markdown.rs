//! Softens double Markdown delimiters to Telegram's single-delimiter dialect.

/// Replace every `**` with `*` and every `__` with `_`.
///
/// This is naive string replacement, not markup-aware: text that legitimately
/// contains double delimiters unrelated to emphasis gets rewritten too, and
/// the pass is not idempotent (`****` becomes `**`, which a second pass would
/// collapse to `*`). Known, accepted behavior.
pub fn soften(text: &str) -> String {
    text.replace("**", "*").replace("__", "_")
}
