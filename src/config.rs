//! Environment-driven calling-convention fallback.
//!
//! When a verb invocation's calling convention cannot be determined, the
//! policy configured here decides the behavior. The policy is resolved per
//! verb name from `TIDYFRAME_<VERB>_AST_FALLBACK`, with
//! `TIDYFRAME_VERB_AST_FALLBACK` as the global default; the per-verb form
//! takes precedence.

use std::str::FromStr;

use crate::{FrameError, Result};

/// Fallback policy when the calling convention is ambiguous.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AstFallback {
    /// Assume pipe usage (`data >> verb(...)`).
    Piping,
    /// Assume a direct call (`verb.apply(data)`).
    #[default]
    Normal,
    /// Fail loudly.
    Raise,
}

impl FromStr for AstFallback {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "piping" => Ok(AstFallback::Piping),
            "normal" => Ok(AstFallback::Normal),
            "raise" => Ok(AstFallback::Raise),
            other => Err(format!(
                "expected one of 'piping', 'normal', 'raise', got '{other}'"
            )),
        }
    }
}

/// Resolve the fallback policy for `verb`.
///
/// The verb name is uppercased with any trailing underscore removed, so a
/// verb exposed as `filter_` still reads `TIDYFRAME_FILTER_AST_FALLBACK`.
/// Unset variables yield the default policy.
pub fn ast_fallback_for(verb: &str) -> Result<AstFallback> {
    let verb_name = verb.trim_end_matches('_').to_uppercase();
    let per_verb_key = format!("TIDYFRAME_{verb_name}_AST_FALLBACK");

    for key in [per_verb_key, "TIDYFRAME_VERB_AST_FALLBACK".to_string()] {
        if let Ok(value) = std::env::var(&key) {
            if value.is_empty() {
                continue;
            }
            return value
                .parse()
                .map_err(|message| FrameError::configuration(key, message));
        }
    }
    Ok(AstFallback::default())
}

#[cfg(test)]
mod tests {
    use super::{ast_fallback_for, AstFallback};

    // Env mutation is process-global; keep every case in one test to avoid
    // interference between parallel test threads.
    #[test]
    fn per_verb_setting_takes_precedence_over_global() {
        std::env::remove_var("TIDYFRAME_VERB_AST_FALLBACK");
        std::env::remove_var("TIDYFRAME_MUTATE_AST_FALLBACK");
        assert_eq!(ast_fallback_for("mutate").unwrap(), AstFallback::Normal);

        std::env::set_var("TIDYFRAME_VERB_AST_FALLBACK", "piping");
        assert_eq!(ast_fallback_for("mutate").unwrap(), AstFallback::Piping);

        std::env::set_var("TIDYFRAME_MUTATE_AST_FALLBACK", "raise");
        assert_eq!(ast_fallback_for("mutate").unwrap(), AstFallback::Raise);
        // trailing underscore and case-insensitivity of the verb name
        assert_eq!(ast_fallback_for("mutate_").unwrap(), AstFallback::Raise);
        // other verbs still see the global value
        assert_eq!(ast_fallback_for("filter").unwrap(), AstFallback::Piping);

        std::env::set_var("TIDYFRAME_MUTATE_AST_FALLBACK", "bogus");
        let err = ast_fallback_for("mutate").unwrap_err();
        assert!(matches!(err, crate::FrameError::Configuration { .. }));

        std::env::remove_var("TIDYFRAME_VERB_AST_FALLBACK");
        std::env::remove_var("TIDYFRAME_MUTATE_AST_FALLBACK");
    }
}
