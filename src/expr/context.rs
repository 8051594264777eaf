/// Evaluation context markers consumed by verbs.
///
/// A verb declares the context its arguments are resolved under:
/// `Select` resolves expressions to column identifiers, `Eval` to concrete
/// values, `Pending` defers resolution to the verb body, `Mixed` lets the
/// verb resolve different arguments under different contexts, and `Unset`
/// means no resolution happens at the dispatch boundary at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Context {
    /// Resolve to column identifiers only.
    Select,
    /// Resolve to concrete values.
    Eval,
    /// Defer; the verb body resolves explicitly.
    Pending,
    /// Per-argument contexts chosen by the verb body.
    Mixed,
    /// No context declared.
    Unset,
}

/// Evaluation state threaded through expression resolution.
///
/// Records every source column actually read, in first-read order; `mutate`
/// consults this for its `_keep` policy.
#[derive(Debug)]
pub struct EvalCx {
    context: Context,
    used_refs: Vec<String>,
}

impl EvalCx {
    /// Create a fresh evaluation state for `context`.
    pub fn new(context: Context) -> Self {
        Self {
            context,
            used_refs: Vec::new(),
        }
    }

    /// The declared evaluation context.
    pub fn context(&self) -> Context {
        self.context
    }

    /// Record that `name` was read from the source frame.
    pub fn track(&mut self, name: &str) {
        if !self.used_refs.iter().any(|c| c == name) {
            self.used_refs.push(name.to_string());
        }
    }

    /// Columns read so far, in first-read order.
    pub fn used_refs(&self) -> &[String] {
        &self.used_refs
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, EvalCx};

    #[test]
    fn track_preserves_first_read_order_without_duplicates() {
        let mut cx = EvalCx::new(Context::Eval);
        cx.track("b");
        cx.track("a");
        cx.track("b");
        assert_eq!(cx.used_refs(), &["b".to_string(), "a".to_string()]);
    }
}
