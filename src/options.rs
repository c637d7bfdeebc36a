/// Tuning knobs for the matching engine. The defaults reproduce the
/// behavior the rest of the crate is tested against; callers normally only
/// touch `match_across_closure_forms`.
#[derive(Clone, Debug)]
pub struct MatchOptions {
    /// Allow a lambda, anonymous method or local function to match any of
    /// the other two forms by nesting position. Disabling restores
    /// same-kind-only matching.
    pub match_across_closure_forms: bool,
    /// Both sequences must exceed this length before the long-sequence
    /// degeneration guard may engage.
    pub long_sequence_len: usize,
    /// Minimum exact-equal leading run required to engage the guard.
    pub long_common_prefix: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            match_across_closure_forms: true,
            long_sequence_len: 1_000,
            long_common_prefix: 64,
        }
    }
}

/// Fault injected by tests into the document analyzer, below the
/// per-document failure boundary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InjectedFailure {
    Panic,
    OutOfMemory,
}

/// Options for a whole document analysis.
#[derive(Clone, Debug)]
pub struct AnalyzerOptions {
    pub match_options: MatchOptions,
    /// Documents with more significant tokens than this are rejected with a
    /// source-file-too-big rude edit instead of being analyzed.
    pub max_tokens: usize,
    /// Trees nested deeper than this are rejected rather than analyzed.
    pub max_depth: u32,
    /// Experimental language features change analysis assumptions; editing
    /// a document that has them enabled is always a rude edit.
    pub experimental_features_enabled: bool,
    /// Test seam: force a catastrophic failure inside the analysis to
    /// exercise the per-document containment boundary.
    pub injected_failure: Option<InjectedFailure>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        AnalyzerOptions {
            match_options: MatchOptions::default(),
            max_tokens: 1 << 20,
            max_depth: 512,
            experimental_features_enabled: false,
            injected_failure: None,
        }
    }
}
