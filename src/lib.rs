mod analysis;
mod cancel;
mod label;
mod matching;
mod options;
mod syntax;
mod tree_text;

pub use crate::analysis::{
    analyze_document, diagnostic_span, ActiveStatement, ActiveStatementFlags, AnalysisError,
    AnalysisRequest, AnalysisResult, MemberUpdate, RudeEdit, RudeEditKind, RuntimeCapabilities,
    TreeEdit,
};
pub use crate::cancel::{Canceled, CancellationToken};
pub use crate::label::{classify, Label};
pub use crate::matching::{
    distance, distance_threshold, match_sequences, match_subtrees, match_trees, subtree_equal,
    token_distance, Edit, EditKind, EditScript, KnownMatch, MatchError, NodeMatch,
};
pub use crate::options::{AnalyzerOptions, InjectedFailure, MatchOptions};
pub use crate::syntax::{NodeId, Span, SyntaxKind, SyntaxTree, TreeBuilder};
pub use crate::tree_text::{parse_tree_text, TreeTextError};
