use crate::syntax::Span;
use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct ActiveStatementFlags: u8 {
        /// The innermost frame; the instruction pointer sits inside this
        /// statement rather than at a call into a deeper frame.
        const LEAF_FRAME = 1 << 0;
        const NON_LEAF_FRAME = 1 << 1;
        /// Set by the analyzer when the statement's anchor has no partner
        /// in the new tree; the position is unresolvable, not dropped.
        const STALE = 1 << 2;
    }
}

/// A source position the debugger considers "where execution is".
///
/// Supplied by the caller against the old tree, relocated by the analyzer
/// to a span in the new tree, and returned in the analysis result. The core
/// never creates or destroys active statements.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ActiveStatement {
    pub ordinal: usize,
    pub span: Span,
    pub flags: ActiveStatementFlags,
}

impl ActiveStatement {
    pub fn new(ordinal: usize, span: Span, flags: ActiveStatementFlags) -> Self {
        ActiveStatement {
            ordinal,
            span,
            flags,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.flags.contains(ActiveStatementFlags::LEAF_FRAME)
    }

    pub fn is_stale(&self) -> bool {
        self.flags.contains(ActiveStatementFlags::STALE)
    }
}
