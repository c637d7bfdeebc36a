use crate::syntax::{NodeId, Span};
use bitflags::bitflags;

bitflags! {
    /// Optional features of the target runtime. An edit that is normally
    /// rude may be permitted when the runtime declares the matching
    /// capability; this set is the sole per-runtime parameterization point.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct RuntimeCapabilities: u32 {
        const BASELINE = 1 << 0;
        const ADD_METHOD_TO_EXISTING_TYPE = 1 << 1;
        const ADD_INSTANCE_FIELD_TO_EXISTING_TYPE = 1 << 2;
        const ADD_STATIC_FIELD_TO_EXISTING_TYPE = 1 << 3;
        const NEW_TYPE_DEFINITION = 1 << 4;
        const UPDATE_METHOD_CONTAINING_CLOSURE = 1 << 5;
    }
}

impl RuntimeCapabilities {
    /// Parses one dashed capability name, as passed on the command line.
    pub fn from_capability_name(name: &str) -> Option<Self> {
        Some(match name {
            "baseline" => RuntimeCapabilities::BASELINE,
            "add-method-to-existing-type" => RuntimeCapabilities::ADD_METHOD_TO_EXISTING_TYPE,
            "add-instance-field-to-existing-type" => {
                RuntimeCapabilities::ADD_INSTANCE_FIELD_TO_EXISTING_TYPE
            }
            "add-static-field-to-existing-type" => {
                RuntimeCapabilities::ADD_STATIC_FIELD_TO_EXISTING_TYPE
            }
            "new-type-definition" => RuntimeCapabilities::NEW_TYPE_DEFINITION,
            "update-method-containing-closure" => {
                RuntimeCapabilities::UPDATE_METHOD_CONTAINING_CLOSURE
            }
            _ => return None,
        })
    }
}

/// Closed classification of changes that cannot be applied to a running
/// process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RudeEditKind {
    Insert,
    Delete,
    Update,
    Move,
    Renamed,

    InsertAroundActiveStatement,
    DeleteAroundActiveStatement,
    UpdateAroundActiveStatement,
    ActiveStatementUpdate,
    DeleteActiveStatement,

    SwitchBetweenLambdaAndLocalFunction,
    ChangingAwaitShape,

    ExperimentalFeaturesEnabled,
    SourceFileTooBig,
    InsertFile,

    InternalError,
    OutOfMemory,
}

impl RudeEditKind {
    pub fn name(self) -> &'static str {
        match self {
            RudeEditKind::Insert => "insert",
            RudeEditKind::Delete => "delete",
            RudeEditKind::Update => "update",
            RudeEditKind::Move => "move",
            RudeEditKind::Renamed => "renamed",
            RudeEditKind::InsertAroundActiveStatement => "insert_around_active_statement",
            RudeEditKind::DeleteAroundActiveStatement => "delete_around_active_statement",
            RudeEditKind::UpdateAroundActiveStatement => "update_around_active_statement",
            RudeEditKind::ActiveStatementUpdate => "active_statement_update",
            RudeEditKind::DeleteActiveStatement => "delete_active_statement",
            RudeEditKind::SwitchBetweenLambdaAndLocalFunction => {
                "switch_between_lambda_and_local_function"
            }
            RudeEditKind::ChangingAwaitShape => "changing_await_shape",
            RudeEditKind::ExperimentalFeaturesEnabled => "experimental_features_enabled",
            RudeEditKind::SourceFileTooBig => "source_file_too_big",
            RudeEditKind::InsertFile => "insert_file",
            RudeEditKind::InternalError => "internal_error",
            RudeEditKind::OutOfMemory => "out_of_memory",
        }
    }

    /// Short user-facing summary; the diagnostics layer owns the full
    /// format-string table.
    pub fn description(self) -> &'static str {
        match self {
            RudeEditKind::Insert => "adding this declaration requires restarting the application",
            RudeEditKind::Delete => "deleting a declaration requires restarting the application",
            RudeEditKind::Update => "updating this declaration requires restarting the application",
            RudeEditKind::Move => "moving a declaration requires restarting the application",
            RudeEditKind::Renamed => "renaming a declaration requires restarting the application",
            RudeEditKind::InsertAroundActiveStatement => {
                "adding a suspension point around an active statement"
            }
            RudeEditKind::DeleteAroundActiveStatement => {
                "deleting a suspension point around an active statement"
            }
            RudeEditKind::UpdateAroundActiveStatement => {
                "updating a suspension point around an active statement"
            }
            RudeEditKind::ActiveStatementUpdate => "updating an active statement",
            RudeEditKind::DeleteActiveStatement => {
                "an active statement has been removed from its method"
            }
            RudeEditKind::SwitchBetweenLambdaAndLocalFunction => {
                "switching between a lambda and a local function"
            }
            RudeEditKind::ChangingAwaitShape => {
                "changing the shape of an await expression or statement"
            }
            RudeEditKind::ExperimentalFeaturesEnabled => {
                "modifying source with experimental language features enabled"
            }
            RudeEditKind::SourceFileTooBig => "the source file is too large for analysis",
            RudeEditKind::InsertFile => "adding a new file while the application is running",
            RudeEditKind::InternalError => "an internal error occurred while analyzing the edit",
            RudeEditKind::OutOfMemory => {
                "the analysis ran out of memory; restart the application"
            }
        }
    }
}

/// A classified "cannot hot-apply this" outcome. Always recoverable and
/// surfaced to the user; never an error path.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RudeEdit {
    pub kind: RudeEditKind,
    /// New-tree node the edit is attached to, when there is one.
    pub node: Option<NodeId>,
    /// Span to report, resolved by the diagnostic span resolver.
    pub span: Span,
    /// First line of the failure detail for internal errors.
    pub detail: Option<String>,
}

impl RudeEdit {
    pub fn new(kind: RudeEditKind, node: Option<NodeId>, span: Span) -> Self {
        RudeEdit {
            kind,
            node,
            span,
            detail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RuntimeCapabilities;

    #[test]
    fn capability_names_parse() {
        assert_eq!(
            RuntimeCapabilities::from_capability_name("baseline"),
            Some(RuntimeCapabilities::BASELINE)
        );
        assert_eq!(
            RuntimeCapabilities::from_capability_name("add-static-field-to-existing-type"),
            Some(RuntimeCapabilities::ADD_STATIC_FIELD_TO_EXISTING_TYPE)
        );
        assert_eq!(RuntimeCapabilities::from_capability_name("warp-drive"), None);
    }
}
