//! Program graph → command sequence.
//!
//! Walks every root chain in workspace order, resolves slots depth-first in
//! declaration order, and expands each statement block's template into one
//! [`Command`]. Blocks that cannot be resolved are skipped with a recorded
//! diagnostic; they never emit a short or malformed command. Cycles abort the
//! whole generation with zero commands, so a bad graph can never start
//! executing partially.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::catalog::{BlockRole, Catalog, SlotSpec};
use crate::command::{Command, Value};
use crate::program::{Block, BlockId, ProgramGraph, SlotInput};

/// Why a block (or the whole program) produced no command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Zero root chains. A notice, not an error.
    EmptyProgram,
    /// Block kind not present in the catalog.
    UnknownKind,
    /// Empty slot with no declared default.
    MissingInput,
    /// A slot received a value of the wrong type.
    TypeMismatch,
    /// A block id that points at nothing.
    DanglingReference,
    /// A value block in a statement chain, or a statement block in a slot.
    MisplacedBlock,
}

/// One recorded generation notice. Serializable for UI consumption.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateDiagnostic {
    pub kind: DiagnosticKind,
    /// Kind of the offending block, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    pub message: String,
}

impl GenerateDiagnostic {
    fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            block: None,
            slot: None,
            message: message.into(),
        }
    }

    fn with_block(mut self, kind: &str) -> Self {
        self.block = Some(kind.to_string());
        self
    }

    fn with_slot(mut self, slot: &str) -> Self {
        self.slot = Some(slot.to_string());
        self
    }
}

/// The slot graph contains a cycle. Fatal for the whole run: no commands are
/// produced and nothing executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleError {
    /// The block at which the cycle closed.
    pub block: BlockId,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cyclic reference involving block {}", self.block)
    }
}

impl std::error::Error for CycleError {}

/// Output of a generation pass: the commands, plus everything worth telling
/// the user about blocks that were skipped.
#[derive(Debug, Clone, Default)]
pub struct GeneratedProgram {
    pub commands: Vec<Command>,
    pub diagnostics: Vec<GenerateDiagnostic>,
}

impl GeneratedProgram {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Generate the command sequence for a program graph.
///
/// Root chains are processed in workspace order and their command sequences
/// concatenated. An empty graph is not an error; it yields zero commands and
/// an [`DiagnosticKind::EmptyProgram`] notice.
pub fn generate(graph: &ProgramGraph, catalog: &Catalog) -> Result<GeneratedProgram, CycleError> {
    let mut out = GeneratedProgram::default();

    if graph.roots.is_empty() {
        out.diagnostics.push(GenerateDiagnostic::new(
            DiagnosticKind::EmptyProgram,
            "the workspace has no blocks to run",
        ));
        return Ok(out);
    }

    for &root in &graph.roots {
        generate_chain(graph, catalog, root, &mut out)?;
    }

    log::debug!(
        "generated {} commands ({} diagnostics)",
        out.commands.len(),
        out.diagnostics.len()
    );

    Ok(out)
}

/// Walk one statement chain from its root.
fn generate_chain(
    graph: &ProgramGraph,
    catalog: &Catalog,
    root: BlockId,
    out: &mut GeneratedProgram,
) -> Result<(), CycleError> {
    let mut visited = HashSet::new();
    let mut cursor = Some(root);

    while let Some(id) = cursor {
        if !visited.insert(id) {
            return Err(CycleError { block: id });
        }

        let Some(block) = graph.get(id) else {
            out.diagnostics.push(GenerateDiagnostic::new(
                DiagnosticKind::DanglingReference,
                format!("chain references missing block {id}"),
            ));
            break;
        };
        cursor = block.next;

        let Some(spec) = catalog.get(&block.kind) else {
            out.diagnostics.push(
                GenerateDiagnostic::new(
                    DiagnosticKind::UnknownKind,
                    format!("unknown block kind {:?}", block.kind),
                )
                .with_block(&block.kind),
            );
            continue;
        };

        let template = match &spec.role {
            BlockRole::Statement { template } => template,
            BlockRole::Value => {
                out.diagnostics.push(
                    GenerateDiagnostic::new(
                        DiagnosticKind::MisplacedBlock,
                        format!("value block {:?} cannot be used as a statement", block.kind),
                    )
                    .with_block(&block.kind),
                );
                continue;
            }
        };

        // The statement itself is on the resolution stack, so a nested value
        // block reaching back to it is reported as a cycle.
        let mut resolving = HashSet::from([id]);
        let mut resolved: HashMap<&str, Value> = HashMap::new();
        let mut complete = true;

        for slot in &spec.slots {
            match resolve_slot(graph, catalog, block, slot, &mut resolving, out)? {
                Some(value) => {
                    resolved.insert(slot.name, value);
                }
                None => {
                    complete = false;
                    break;
                }
            }
        }

        if complete {
            out.commands.push(template.expand(&resolved));
        } else {
            log::debug!("skipped block {:?} ({id})", block.kind);
        }
    }

    Ok(())
}

/// Resolve one declared slot of `block` to a literal.
///
/// `Ok(None)` means the slot could not be resolved; a diagnostic has already
/// been recorded and the enclosing block must be skipped.
fn resolve_slot(
    graph: &ProgramGraph,
    catalog: &Catalog,
    block: &Block,
    slot: &SlotSpec,
    resolving: &mut HashSet<BlockId>,
    out: &mut GeneratedProgram,
) -> Result<Option<Value>, CycleError> {
    match block.input(slot.name) {
        None => match &slot.default {
            Some(default) => Ok(Some(*default)),
            None => {
                out.diagnostics.push(
                    GenerateDiagnostic::new(
                        DiagnosticKind::MissingInput,
                        format!(
                            "slot {:?} of {:?} is empty and has no default",
                            slot.name, block.kind
                        ),
                    )
                    .with_block(&block.kind)
                    .with_slot(slot.name),
                );
                Ok(None)
            }
        },
        Some(SlotInput::Literal(value)) => {
            if slot.ty.accepts(value) {
                Ok(Some(*value))
            } else {
                out.diagnostics.push(
                    GenerateDiagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        format!(
                            "slot {:?} of {:?} expects a {} but got a {}",
                            slot.name,
                            block.kind,
                            slot.ty,
                            value.type_name()
                        ),
                    )
                    .with_block(&block.kind)
                    .with_slot(slot.name),
                );
                Ok(None)
            }
        }
        Some(SlotInput::Block { block: nested }) => {
            resolve_value_block(graph, catalog, *nested, slot, resolving, out)
        }
    }
}

/// Resolve a nested value block, depth-first.
fn resolve_value_block(
    graph: &ProgramGraph,
    catalog: &Catalog,
    id: BlockId,
    expected: &SlotSpec,
    resolving: &mut HashSet<BlockId>,
    out: &mut GeneratedProgram,
) -> Result<Option<Value>, CycleError> {
    if !resolving.insert(id) {
        return Err(CycleError { block: id });
    }
    let result = resolve_value_inner(graph, catalog, id, expected, resolving, out);
    resolving.remove(&id);
    result
}

fn resolve_value_inner(
    graph: &ProgramGraph,
    catalog: &Catalog,
    id: BlockId,
    expected: &SlotSpec,
    resolving: &mut HashSet<BlockId>,
    out: &mut GeneratedProgram,
) -> Result<Option<Value>, CycleError> {
    let Some(block) = graph.get(id) else {
        out.diagnostics.push(
            GenerateDiagnostic::new(
                DiagnosticKind::DanglingReference,
                format!("slot {:?} references missing block {id}", expected.name),
            )
            .with_slot(expected.name),
        );
        return Ok(None);
    };

    let Some(spec) = catalog.get(&block.kind) else {
        out.diagnostics.push(
            GenerateDiagnostic::new(
                DiagnosticKind::UnknownKind,
                format!("unknown block kind {:?}", block.kind),
            )
            .with_block(&block.kind),
        );
        return Ok(None);
    };

    if !spec.is_value() {
        out.diagnostics.push(
            GenerateDiagnostic::new(
                DiagnosticKind::MisplacedBlock,
                format!(
                    "statement block {:?} cannot fill slot {:?}",
                    block.kind, expected.name
                ),
            )
            .with_block(&block.kind)
            .with_slot(expected.name),
        );
        return Ok(None);
    }

    // Registration guarantees value blocks declare exactly one slot; that
    // slot may itself hold a literal or another value block.
    let inner = &spec.slots[0];
    let Some(value) = resolve_slot(graph, catalog, block, inner, resolving, out)? else {
        return Ok(None);
    };

    if expected.ty.accepts(&value) {
        Ok(Some(value))
    } else {
        out.diagnostics.push(
            GenerateDiagnostic::new(
                DiagnosticKind::TypeMismatch,
                format!(
                    "slot {:?} expects a {} but block {:?} produced a {}",
                    expected.name,
                    expected.ty,
                    block.kind,
                    value.type_name()
                ),
            )
            .with_block(&block.kind)
            .with_slot(expected.name),
        );
        Ok(None)
    }
}
