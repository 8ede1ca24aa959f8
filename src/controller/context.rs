//! Shared context and types for the Appraiser controller.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc::Sender, oneshot};
use tower_lsp::{
    lsp_types::{CodeActionResponse, Diagnostic, GotoDefinitionResponse, Hover, Position, Range, Url},
    Client,
};
use tree_parser::{DependencyTreeOutput, MavenRunner, TreeError};

use crate::{config::UserConfig, entity::CanonicalUri, usecase::Workspace};

use super::{
    debouncer::Debouncer,
    diagnostic::{ConflictDiagnostics, DiagnosticController},
};

/// Context for dependency tree refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctx {
    pub uri: CanonicalUri,
    pub rev: usize,
}

/// Result of one maven run.
#[derive(Debug)]
pub struct TreeResolveOutput {
    pub ctx: Ctx,
    pub result: Result<DependencyTreeOutput, TreeError>,
    pub elapsed: Duration,
}

/// Events that can be sent to the Appraiser controller.
pub enum MavenDocumentEvent {
    /// Settings from `didChangeConfiguration`
    Configured(UserConfig),
    Opened(PomPayload),
    Saved(PomPayload),
    /// Relocate cached conflicts now, refresh the tree later
    Changed(PomPayload),
    Closed(Url),
    /// The debouncer fired for this rev
    ReadyToRefresh(Ctx),
    /// Result from maven
    TreeResolved(TreeResolveOutput),
    /// Forced refresh from the refresh command
    Refresh(Url),
    /// Code action request with the diagnostics in range
    CodeAction(
        Url,
        Range,
        Vec<Diagnostic>,
        oneshot::Sender<CodeActionResponse>,
    ),
    /// Hover event
    Hovered(Url, Position, oneshot::Sender<Option<Hover>>),
    /// Goto definition request
    Gded(
        Url,
        Position,
        oneshot::Sender<Option<GotoDefinitionResponse>>,
    ),
    /// JSON forest of a pom
    DependencyTree(Url, oneshot::Sender<Option<Value>>),
    /// Path to the effective node of `groupId:artifactId`
    GoToEffective(Url, String, String, oneshot::Sender<Option<Value>>),
}

/// Payload for pom.xml document events.
pub struct PomPayload {
    pub uri: Url,
    pub text: String,
}

/// Shared context passed to all event handlers.
pub struct AppraiserContext<'a> {
    /// Open documents and their trees
    pub state: &'a mut Workspace,
    /// Published diagnostics per file
    pub diagnostic_controller: &'a mut DiagnosticController,
    /// Conflict records behind the published diagnostics
    pub conflicts: &'a mut ConflictDiagnostics,
    pub debouncer: &'a Debouncer,
    pub runner: &'a mut MavenRunner,
    pub config: &'a mut UserConfig,
    /// Sender for internal event loop messages
    pub inner_tx: &'a Sender<MavenDocumentEvent>,
    pub client: &'a Client,
}
