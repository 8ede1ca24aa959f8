mod document;
mod resolve;

use tokio::sync::mpsc::{self, Sender};
use tower_lsp::{lsp_types::Url, Client};
use tracing::debug;
use tree_parser::MavenRunner;

use crate::{
    config::UserConfig,
    entity::CanonicalUri,
    usecase::{Document, Workspace},
};

use self::{
    document::{handle_changed, handle_closed, handle_configured, handle_opened_saved},
    resolve::{handle_ready_to_refresh, handle_refresh, handle_tree_resolved},
};

use super::{
    code_action::code_action,
    command::{dependency_tree_json, go_to_effective_json},
    context::{AppraiserContext, MavenDocumentEvent},
    debouncer::Debouncer,
    diagnostic::{ConflictDiagnostics, DiagnosticController},
    gd::goto_definition,
    hover::hover,
};

/// Owns every open pom and runs a dedicated task receiving the LSP events.
/// All state is touched by that task only.
pub struct Appraiser {
    client: Client,
    config: UserConfig,
}

impl Appraiser {
    pub fn new(client: Client, config: UserConfig) -> Self {
        Self { client, config }
    }

    pub fn initialize(self) -> Sender<MavenDocumentEvent> {
        let (tx, mut rx) = mpsc::channel::<MavenDocumentEvent>(64);
        let inner_tx = tx.clone();
        let client = self.client;
        let mut config = self.config;

        tokio::spawn(async move {
            let mut state = Workspace::new();
            let mut diagnostic_controller = DiagnosticController::new(client.clone());
            let mut conflicts = ConflictDiagnostics::new(&config);
            let mut runner = MavenRunner::new(config.runner_config());
            let debouncer = Debouncer::spawn(inner_tx.clone());

            while let Some(event) = rx.recv().await {
                let mut ctx = AppraiserContext {
                    state: &mut state,
                    diagnostic_controller: &mut diagnostic_controller,
                    conflicts: &mut conflicts,
                    debouncer: &debouncer,
                    runner: &mut runner,
                    config: &mut config,
                    inner_tx: &inner_tx,
                    client: &client,
                };

                match event {
                    MavenDocumentEvent::Configured(config) => {
                        handle_configured(&mut ctx, config).await
                    }
                    MavenDocumentEvent::Opened(msg) | MavenDocumentEvent::Saved(msg) => {
                        handle_opened_saved(&mut ctx, msg).await
                    }
                    MavenDocumentEvent::Changed(msg) => handle_changed(&mut ctx, msg).await,
                    MavenDocumentEvent::Closed(uri) => handle_closed(&mut ctx, uri).await,
                    MavenDocumentEvent::ReadyToRefresh(event_ctx) => {
                        handle_ready_to_refresh(&mut ctx, event_ctx).await
                    }
                    MavenDocumentEvent::TreeResolved(output) => {
                        handle_tree_resolved(&mut ctx, output).await
                    }
                    MavenDocumentEvent::Refresh(uri) => handle_refresh(&mut ctx, uri).await,
                    MavenDocumentEvent::CodeAction(uri, _range, diagnostics, tx) => {
                        let Some(doc) = find_document(ctx.state, &uri) else {
                            let _ = tx.send(vec![]);
                            continue;
                        };
                        let actions = code_action(
                            &uri,
                            doc.text(),
                            &diagnostics,
                            ctx.conflicts,
                            doc.tree.as_ref(),
                        );
                        let _ = tx.send(actions);
                    }
                    MavenDocumentEvent::Hovered(uri, pos, tx) => {
                        let h = find_document(ctx.state, &uri).and_then(|doc| hover(doc, pos));
                        let _ = tx.send(h);
                    }
                    MavenDocumentEvent::Gded(uri, pos, tx) => {
                        let gd = find_document(ctx.state, &uri)
                            .and_then(|doc| goto_definition(doc, pos));
                        let _ = tx.send(gd);
                    }
                    MavenDocumentEvent::DependencyTree(uri, tx) => {
                        let value = find_document(ctx.state, &uri)
                            .and_then(|doc| doc.tree.as_ref())
                            .and_then(dependency_tree_json);
                        let _ = tx.send(value);
                    }
                    MavenDocumentEvent::GoToEffective(uri, group_id, artifact_id, tx) => {
                        let value = find_document(ctx.state, &uri)
                            .and_then(|doc| doc.tree.as_ref())
                            .and_then(|tree| go_to_effective_json(tree, &group_id, &artifact_id));
                        let _ = tx.send(value);
                    }
                }
            }
            debug!("appraiser event loop stopped");
        });
        tx
    }
}

fn find_document<'a>(state: &'a Workspace, uri: &Url) -> Option<&'a Document> {
    if let Some(doc) = state.document_by_uri(uri) {
        return Some(doc);
    }
    let canonical_uri: CanonicalUri = uri.clone().try_into().ok()?;
    state.document(&canonical_uri)
}
