//! Dependency tree handlers (ReadyToRefresh, TreeResolved, Refresh).

use std::time::Instant;

use tower_lsp::lsp_types::{MessageType, Url};
use tracing::{debug, error, info};

use crate::entity::CanonicalUri;

use super::super::context::{AppraiserContext, Ctx, MavenDocumentEvent, TreeResolveOutput};

/// Handle `MavenDocumentEvent::ReadyToRefresh`.
pub async fn handle_ready_to_refresh(ctx: &mut AppraiserContext<'_>, event_ctx: Ctx) {
    debug!(
        "Appraiser Event: ReadyToRefresh for URI: {}, rev: {}",
        event_ctx.uri.as_str(),
        event_ctx.rev
    );

    if !ctx.state.check_rev(&event_ctx.uri, event_ctx.rev) {
        debug!("skip refresh of outdated rev {}", event_ctx.rev);
        return;
    }
    start_refresh(ctx, event_ctx);
}

/// Handle `MavenDocumentEvent::Refresh`, ignoring the debouncer.
pub async fn handle_refresh(ctx: &mut AppraiserContext<'_>, uri: Url) {
    debug!("Appraiser Event: Refresh for URI: {}", uri);

    let Some(doc) = ctx.state.document_by_uri(&uri) else {
        debug!("refresh of a closed document: {}", uri);
        return;
    };
    let event_ctx = Ctx {
        uri: doc.canonical_uri.clone(),
        rev: doc.rev,
    };
    start_refresh(ctx, event_ctx);
}

fn start_refresh(ctx: &mut AppraiserContext<'_>, event_ctx: Ctx) {
    let pom = match event_ctx.uri.to_path_buf() {
        Ok(pom) => pom,
        Err(e) => {
            error!("pom path of {}: {}", event_ctx.uri.as_str(), e);
            return;
        }
    };

    let runner = ctx.runner.clone();
    let tx = ctx.inner_tx.clone();
    tokio::spawn(async move {
        let started = Instant::now();
        let result = runner.resolve(&pom).await;
        let output = TreeResolveOutput {
            ctx: event_ctx,
            result,
            elapsed: started.elapsed(),
        };
        if let Err(e) = tx.send(MavenDocumentEvent::TreeResolved(output)).await {
            error!("tree resolved tx error: {}", e);
        }
    });
}

/// Handle `MavenDocumentEvent::TreeResolved`.
pub async fn handle_tree_resolved(ctx: &mut AppraiserContext<'_>, output: TreeResolveOutput) {
    debug!(
        "Appraiser Event: TreeResolved for URI: {}, rev: {} in {:?}",
        output.ctx.uri.as_str(),
        output.ctx.rev,
        output.elapsed
    );

    ctx.debouncer.record_latency(output.elapsed);

    let Some(doc) = ctx.state.document_mut(&output.ctx.uri) else {
        debug!("skip tree of closed document {}", output.ctx.uri.as_str());
        return;
    };

    match output.result {
        Ok(resolved) => {
            if doc.rev != output.ctx.rev {
                // maven reads the file on disk, the tree is as good as it gets
                debug!(
                    "tree resolved for rev {} while document is at rev {}",
                    output.ctx.rev, doc.rev
                );
            }
            info!(
                "{} nodes, {} conflicts in {}",
                resolved.tree.len(),
                resolved.conflicts.len(),
                output.ctx.uri.as_str()
            );
            doc.tree = Some(resolved.tree);
            publish_conflicts(ctx, &output.ctx.uri).await;
        }
        Err(e) => {
            // keep the previous tree and its diagnostics
            error!("dependency tree of {}: {}", output.ctx.uri.as_str(), e);
            ctx.client
                .show_message(
                    MessageType::ERROR,
                    format!("maven-appraiser: failed to resolve dependency tree: {}", e),
                )
                .await;
        }
    }
}

/// Relocate the conflicts of the cached tree in the current text and
/// publish them.
pub async fn publish_conflicts(ctx: &mut AppraiserContext<'_>, uri: &CanonicalUri) {
    let Some(doc) = ctx.state.document_mut(uri) else {
        return;
    };
    let Some(tree) = doc.tree.as_ref() else {
        return;
    };

    match ctx.conflicts.refresh(&doc.uri, doc.text(), tree) {
        Ok(diags) => {
            ctx.diagnostic_controller.replace(&doc.uri, diags).await;
        }
        Err(e) => {
            ctx.conflicts.clear(&doc.uri);
            ctx.diagnostic_controller.clear(&doc.uri).await;
            if doc.structure_reported {
                return;
            }
            doc.structure_reported = true;
            ctx.client
                .show_message(
                    MessageType::WARNING,
                    format!("maven-appraiser: {}: {}", doc.uri, e),
                )
                .await;
        }
    }
}
