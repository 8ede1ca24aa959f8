//! Document lifecycle handlers (opened, saved, changed, closed, configured).

use tower_lsp::lsp_types::Url;
use tracing::{debug, error, info};

use crate::{config::UserConfig, entity::CanonicalUri};

use super::super::context::{AppraiserContext, Ctx, PomPayload};
use super::resolve::publish_conflicts;

/// Handle `MavenDocumentEvent::Opened` or `MavenDocumentEvent::Saved`.
pub async fn handle_opened_saved(ctx: &mut AppraiserContext<'_>, msg: PomPayload) {
    debug!("Appraiser Event: Opened/Saved for URI: {}", msg.uri);

    let Ok(canonical_uri): Result<CanonicalUri, _> = msg.uri.clone().try_into() else {
        error!("failed to canonicalize uri: {}", msg.uri.as_str());
        return;
    };

    let rev = ctx
        .state
        .update(msg.uri.clone(), canonical_uri.clone(), &msg.text)
        .rev;

    // the cached tree is stale for the saved text, but its ranges are not
    publish_conflicts(ctx, &canonical_uri).await;

    if let Err(e) = ctx
        .debouncer
        .send_interactive(Ctx {
            uri: canonical_uri,
            rev,
        })
        .await
    {
        error!("debouncer send interactive error: {}", e);
    }
}

/// Handle `MavenDocumentEvent::Changed`.
pub async fn handle_changed(ctx: &mut AppraiserContext<'_>, msg: PomPayload) {
    debug!("Appraiser Event: Changed for URI: {}", msg.uri);

    let Ok(canonical_uri) = TryInto::<CanonicalUri>::try_into(msg.uri.clone()) else {
        error!("failed to canonicalize uri: {}", msg.uri.as_str());
        return;
    };

    let rev = ctx
        .state
        .update(msg.uri.clone(), canonical_uri.clone(), &msg.text)
        .rev;

    publish_conflicts(ctx, &canonical_uri).await;

    if let Err(e) = ctx
        .debouncer
        .send_background(Ctx {
            uri: canonical_uri,
            rev,
        })
        .await
    {
        error!("debouncer send background error: {}", e);
    }
}

/// Handle `MavenDocumentEvent::Closed`.
pub async fn handle_closed(ctx: &mut AppraiserContext<'_>, uri: Url) {
    debug!("Appraiser Event: Closed for URI: {}", uri);

    // the file may be gone already, so fall back to the client uri
    let canonical_uri = match TryInto::<CanonicalUri>::try_into(uri.clone()) {
        Ok(canonical_uri) => Some(canonical_uri),
        Err(_) => ctx
            .state
            .document_by_uri(&uri)
            .map(|doc| doc.canonical_uri.clone()),
    };

    if let Some(canonical_uri) = canonical_uri {
        ctx.state.remove(&canonical_uri);
        if let Err(e) = ctx.debouncer.cancel(canonical_uri).await {
            error!("debouncer cancel error: {}", e);
        }
    }
    debug!(
        "Document removed. Workspace now has {} documents",
        ctx.state.documents.len()
    );

    ctx.conflicts.clear(&uri);
    ctx.diagnostic_controller.clear(&uri).await;
}

/// Handle `MavenDocumentEvent::Configured`.
pub async fn handle_configured(ctx: &mut AppraiserContext<'_>, config: UserConfig) {
    info!("configuration updated");
    debug!("{:?}", config);

    if config.runner_config() != *ctx.runner.config() {
        *ctx.runner = ctx.runner.with_config(config.runner_config());
    }
    ctx.conflicts.configure(&config);
    *ctx.config = config;

    // the new severity or the disabled flag applies to what is shown now
    let uris: Vec<CanonicalUri> = ctx.state.documents.keys().cloned().collect();
    for uri in uris {
        publish_conflicts(ctx, &uri).await;
    }
}
