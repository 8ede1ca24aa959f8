use std::collections::HashMap;

use pom_parser::{
    locate_in_document, project_element, LineIndex, LocateError, Properties, XmlDocument,
};
use serde_json::Value;
use tower_lsp::{
    lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Url},
    Client,
};
use tracing::debug;
use tree_parser::DependencyTree;

use crate::{
    config::UserConfig,
    entity::{ConflictRecord, CONFLICT_CODE, DIAGNOSTIC_SOURCE},
};

/// Conflict diagnostics of every open pom, with the structured record
/// behind each one so quick fixes never parse messages.
#[derive(Debug)]
pub struct ConflictDiagnostics {
    records: HashMap<Url, HashMap<String, ConflictRecord>>,
    severity: DiagnosticSeverity,
    disabled: bool,
}

impl Default for ConflictDiagnostics {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            severity: DiagnosticSeverity::WARNING,
            disabled: false,
        }
    }
}

impl ConflictDiagnostics {
    pub fn new(config: &UserConfig) -> Self {
        let mut diagnostics = Self::default();
        diagnostics.configure(config);
        diagnostics
    }

    pub fn configure(&mut self, config: &UserConfig) {
        self.severity = config.severity();
        self.disabled = config.conflict_diagnostics.disabled;
    }

    /// Rebuild the diagnostics of `uri` from `tree` against the current
    /// `text`. The records of `uri` are replaced as a whole.
    ///
    /// Conflicts whose direct dependency is not declared in `text` are
    /// skipped. A pom without a single root element fails the whole file and
    /// leaves the previous records untouched.
    pub fn refresh(
        &mut self,
        uri: &Url,
        text: &str,
        tree: &DependencyTree,
    ) -> Result<Vec<Diagnostic>, LocateError> {
        if self.disabled {
            self.records.remove(uri);
            return Ok(Vec::new());
        }

        let doc = XmlDocument::parse(text);
        let project = project_element(&doc)?;
        let properties = Properties::from_document(&doc);
        let index = LineIndex::new(text);

        let mut records = HashMap::new();
        let mut diagnostics = Vec::new();
        for id in tree.conflicts() {
            let Some(record) = ConflictRecord::from_node(tree, id) else {
                continue;
            };
            let key = record.id();
            if records.contains_key(&key) {
                continue;
            }
            let range = match locate_in_document(
                &doc,
                project,
                &record.root_group_id,
                &record.root_artifact_id,
                &properties,
            ) {
                Ok(range) => range,
                Err(e) => {
                    debug!("skip conflict {}: {}", key, e);
                    continue;
                }
            };
            diagnostics.push(Diagnostic {
                range: index.range(range),
                severity: Some(self.severity),
                code: Some(NumberOrString::String(CONFLICT_CODE.to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: record.message(),
                data: Some(Value::String(key.clone())),
                ..Default::default()
            });
            records.insert(key, record);
        }

        debug!("{} conflict diagnostics for {}", diagnostics.len(), uri);
        self.records.insert(uri.clone(), records);
        Ok(diagnostics)
    }

    pub fn record(&self, uri: &Url, id: &str) -> Option<&ConflictRecord> {
        self.records.get(uri)?.get(id)
    }

    pub fn records(&self, uri: &Url) -> impl Iterator<Item = &ConflictRecord> {
        self.records.get(uri).into_iter().flat_map(|r| r.values())
    }

    pub fn clear(&mut self, uri: &Url) {
        self.records.remove(uri);
    }
}

/// Whether `diag` was published by [`ConflictDiagnostics`].
pub fn is_conflict_diagnostic(diag: &Diagnostic) -> bool {
    matches!(&diag.code, Some(NumberOrString::String(code)) if code == CONFLICT_CODE)
}

/// The published diagnostics per file. Every publish sends the whole set of
/// the file.
pub struct DiagnosticController {
    client: Client,
    diagnostics: HashMap<Url, Vec<Diagnostic>>,
}

impl DiagnosticController {
    pub fn new(client: Client) -> Self {
        DiagnosticController {
            client,
            diagnostics: HashMap::new(),
        }
    }

    pub async fn replace(&mut self, uri: &Url, diags: Vec<Diagnostic>) {
        if diags.is_empty() && !self.diagnostics.contains_key(uri) {
            return;
        }
        self.diagnostics.insert(uri.clone(), diags.clone());
        publish(&self.client, uri, diags).await;
    }

    pub async fn clear(&mut self, uri: &Url) {
        if self.diagnostics.remove(uri).is_some() {
            publish(&self.client, uri, Vec::new()).await;
        }
    }
}

async fn publish(client: &Client, uri: &Url, diags: Vec<Diagnostic>) {
    client.publish_diagnostics(uri.clone(), diags, None).await
}
