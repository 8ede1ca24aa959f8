use std::collections::{hash_map::Entry, HashMap};

use tower_lsp::lsp_types::Url;

use crate::entity::CanonicalUri;

use super::document::Document;

#[derive(Debug, Default)]
pub struct Workspace {
    pub documents: HashMap<CanonicalUri, Document>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, uri: &CanonicalUri) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn document_mut(&mut self, uri: &CanonicalUri) -> Option<&mut Document> {
        self.documents.get_mut(uri)
    }

    /// Find an open document by the uri the client uses for it.
    pub fn document_by_uri(&self, uri: &Url) -> Option<&Document> {
        self.documents.values().find(|doc| &doc.uri == uri)
    }

    pub fn check_rev(&self, uri: &CanonicalUri, rev: usize) -> bool {
        self.document(uri).map(|doc| doc.rev == rev).unwrap_or(false)
    }

    /// Insert or update a document, returning it with its new rev.
    pub fn update(&mut self, uri: Url, canonical_uri: CanonicalUri, text: &str) -> &Document {
        match self.documents.entry(canonical_uri.clone()) {
            Entry::Occupied(entry) => {
                let doc = entry.into_mut();
                doc.uri = uri;
                doc.update(text);
                doc
            }
            Entry::Vacant(entry) => entry.insert(Document::new(uri, canonical_uri, text)),
        }
    }

    pub fn remove(&mut self, uri: &CanonicalUri) -> Option<Document> {
        self.documents.remove(uri)
    }
}
