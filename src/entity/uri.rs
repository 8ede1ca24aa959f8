use std::{
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::anyhow;
use tower_lsp::lsp_types::Url;

/// A `file:` uri whose path is canonicalized, so the same pom opened through
/// different paths maps to one document.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct CanonicalUri(Url);

impl TryFrom<Url> for CanonicalUri {
    type Error = anyhow::Error;

    fn try_from(uri: Url) -> Result<Self, Self::Error> {
        let path = uri
            .to_file_path()
            .map_err(|_| anyhow!("not a file uri: {}", uri))?;
        Self::try_from_path(path)
    }
}

impl CanonicalUri {
    pub fn try_from_path<T: AsRef<Path>>(path: T) -> Result<Self, anyhow::Error> {
        let canonical = dunce::canonicalize(path.as_ref())?;
        let uri = Url::from_file_path(&canonical)
            .map_err(|_| anyhow!("not an absolute path: {}", canonical.display()))?;
        Ok(CanonicalUri(uri))
    }

    pub fn to_path_buf(&self) -> Result<PathBuf, anyhow::Error> {
        self.0
            .to_file_path()
            .map_err(|_| anyhow!("not a file uri: {}", self.0))
    }
}

impl Deref for CanonicalUri {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let pom = dir.path().join("pom.xml");
        std::fs::write(&pom, "<project/>").unwrap();

        let dotted = dir.path().join(".").join("pom.xml");
        let uri = Url::from_file_path(&dotted).unwrap();
        let canonical = CanonicalUri::try_from(uri).unwrap();
        assert_eq!(canonical, CanonicalUri::try_from_path(&pom).unwrap());
        assert_eq!(
            canonical.to_path_buf().unwrap(),
            dunce::canonicalize(&pom).unwrap()
        );
    }

    #[test]
    fn test_reject_non_file_uri() {
        let uri = Url::parse("untitled:Untitled-1").unwrap();
        assert!(CanonicalUri::try_from(uri).is_err());
    }

    #[test]
    fn test_reject_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CanonicalUri::try_from_path(dir.path().join("missing.xml")).is_err());
    }
}
