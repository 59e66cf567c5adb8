//! The fixed set of aliases that may be reindexed

use crate::error::ReindexFailure;
use crate::task::IndexKind;
use serde::{Deserialize, Serialize};

/// Migratable aliases: one main alias holding several document types plus
/// any number of single-purpose standalone aliases.
///
/// ```toml
/// [indices]
/// main = "gitlab-production"
/// standalone = ["gitlab-production-issues", "gitlab-production-notes"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCatalog {
    #[serde(default)]
    pub main: Option<String>,

    #[serde(default)]
    pub standalone: Vec<String>,
}

/// A task target tagged with its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub alias: String,
    pub kind: IndexKind,
}

impl IndexCatalog {
    pub fn new(main: impl Into<String>, standalone: Vec<String>) -> Self {
        Self {
            main: Some(main.into()),
            standalone,
        }
    }

    /// Every alias, main first
    pub fn all(&self) -> Vec<ResolvedTarget> {
        let main = self.main.iter().map(|alias| ResolvedTarget {
            alias: alias.clone(),
            kind: IndexKind::Main,
        });
        let standalone = self.standalone.iter().map(|alias| ResolvedTarget {
            alias: alias.clone(),
            kind: IndexKind::Standalone,
        });

        let mut resolved: Vec<ResolvedTarget> = Vec::new();
        for target in main.chain(standalone) {
            if !resolved.iter().any(|r| r.alias == target.alias) {
                resolved.push(target);
            }
        }
        resolved
    }

    pub fn kind_of(&self, alias: &str) -> Option<IndexKind> {
        if self.main.as_deref() == Some(alias) {
            Some(IndexKind::Main)
        } else if self.standalone.iter().any(|s| s == alias) {
            Some(IndexKind::Standalone)
        } else {
            None
        }
    }

    /// Resolve a task's targets in catalog order (main first).
    ///
    /// Empty targets select the whole catalog.
    pub fn resolve(&self, targets: &[String]) -> Result<Vec<ResolvedTarget>, ReindexFailure> {
        if targets.is_empty() {
            return Ok(self.all());
        }

        if let Some(unknown) = targets.iter().find(|t| self.kind_of(t).is_none()) {
            return Err(ReindexFailure::UnknownTarget(unknown.clone()));
        }

        Ok(self
            .all()
            .into_iter()
            .filter(|r| targets.contains(&r.alias))
            .collect())
    }
}
