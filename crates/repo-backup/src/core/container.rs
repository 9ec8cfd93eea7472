//! Container and repository kind types.
//!
//! A container is a unit of ownership for one or more repositories: a
//! project owns its main, wiki, and design repositories; a snippet owns a
//! single snippet repository. Containers are enumerated from the data layer
//! and flow through the dispatch queues as values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of repository a container can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryKind {
    Project,
    Wiki,
    Design,
    Snippet,
}

impl RepositoryKind {
    /// Stable lowercase identifier, used in logs and wire requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryKind::Project => "project",
            RepositoryKind::Wiki => "wiki",
            RepositoryKind::Design => "design",
            RepositoryKind::Snippet => "snippet",
        }
    }

    /// Suffix appended to the owning container's disk path for this kind.
    pub fn path_suffix(&self) -> &'static str {
        match self {
            RepositoryKind::Project | RepositoryKind::Snippet => "",
            RepositoryKind::Wiki => ".wiki",
            RepositoryKind::Design => ".design",
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository kinds owned by a project, in enqueue order.
pub const PROJECT_REPOSITORY_KINDS: &[RepositoryKind] = &[
    RepositoryKind::Project,
    RepositoryKind::Wiki,
    RepositoryKind::Design,
];

/// Repository kinds owned by a snippet.
pub const SNIPPET_REPOSITORY_KINDS: &[RepositoryKind] = &[RepositoryKind::Snippet];

/// A project and the storage its repositories live on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContainer {
    /// Stable database identifier.
    pub id: i64,

    /// Human-readable path, e.g. `group/project`.
    pub full_path: String,

    /// On-storage path of the main repository, without the `.git` extension.
    pub disk_path: String,

    /// Name of the storage backend holding this project's repositories.
    pub storage: String,
}

/// A snippet and the storage its repository lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetContainer {
    /// Stable database identifier.
    pub id: i64,

    /// Human-readable path, e.g. `snippets/42`.
    pub full_path: String,

    /// On-storage path of the repository, without the `.git` extension.
    pub disk_path: String,

    /// Name of the storage backend holding this snippet's repository.
    pub storage: String,
}

/// A unit of dispatch: either a project or a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Container {
    Project(ProjectContainer),
    Snippet(SnippetContainer),
}

impl Container {
    /// Database identifier of the underlying record.
    pub fn id(&self) -> i64 {
        match self {
            Container::Project(p) => p.id,
            Container::Snippet(s) => s.id,
        }
    }

    /// Name of the storage backend this container is assigned to.
    pub fn storage(&self) -> &str {
        match self {
            Container::Project(p) => &p.storage,
            Container::Snippet(s) => &s.storage,
        }
    }

    /// Human-readable path used in logs and error messages.
    pub fn full_path(&self) -> &str {
        match self {
            Container::Project(p) => &p.full_path,
            Container::Snippet(s) => &s.full_path,
        }
    }

    /// On-storage path of the main repository, without extension.
    pub fn disk_path(&self) -> &str {
        match self {
            Container::Project(p) => &p.disk_path,
            Container::Snippet(s) => &s.disk_path,
        }
    }

    /// The set of repository kinds this container owns, in enqueue order.
    pub fn repository_kinds(&self) -> &'static [RepositoryKind] {
        match self {
            Container::Project(_) => PROJECT_REPOSITORY_KINDS,
            Container::Snippet(_) => SNIPPET_REPOSITORY_KINDS,
        }
    }

    /// Relative on-storage path of one owned repository.
    pub fn repository_path(&self, kind: RepositoryKind) -> String {
        format!("{}{}.git", self.disk_path(), kind.path_suffix())
    }
}
