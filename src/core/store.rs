//! File-backed content repository
//!
//! Folder nodes are directories and content nodes are files under the
//! project root. Everything else (aspects, associations, metadata nodes,
//! content digests) lives in a YAML index at `.tfm/repository.yaml`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::config::Config;
use crate::core::identity::NodeRef;
use crate::core::project::Project;
use crate::core::repository::{
    Aspect, AssocType, Association, ContentData, ContentRepository, ContentWrite, FileInfo,
    NodeAspects, NodeKind, NodeRecord, RenditionProperties, RepositoryError,
};

/// On-disk node index, in creation order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RepositoryIndex {
    #[serde(default)]
    nodes: Vec<NodeRecord>,
}

/// State needed to undo the work of an open transaction
#[derive(Debug)]
struct Transaction {
    snapshot: RepositoryIndex,
    created_paths: Vec<PathBuf>,
    overwritten: Vec<(PathBuf, Vec<u8>)>,
}

/// Content repository stored in a TFM project directory
#[derive(Debug)]
pub struct FsRepository {
    root: PathBuf,
    index_path: PathBuf,
    container: NodeRef,
    author: String,
    index: RepositoryIndex,
    tx: Option<Transaction>,
}

impl FsRepository {
    /// Open the repository of a project using its configuration
    pub fn open(project: &Project, config: &Config) -> Result<Self, RepositoryError> {
        Self::open_at(
            project.root(),
            &project.repository_index_path(),
            config.forms_container(),
            &config.author(),
        )
    }

    /// Open (or create) a repository rooted at `root`
    ///
    /// The forms container folder is created when missing.
    pub fn open_at(
        root: &Path,
        index_path: &Path,
        container_name: &str,
        author: &str,
    ) -> Result<Self, RepositoryError> {
        let index = if index_path.exists() {
            let contents = fs::read_to_string(index_path)?;
            serde_yml::from_str(&contents).map_err(|e| RepositoryError::YamlError {
                message: e.to_string(),
            })?
        } else {
            RepositoryIndex::default()
        };

        let mut repo = Self {
            root: root.to_path_buf(),
            index_path: index_path.to_path_buf(),
            container: NodeRef::new(),
            author: author.to_string(),
            index,
            tx: None,
        };

        let existing = repo
            .index
            .nodes
            .iter()
            .find(|n| n.parent.is_none() && n.name == container_name)
            .map(|n| n.id);

        repo.container = match existing {
            Some(id) => id,
            None => repo.create_container(container_name)?,
        };

        Ok(repo)
    }

    fn create_container(&mut self, name: &str) -> Result<NodeRef, RepositoryError> {
        validate_name(name)?;
        let relative = PathBuf::from(name);
        fs::create_dir_all(self.root.join(&relative))?;

        let record = self.new_record(None, name, NodeKind::Folder, Some(relative));
        let id = record.id;
        self.index.nodes.push(record);
        self.save()?;

        tracing::debug!("created forms container {} at {}", id, name);
        Ok(id)
    }

    /// Absolute filesystem location of a folder or content node
    pub fn path_of(&self, node: &NodeRef) -> Result<PathBuf, RepositoryError> {
        let record = self.record(node)?;
        record
            .path
            .as_ref()
            .map(|p| self.root.join(p))
            .ok_or(RepositoryError::WrongKind {
                node: *node,
                kind: record.kind,
                operation: "be located on disk",
            })
    }

    fn new_record(
        &self,
        parent: Option<NodeRef>,
        name: &str,
        kind: NodeKind,
        path: Option<PathBuf>,
    ) -> NodeRecord {
        NodeRecord {
            id: NodeRef::new(),
            parent,
            name: name.to_string(),
            kind,
            child_assoc: None,
            path,
            created: Utc::now(),
            creator: self.author.clone(),
            content: None,
            aspects: NodeAspects::default(),
            rendition_properties: None,
            associations: Vec::new(),
        }
    }

    fn record(&self, node: &NodeRef) -> Result<&NodeRecord, RepositoryError> {
        self.index
            .nodes
            .iter()
            .find(|n| n.id == *node)
            .ok_or(RepositoryError::NodeNotFound(*node))
    }

    fn record_mut(&mut self, node: &NodeRef) -> Result<&mut NodeRecord, RepositoryError> {
        self.index
            .nodes
            .iter_mut()
            .find(|n| n.id == *node)
            .ok_or(RepositoryError::NodeNotFound(*node))
    }

    /// Persist the index unless a transaction is collecting changes
    fn autosave(&self) -> Result<(), RepositoryError> {
        if self.tx.is_none() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), RepositoryError> {
        let yaml = serde_yml::to_string(&self.index).map_err(|e| RepositoryError::YamlError {
            message: e.to_string(),
        })?;

        if let Some(dir) = self.index_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp_path = self.index_path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml)?;
        fs::rename(&tmp_path, &self.index_path)?;
        Ok(())
    }
}

impl ContentRepository for FsRepository {
    fn forms_container(&self) -> Result<NodeRef, RepositoryError> {
        Ok(self.container)
    }

    fn create(
        &mut self,
        parent: &NodeRef,
        name: &str,
        kind: NodeKind,
    ) -> Result<FileInfo, RepositoryError> {
        validate_name(name)?;

        let parent_record = self.record(parent)?;
        if parent_record.kind != NodeKind::Folder {
            return Err(RepositoryError::WrongKind {
                node: *parent,
                kind: parent_record.kind,
                operation: "contain files",
            });
        }
        if !kind.is_named() {
            return Err(RepositoryError::WrongKind {
                node: *parent,
                kind,
                operation: "be created by name",
            });
        }
        if self.search_simple(parent, name)?.is_some() {
            return Err(RepositoryError::FileExists {
                name: name.to_string(),
                parent: *parent,
            });
        }

        let relative = parent_record
            .path
            .clone()
            .unwrap_or_default()
            .join(name);
        let absolute = self.root.join(&relative);

        let created = match kind {
            NodeKind::Folder => fs::create_dir(&absolute),
            _ => fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&absolute)
                .map(|_| ()),
        };
        match created {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RepositoryError::FileExists {
                    name: name.to_string(),
                    parent: *parent,
                });
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(tx) = self.tx.as_mut() {
            tx.created_paths.push(absolute);
        }

        let record = self.new_record(Some(*parent), name, kind, Some(relative));
        let info = FileInfo {
            node_ref: record.id,
            name: record.name.clone(),
            kind,
        };
        self.index.nodes.push(record);
        self.autosave()?;

        Ok(info)
    }

    fn search_simple(
        &self,
        parent: &NodeRef,
        name: &str,
    ) -> Result<Option<NodeRef>, RepositoryError> {
        Ok(self
            .index
            .nodes
            .iter()
            .find(|n| n.parent == Some(*parent) && n.kind.is_named() && n.name == name)
            .map(|n| n.id))
    }

    fn write_content(
        &mut self,
        node: &NodeRef,
        write: ContentWrite<'_>,
    ) -> Result<(), RepositoryError> {
        let record = self.record(node)?;
        if record.kind != NodeKind::Content {
            return Err(RepositoryError::WrongKind {
                node: *node,
                kind: record.kind,
                operation: "hold content",
            });
        }
        let path = self.path_of(node)?;

        if let Some(tx) = self.tx.as_mut() {
            let fresh = tx.created_paths.contains(&path);
            let saved = tx.overwritten.iter().any(|(p, _)| *p == path);
            if !fresh && !saved {
                let previous = fs::read(&path)?;
                tx.overwritten.push((path.clone(), previous));
            }
        }

        fs::write(&path, write.bytes)?;

        let content = ContentData {
            mimetype: write.mimetype.map(String::from),
            encoding: write.encoding.to_string(),
            size: write.bytes.len() as u64,
            sha256: compute_hash(write.bytes),
        };
        self.record_mut(node)?.content = Some(content);
        self.autosave()
    }

    fn read_content(&self, node: &NodeRef) -> Result<Vec<u8>, RepositoryError> {
        Ok(fs::read(self.path_of(node)?)?)
    }

    fn add_aspect(&mut self, node: &NodeRef, aspect: Aspect) -> Result<(), RepositoryError> {
        tracing::debug!("adding aspect {} to {}", aspect.name(), node);
        self.record_mut(node)?.aspects.apply(aspect);
        self.autosave()
    }

    fn create_association(
        &mut self,
        source: &NodeRef,
        target: &NodeRef,
        assoc_type: AssocType,
    ) -> Result<(), RepositoryError> {
        self.record(target)?;
        self.record_mut(source)?.associations.push(Association {
            assoc_type,
            target: *target,
        });
        self.autosave()
    }

    fn create_child(
        &mut self,
        parent: &NodeRef,
        assoc_type: AssocType,
        properties: RenditionProperties,
    ) -> Result<NodeRef, RepositoryError> {
        self.record(parent)?;

        let mut record = self.new_record(
            Some(*parent),
            &assoc_type.to_string(),
            NodeKind::RenditionProperties,
            None,
        );
        record.child_assoc = Some(assoc_type);
        record.rendition_properties = Some(properties);
        let id = record.id;

        self.index.nodes.push(record);
        self.autosave()?;
        Ok(id)
    }

    fn node(&self, node: &NodeRef) -> Result<NodeRecord, RepositoryError> {
        self.record(node).cloned()
    }

    fn children(&self, parent: &NodeRef) -> Result<Vec<NodeRecord>, RepositoryError> {
        self.record(parent)?;
        Ok(self
            .index
            .nodes
            .iter()
            .filter(|n| n.parent == Some(*parent))
            .cloned()
            .collect())
    }

    fn begin(&mut self) -> Result<(), RepositoryError> {
        if self.tx.is_some() {
            return Err(RepositoryError::TransactionActive);
        }
        self.tx = Some(Transaction {
            snapshot: self.index.clone(),
            created_paths: Vec::new(),
            overwritten: Vec::new(),
        });
        Ok(())
    }

    /// Persist the transaction's changes
    ///
    /// When the index cannot be saved the transaction stays open so the
    /// caller can roll it back.
    fn commit(&mut self) -> Result<(), RepositoryError> {
        let tx = self.tx.take().ok_or(RepositoryError::NoTransaction)?;
        if let Err(e) = self.save() {
            tracing::warn!("failed to save repository index: {}", e);
            self.tx = Some(tx);
            return Err(e);
        }
        tracing::info!(
            "committed transaction ({} new file(s))",
            tx.created_paths.len()
        );
        Ok(())
    }

    /// Undo every change of the open transaction
    ///
    /// Each undo step is attempted even when an earlier one fails, and the
    /// index is always restored. The first failure is returned.
    fn rollback(&mut self) -> Result<(), RepositoryError> {
        let tx = self.tx.take().ok_or(RepositoryError::NoTransaction)?;
        let mut first_err: Option<RepositoryError> = None;

        for path in tx.created_paths.iter().rev() {
            let removed = if path.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            match removed {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::error!("failed to remove {}: {}", path.display(), e);
                    first_err.get_or_insert(e.into());
                }
            }
        }
        for (path, bytes) in &tx.overwritten {
            if let Err(e) = fs::write(path, bytes) {
                tracing::error!("failed to restore {}: {}", path.display(), e);
                first_err.get_or_insert(e.into());
            }
        }

        self.index = tx.snapshot;
        tracing::info!(
            "rolled back transaction ({} file(s) removed)",
            tx.created_paths.len()
        );
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Reject names that would escape or alias their parent directory
fn validate_name(name: &str) -> Result<(), RepositoryError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(RepositoryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Compute SHA256 hash of content
fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::{in_transaction, TitledAspect, ENCODING_UTF8};
    use tempfile::{tempdir, TempDir};

    fn open(tmp: &TempDir) -> FsRepository {
        FsRepository::open_at(
            tmp.path(),
            &tmp.path().join(".tfm/repository.yaml"),
            "forms",
            "tester",
        )
        .unwrap()
    }

    fn write(repo: &mut FsRepository, node: &NodeRef, bytes: &[u8]) {
        repo.write_content(
            node,
            ContentWrite {
                mimetype: None,
                encoding: ENCODING_UTF8,
                bytes,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_open_creates_container_once() {
        let tmp = tempdir().unwrap();
        let first = open(&tmp).forms_container().unwrap();
        assert!(tmp.path().join("forms").is_dir());

        let second = open(&tmp).forms_container().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_create_folder_and_content() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();

        let folder = repo.create(&container, "news", NodeKind::Folder).unwrap();
        let file = repo
            .create(&folder.node_ref, "news.xsd", NodeKind::Content)
            .unwrap();
        write(&mut repo, &file.node_ref, b"<schema/>");

        assert!(tmp.path().join("forms/news").is_dir());
        assert_eq!(
            fs::read(tmp.path().join("forms/news/news.xsd")).unwrap(),
            b"<schema/>"
        );
        let record = repo.node(&file.node_ref).unwrap();
        let content = record.content.unwrap();
        assert_eq!(content.size, 9);
        assert_eq!(content.encoding, "UTF-8");
        assert_eq!(record.creator, "tester");
    }

    #[test]
    fn test_create_reports_file_exists() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();

        repo.create(&container, "news", NodeKind::Folder).unwrap();
        let err = repo.create(&container, "news", NodeKind::Folder).unwrap_err();
        assert!(matches!(err, RepositoryError::FileExists { ref name, .. } if name == "news"));
    }

    #[test]
    fn test_create_collides_with_untracked_file() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();
        fs::write(tmp.path().join("forms/stray.txt"), "x").unwrap();

        let err = repo
            .create(&container, "stray.txt", NodeKind::Content)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::FileExists { .. }));
    }

    #[test]
    fn test_create_rejects_path_names() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();

        for name in ["", "..", "a/b", "a\\b"] {
            let err = repo.create(&container, name, NodeKind::Folder).unwrap_err();
            assert!(matches!(err, RepositoryError::InvalidName(_)));
        }
    }

    #[test]
    fn test_search_simple_ignores_metadata_children() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();
        let folder = repo.create(&container, "news", NodeKind::Folder).unwrap();

        repo.create_child(
            &folder.node_ref,
            AssocType::RenditionProperties,
            RenditionProperties {
                output_path_pattern_for_rendition: "${name}.html".to_string(),
                mimetype_for_rendition: None,
            },
        )
        .unwrap();

        assert!(repo
            .search_simple(&folder.node_ref, "rendition-properties")
            .unwrap()
            .is_none());
        assert_eq!(repo.children(&folder.node_ref).unwrap().len(), 1);
    }

    #[test]
    fn test_index_survives_reopen() {
        let tmp = tempdir().unwrap();
        let folder = {
            let mut repo = open(&tmp);
            let container = repo.forms_container().unwrap();
            let folder = repo.create(&container, "news", NodeKind::Folder).unwrap();
            repo.add_aspect(
                &folder.node_ref,
                Aspect::Titled(TitledAspect {
                    title: Some("News".to_string()),
                    description: None,
                }),
            )
            .unwrap();
            folder.node_ref
        };

        let repo = open(&tmp);
        let record = repo.node(&folder).unwrap();
        assert_eq!(record.aspects.titled.unwrap().title.as_deref(), Some("News"));
    }

    #[test]
    fn test_rollback_removes_created_nodes() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();

        let result: Result<(), RepositoryError> = in_transaction(&mut repo, |repo| {
            let folder = repo.create(&container, "news", NodeKind::Folder)?;
            repo.create(&folder.node_ref, "news.xsd", NodeKind::Content)?;
            repo.create(&container, "news", NodeKind::Folder)?;
            Ok(())
        });

        assert!(matches!(result, Err(RepositoryError::FileExists { .. })));
        assert!(!tmp.path().join("forms/news").exists());
        assert!(repo.search_simple(&container, "news").unwrap().is_none());

        let reopened = open(&tmp);
        assert!(reopened.search_simple(&container, "news").unwrap().is_none());
    }

    #[test]
    fn test_rollback_restores_overwritten_content() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();
        let file = repo.create(&container, "a.txt", NodeKind::Content).unwrap();
        write(&mut repo, &file.node_ref, b"before");

        repo.begin().unwrap();
        write(&mut repo, &file.node_ref, b"after");
        repo.rollback().unwrap();

        assert_eq!(repo.read_content(&file.node_ref).unwrap(), b"before");
        assert_eq!(repo.node(&file.node_ref).unwrap().content.unwrap().size, 6);
    }

    #[test]
    fn test_commit_persists_transaction() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();

        repo.begin().unwrap();
        repo.create(&container, "news", NodeKind::Folder).unwrap();
        assert!(matches!(repo.begin(), Err(RepositoryError::TransactionActive)));
        repo.commit().unwrap();

        let reopened = open(&tmp);
        assert!(reopened.search_simple(&container, "news").unwrap().is_some());
        assert!(matches!(repo.commit(), Err(RepositoryError::NoTransaction)));
    }

    #[test]
    fn test_failed_index_save_rolls_back_transaction() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();

        // A directory in place of the index makes the save fail
        let index = tmp.path().join(".tfm/repository.yaml");
        fs::remove_file(&index).unwrap();
        fs::create_dir(&index).unwrap();

        let result: Result<(), RepositoryError> = in_transaction(&mut repo, |repo| {
            let folder = repo.create(&container, "news", NodeKind::Folder)?;
            repo.create(&folder.node_ref, "news.xsd", NodeKind::Content)?;
            Ok(())
        });

        assert!(matches!(result, Err(RepositoryError::IoError(_))));
        assert!(!tmp.path().join("forms/news").exists());
        assert!(repo.search_simple(&container, "news").unwrap().is_none());

        // The repository is usable again once the index can be written
        fs::remove_dir(&index).unwrap();
        in_transaction(&mut repo, |repo| {
            repo.create(&container, "news", NodeKind::Folder).map(|_| ())
        })
        .unwrap();
        assert!(open(&tmp).search_simple(&container, "news").unwrap().is_some());
    }

    #[test]
    fn test_rollback_restores_index_when_an_undo_step_fails() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();
        let file = repo.create(&container, "a.txt", NodeKind::Content).unwrap();
        write(&mut repo, &file.node_ref, b"before");

        repo.begin().unwrap();
        repo.create(&container, "news", NodeKind::Folder).unwrap();
        write(&mut repo, &file.node_ref, b"after");

        // A directory in place of the file makes restoring it fail
        let path = tmp.path().join("forms/a.txt");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(repo.rollback(), Err(RepositoryError::IoError(_))));
        assert!(!tmp.path().join("forms/news").exists());
        assert!(repo.search_simple(&container, "news").unwrap().is_none());
        assert_eq!(repo.node(&file.node_ref).unwrap().content.unwrap().size, 6);
        repo.begin().unwrap();
        repo.rollback().unwrap();
    }

    #[test]
    fn test_write_content_requires_content_node() {
        let tmp = tempdir().unwrap();
        let mut repo = open(&tmp);
        let container = repo.forms_container().unwrap();

        let err = repo
            .write_content(
                &container,
                ContentWrite {
                    mimetype: None,
                    encoding: ENCODING_UTF8,
                    bytes: b"x",
                },
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::WrongKind { .. }));
    }
}
