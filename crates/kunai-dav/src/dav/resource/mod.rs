//! The per-request resource aggregate.
//!
//! A [`Resource`] binds a classified [`ResourceUri`] to repository
//! state: the opened revision or transaction root, the collection flag,
//! and client metadata. Preparation and parent resolution dispatch on
//! the descriptor's type; the variant set is closed by the protocol, so
//! this is a single `match`, not a registry.

use chrono::{DateTime, Utc};
use kunai_core::constants::{SVN_PROP_REVISION_AUTHOR, SVN_PROP_REVISION_DATE};
use kunai_core::util::path;

use crate::dav::uri::{ResourceKind, ResourceType, ResourceUri};
use crate::error::{DavError, DavResult};
use crate::fs::{ActivityStore, DirEntry, NodeKind, RootHandle, VersionedFs};

/// DeltaV client options carried on the request.
///
/// Parsed from the client's option headers by the transport layer and
/// recorded here untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Etag of the delta base the client holds, for delta responses.
    pub delta_base: Option<String>,
    /// Client handles depth-infinity PROPFIND.
    pub depth_infinity: bool,
    /// Client asked to skip the MERGE response body.
    pub no_merge_response: bool,
}

/// A classified resource bound to repository state. Created fresh per
/// request, never shared across requests.
#[derive(Debug, Clone)]
pub struct Resource {
    pub uri: ResourceUri,
    /// Revision or transaction root, attached lazily during prepare.
    pub root: Option<RootHandle>,
    /// Transaction bound to the activity, for working resources.
    pub txn_name: Option<String>,
    pub is_collection: bool,
    /// Authenticated user, if any.
    pub user: Option<String>,
    /// Lock tokens submitted with the request.
    pub lock_tokens: Vec<String>,
    pub options: ClientOptions,
}

impl Resource {
    #[must_use]
    pub fn new(uri: ResourceUri) -> Self {
        Self {
            uri,
            root: None,
            txn_name: None,
            is_collection: false,
            user: None,
            lock_tokens: Vec::new(),
            options: ClientOptions::default(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_lock_tokens(mut self, tokens: Vec<String>) -> Self {
        self.lock_tokens = tokens;
        self
    }

    /// ## Summary
    /// Fills in existence, collection, and root state for the resource,
    /// dispatching on its type.
    ///
    /// Regular and version resources resolve an unset revision to the
    /// latest, open a revision root, and classify the node. Working
    /// resources resolve their activity to a transaction and enforce
    /// single-author transactions. History, activity, and private
    /// resources are synthetic; their flags were set at classification.
    ///
    /// ## Errors
    /// 400 for an unknown activity, 501 for a second transaction author
    /// or a workspace resource, 500 for any collaborator failure.
    #[tracing::instrument(skip(self, fs, activities), fields(uri = %self.uri.raw))]
    pub fn prepare(
        &mut self,
        fs: &dyn VersionedFs,
        activities: &dyn ActivityStore,
    ) -> DavResult<()> {
        match self.uri.res_type {
            ResourceType::Regular | ResourceType::Version => self.prepare_versioned(fs),
            ResourceType::Working => self.prepare_working(fs, activities),
            ResourceType::History | ResourceType::Activity | ResourceType::Private => Ok(()),
            ResourceType::Workspace => {
                Err(DavError::not_implemented("workspaces are not supported"))
            }
        }
    }

    fn prepare_versioned(&mut self, fs: &dyn VersionedFs) -> DavResult<()> {
        let rev = match self.uri.revision {
            Some(rev) => rev,
            None => {
                let latest = fs
                    .latest_revision()
                    .map_err(|e| DavError::fs("could not determine latest revision", &e))?;
                self.uri.revision = Some(latest);
                latest
            }
        };

        let root = match &self.root {
            Some(root) => root.clone(),
            None => {
                let root = fs
                    .open_revision_root(rev)
                    .map_err(|e| DavError::fs("could not open revision root", &e))?;
                self.root = Some(root.clone());
                root
            }
        };

        let kind = fs
            .node_kind(&root, &self.uri.path)
            .map_err(|e| DavError::fs("could not determine resource kind", &e))?;
        self.uri.exists = kind != NodeKind::None;
        self.is_collection = kind == NodeKind::Dir;
        Ok(())
    }

    fn prepare_working(
        &mut self,
        fs: &dyn VersionedFs,
        activities: &dyn ActivityStore,
    ) -> DavResult<()> {
        let activity_id = self
            .uri
            .activity_id
            .clone()
            .ok_or_else(|| DavError::internal("working resource carries no activity id"))?;

        let txn_name = activities
            .transaction_name(&activity_id)
            .map_err(|e| DavError::fs("could not consult activity store", &e))?
            .ok_or_else(|| DavError::unknown_activity(&activity_id))?;

        fs.open_transaction(&txn_name)
            .map_err(|e| DavError::fs("could not open transaction", &e))?;
        self.txn_name = Some(txn_name.clone());

        if self.uri.is_baselined {
            self.uri.exists = true;
            return Ok(());
        }

        if let Some(user) = self.user.clone() {
            let author = fs
                .transaction_prop(&txn_name, SVN_PROP_REVISION_AUTHOR)
                .map_err(|e| DavError::fs("could not read transaction author", &e))?;
            match author {
                Some(author) if author != user => return Err(DavError::multi_author()),
                Some(_) => {}
                None => {
                    fs.set_transaction_prop(&txn_name, SVN_PROP_REVISION_AUTHOR, &user)
                        .map_err(|e| DavError::fs("could not set transaction author", &e))?;
                }
            }
        }

        let root = fs
            .transaction_root(&txn_name)
            .map_err(|e| DavError::fs("could not open transaction root", &e))?;
        let kind = fs
            .node_kind(&root, &self.uri.path)
            .map_err(|e| DavError::fs("could not determine resource kind", &e))?;
        self.root = Some(root);
        self.uri.exists = kind != NodeKind::None;
        self.is_collection = kind == NodeKind::Dir;
        Ok(())
    }

    /// ## Summary
    /// Derives the parent resource.
    ///
    /// A regular resource's parent is the enclosing collection at the
    /// same revision. A working resource's parent is the synthetic
    /// private container for working resources, not a path parent.
    ///
    /// ## Errors
    /// 500 for every other type: callers must never ask those kinds for
    /// a parent.
    pub fn parent(&self) -> DavResult<Resource> {
        match self.uri.res_type {
            ResourceType::Regular => {
                let mut uri = self.uri.clone();
                uri.raw = path::parent(&uri.raw).to_string();
                uri.path = path::parent(&uri.path).to_string();
                uri.exists = true;
                uri.is_versioned = true;
                let mut parent = Resource::new(uri);
                parent.root = self.root.clone();
                parent.user = self.user.clone();
                parent.is_collection = true;
                Ok(parent)
            }
            ResourceType::Working => {
                let mut uri = self.uri.clone();
                uri.res_type = ResourceType::Private;
                uri.kind = ResourceKind::Working;
                uri.exists = true;
                let mut parent = Resource::new(uri);
                parent.user = self.user.clone();
                parent.is_collection = true;
                Ok(parent)
            }
            other => Err(DavError::illegal_parent(other.as_str())),
        }
    }

    // Read operations, built from the filesystem collaborator.

    /// ## Summary
    /// Full content of a file resource.
    ///
    /// ## Errors
    /// 404 when the resource does not exist, 405 for a collection, 500
    /// when the resource was never prepared or the filesystem fails.
    pub fn content(&self, fs: &dyn VersionedFs) -> DavResult<Vec<u8>> {
        if !self.uri.exists {
            return Err(DavError::not_found(format!(
                "resource {} does not exist",
                self.uri.path
            )));
        }
        if self.is_collection {
            return Err(DavError::method_not_allowed(
                "content of a collection is not readable",
            ));
        }
        let root = self.prepared_root()?;
        fs.file_content(root, &self.uri.path)
            .map_err(|e| DavError::fs("could not read file content", &e))
    }

    /// ## Summary
    /// Entries of a collection resource.
    ///
    /// ## Errors
    /// 404 when the resource does not exist, 405 for a non-collection.
    pub fn children(&self, fs: &dyn VersionedFs) -> DavResult<Vec<DirEntry>> {
        if !self.uri.exists {
            return Err(DavError::not_found(format!(
                "resource {} does not exist",
                self.uri.path
            )));
        }
        if !self.is_collection {
            return Err(DavError::method_not_allowed("resource is not a collection"));
        }
        let root = self.prepared_root()?;
        fs.dir_entries(root, &self.uri.path)
            .map_err(|e| DavError::fs("could not list directory", &e))
    }

    /// Weak entity tag derived from the node's created revision; `None`
    /// for resources that do not exist.
    pub fn etag(&self, fs: &dyn VersionedFs) -> DavResult<Option<String>> {
        if !self.uri.exists {
            return Ok(None);
        }
        let root = self.prepared_root()?;
        let created = fs
            .created_revision(root, &self.uri.path)
            .map_err(|e| DavError::fs("could not determine created revision", &e))?;
        Ok(Some(format!("W/\"{created}{}\"", self.uri.path)))
    }

    /// Last-modified time: the date property of the node's created
    /// revision. `None` when the resource does not exist or the
    /// revision carries no date.
    pub fn last_modified(&self, fs: &dyn VersionedFs) -> DavResult<Option<DateTime<Utc>>> {
        if !self.uri.exists {
            return Ok(None);
        }
        let root = self.prepared_root()?;
        let created = fs
            .created_revision(root, &self.uri.path)
            .map_err(|e| DavError::fs("could not determine created revision", &e))?;
        let Some(stamp) = fs
            .revision_prop(created, SVN_PROP_REVISION_DATE)
            .map_err(|e| DavError::fs("could not read revision date", &e))?
        else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(&stamp)
            .map_err(|e| DavError::internal(format!("malformed revision date '{stamp}': {e}")))?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    fn prepared_root(&self) -> DavResult<&RootHandle> {
        self.root
            .as_ref()
            .ok_or_else(|| DavError::internal("resource was not prepared"))
    }
}
