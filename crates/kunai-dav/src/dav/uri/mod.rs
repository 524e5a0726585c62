//! Request URI classification.
//!
//! Every request path is parsed into a [`ResourceUri`]: a typed
//! descriptor naming the resource type and kind, the repository path,
//! and where applicable the revision and activity id. Paths whose first
//! segment is not the reserved `!svn` marker are public regular
//! resources; below the marker, the next segment selects the kind and
//! its sub-parser.

use kunai_core::constants::{
    DEFAULT_VCC_NAME, KIND_ACTIVITY, KIND_BASELINE, KIND_BASELINE_COLL, KIND_HISTORY,
    KIND_VCC, KIND_VERSION, KIND_WORKING, KIND_WORKING_BASELINE, SVN_URI_MARKER,
};
use kunai_core::util::path;

use crate::error::{DavError, DavResult};
use crate::fs::Revision;

/// Resource type: selects the preparation and parent-resolution
/// behavior. A closed set fixed by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// A path in a revision tree, addressed publicly.
    Regular,
    /// An in-progress view of a path within an activity.
    Working,
    /// An immutable version or baseline.
    Version,
    /// A synthetic protocol resource (VCC, working-resource parent).
    Private,
    /// An activity (maps to one open transaction).
    Activity,
    /// A version history resource.
    History,
    /// A workspace; not supported by this server.
    Workspace,
}

impl ResourceType {
    /// Human-readable name used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Working => "working",
            Self::Version => "version",
            Self::Private => "private",
            Self::Activity => "activity",
            Self::History => "history",
            Self::Workspace => "workspace",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource kind: the specific URI form the descriptor was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A public repository path.
    Public,
    /// The activity collection (`act`).
    ActivityCollection,
    /// A baseline for one revision (`bln`).
    Baseline,
    /// The collection under a baseline (`bc`).
    BaselineCollection,
    /// A version history resource (`his`).
    History,
    /// A working resource (`wrk`).
    Working,
    /// A version resource (`ver`).
    Version,
    /// The version-controlled configuration (`vcc`).
    VersionControlledConfiguration,
    /// A working baseline (`wbl`).
    WorkingBaseline,
    /// The root collection of the DAV namespace.
    RootCollection,
    /// Not classified.
    Unknown,
}

/// The classified description of a request path.
///
/// Constructed once per request by [`ResourceUri::classify`] (or
/// duplicated when deriving a parent resource). The `exists`,
/// `is_versioned`, `is_baselined`, and `is_working` flags are mutated
/// only during classification and preparation, never once a handler
/// has begun producing a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUri {
    /// The raw request path, relative to the mount context.
    pub raw: String,
    /// Mount prefix the path was resolved against.
    pub context: String,
    pub res_type: ResourceType,
    pub kind: ResourceKind,
    /// Revision, when the URI form fixes one.
    pub revision: Option<Revision>,
    /// Repository-relative path, canonical (`/`-rooted, no trailing
    /// slash). Meaningful for regular, version, and history forms.
    pub path: String,
    /// Activity id, for activity/working/working-baseline forms.
    pub activity_id: Option<String>,
    pub exists: bool,
    pub is_versioned: bool,
    pub is_baselined: bool,
    pub is_working: bool,
}

impl ResourceUri {
    fn unparsed(context: &str, raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            context: context.to_string(),
            res_type: ResourceType::Regular,
            kind: ResourceKind::Unknown,
            revision: None,
            path: "/".to_string(),
            activity_id: None,
            exists: false,
            is_versioned: false,
            is_baselined: false,
            is_working: false,
        }
    }

    /// ## Summary
    /// Classifies a request path into a typed resource descriptor.
    ///
    /// `context` is the mount prefix and is stripped from `uri` before
    /// classification. `label`, when present, is a client-supplied
    /// revision label; `use_checked_in` requests the checked-in version
    /// of a version-controlled configuration.
    ///
    /// ## Errors
    /// Returns 400 for malformed forms (bad revision numbers, missing
    /// required segments, invalid VCC name) and 501 for URI forms the
    /// server does not implement (unknown kind keywords).
    #[tracing::instrument]
    pub fn classify(
        context: &str,
        uri: &str,
        label: Option<&str>,
        use_checked_in: bool,
    ) -> DavResult<Self> {
        // Strip the mount prefix only at a segment boundary.
        let relative = match uri.strip_prefix(context) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => uri,
        };
        let relative = path::standardize(relative);

        let (first, rest) = path::split_head(&relative);
        if first != SVN_URI_MARKER {
            let mut parsed = Self::unparsed(context, &relative);
            parsed.kind = ResourceKind::Public;
            parsed.res_type = ResourceType::Regular;
            parsed.path = relative.clone();
            parsed.is_versioned = true;
            return Ok(parsed);
        }

        let (keyword, remainder) = path::split_head(rest);
        let mut parsed = Self::unparsed(context, &relative);
        match keyword {
            KIND_VCC => parsed.parse_vcc(remainder, label, use_checked_in)?,
            KIND_VERSION => parsed.parse_version(remainder)?,
            KIND_BASELINE => parsed.parse_baseline(remainder)?,
            KIND_BASELINE_COLL => parsed.parse_baseline_collection(remainder)?,
            KIND_ACTIVITY => parsed.parse_activity(remainder)?,
            KIND_HISTORY => parsed.parse_history(remainder)?,
            KIND_WORKING_BASELINE => parsed.parse_working_baseline(remainder)?,
            KIND_WORKING => parsed.parse_working(remainder)?,
            "" => {
                return Err(DavError::malformed_uri(format!(
                    "nothing follows the '{SVN_URI_MARKER}' marker"
                )));
            }
            other => {
                return Err(DavError::not_implemented(format!(
                    "unsupported URI form '{other}'"
                )));
            }
        }
        Ok(parsed)
    }

    /// Version-controlled configuration: `vcc/default`.
    fn parse_vcc(
        &mut self,
        remainder: &str,
        label: Option<&str>,
        use_checked_in: bool,
    ) -> DavResult<()> {
        let (name, extra) = path::split_head(remainder);
        if name != DEFAULT_VCC_NAME || !extra.is_empty() {
            return Err(DavError::malformed_uri(format!(
                "invalid VCC name '{}'",
                remainder.trim_start_matches('/')
            )));
        }

        if label.is_some() || use_checked_in {
            // A labeled (or checked-in) VCC addresses one baseline.
            self.res_type = ResourceType::Version;
            self.kind = ResourceKind::Baseline;
            self.revision = label.map(parse_revision).transpose()?;
            self.is_versioned = true;
            self.is_baselined = true;
        } else {
            self.res_type = ResourceType::Private;
            self.kind = ResourceKind::VersionControlledConfiguration;
            self.exists = true;
            self.is_versioned = true;
            self.is_baselined = true;
        }
        Ok(())
    }

    /// Version resource: `ver/REV` or `ver/REV/PATH`.
    fn parse_version(&mut self, remainder: &str) -> DavResult<()> {
        let (rev, rest) = path::split_head(remainder);
        self.revision = Some(parse_revision(rev)?);
        self.path = path::standardize(rest);
        self.res_type = ResourceType::Version;
        self.kind = ResourceKind::Version;
        self.is_versioned = true;
        Ok(())
    }

    /// Baseline: `bln/REV`, a bare revision with no path.
    fn parse_baseline(&mut self, remainder: &str) -> DavResult<()> {
        let (rev, rest) = path::split_head(remainder);
        if !rest.is_empty() {
            return Err(DavError::malformed_uri(
                "baseline URIs carry a bare revision",
            ));
        }
        self.revision = Some(parse_revision(rev)?);
        self.res_type = ResourceType::Version;
        self.kind = ResourceKind::Baseline;
        self.is_versioned = true;
        self.is_baselined = true;
        Ok(())
    }

    /// Baseline collection: `bc/REV` or `bc/REV/PATH`.
    fn parse_baseline_collection(&mut self, remainder: &str) -> DavResult<()> {
        let (rev, rest) = path::split_head(remainder);
        self.revision = Some(parse_revision(rev)?);
        self.path = path::standardize(rest);
        self.res_type = ResourceType::Regular;
        self.kind = ResourceKind::BaselineCollection;
        self.is_versioned = true;
        Ok(())
    }

    /// Activity: `act/ACTIVITY-ID`.
    fn parse_activity(&mut self, remainder: &str) -> DavResult<()> {
        let id = remainder.trim_start_matches('/');
        if id.is_empty() {
            return Err(DavError::malformed_uri("activity URIs carry an activity id"));
        }
        self.activity_id = Some(id.to_string());
        self.res_type = ResourceType::Activity;
        self.kind = ResourceKind::ActivityCollection;
        Ok(())
    }

    /// History: `his/PATH`.
    fn parse_history(&mut self, remainder: &str) -> DavResult<()> {
        self.path = path::standardize(remainder);
        self.res_type = ResourceType::History;
        self.kind = ResourceKind::History;
        self.exists = true;
        Ok(())
    }

    /// Working baseline: `wbl/ACTIVITY-ID/REV`.
    fn parse_working_baseline(&mut self, remainder: &str) -> DavResult<()> {
        let (id, rest) = path::split_head(remainder);
        let (rev, extra) = path::split_head(rest);
        if id.is_empty() || rev.is_empty() || !extra.is_empty() {
            return Err(DavError::malformed_uri(
                "working baseline URIs carry an activity id and a revision",
            ));
        }
        self.activity_id = Some(id.to_string());
        self.revision = Some(parse_revision(rev)?);
        self.res_type = ResourceType::Working;
        self.kind = ResourceKind::WorkingBaseline;
        self.is_versioned = true;
        self.is_baselined = true;
        self.is_working = true;
        Ok(())
    }

    /// Working resource: `wrk/ACTIVITY-ID` or `wrk/ACTIVITY-ID/PATH`.
    fn parse_working(&mut self, remainder: &str) -> DavResult<()> {
        let (id, rest) = path::split_head(remainder);
        if id.is_empty() {
            return Err(DavError::malformed_uri("working URIs carry an activity id"));
        }
        self.activity_id = Some(id.to_string());
        self.path = path::standardize(rest);
        self.res_type = ResourceType::Working;
        self.kind = ResourceKind::Working;
        self.is_versioned = true;
        self.is_working = true;
        Ok(())
    }
}

fn parse_revision(segment: &str) -> DavResult<Revision> {
    segment
        .parse::<Revision>()
        .map_err(|_| DavError::malformed_uri(format!("malformed revision '{segment}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(uri: &str) -> DavResult<ResourceUri> {
        ResourceUri::classify("", uri, None, false)
    }

    #[test]
    fn public_path_is_regular() {
        let uri = classify("/trunk/a.txt").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Regular);
        assert_eq!(uri.kind, ResourceKind::Public);
        assert_eq!(uri.path, "/trunk/a.txt");
        assert_eq!(uri.revision, None);
        assert!(uri.is_versioned);
    }

    #[test]
    fn root_path_is_regular() {
        let uri = classify("/").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Regular);
        assert_eq!(uri.path, "/");
    }

    #[test]
    fn context_prefix_is_stripped() {
        let uri = ResourceUri::classify("/svn/repo", "/svn/repo/trunk", None, false)
            .expect("classifies");
        assert_eq!(uri.path, "/trunk");
        assert_eq!(uri.context, "/svn/repo");
    }

    #[test]
    fn version_with_path() {
        let uri = classify("/!svn/ver/17/trunk/a.txt").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Version);
        assert_eq!(uri.kind, ResourceKind::Version);
        assert_eq!(uri.revision, Some(17));
        assert_eq!(uri.path, "/trunk/a.txt");
    }

    #[test]
    fn version_bare_revision_defaults_to_root() {
        let uri = classify("/!svn/ver/5").expect("classifies");
        assert_eq!(uri.revision, Some(5));
        assert_eq!(uri.path, "/");
    }

    #[test]
    fn baseline_is_bare_revision() {
        let uri = classify("/!svn/bln/12").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Version);
        assert_eq!(uri.kind, ResourceKind::Baseline);
        assert_eq!(uri.revision, Some(12));
        assert!(uri.is_baselined);

        assert!(classify("/!svn/bln/12/extra").is_err());
        assert!(classify("/!svn/bln/notanumber").is_err());
    }

    #[test]
    fn baseline_collection_takes_revision_and_path() {
        let uri = classify("/!svn/bc/8/tags/v1").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Regular);
        assert_eq!(uri.kind, ResourceKind::BaselineCollection);
        assert_eq!(uri.revision, Some(8));
        assert_eq!(uri.path, "/tags/v1");
        assert!(uri.is_versioned);
    }

    #[test]
    fn activity_takes_id_verbatim() {
        let uri = classify("/!svn/act/abc-123").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Activity);
        assert_eq!(uri.kind, ResourceKind::ActivityCollection);
        assert_eq!(uri.activity_id.as_deref(), Some("abc-123"));

        assert!(classify("/!svn/act").is_err());
    }

    #[test]
    fn history_takes_path() {
        let uri = classify("/!svn/his/trunk/a.txt").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::History);
        assert_eq!(uri.kind, ResourceKind::History);
        assert_eq!(uri.path, "/trunk/a.txt");
        assert!(uri.exists);
    }

    #[test]
    fn working_with_and_without_path() {
        let uri = classify("/!svn/wrk/act-1/trunk/a.txt").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Working);
        assert_eq!(uri.kind, ResourceKind::Working);
        assert_eq!(uri.activity_id.as_deref(), Some("act-1"));
        assert_eq!(uri.path, "/trunk/a.txt");
        assert!(uri.is_working);
        assert!(uri.is_versioned);

        let bare = classify("/!svn/wrk/act-1").expect("classifies");
        assert_eq!(bare.path, "/");
    }

    #[test]
    fn working_baseline_takes_activity_and_revision() {
        let uri = classify("/!svn/wbl/act-1/9").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Working);
        assert_eq!(uri.kind, ResourceKind::WorkingBaseline);
        assert_eq!(uri.activity_id.as_deref(), Some("act-1"));
        assert_eq!(uri.revision, Some(9));
        assert!(uri.is_baselined);
        assert!(uri.is_working);

        assert!(classify("/!svn/wbl/act-1").is_err());
        assert!(classify("/!svn/wbl/act-1/9/extra").is_err());
        assert!(classify("/!svn/wbl/act-1/nan").is_err());
    }

    #[test]
    fn vcc_requires_default_name() {
        let uri = classify("/!svn/vcc/default").expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Private);
        assert_eq!(uri.kind, ResourceKind::VersionControlledConfiguration);
        assert_eq!(uri.revision, None);
        assert!(uri.exists);

        assert!(classify("/!svn/vcc/other").is_err());
        assert!(classify("/!svn/vcc/default/extra").is_err());
        assert!(classify("/!svn/vcc").is_err());
    }

    #[test]
    fn vcc_with_label_is_a_version_baseline() {
        let uri =
            ResourceUri::classify("", "/!svn/vcc/default", Some("21"), false).expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Version);
        assert_eq!(uri.kind, ResourceKind::Baseline);
        assert_eq!(uri.revision, Some(21));
        assert!(uri.is_baselined);

        assert!(ResourceUri::classify("", "/!svn/vcc/default", Some("x"), false).is_err());
    }

    #[test]
    fn vcc_checked_in_is_a_version_baseline_without_revision() {
        let uri =
            ResourceUri::classify("", "/!svn/vcc/default", None, true).expect("classifies");
        assert_eq!(uri.res_type, ResourceType::Version);
        assert_eq!(uri.kind, ResourceKind::Baseline);
        assert_eq!(uri.revision, None);
    }

    #[test]
    fn unknown_keyword_is_unsupported() {
        let err = classify("/!svn/xyz/1").expect_err("must fail");
        assert_eq!(err.status, 501);
    }

    #[test]
    fn bare_marker_is_malformed() {
        let err = classify("/!svn").expect_err("must fail");
        assert_eq!(err.status, 400);
    }

    #[test]
    fn malformed_revisions_are_rejected_everywhere() {
        for uri in [
            "/!svn/ver/abc/trunk",
            "/!svn/ver/-3",
            "/!svn/bc/1x/trunk",
            "/!svn/bln/",
        ] {
            let err = classify(uri).expect_err("must fail");
            assert_eq!(err.status, 400, "for {uri}");
        }
    }
}
