/// Protocol constants shared across crates.
///
/// All non-public DeltaV resources live below the reserved `!svn` URI
/// segment; the segment after it selects the resource kind.
pub const SVN_URI_MARKER: &str = "!svn";
pub const SVN_URI_PREFIX: &str = const_str::concat!("/", SVN_URI_MARKER);

/// Kind keyword segments following the reserved marker.
pub const KIND_ACTIVITY: &str = "act";
pub const KIND_BASELINE: &str = "bln";
pub const KIND_BASELINE_COLL: &str = "bc";
pub const KIND_VERSION: &str = "ver";
pub const KIND_HISTORY: &str = "his";
pub const KIND_WORKING: &str = "wrk";
pub const KIND_WORKING_BASELINE: &str = "wbl";
pub const KIND_VCC: &str = "vcc";

/// The single valid name for the version-controlled configuration.
pub const DEFAULT_VCC_NAME: &str = "default";

/// Revision properties consulted during transaction preparation.
pub const SVN_PROP_REVISION_AUTHOR: &str = "svn:author";
pub const SVN_PROP_REVISION_DATE: &str = "svn:date";
pub const SVN_PROP_REVISION_LOG: &str = "svn:log";
