//! Metadata source parsers.
//!
//! Every source implements the same capability: say whether it applies to
//! a path, and produce a record for it. The orchestrator holds sources
//! behind this trait in an ordered list instead of branching on extension
//! strings inline.

use reelmeta_common::{Record, Result};
use std::path::Path;

pub mod eyetv;
pub mod moov;
pub mod mscore;
pub mod nfo;
pub mod recording;
pub mod text;

pub use eyetv::EyetvSource;
pub use moov::ContainerTagSource;
pub use mscore::ScoreTagSource;
pub use nfo::NfoSource;
pub use recording::RecordingSource;
pub use text::TextSource;

/// A metadata source parser.
pub trait MetadataSource {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// True when this source can describe the given path.
    fn applies(&self, path: &Path) -> bool;

    /// Parse the source into a record. Failures surface as errors; the
    /// orchestrator decides how to degrade.
    fn parse(&self, path: &Path) -> Result<Record>;
}

/// Lower-cased file extension, empty when absent.
pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
