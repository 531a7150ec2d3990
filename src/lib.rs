//! Metadata normalization for media files, sidecars, and DVR recording
//! containers.
//!
//! A [`pipeline::MetadataPipeline`] assembles one canonical
//! [`Record`] per media file from whichever sources apply: embedded
//! MP4/ASF tags, EyeTV bundles, `.nfo` and plain-text sidecars, and the
//! encrypted details document of `.tivo` recording containers (decoded by
//! the `reelmeta-dvr` crate). Rating spellings from every source normalize
//! onto the closed scales in [`reelmeta_common::ratings`].

pub mod asf;
pub mod cache;
pub mod dump;
pub mod mp4;
pub mod pipeline;
pub mod sources;
pub mod xml;

pub use dump::dump;
pub use pipeline::{MetadataPipeline, PipelineConfig};
pub use reelmeta_common::{ratings, Error, Record, Result, Value};
pub use reelmeta_dvr::DecoderConfig;
