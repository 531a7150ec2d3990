//! Metadata assembly across sources.
//!
//! A [`MetadataPipeline`] owns one instance of every source parser, each
//! with its own cache, and layers their records in a fixed order: basic
//! filename seeding, then the first applicable embedded-metadata source,
//! then the `.nfo` sidecar, then text sidecars. Later layers override
//! scalars; vector fields accumulate from the sidecar layers. A source
//! failure is logged and contributes nothing.

use crate::cache::{SourceCache, DEFAULT_CAPACITY};
use crate::sources::{
    ContainerTagSource, EyetvSource, MetadataSource, NfoSource, RecordingSource, ScoreTagSource,
    TextSource,
};
use chrono::{DateTime, Utc};
use reelmeta_common::Record;
use reelmeta_dvr::DecoderConfig;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Pipeline-wide configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of each per-source cache.
    pub cache_capacity: usize,
    /// Whether failed parses are memoized as empty records.
    pub cache_failures: bool,
    /// Recording container decode settings.
    pub decoder: DecoderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            cache_failures: true,
            decoder: DecoderConfig::default(),
        }
    }
}

/// The full set of source parsers with their caches.
pub struct MetadataPipeline {
    primary: Vec<Box<dyn MetadataSource>>,
    nfo: NfoSource,
    text: TextSource,
    recording: RecordingSource,
}

impl MetadataPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let cache = |config: &PipelineConfig| {
            let cache = SourceCache::new(config.cache_capacity);
            if config.cache_failures {
                cache
            } else {
                cache.without_negative_caching()
            }
        };

        Self {
            primary: vec![
                Box::new(ContainerTagSource::new(cache(&config))),
                Box::new(ScoreTagSource::new(cache(&config))),
                Box::new(EyetvSource::new()),
            ],
            nfo: NfoSource::new(cache(&config)),
            text: TextSource::new(),
            recording: RecordingSource::new(cache(&config), config.decoder),
        }
    }

    /// Assemble the record for a plain media file.
    ///
    /// The record is seeded with the file stem as `title` and the
    /// modification time as `originalAirDate`, then layered with the first
    /// applicable embedded source, the nfo sidecar, and the text sidecars.
    pub fn build_record(&self, path: &Path, mtime: Option<SystemTime>) -> Record {
        let mut record = Record::new();
        if let Some(stem) = path.file_stem() {
            record.set("title", stem.to_string_lossy().into_owned());
        }
        record.set("originalAirDate", air_date(path, mtime));

        for source in &self.primary {
            if source.applies(path) {
                record.merge(self.layer(source.as_ref(), path), false);
                break;
            }
        }
        if self.nfo.applies(path) {
            record.merge(self.layer(&self.nfo, path), true);
        }
        record.merge(self.layer(&self.text, path), true);

        record
    }

    /// Assemble the record for a recording container. Decode failures,
    /// including a missing media access key, yield an empty record.
    pub fn build_from_recording(&self, path: &Path) -> Record {
        self.layer(&self.recording, path)
    }

    fn layer(&self, source: &dyn MetadataSource, path: &Path) -> Record {
        match source.parse(path) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    source = source.name(),
                    path = %path.display(),
                    error = %err,
                    "source parse failed"
                );
                Record::new()
            }
        }
    }
}

/// The file's modification time (or now when unreadable) as a local-less
/// ISO timestamp.
fn air_date(path: &Path, mtime: Option<SystemTime>) -> String {
    let time = mtime
        .or_else(|| fs::metadata(path).ok().and_then(|m| m.modified().ok()))
        .unwrap_or_else(SystemTime::now);
    DateTime::<Utc>::from(time)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_seeded_from_filename_and_mtime() {
        let pipeline = MetadataPipeline::new(PipelineConfig::default());
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_714_529_700);
        let record = pipeline.build_record(Path::new("/media/Some Show.mpg"), Some(mtime));

        assert_eq!(record.text("title"), Some("Some Show"));
        assert_eq!(record.text("originalAirDate"), Some("2024-05-01T02:15:00"));
    }

    #[test]
    fn test_sidecars_layer_over_seed() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("pilot.mpg");
        fs::write(&media, b"").unwrap();
        fs::write(
            root.path().join("pilot.nfo"),
            "<movie><title>Pilot Movie</title><year>1999</year>\
             <actor><name>Alice</name></actor></movie>",
        )
        .unwrap();
        fs::write(
            root.path().join("pilot.mpg.txt"),
            "description : from text sidecar\nvActor : Bob\n",
        )
        .unwrap();

        let pipeline = MetadataPipeline::new(PipelineConfig::default());
        let record = pipeline.build_record(&media, None);

        assert_eq!(record.text("title"), Some("Pilot Movie"));
        assert_eq!(record.text("movieYear"), Some("1999"));
        assert_eq!(record.text("description"), Some("from text sidecar"));
        assert_eq!(
            record.list("vActor").unwrap(),
            &["Alice".to_string(), "Bob".to_string()]
        );
    }

    #[test]
    fn test_missing_secret_yields_empty_record() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("show.tivo");
        fs::write(&path, b"not a real container").unwrap();

        let pipeline = MetadataPipeline::new(PipelineConfig::default());
        assert!(pipeline.build_from_recording(&path).is_empty());
    }
}
