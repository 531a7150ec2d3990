//! Plain-text sidecar metadata.
//!
//! Key/value text files layered from least to most specific: `default.txt`
//! in each ancestor directory (outermost first), then `<stem>.properties`,
//! `<name>.txt` next to the file, and finally the `.meta` subdirectory.
//! Later files override scalar keys; `v`-prefixed keys accumulate across
//! the whole chain.

use super::MetadataSource;
use reelmeta_common::{ratings, Record, Result, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Layered key/value sidecar files.
pub struct TextSource;

impl TextSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataSource for TextSource {
    fn name(&self) -> &'static str {
        "sidecar-text"
    }

    // Text sidecars can annotate any media file.
    fn applies(&self, _path: &Path) -> bool {
        true
    }

    fn parse(&self, path: &Path) -> Result<Record> {
        let mut record = Record::new();
        for candidate in candidate_paths(path) {
            if !candidate.is_file() {
                continue;
            }
            let sep = if candidate.extension().is_some_and(|e| e == "properties") {
                '='
            } else {
                ':'
            };
            // One unreadable sidecar must not discard what the earlier
            // layers already contributed.
            if let Err(err) = apply_file(&mut record, &candidate, sep) {
                tracing::warn!(
                    path = %candidate.display(),
                    error = %err,
                    "skipping unreadable sidecar"
                );
            }
        }
        coerce_ratings(&mut record);
        Ok(record)
    }
}

/// Candidate sidecars in application order, least specific first.
fn candidate_paths(media: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let mut dirs = Vec::new();
    let mut dir = media.parent();
    while let Some(current) = dir {
        dirs.push(current);
        dir = current.parent();
    }
    for current in dirs.into_iter().rev() {
        paths.push(current.join("default.txt"));
    }

    if let Some(stem) = media.file_stem() {
        let mut name = stem.to_os_string();
        name.push(".properties");
        paths.push(media.with_file_name(name));
    }

    let mut full = media.as_os_str().to_os_string();
    full.push(".txt");
    paths.push(PathBuf::from(full));

    if let (Some(parent), Some(name)) = (media.parent(), media.file_name()) {
        let meta = parent.join(".meta");
        paths.push(meta.join("default.txt"));
        let mut name = name.to_os_string();
        name.push(".txt");
        paths.push(meta.join(name));
    }

    paths
}

fn apply_file(record: &mut Record, path: &Path, sep: char) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    for line in text.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(sep) else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        if Record::is_vector_key(key) {
            record.push_list(key, value);
        } else {
            record.set(key, value);
        }
    }
    Ok(())
}

/// Replace rating spellings with canonical integers, falling back to a
/// bare integer, dropping what fits neither.
fn coerce_ratings(record: &mut Record) {
    for (field, kind) in [
        ("tvRating", ratings::Kind::Tv),
        ("mpaaRating", ratings::Kind::Mpaa),
        ("starRating", ratings::Kind::Star),
    ] {
        let Some(Value::Text(raw)) = record.get(field).cloned() else {
            continue;
        };
        let value = ratings::canonical(kind, &raw).or_else(|| raw.trim().parse::<i64>().ok());
        match value {
            Some(value) => record.set(field, value),
            None => {
                record.remove(field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layering_and_overrides() {
        let root = tempfile::tempdir().unwrap();
        let show_dir = root.path().join("shows");
        let meta_dir = show_dir.join(".meta");
        fs::create_dir_all(&meta_dir).unwrap();

        fs::write(
            root.path().join("default.txt"),
            "title : Library Default\nvActor : Alice\n",
        )
        .unwrap();
        fs::write(
            show_dir.join("default.txt"),
            "title : Show Default\ndescription : from the folder\n",
        )
        .unwrap();
        fs::write(
            show_dir.join("pilot.properties"),
            "title = Pilot (properties)\nvActor = Bob\n",
        )
        .unwrap();
        fs::write(
            show_dir.join("pilot.mpg.txt"),
            "# comment line\nepisodeTitle : Pilot\nno separator here\n",
        )
        .unwrap();
        fs::write(meta_dir.join("pilot.mpg.txt"), "callsign : KTEST\n").unwrap();

        let record = TextSource::new()
            .parse(&show_dir.join("pilot.mpg"))
            .unwrap();

        // Inner default.txt beats outer, properties beat both.
        assert_eq!(record.text("title"), Some("Pilot (properties)"));
        assert_eq!(record.text("description"), Some("from the folder"));
        assert_eq!(record.text("episodeTitle"), Some("Pilot"));
        assert_eq!(record.text("callsign"), Some("KTEST"));
        assert_eq!(
            record.list("vActor").unwrap(),
            &["Alice".to_string(), "Bob".to_string()]
        );
    }

    #[test]
    fn test_unreadable_sidecar_keeps_earlier_layers() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("movie.mpg");
        fs::write(root.path().join("default.txt"), "title : Kept\n").unwrap();
        // Invalid UTF-8 makes this candidate unreadable as text.
        fs::write(root.path().join("movie.mpg.txt"), [0xff, 0xfe, 0xfd]).unwrap();
        let meta_dir = root.path().join(".meta");
        fs::create_dir_all(&meta_dir).unwrap();
        fs::write(meta_dir.join("movie.mpg.txt"), "callsign : KTEST\n").unwrap();

        let record = TextSource::new().parse(&media).unwrap();
        assert_eq!(record.text("title"), Some("Kept"));
        assert_eq!(record.text("callsign"), Some("KTEST"));
    }

    #[test]
    fn test_rating_coercion() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("movie.mpg");
        fs::write(
            root.path().join("movie.mpg.txt"),
            "tvRating : TV-14\nmpaaRating : junk\nstarRating : 3\ncolorCode : 4\n",
        )
        .unwrap();

        let record = TextSource::new().parse(&media).unwrap();
        assert_eq!(record.int("tvRating"), Some(5));
        assert!(record.get("mpaaRating").is_none());
        // "3" is a star-table spelling, not a raw canonical value.
        assert_eq!(record.int("starRating"), Some(5));
        assert_eq!(record.text("colorCode"), Some("4"));
    }

    #[test]
    fn test_raw_integer_rating_passes_through() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("movie.mpg");
        fs::write(root.path().join("movie.mpg.txt"), "tvRating : 9\n").unwrap();

        let record = TextSource::new().parse(&media).unwrap();
        assert_eq!(record.int("tvRating"), Some(9));
    }

    #[test]
    fn test_bom_on_first_line_is_ignored() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("movie.mpg");
        fs::write(
            root.path().join("movie.mpg.txt"),
            "\u{feff}title : With BOM\n",
        )
        .unwrap();

        let record = TextSource::new().parse(&media).unwrap();
        assert_eq!(record.text("title"), Some("With BOM"));
    }
}
