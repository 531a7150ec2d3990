//! EyeTV recording bundles.
//!
//! An EyeTV recording is a `.eyetv` directory holding the media file and a
//! sibling `.eyetvp` property list whose `epg info` dictionary carries the
//! program guide fields.

use super::MetadataSource;
use chrono::Datelike;
use reelmeta_common::{ratings, Error, Record, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Program guide metadata from an EyeTV bundle.
pub struct EyetvSource;

impl EyetvSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EyetvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataSource for EyetvSource {
    fn name(&self) -> &'static str {
        "eyetv"
    }

    fn applies(&self, path: &Path) -> bool {
        path.parent()
            .and_then(Path::file_name)
            .is_some_and(|name| name.to_string_lossy().ends_with(".eyetv"))
    }

    fn parse(&self, path: &Path) -> Result<Record> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::unsupported("no enclosing bundle"))?;
        let plist_path = find_eyetvp(dir)?;
        let root = plist::Value::from_file(&plist_path)
            .map_err(|e| Error::malformed(format!("bad eyetvp plist: {e}")))?;
        let Some(root) = root.as_dictionary() else {
            return Err(Error::malformed("eyetvp root is not a dictionary"));
        };
        Ok(map_bundle(root))
    }
}

/// The first `.eyetvp` file in the bundle directory, by name.
fn find_eyetvp(dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|e| e == "eyetvp"))
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::unsupported("no .eyetvp in bundle"))
}

pub(crate) fn map_bundle(root: &plist::Dictionary) -> Record {
    let mut record = Record::new();
    let Some(info) = root.get("epg info").and_then(plist::Value::as_dictionary) else {
        return record;
    };

    for (tag, field) in [
        ("TITLE", "title"),
        ("SUBTITLE", "episodeTitle"),
        ("DESCRIPTION", "description"),
        ("YEAR", "movieYear"),
        ("EPISODENUM", "episodeNumber"),
    ] {
        if let Some(value) = info.get(tag).and_then(plist_text) {
            if !value.is_empty() {
                record.set(field, value);
            }
        }
    }

    // A subtitle marks an episode, and then TITLE names the series.
    if record.contains("episodeTitle") {
        if let Some(title) = record.text("title").map(str::to_string) {
            record.set("seriesTitle", title);
        }
    }

    if let Some(actors) = info.get("ACTORS").and_then(plist::Value::as_string) {
        for actor in actors.split(',') {
            let actor = actor.trim();
            if !actor.is_empty() {
                record.push_list("vActor", actor);
            }
        }
    }
    if let Some(director) = info.get("DIRECTOR").and_then(plist::Value::as_string) {
        if !director.is_empty() {
            record.push_list("vDirector", director);
        }
    }

    for (field, tag, kind) in [
        ("tvRating", "TV_RATING", ratings::Kind::Tv),
        ("mpaaRating", "MPAA_RATING", ratings::Kind::Mpaa),
        ("starRating", "STAR_RATING", ratings::Kind::Star),
    ] {
        if let Some(raw) = info.get(tag).and_then(plist::Value::as_string) {
            if let Some(value) = ratings::canonical(kind, raw) {
                record.set(field, value);
            }
        }
    }

    // Movie ratings need a year to render; fall back to the recording
    // start date.
    if (record.contains("mpaaRating") || record.contains("starRating"))
        && !record.contains("movieYear")
    {
        if let Some(year) = recording_start_year(root) {
            record.set("movieYear", year.to_string());
        }
    }

    record
}

fn recording_start_year(root: &plist::Dictionary) -> Option<i32> {
    let start = root
        .get("info")
        .and_then(plist::Value::as_dictionary)?
        .get("start")?;
    let plist::Value::Date(date) = start else {
        return None;
    };
    let time = SystemTime::from(*date);
    Some(chrono::DateTime::<chrono::Utc>::from(time).year())
}

fn plist_text(value: &plist::Value) -> Option<String> {
    match value {
        plist::Value::String(s) => Some(s.clone()),
        plist::Value::Integer(n) => n.as_signed().map(|v| v.to_string()),
        _ => None,
    }
}
