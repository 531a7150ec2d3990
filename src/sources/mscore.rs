//! DVR-MS / WMV metadata via ASF header attributes.

use super::{extension, MetadataSource};
use crate::asf;
use crate::cache::SourceCache;
use reelmeta_common::{ratings, Record, Result};
use std::path::Path;

/// Record field to ASF attribute names, in fallback order. When several
/// spellings of an attribute are present the last one listed wins.
const FIELD_TAGS: [(&str, &[&str]); 9] = [
    ("title", &["Title"]),
    ("description", &["Description", "WM/SubTitleDescription"]),
    ("episodeTitle", &["WM/SubTitle"]),
    ("callsign", &["WM/MediaStationCallSign"]),
    ("displayMajorNumber", &["WM/MediaOriginalChannel"]),
    ("originalAirDate", &["WM/MediaOriginalBroadcastDateTime"]),
    ("rating", &["WM/ParentalRating"]),
    ("credits", &["WM/MediaCredits"]),
    ("genre", &["WM/Genre"]),
];

/// Metadata embedded in Windows Media recordings (`.dvr-ms`, `.wmv`,
/// `.asf`).
pub struct ScoreTagSource {
    cache: SourceCache,
}

impl ScoreTagSource {
    pub fn new(cache: SourceCache) -> Self {
        Self { cache }
    }
}

impl MetadataSource for ScoreTagSource {
    fn name(&self) -> &'static str {
        "score-tag"
    }

    fn applies(&self, path: &Path) -> bool {
        matches!(extension(path).as_str(), "dvr-ms" | "asf" | "wmv")
    }

    fn parse(&self, path: &Path) -> Result<Record> {
        self.cache
            .get_or_compute(path, |p| Ok(map_attributes(&asf::read_attributes(p)?)))
    }
}

/// Map raw ASF attributes onto the record vocabulary.
pub(crate) fn map_attributes(attrs: &[(String, String)]) -> Record {
    let mut record = Record::new();

    for (field, tags) in FIELD_TAGS {
        for tag in tags {
            if let Some(value) = lookup(attrs, tag) {
                if !value.is_empty() {
                    record.set(field, value);
                }
            }
        }
    }

    // A subtitle marks an episodic recording, so the outer title names
    // the series.
    if record.contains("episodeTitle") {
        if let Some(title) = record.text("title").map(str::to_string) {
            record.set("seriesTitle", title);
        }
    }

    if let Some(genre) = record.remove("genre").and_then(|v| v.as_text().map(str::to_string)) {
        let items: Vec<String> = genre
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();
        if !items.is_empty() {
            record.set("vProgramGenre", items.clone());
            record.set("vSeriesGenre", items);
        }
    }

    if let Some(credits) = record.remove("credits").and_then(|v| v.as_text().map(str::to_string)) {
        apply_credits(&mut record, &credits);
    }

    if let Some(rating) = record.remove("rating").and_then(|v| v.as_text().map(str::to_string)) {
        if let Some(value) = ratings::canonical(ratings::Kind::Tv, &rating) {
            record.set("tvRating", value);
        }
    }

    record
}

/// Credit groups are `;`-separated, names within a group `/`-separated:
/// actors, directors, hosts, guest stars. Guests count as actors.
fn apply_credits(record: &mut Record, credits: &str) {
    let groups: Vec<Vec<&str>> = credits
        .split(';')
        .map(|group| group.split('/').collect())
        .collect();
    if groups.len() <= 3 {
        return;
    }

    for name in groups[0].iter().chain(groups[3].iter()) {
        if !name.is_empty() {
            record.push_list("vActor", *name);
        }
    }
    for name in &groups[1] {
        if !name.is_empty() {
            record.push_list("vDirector", *name);
        }
    }
}

fn lookup(attrs: &[(String, String)], tag: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(name, _)| name == tag)
        .map(|(_, value)| value.trim().to_string())
}
