//! Embedded MP4/QuickTime tag source.
//!
//! Maps the iTunes-style atom tag set onto the canonical record. Whether a
//! file is treated as a TV episode or a movie follows the `stik` media
//! kind when present, else the presence of a show-name tag, and several
//! mappings change meaning with that context.

use crate::cache::SourceCache;
use crate::mp4::{self, TagValue};
use crate::sources::{extension, MetadataSource};
use reelmeta_common::ratings::{self, Kind};
use reelmeta_common::{Record, Result, Value};
use std::io::Cursor;
use std::path::Path;

/// `stik` media kind for TV shows.
const MEDIA_KIND_TV_SHOW: i64 = 10;

/// Freeform tag carrying the iTunes rating string.
const TAG_RATING: &str = "----:com.apple.iTunes:iTunEXTC";

/// Freeform tag carrying the iTunes movie credits plist.
const TAG_CREDITS: &str = "----:com.apple.iTunes:iTunMOVI";

/// Freeform tag carrying an arbitrary pass-through plist.
const TAG_PASSTHROUGH: &str = "----:com.reelmeta.reelmeta:reelINFO";

/// Source for `.mp4`/`.m4v`/`.mov` embedded tags.
pub struct ContainerTagSource {
    cache: SourceCache,
}

impl ContainerTagSource {
    pub fn new(cache: SourceCache) -> Self {
        Self { cache }
    }
}

impl MetadataSource for ContainerTagSource {
    fn name(&self) -> &'static str {
        "container-tag"
    }

    fn applies(&self, path: &Path) -> bool {
        matches!(extension(path).as_str(), "mp4" | "m4v" | "mov")
    }

    fn parse(&self, path: &Path) -> Result<Record> {
        self.cache
            .get_or_compute(path, |p| Ok(map_tags(&mp4::read_tags(p)?)))
    }
}

/// Map a raw tag set onto the canonical record.
pub(crate) fn map_tags(tags: &[(String, TagValue)]) -> Record {
    let mut record = Record::new();
    let mut best_desc_len = 0usize;

    let is_tv_show = match tags
        .iter()
        .find(|(k, _)| k == "stik")
        .and_then(|(_, v)| v.as_int())
    {
        Some(kind) => kind == MEDIA_KIND_TV_SHOW,
        None => tags.iter().any(|(k, _)| k == "tvsh"),
    };

    for (key, value) in tags {
        match key.as_str() {
            "tvnn" => {
                if let Some(text) = value.as_text() {
                    record.set("callsign", text);
                }
            }
            "tvsh" => {
                if let Some(text) = value.as_text() {
                    record.set("seriesTitle", text);
                }
            }
            "tven" => {
                if let Some(text) = value.as_text() {
                    map_episode_id(&mut record, text);
                }
            }
            "tvsn" => {
                let season = tag_number(value);
                let episode = tags
                    .iter()
                    .find(|(k, _)| k == "tves")
                    .map(|(_, v)| tag_number(v))
                    .unwrap_or_else(|| "0".to_string());
                record.set("episodeNumber", format!("{season}{episode:0>2}"));
            }
            "\u{a9}day" => {
                if let Some(text) = value.as_text() {
                    if is_tv_show {
                        let mut date = text.to_string();
                        if date.len() == 4 {
                            date.push_str("-01-01T16:00:00Z");
                        }
                        record.set("originalAirDate", date);
                    } else if text.chars().count() >= 4 {
                        let year: String = text.chars().take(4).collect();
                        record.set("movieYear", year);
                    }
                }
            }
            "\u{a9}gen" | "gnre" => {
                if let Some(text) = value.as_text() {
                    record.push_list("vProgramGenre", text);
                    record.push_list("vSeriesGenre", text);
                }
            }
            "\u{a9}nam" => {
                if let Some(text) = value.as_text() {
                    let field = if is_tv_show { "episodeTitle" } else { "title" };
                    record.set(field, text);
                }
            }
            "desc" | "\u{a9}cmt" | "ldes" => {
                if let Some(text) = value.as_text() {
                    if text.len() > best_desc_len {
                        best_desc_len = text.len();
                        record.set("description", text);
                    }
                }
            }
            TAG_RATING => {
                if let Some(text) = value.as_text() {
                    map_rating(&mut record, text);
                }
            }
            TAG_CREDITS => map_credits_plist(&mut record, value),
            TAG_PASSTHROUGH => map_passthrough_plist(&mut record, value),
            _ => {}
        }
    }

    record
}

/// The `tven` tag carries either a program id or an `SnEn` spelling.
fn map_episode_id(record: &mut Record, value: &str) {
    if value.starts_with("SH") {
        record.set("isEpisode", "false");
    } else if value.starts_with("MV") || value.starts_with("EP") {
        record.set("isEpisode", "true");
        record.set("programId", value);
    } else if let Some(rest) = value.strip_prefix('S') {
        if rest.matches('E').count() != 1 {
            return;
        }
        if let Some((season, episode)) = rest.split_once('E') {
            if !season.is_empty()
                && !episode.is_empty()
                && season.bytes().all(|b| b.is_ascii_digit())
                && episode.bytes().all(|b| b.is_ascii_digit())
            {
                record.set("episodeNumber", format!("{season}{episode:0>2}"));
            }
        }
    }
}

/// iTunes rating strings look like `us-tv|TV-PG|500|` or `mpaa|PG-13|300|`.
fn map_rating(record: &mut Record, value: &str) {
    let Some(token) = value.split('|').nth(1) else {
        return;
    };
    if value.contains("us-tv") {
        if let Some(rating) = ratings::canonical(Kind::Tv, token) {
            record.set("tvRating", rating);
        }
    } else if value.contains("mpaa") {
        if let Some(rating) = ratings::canonical(Kind::Mpaa, token) {
            record.set("mpaaRating", rating);
        }
    }
}

/// The `iTunMOVI` plist lists role groups as arrays of `{name: ...}` dicts.
fn map_credits_plist(record: &mut Record, value: &TagValue) {
    const GROUPS: [(&str, &str); 4] = [
        ("cast", "vActor"),
        ("directors", "vDirector"),
        ("producers", "vProducer"),
        ("screenwriters", "vWriter"),
    ];

    let Some(dict) = parse_plist_dict(value) else {
        return;
    };
    for (group, field) in GROUPS {
        let Some(entries) = dict.get(group).and_then(plist::Value::as_array) else {
            continue;
        };
        for entry in entries {
            if let Some(name) = entry
                .as_dictionary()
                .and_then(|d| d.get("name"))
                .and_then(plist::Value::as_string)
            {
                record.push_list(field, name);
            }
        }
    }
}

/// Arbitrary fields pass through from the embedded plist untouched.
fn map_passthrough_plist(record: &mut Record, value: &TagValue) {
    let Some(dict) = parse_plist_dict(value) else {
        return;
    };
    for (key, value) in &dict {
        match value {
            plist::Value::String(s) => record.set(key.clone(), s.as_str()),
            plist::Value::Integer(n) => {
                if let Some(n) = n.as_signed() {
                    record.set(key.clone(), n);
                }
            }
            plist::Value::Array(items) => {
                let strings: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_string().map(str::to_string))
                    .collect();
                if !strings.is_empty() {
                    record.set(key.clone(), Value::List(strings));
                }
            }
            _ => {}
        }
    }
}

fn tag_number(value: &TagValue) -> String {
    match value {
        TagValue::Int(n) => n.to_string(),
        TagValue::Text(s) => s.trim().to_string(),
        TagValue::Bytes(_) => "0".to_string(),
    }
}

fn parse_plist_dict(value: &TagValue) -> Option<plist::Dictionary> {
    let bytes: &[u8] = match value {
        TagValue::Text(s) => s.as_bytes(),
        TagValue::Bytes(b) => b,
        TagValue::Int(_) => return None,
    };
    plist::Value::from_reader(Cursor::new(bytes))
        .ok()?
        .into_dictionary()
}
