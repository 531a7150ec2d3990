//! Kodi/XBMC `.nfo` sidecar parsing.
//!
//! An `.nfo` next to the media file carries either `<episodedetails>` or
//! `<movie>`. Episodes also inherit show-level fields from the nearest
//! `tvshow.nfo` found walking up the directory tree. Scraper-seed files
//! often end with a bare URL after the XML; parsing trims such trailing
//! lines before giving up.

use super::MetadataSource;
use crate::cache::SourceCache;
use crate::xml::{self, Element};
use reelmeta_common::{ratings, Error, Record, Result, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Sidecar metadata in `.nfo` files, with `tvshow.nfo` inheritance.
pub struct NfoSource {
    cache: SourceCache,
}

impl NfoSource {
    pub fn new(cache: SourceCache) -> Self {
        Self { cache }
    }

    fn parse_media(&self, media: &Path) -> Result<Record> {
        let nfo_path = sidecar_path(media);
        let text = read_sidecar(&nfo_path)?;
        let Some(doc) = parse_trimmed(&text) else {
            return Err(Error::malformed(format!(
                "unparseable nfo {}",
                nfo_path.display()
            )));
        };

        let mut record = if let Some(episode) = doc.find("episodedetails") {
            let mut record = self.tvshow_record(&nfo_path);
            apply_episode(episode, &mut record);
            record
        } else if let Some(movie) = doc.find("movie") {
            let mut record = Record::new();
            apply_movie(movie, &mut record);
            record
        } else {
            Record::new()
        };

        normalize_ratings(&mut record);
        Ok(record)
    }

    /// Fields inherited from the nearest `tvshow.nfo`, walking ancestor
    /// directories starting at the sidecar's own. A show file that fails
    /// to parse inherits nothing.
    fn tvshow_record(&self, nfo_path: &Path) -> Record {
        let mut dir = nfo_path.parent();
        while let Some(current) = dir {
            let candidate = current.join("tvshow.nfo");
            if candidate.exists() {
                return self
                    .cache
                    .get_or_compute(&candidate, |p| Ok(read_tvshow(p)))
                    .unwrap_or_default();
            }
            dir = current.parent();
        }
        Record::new()
    }
}

impl MetadataSource for NfoSource {
    fn name(&self) -> &'static str {
        "nfo"
    }

    fn applies(&self, path: &Path) -> bool {
        sidecar_path(path).exists()
    }

    fn parse(&self, path: &Path) -> Result<Record> {
        self.cache.get_or_compute(path, |p| self.parse_media(p))
    }
}

fn sidecar_path(media: &Path) -> PathBuf {
    media.with_extension("nfo")
}

fn read_sidecar(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// Parse an nfo document, trimming trailing non-XML lines.
///
/// Each retry drops at most the blank tail plus the line the parser
/// stopped in, and only when that line is the last one, so the loop is
/// bounded by the line count and never trims past a mid-document error.
fn parse_trimmed(text: &str) -> Option<Element> {
    let mut lines: Vec<&str> = text.lines().map(str::trim).collect();
    loop {
        if lines.is_empty() {
            return None;
        }
        let joined = lines.join("\n");
        let err = match xml::parse(&joined) {
            Ok(doc) => return Some(doc),
            Err(err) => err,
        };

        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        let last_start = match lines.len() {
            0 => return None,
            n => lines[..n - 1].iter().map(|l| l.len() + 1).sum::<usize>(),
        };
        if err.offset < last_start {
            return None;
        }
        lines.pop();
    }
}

fn read_tvshow(path: &Path) -> Record {
    let mut record = Record::new();
    let Ok(text) = read_sidecar(path) else {
        return record;
    };
    let Some(doc) = parse_trimmed(&text) else {
        return record;
    };
    let Some(tvshow) = doc.find("tvshow") else {
        return record;
    };

    for (field, tag) in [
        ("description", "plot"),
        ("title", "title"),
        ("seriesTitle", "showtitle"),
        ("starRating", "rating"),
        ("tvRating", "mpaa"),
    ] {
        let data = xml::tag_data(tvshow, tag);
        if !data.is_empty() {
            record.set(field, data);
        }
    }
    apply_vitems(tvshow, &mut record);
    record
}

fn apply_episode(episode: &Element, record: &mut Record) {
    record.set("isEpisode", "true");
    for (field, tag) in [
        ("description", "plot"),
        ("episodeTitle", "title"),
        ("seriesTitle", "showtitle"),
        ("originalAirDate", "aired"),
        ("starRating", "rating"),
        ("tvRating", "mpaa"),
    ] {
        let data = xml::tag_data(episode, tag);
        if !data.is_empty() {
            record.set(field, data);
        }
    }

    // Display overrides take precedence unless absent or the -1 filler.
    let mut season = xml::tag_data(episode, "displayseason");
    if season.is_empty() || season == "-1" {
        season = xml::tag_data(episode, "season");
    }
    if season.is_empty() {
        season = "1".to_string();
    }
    let mut number = xml::tag_data(episode, "displayepisode");
    if number.is_empty() || number == "-1" {
        number = xml::tag_data(episode, "episode");
    }
    if !number.is_empty() && number != "-1" {
        if let (Ok(season), Ok(number)) = (season.parse::<i64>(), number.parse::<i64>()) {
            record.set("episodeNumber", format!("{season}{number:02}"));
        }
    }

    if let Some(aired) = record.text("originalAirDate").map(str::to_string) {
        record.set("originalAirDate", format!("{aired}T00:00:00Z"));
    }

    apply_vitems(episode, record);
}

fn apply_movie(movie: &Element, record: &mut Record) {
    record.set("isEpisode", "false");
    for (field, tag) in [
        ("description", "plot"),
        ("title", "title"),
        ("movieYear", "year"),
        ("starRating", "rating"),
        ("mpaaRating", "mpaa"),
    ] {
        let data = xml::tag_data(movie, tag);
        if !data.is_empty() {
            record.set(field, data);
        }
    }

    let year = record
        .text("movieYear")
        .and_then(|y| y.trim().parse::<i64>().ok())
        .unwrap_or(0);
    record.set("movieYear", format!("{year:04}"));

    apply_vitems(movie, record);
}

/// Append the vector fields of an nfo node, deduplicating against values
/// already inherited from the show file. The genre list is additionally
/// exposed under both program and series genre names.
fn apply_vitems(source: &Element, record: &mut Record) {
    for (field, path) in [
        ("vGenre", "genre"),
        ("vWriter", "credits"),
        ("vDirector", "director"),
        ("vActor", "actor/name"),
    ] {
        for item in xml::vtag_data_alternate(source, path) {
            record.push_list(field, item);
        }
    }

    if let Some(genres) = record.list("vGenre").map(<[String]>::to_vec) {
        record.set("vSeriesGenre", genres.clone());
        record.set("vProgramGenre", genres);
    }
}

/// Rescale the 0-10 scraper rating onto the 1-7 star scale and replace
/// rating spellings with canonical integers, dropping unknown ones.
fn normalize_ratings(record: &mut Record) {
    if let Some(value) = record.get("starRating").cloned() {
        let rescaled = value
            .as_text()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .map(|x| (x * 6.0 / 10.0 + 1.5).floor() as i64);
        match rescaled {
            Some(stars) => record.set("starRating", stars),
            None => {
                record.remove("starRating");
            }
        }
    }

    for (field, kind) in [
        ("mpaaRating", ratings::Kind::Mpaa),
        ("tvRating", ratings::Kind::Tv),
    ] {
        let Some(Value::Text(raw)) = record.get(field).cloned() else {
            continue;
        };
        match ratings::canonical(kind, &raw) {
            Some(value) => record.set(field, value),
            None => {
                record.remove(field);
            }
        }
    }
}
