//! DVR recording containers and their details documents.
//!
//! A `.tivo` recording embeds a "details" XML document describing the
//! showing. [`RecordingSource`] decodes the container (in process or via a
//! configured external tool) and maps the document onto a record.
//! [`from_listing`] maps the `<Details>` block of a device's own listing
//! documents, which use a different tag vocabulary.

use super::{extension, MetadataSource};
use crate::cache::SourceCache;
use crate::xml::{self, Element};
use reelmeta_common::{Error, Record, Result};
use reelmeta_dvr::{decode_file, DecodeError, DecoderConfig};
use std::path::Path;

/// Listing-service copyright boilerplate stripped from descriptions.
const COPYRIGHT_NOTICES: [&str; 2] = [
    " Copyright Tribune Media Services, Inc.",
    " Copyright Rovi, Inc.",
];

/// Metadata embedded in `.tivo` recording containers.
pub struct RecordingSource {
    cache: SourceCache,
    decoder: DecoderConfig,
}

impl RecordingSource {
    pub fn new(cache: SourceCache, decoder: DecoderConfig) -> Self {
        Self { cache, decoder }
    }
}

impl MetadataSource for RecordingSource {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn applies(&self, path: &Path) -> bool {
        extension(path) == "tivo"
    }

    fn parse(&self, path: &Path) -> Result<Record> {
        self.cache.get_or_compute(path, |p| {
            let xml = decode_file(p, &self.decoder).map_err(decode_error)?;
            from_details(&String::from_utf8_lossy(&xml))
        })
    }
}

fn decode_error(err: DecodeError) -> Error {
    match err {
        DecodeError::Io(io) => Error::Io(io),
        DecodeError::MissingSecret => Error::MissingSecret,
        other => Error::decode(other.to_string()),
    }
}

/// Map a decoded details document onto a record.
pub fn from_details(text: &str) -> Result<Record> {
    let doc = xml::parse(text)?;
    let showing = doc
        .find("showing")
        .ok_or_else(|| Error::malformed("details document without a showing element"))?;
    let program = showing
        .find("program")
        .ok_or_else(|| Error::malformed("showing without a program element"))?;

    let mut record = Record::new();
    for (field, path) in [
        ("description", "program/description"),
        ("title", "program/title"),
        ("episodeTitle", "program/episodeTitle"),
        ("episodeNumber", "program/episodeNumber"),
        ("programId", "program/uniqueId"),
        ("seriesId", "program/series/uniqueId"),
        ("seriesTitle", "program/series/seriesTitle"),
        ("originalAirDate", "program/originalAirDate"),
        ("isEpisode", "program/isEpisode"),
        ("movieYear", "program/movieYear"),
        ("partCount", "partCount"),
        ("partIndex", "partIndex"),
        ("time", "time"),
    ] {
        let mut data = xml::tag_data(showing, path);
        if data.is_empty() {
            continue;
        }
        if field == "description" {
            data = clean_description(&data);
        }
        record.set(field, data);
    }

    for field in [
        "vActor",
        "vChoreographer",
        "vDirector",
        "vExecProducer",
        "vProgramGenre",
        "vGuestStar",
        "vHost",
        "vProducer",
        "vWriter",
    ] {
        let items = xml::vtag_data(program, field);
        if !items.is_empty() {
            record.set(field, items);
        }
    }

    if let Some(bits) = showing.find("showingBits").and_then(|e| e.attr("value")) {
        record.set("showingBits", bits);
    }

    for field in ["starRating", "mpaaRating"] {
        if let Some(value) = xml::tag_value(program, field) {
            record.set(field, value);
        }
    }
    if let Some(value) = xml::tag_value(showing, "tvRating") {
        record.set("tvRating", value);
    }

    Ok(record)
}

/// Map the `<Details>` block of a device listing document onto a record.
pub fn from_listing(doc: &Element) -> Result<Record> {
    let details = doc
        .find("Details")
        .ok_or_else(|| Error::malformed("listing without a Details element"))?;

    let mut record = Record::new();
    for (field, tag) in [
        ("title", "Title"),
        ("episodeTitle", "EpisodeTitle"),
        ("description", "Description"),
        ("programId", "ProgramId"),
        ("seriesId", "SeriesId"),
        ("episodeNumber", "EpisodeNumber"),
        ("tvRating", "TvRating"),
        ("displayMajorNumber", "SourceChannel"),
        ("callsign", "SourceStation"),
        ("showingBits", "ShowingBits"),
        ("mpaaRating", "MpaaRating"),
    ] {
        let data = xml::tag_data(details, tag);
        if data.is_empty() {
            continue;
        }
        match field {
            "description" => record.set(field, clean_description(&data)),
            "tvRating" => {
                if let Ok(value) = data.parse::<i64>() {
                    record.set(field, value);
                }
            }
            "displayMajorNumber" => match data.split_once('-') {
                Some((major, minor)) => {
                    record.set(field, major);
                    record.set("displayMinorNumber", minor);
                }
                None => record.set(field, data),
            },
            _ => record.set(field, data),
        }
    }

    Ok(record)
}

/// Strip listing-service copyright boilerplate and the trailing part
/// marker.
fn clean_description(data: &str) -> String {
    let mut data = data.to_string();
    for notice in COPYRIGHT_NOTICES {
        data = data.replace(notice, "");
    }
    data.strip_suffix(" *").unwrap_or(&data).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILS: &str = r#"<showing>
        <time>2024-05-01T02:00:00Z</time>
        <partCount>1</partCount>
        <partIndex>1</partIndex>
        <tvRating value="4">PG</tvRating>
        <showingBits value="4099"/>
        <program>
          <title>Nature</title>
          <episodeTitle>Wolves of Yellowstone</episodeTitle>
          <episodeNumber>307</episodeNumber>
          <description>Wolves return to the park. Copyright Tribune Media Services, Inc. *</description>
          <uniqueId>EP0123450007</uniqueId>
          <originalAirDate>2024-03-05T00:00:00Z</originalAirDate>
          <isEpisode>true</isEpisode>
          <series>
            <uniqueId>SH0123450000</uniqueId>
            <seriesTitle>Nature</seriesTitle>
          </series>
          <vActor>
            <element>Alice Narrator</element>
            <element>Bob Guide</element>
          </vActor>
          <vProgramGenre>
            <element>Documentary</element>
          </vProgramGenre>
          <starRating value="5"/>
        </program>
    </showing>"#;

    #[test]
    fn test_details_document_maps_onto_record() {
        let record = from_details(DETAILS).unwrap();

        assert_eq!(record.text("title"), Some("Nature"));
        assert_eq!(record.text("episodeTitle"), Some("Wolves of Yellowstone"));
        assert_eq!(record.text("episodeNumber"), Some("307"));
        assert_eq!(record.text("programId"), Some("EP0123450007"));
        assert_eq!(record.text("seriesId"), Some("SH0123450000"));
        assert_eq!(record.text("seriesTitle"), Some("Nature"));
        assert_eq!(record.text("isEpisode"), Some("true"));
        assert_eq!(record.text("time"), Some("2024-05-01T02:00:00Z"));
        assert_eq!(record.text("showingBits"), Some("4099"));
        assert_eq!(record.int("tvRating"), Some(4));
        assert_eq!(record.int("starRating"), Some(5));
        assert_eq!(
            record.list("vActor").unwrap(),
            &["Alice Narrator".to_string(), "Bob Guide".to_string()]
        );
        // Copyright boilerplate and the trailing marker are stripped.
        assert_eq!(
            record.text("description"),
            Some("Wolves return to the park.")
        );
    }

    #[test]
    fn test_details_without_program_is_malformed() {
        assert!(matches!(
            from_details("<showing><time>now</time></showing>"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_listing_details_map_with_channel_split() {
        let doc = xml::parse(
            r#"<Item><Details>
                <Title>Nature</Title>
                <EpisodeTitle>Wolves</EpisodeTitle>
                <Description>A plot. Copyright Rovi, Inc.</Description>
                <SourceChannel>10-2</SourceChannel>
                <SourceStation>KTEST</SourceStation>
                <TvRating>4</TvRating>
                <MpaaRating>3</MpaaRating>
            </Details></Item>"#,
        )
        .unwrap();
        let record = from_listing(&doc).unwrap();

        assert_eq!(record.text("title"), Some("Nature"));
        assert_eq!(record.text("displayMajorNumber"), Some("10"));
        assert_eq!(record.text("displayMinorNumber"), Some("2"));
        assert_eq!(record.text("callsign"), Some("KTEST"));
        assert_eq!(record.int("tvRating"), Some(4));
        // The listing vocabulary leaves the film rating as supplied.
        assert_eq!(record.text("mpaaRating"), Some("3"));
        assert_eq!(record.text("description"), Some("A plot."));
    }

    #[test]
    fn test_recording_source_decodes_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.TiVo");
        std::fs::write(&path, plain_container(DETAILS.as_bytes())).unwrap();

        let source = RecordingSource::new(
            SourceCache::new(10),
            DecoderConfig {
                media_access_key: Some("1234567890".to_string()),
                external_decoder: None,
            },
        );
        assert!(source.applies(&path));
        let record = source.parse(&path).unwrap();
        assert_eq!(record.text("title"), Some("Nature"));
    }

    #[test]
    fn test_recording_source_without_secret_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("show.tivo");
        std::fs::write(&path, plain_container(b"<x/>")).unwrap();

        let source = RecordingSource::new(SourceCache::new(10), DecoderConfig::default());
        assert!(matches!(
            source.parse(&path),
            Err(Error::MissingSecret)
        ));
    }

    /// A minimal container with an unencrypted details chunk.
    fn plain_container(details: &[u8]) -> Vec<u8> {
        let chunk_size = 12 + details.len();
        let total = 16 + chunk_size;

        let mut out = vec![0u8; 10];
        out.extend_from_slice(&(total as u32).to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&(chunk_size as u32).to_be_bytes());
        out.extend_from_slice(&(details.len() as u32).to_be_bytes());
        out.extend_from_slice(&2u16.to_be_bytes()); // details chunk id
        out.extend_from_slice(&0u16.to_be_bytes()); // unencrypted
        out.extend_from_slice(details);
        out
    }
}
