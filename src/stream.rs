//! Encoded variants of a track and their preference order.

use itertools::Itertools;

use crate::meta::Transcoding;

pub const ORIGINAL: &str = "original";
pub const PROGRESSIVE: &str = "progressive";
pub const HLS: &str = "hls";

/// Protocols that can be transferred. Other variants (encrypted HLS and the
/// like) are kept in the catalog without a source so the fallback walk skips
/// over them.
const TRANSFERABLE: &[&str] = &[PROGRESSIVE, HLS];

/// Preference over (protocol, extension): most compatible first.
/// Variants missing from the table go after every listed one, the
/// original upload always goes last.
const PREFERENCE: &[(&str, &str)] = &[
    (PROGRESSIVE, "mp3"),
    (HLS, "mp3"),
    (HLS, "opus"),
    (HLS, "aac"),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stream {
    pub format: String,
    /// Empty for the original upload.
    pub extension: String,
    pub url: Option<String>,
    pub description: String,
}

impl Stream {
    pub fn transcoded(transcoding: &Transcoding) -> Self {
        let preset = transcoding.preset.as_str();
        let extension = preset.split_once('_').map_or(preset, |(ext, _)| ext);
        let format = transcoding.format.protocol.clone();
        let url = if TRANSFERABLE.contains(&format.as_str()) {
            non_empty(transcoding.url.as_deref())
        } else {
            None
        };

        Self {
            description: format!("{}-{}", extension, format),
            extension: extension.to_string(),
            format,
            url,
        }
    }

    pub fn original(url: Option<&str>) -> Self {
        Self {
            format: ORIGINAL.to_string(),
            extension: String::new(),
            url: non_empty(url),
            description: ORIGINAL.to_string(),
        }
    }

    pub fn has_source(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_original(&self) -> bool {
        self.description == ORIGINAL
    }

    pub fn is_hls(&self) -> bool {
        self.format == HLS
    }

    fn rank(&self) -> usize {
        if self.is_original() {
            return usize::MAX;
        }
        PREFERENCE
            .iter()
            .position(|(format, ext)| *format == self.format && *ext == self.extension)
            .unwrap_or(PREFERENCE.len())
    }
}

fn non_empty(url: Option<&str>) -> Option<String> {
    url.filter(|url| !url.is_empty()).map(str::to_string)
}

/// Builds the ordered stream list of a track.
///
/// Exact duplicate descriptors collapse into one stream; ties in preference
/// keep descriptor order.
pub fn catalog(
    transcodings: &[Transcoding],
    downloadable: bool,
    download_url: Option<&str>,
) -> Vec<Stream> {
    let mut streams: Vec<Stream> = transcodings
        .iter()
        .map(Stream::transcoded)
        .unique()
        .collect();

    if downloadable {
        streams.push(Stream::original(download_url));
    }

    streams.sort_by_key(Stream::rank);
    streams
}
