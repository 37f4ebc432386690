//! A resolved song and the engine that materializes it into a file.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use snafu::ResultExt;

use crate::client::Backend;
use crate::error::{Error, Result, TaggingSnafu};
use crate::meta::TrackMeta;
use crate::stream::{self, Stream};

const BEST_THUMBNAIL_SIZE: &str = "t500x500";

pub struct Track {
    pub id: u64,
    pub permalink: String,
    pub permalink_url: String,
    pub streams: Vec<Stream>,
    pub title: String,
    pub author: String,
    pub duration: Duration,
    pub publish_date: NaiveDate,
    pub thumbnail: String,

    cursor: usize,
    backend: Backend,
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("permalink", &self.permalink)
            .field("title", &self.title)
            .field("author", &self.author)
            .field("streams", &self.streams)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Track {
    pub fn from_meta(meta: TrackMeta, backend: Backend) -> Self {
        let streams = stream::catalog(
            &meta.media.transcodings,
            meta.downloadable,
            meta.download_url.as_deref(),
        );

        Self {
            id: meta.id,
            permalink: meta.permalink,
            permalink_url: meta.permalink_url,
            streams,
            title: meta.title,
            author: meta.user.username,
            duration: Duration::from_secs((meta.duration + 500) / 1000),
            publish_date: meta.created_at.date_naive(),
            thumbnail: best_thumbnail(meta.artwork_url.as_deref().unwrap_or_default()),
            cursor: 0,
            backend,
        }
    }

    /// Index the next [`Track::get_next`] call starts from.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.streams.len().saturating_sub(1));
    }

    /// Downloads and tags the stream at `index`.
    ///
    /// Indexes past the end select the last stream, negative ones the first.
    pub async fn get(&self, index: isize) -> Result<PathBuf> {
        let index = clamp_index(index, self.streams.len()).ok_or(Error::NoStreams)?;
        self.get_at(index).await
    }

    /// Tries the streams in turn starting at the cursor, skipping empty ones.
    ///
    /// The cursor moves past every stream tried, whatever the outcome; any
    /// failure other than an empty stream ends the walk.
    pub async fn get_next(&mut self) -> Result<PathBuf> {
        let len = self.streams.len();
        if len == 0 {
            return Err(Error::NoStreams);
        }

        log::debug!("start getting [{}] {}", self.id, self.permalink);
        let start = self.cursor.min(len - 1);
        let mut result = Err(Error::EmptyStream);
        for index in (start..len).chain(0..start) {
            self.cursor = (index + 1) % len;
            result = self.get_at(index).await;
            match &result {
                Err(err) if err.is_recoverable() => {
                    log::debug!("stream #{} ({}) empty", index, self.streams[index].description);
                }
                _ => break,
            }
        }
        result
    }

    pub async fn get_original(&self) -> Result<PathBuf> {
        match self.streams.last() {
            Some(last) if last.is_original() => self.get_at(self.streams.len() - 1).await,
            _ => Err(Error::NoOriginalStream),
        }
    }

    async fn get_at(&self, index: usize) -> Result<PathBuf> {
        let stream = &self.streams[index];
        if !stream.has_source() {
            return Err(Error::EmptyStream);
        }

        let path = self
            .backend
            .api
            .download(stream, &self.destination(stream))
            .await?;

        self.backend
            .tagger
            .write_tags(&path, &self.tag_lines())
            .await
            .context(TaggingSnafu { path: path.clone() })?;

        if !self.thumbnail.is_empty() {
            if let Err(err) = self
                .backend
                .tagger
                .embed_artwork(&path, &self.thumbnail)
                .await
            {
                log::warn!("can't get song's thumbnail: {}", err);
            }
        }

        log::info!("{} saved as {}", self.permalink, path.display());
        Ok(path)
    }

    fn tag_lines(&self) -> Vec<String> {
        let tags = [
            ("title", self.title.clone()),
            ("album", self.title.clone()),
            ("artist", self.author.clone()),
            ("album_artist", self.author.clone()),
            ("track", 1.to_string()),
            ("date", self.publish_date.year().to_string()),
        ];
        tags.iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }

    /// File path without extension for `stream`.
    fn destination(&self, stream: &Stream) -> PathBuf {
        let name = format!("{} - {} [{}]", self.author, self.title, stream.description);
        self.backend.download_dir.join(sanitize(&name))
    }
}

fn clamp_index(index: isize, len: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    Some(if index < 0 {
        0
    } else {
        (index as usize).min(last)
    })
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

/// Rewrites the size token of an artwork url to the largest size.
///
/// `https://i1.sndcdn.com/artworks-ABC-t50x50.jpg` becomes
/// `https://i1.sndcdn.com/artworks-ABC-t500x500.jpg`; urls without a
/// `-<size>` segment are returned as is.
pub fn best_thumbnail(url: &str) -> String {
    let (head, tail) = match url.rsplit_once('-') {
        Some(split) => split,
        None => return url.to_string(),
    };

    match tail.split_once('.') {
        Some((_, extension)) => format!("{}-{}.{}", head, BEST_THUMBNAIL_SIZE, extension),
        None => format!("{}-{}", head, BEST_THUMBNAIL_SIZE),
    }
}
