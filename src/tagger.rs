//! Writing tags and cover art into downloaded files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagExt};
use snafu::{OptionExt, ResultExt};

use crate::providers::{self, Api, Artwork};

#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("malformed tag line {:?}", line))]
    MalformedLine { line: String },
    #[snafu(display("lofty error: {}", source))]
    Lofty { source: lofty::error::LoftyError },
    #[snafu(display("no writable tag in {}", path.display()))]
    NoTag { path: PathBuf },
    #[snafu(display("cannot fetch artwork: {}", source))]
    ArtworkFetch { source: providers::Error },
    #[snafu(display("tagging task failed: {}", source))]
    Task { source: tokio::task::JoinError },
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait Tagger: Send + Sync {
    /// Writes `key=value` lines as tags of the file at `path`.
    async fn write_tags(&self, path: &Path, tags: &[String]) -> Result<()>;

    /// Embeds the image at `url` as the front cover.
    async fn embed_artwork(&self, path: &Path, url: &str) -> Result<()>;
}

/// In-process tagger backed by lofty.
pub struct LoftyTagger {
    api: Arc<dyn Api>,
}

impl LoftyTagger {
    pub fn new(api: Arc<dyn Api>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tagger for LoftyTagger {
    async fn write_tags(&self, path: &Path, tags: &[String]) -> Result<()> {
        let items = parse_lines(tags)?;
        let path = path.to_owned();

        tokio::task::spawn_blocking(move || {
            edit_tag(&path, |tag| {
                for (key, value) in items {
                    tag.insert_text(key, value);
                }
            })
        })
        .await
        .context(TaskSnafu)?
    }

    async fn embed_artwork(&self, path: &Path, url: &str) -> Result<()> {
        let artwork = self.api.artwork(url).await.context(ArtworkFetchSnafu)?;
        let picture = cover(artwork);
        let path = path.to_owned();

        tokio::task::spawn_blocking(move || {
            edit_tag(&path, |tag| {
                tag.remove_picture_type(PictureType::CoverFront);
                tag.push_picture(picture);
            })
        })
        .await
        .context(TaskSnafu)?
    }
}

fn parse_lines(tags: &[String]) -> Result<Vec<(ItemKey, String)>> {
    tags.iter()
        .map(|line| {
            let (key, value) = line
                .split_once('=')
                .context(MalformedLineSnafu { line: line.as_str() })?;
            Ok((item_key(key.trim()), value.to_string()))
        })
        .collect()
}

fn item_key(key: &str) -> ItemKey {
    match key {
        "title" => ItemKey::TrackTitle,
        "album" => ItemKey::AlbumTitle,
        "artist" => ItemKey::TrackArtist,
        "album_artist" => ItemKey::AlbumArtist,
        "track" => ItemKey::TrackNumber,
        "date" => ItemKey::Year,
        "genre" => ItemKey::Genre,
        "comment" => ItemKey::Comment,
        other => ItemKey::Unknown(other.to_string()),
    }
}

fn cover(artwork: Artwork) -> Picture {
    let mime_type = match artwork.mime_type.as_deref() {
        Some("image/png") => MimeType::Png,
        Some("image/gif") => MimeType::Gif,
        Some("image/bmp") => MimeType::Bmp,
        Some("image/tiff") => MimeType::Tiff,
        // the artwork cdn serves jpegs
        _ => MimeType::Jpeg,
    };
    Picture::new_unchecked(PictureType::CoverFront, Some(mime_type), None, artwork.data)
}

fn edit_tag(path: &Path, edit: impl FnOnce(&mut Tag)) -> Result<()> {
    let mut tagged_file = Probe::open(path)
        .context(LoftySnafu)?
        .read()
        .context(LoftySnafu)?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file.tag_mut(tag_type).context(NoTagSnafu { path })?;

    edit(tag);
    tag.save_to_path(path, WriteOptions::default())
        .context(LoftySnafu)
}
