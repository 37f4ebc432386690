//! In-memory collaborators for tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::meta::{Format, Media, Transcoding, TrackMeta, User};
use crate::providers::{self, Api, Artwork};
use crate::stream::Stream;
use crate::tagger::{self, Tagger};
use crate::url_info::UrlInfo;

pub fn transcoding(preset: &str, protocol: &str, url: Option<&str>) -> Transcoding {
    Transcoding {
        preset: preset.to_string(),
        format: Format {
            protocol: protocol.to_string(),
            mime_type: None,
        },
        url: url.map(str::to_string),
    }
}

pub fn meta(transcodings: Vec<Transcoding>, downloadable: bool) -> TrackMeta {
    TrackMeta {
        kind: "track".to_string(),
        id: 571185813,
        permalink: "yasuha-flyday-chinatown".to_string(),
        permalink_url: "https://soundcloud.com/unitasprima/yasuha-flyday-chinatown".to_string(),
        title: "Yasuha - Flyday Chinatown".to_string(),
        user: User {
            username: "unitasprima".to_string(),
        },
        duration: 226_482,
        created_at: Utc.with_ymd_and_hms(2019, 2, 6, 12, 46, 6).unwrap(),
        artwork_url: None,
        downloadable,
        download_url: if downloadable {
            Some("https://api-v2.soundcloud.com/tracks/571185813/download".to_string())
        } else {
            None
        },
        media: Media { transcodings },
    }
}

/// Streams whose url is this fail to transfer.
pub const BROKEN_URL: &str = "broken";

#[derive(Default)]
pub struct FakeApi {
    redirects: HashMap<String, String>,
    meta: Option<TrackMeta>,
    redirects_followed: Mutex<usize>,
    requested: Mutex<Vec<UrlInfo>>,
    attempts: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_meta(mut self, meta: TrackMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn redirects_followed(&self) -> usize {
        *self.redirects_followed.lock().unwrap()
    }

    pub fn requested(&self) -> Vec<UrlInfo> {
        self.requested.lock().unwrap().clone()
    }

    /// Descriptions of every stream a transfer was started for.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Descriptions of streams transferred successfully.
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Api for FakeApi {
    async fn follow_redirects(&self, url: &str) -> providers::Result<String> {
        *self.redirects_followed.lock().unwrap() += 1;
        Ok(self.redirects.get(url).cloned().unwrap_or_else(|| url.to_string()))
    }

    async fn track_metadata(&self, info: &UrlInfo) -> providers::Result<TrackMeta> {
        self.requested.lock().unwrap().push(info.clone());
        self.meta.clone().ok_or_else(|| providers::Error::NotATrack {
            url: info.permalink_url(),
            kind: "nothing".to_string(),
        })
    }

    async fn download(&self, stream: &Stream, dest_stem: &Path) -> providers::Result<PathBuf> {
        self.attempts
            .lock()
            .unwrap()
            .push(stream.description.clone());

        let url = stream.url.as_deref().unwrap_or_default();
        if url == BROKEN_URL {
            return Err(providers::Error::NoMediaLocation {
                url: url.to_string(),
            });
        }

        let path = dest_stem.with_extension("bin");
        std::fs::write(&path, url.as_bytes()).map_err(|source| providers::Error::Io {
            path: path.clone(),
            source,
        })?;
        self.downloads
            .lock()
            .unwrap()
            .push(stream.description.clone());
        Ok(path)
    }

    async fn artwork(&self, _url: &str) -> providers::Result<Artwork> {
        Ok(Artwork {
            data: Vec::new(),
            mime_type: None,
        })
    }
}

#[derive(Default)]
pub struct FakeTagger {
    fail_tags: bool,
    fail_artwork: bool,
    tagged: Mutex<Vec<(PathBuf, Vec<String>)>>,
    artworks: Mutex<Vec<(PathBuf, String)>>,
}

impl FakeTagger {
    pub fn failing_tags() -> Self {
        Self {
            fail_tags: true,
            ..Self::default()
        }
    }

    pub fn failing_artwork() -> Self {
        Self {
            fail_artwork: true,
            ..Self::default()
        }
    }

    pub fn tagged(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.tagged.lock().unwrap().clone()
    }

    pub fn artworks(&self) -> Vec<(PathBuf, String)> {
        self.artworks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tagger for FakeTagger {
    async fn write_tags(&self, path: &Path, tags: &[String]) -> tagger::Result<()> {
        if self.fail_tags {
            return Err(tagger::Error::NoTag {
                path: path.to_owned(),
            });
        }
        self.tagged
            .lock()
            .unwrap()
            .push((path.to_owned(), tags.to_vec()));
        Ok(())
    }

    async fn embed_artwork(&self, path: &Path, url: &str) -> tagger::Result<()> {
        if self.fail_artwork {
            return Err(tagger::Error::ArtworkFetch {
                source: providers::Error::NoMediaLocation {
                    url: url.to_string(),
                },
            });
        }
        self.artworks
            .lock()
            .unwrap()
            .push((path.to_owned(), url.to_string()));
        Ok(())
    }
}
