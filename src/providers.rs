use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::{self, TryFutureExt};
use m3u8_rs::Playlist;
use regex::Regex;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use snafu::{OptionExt, ResultExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use unhtml::FromHtml;

use crate::config::Config;
use crate::meta::TrackMeta;
use crate::stream::{self, Stream};
use crate::url_info::UrlInfo;

const BASE_URL: &str = "https://soundcloud.com";
const API_URL: &str = "https://api-v2.soundcloud.com";
const ASSETS_PREFIX: &str = "https://a-v2.sndcdn.com/assets/";
const CLIENT_ID_PATTERN: &str = r#"client_id\s*[:=]\s*["']?([A-Za-z0-9]{16,})"#;
const PARTIAL_EXTENSION: &str = "part";

#[derive(FromHtml, Debug)]
struct ScriptRaw {
    #[html(attr = "src")]
    src: String,
}

#[derive(FromHtml, Debug)]
struct WebPlayerPage {
    #[html(selector = "script[src]")]
    scripts: Vec<ScriptRaw>,
}

/*
{"url":"https://cf-hls-media.sndcdn.com/playlist/....m3u8?Policy=..."}
or, for the original upload:
{"redirectUri":"https://cf-media.sndcdn.com/....wav?Policy=..."}
*/
#[derive(serde::Deserialize, Debug)]
struct MediaLocation {
    url: Option<String>,
    #[serde(rename = "redirectUri")]
    redirect_uri: Option<String>,
}

#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("cannot build http client: {}", source))]
    Builder { source: reqwest::Error },
    #[snafu(display("http error, url: {}, err: {}", url, source))]
    Http { url: String, source: reqwest::Error },
    #[snafu(display("html error: {}", source))]
    Html { source: unhtml::Error },
    #[snafu(display("bad client id pattern: {}", source))]
    Pattern { source: regex::Error },
    #[snafu(display("malformed playlist at {}", url))]
    Playlist { url: String },
    #[snafu(display("{} is a master playlist, expected media segments", url))]
    MasterPlaylist { url: String },
    #[snafu(display("stream {} uses unsupported protocol {}", description, protocol))]
    UnsupportedProtocol {
        description: String,
        protocol: String,
    },
    #[snafu(display("JsonError({})", source))]
    Json {
        body: String,
        source: serde_json::Error,
    },
    #[snafu(display("{} is a {}, not a track", url, kind))]
    NotATrack { url: String, kind: String },
    #[snafu(display("stream {} has no source url", description))]
    NoSource { description: String },
    #[snafu(display("no media location in response from {}", url))]
    NoMediaLocation { url: String },
    #[snafu(display("client id not found on {}", url))]
    ClientIdNotFound { url: String },
    #[snafu(display("io error on {}: {}", path.display(), source))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct Artwork {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Network side of the platform: everything the core asks from the outside.
#[async_trait]
pub trait Api: Send + Sync {
    /// Follows the redirect chain of `url` and returns the final location.
    async fn follow_redirects(&self, url: &str) -> Result<String>;

    async fn track_metadata(&self, info: &UrlInfo) -> Result<TrackMeta>;

    /// Stores the media of `stream` next to `dest_stem`, returns the file written.
    async fn download(&self, stream: &Stream, dest_stem: &Path) -> Result<PathBuf> {
        let transfer = transfer(stream)?;
        let source = stream.url.as_deref().context(NoSourceSnafu {
            description: stream.description.as_str(),
        })?;
        let location = self.media_location(source).await?;

        let extension = if stream.is_original() {
            media_extension(&location).unwrap_or_else(|| "bin".to_string())
        } else {
            stream.extension.clone()
        };
        let path = with_extension(dest_stem, &extension);

        let parts = match transfer {
            Transfer::Whole => vec![location],
            Transfer::Segmented => {
                let playlist = self.text(&location).await?;
                let segments = playlist_segments(&location, playlist.as_bytes())?;
                log::debug!("{} segments in {}", segments.len(), location);
                segments
            }
        };

        log::info!("downloading {} into {}", stream.description, path.display());
        self.save(&parts, &path).await?;
        Ok(path)
    }

    async fn artwork(&self, url: &str) -> Result<Artwork>;
}

/// SoundCloud info/media provider
pub struct Provider {
    client: Client,
    client_id: OnceCell<String>,
}

impl Provider {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build().context(BuilderSnafu)?,
            client_id: OnceCell::new_with(config.client_id.clone()),
        })
    }

    async fn client_id(&self) -> Result<&str> {
        self.client_id
            .get_or_try_init(|| self.discover_client_id())
            .await
            .map(String::as_str)
    }

    async fn discover_client_id(&self) -> Result<String> {
        let page = self.text(BASE_URL).await?;
        let pattern = Regex::new(CLIENT_ID_PATTERN).context(PatternSnafu)?;

        // the id lives in one of the last loaded bundles
        for script in script_urls(&page)?.iter().rev() {
            let body = self.text(script).await?;
            if let Some(id) = find_client_id(&pattern, &body) {
                log::debug!("discovered client id in {}", script);
                return Ok(id.to_string());
            }
        }

        ClientIdNotFoundSnafu { url: BASE_URL }.fail()
    }

    async fn text(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .and_then(|r| future::ready(r.error_for_status()))
            .and_then(|r| r.text())
            .await
            .context(HttpSnafu { url })
    }

    async fn api_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let client_id = self.client_id().await?;
        let body = self
            .client
            .get(url)
            .query(query)
            .query(&[("client_id", client_id)])
            .send()
            .and_then(|r| future::ready(r.error_for_status()))
            .and_then(|r| r.text())
            .await
            .context(HttpSnafu { url })?;

        serde_json::from_str(&body).context(JsonSnafu { body })
    }

    async fn media_location(&self, source: &str) -> Result<String> {
        let location: MediaLocation = self.api_json(source, &[]).await?;
        location
            .url
            .or(location.redirect_uri)
            .context(NoMediaLocationSnafu { url: source })
    }

    /// Writes `parts` one after another into `path`; nothing is left behind
    /// under `path` when a transfer fails.
    async fn save(&self, parts: &[String], path: &Path) -> Result<()> {
        let partial = with_extension(path, PARTIAL_EXTENSION);
        let written = self.write_parts(parts, &partial).await;
        settle(written, &partial, path).await
    }

    async fn write_parts(&self, parts: &[String], path: &Path) -> Result<()> {
        let mut file = tokio::fs::File::create(path)
            .await
            .context(IoSnafu { path })?;
        for part in parts.iter() {
            self.append(part, &mut file, path).await?;
        }
        file.flush().await.context(IoSnafu { path })
    }

    async fn append(&self, url: &str, file: &mut tokio::fs::File, path: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context(HttpSnafu { url })?;

        while let Some(chunk) = response.chunk().await.context(HttpSnafu { url })? {
            file.write_all(&chunk).await.context(IoSnafu { path })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Api for Provider {
    async fn follow_redirects(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context(HttpSnafu { url })?;
        Ok(response.url().to_string())
    }

    async fn track_metadata(&self, info: &UrlInfo) -> Result<TrackMeta> {
        let permalink = info.permalink_url();
        let url = format!("{}/resolve", API_URL);
        let mut meta: TrackMeta = self.api_json(&url, &[("url", permalink.as_str())]).await?;

        if meta.kind != "track" {
            return NotATrackSnafu {
                url: permalink,
                kind: meta.kind,
            }
            .fail();
        }
        if meta.downloadable && meta.download_url.is_none() {
            meta.download_url = Some(format!("{}/tracks/{}/download", API_URL, meta.id));
        }
        Ok(meta)
    }

    async fn download(&self, stream: &Stream, dest_stem: &Path) -> Result<PathBuf> {
        let source = stream.url.as_deref().context(NoSourceSnafu {
            description: stream.description.as_str(),
        })?;
        let location = self.media_location(source).await?;

        let extension = if stream.is_original() {
            media_extension(&location).unwrap_or_else(|| "bin".to_string())
        } else {
            stream.extension.clone()
        };
        let path = with_extension(dest_stem, &extension);

        log::info!("downloading {} into {}", stream.description, path.display());
        if stream.is_hls() {
            self.save_hls(&location, &path).await?;
        } else {
            self.save(&location, &path).await?;
        }
        Ok(path)
    }

    async fn artwork(&self, url: &str) -> Result<Artwork> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context(HttpSnafu { url })?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await.context(HttpSnafu { url })?;

        Ok(Artwork {
            data: data.to_vec(),
            mime_type,
        })
    }
}

/// Appends `.extension` without touching dots already present in the stem.
fn with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(extension);
    name.into()
}

fn media_extension(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    /// One file at the media location.
    Whole,
    /// HLS media playlist whose segments are concatenated.
    Segmented,
}

fn transfer(stream: &Stream) -> Result<Transfer> {
    if stream.is_original() || stream.format == stream::PROGRESSIVE {
        Ok(Transfer::Whole)
    } else if stream.is_hls() {
        Ok(Transfer::Segmented)
    } else {
        UnsupportedProtocolSnafu {
            description: stream.description.as_str(),
            protocol: stream.format.as_str(),
        }
        .fail()
    }
}

/// Moves a finished download into place, or drops what was written of it.
async fn settle(written: Result<()>, partial: &Path, path: &Path) -> Result<()> {
    match written {
        Ok(()) => tokio::fs::rename(partial, path)
            .await
            .context(IoSnafu { path }),
        Err(err) => {
            match tokio::fs::remove_file(partial).await {
                Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                    log::warn!("can't remove {}: {}", partial.display(), cleanup);
                }
                _ => {}
            }
            Err(err)
        }
    }
}

/// Media URIs of an HLS media playlist in play order, each init section
/// before the first segment that needs it.
fn playlist_segments(playlist_url: &str, body: &[u8]) -> Result<Vec<String>> {
    let media = match m3u8_rs::parse_playlist_res(body) {
        Ok(Playlist::MediaPlaylist(media)) => media,
        Ok(Playlist::MasterPlaylist(_)) => {
            return MasterPlaylistSnafu { url: playlist_url }.fail();
        }
        Err(_) => return PlaylistSnafu { url: playlist_url }.fail(),
    };

    let base = Url::parse(playlist_url).ok();
    let absolute = |uri: &str| match &base {
        Some(base) => base
            .join(uri)
            .map(String::from)
            .unwrap_or_else(|_| uri.to_string()),
        None => uri.to_string(),
    };

    let mut uris = Vec::with_capacity(media.segments.len() + 1);
    let mut current_map: Option<&str> = None;
    for segment in media.segments.iter() {
        if let Some(map) = &segment.map {
            if current_map != Some(map.uri.as_str()) {
                uris.push(absolute(&map.uri));
                current_map = Some(map.uri.as_str());
            }
        }
        uris.push(absolute(&segment.uri));
    }
    Ok(uris)
}

fn script_urls(page: &str) -> Result<Vec<String>> {
    let page = WebPlayerPage::from_html(page).context(HtmlSnafu)?;
    Ok(page
        .scripts
        .into_iter()
        .map(|script| script.src)
        .filter(|src| src.starts_with(ASSETS_PREFIX) && src.ends_with(".js"))
        .collect())
}

fn find_client_id<'a>(pattern: &Regex, script: &'a str) -> Option<&'a str> {
    pattern
        .captures(script)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST_URL: &str = "https://host.example/playlist/abc.m3u8?p=1";

    fn stream(format: &str, description: &str) -> Stream {
        Stream {
            format: format.to_string(),
            extension: "mp3".to_string(),
            url: Some("u".to_string()),
            description: description.to_string(),
        }
    }

    #[test]
    fn hls_playlist() {
        let body = "#EXTM3U\n\
                    #EXT-X-VERSION:6\n\
                    #EXT-X-TARGETDURATION:10\n\
                    #EXT-X-MAP:URI=\"init.mp4\"\n\
                    #EXTINF:9.98,\n\
                    https://cf-hls-media.sndcdn.com/media/0/1/seg.mp3?x=1\n\
                    #EXTINF:10.0,\n\
                    part/2.mp4\n\
                    #EXT-X-ENDLIST\n";

        assert_eq!(
            playlist_segments(PLAYLIST_URL, body.as_bytes()).unwrap(),
            vec![
                "https://host.example/playlist/init.mp4",
                "https://cf-hls-media.sndcdn.com/media/0/1/seg.mp3?x=1",
                "https://host.example/playlist/part/2.mp4",
            ]
        );
    }

    #[test]
    fn master_playlist_is_refused() {
        let body = "#EXTM3U\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=128000,CODECS=\"mp4a.40.2\"\n\
                    low/index.m3u8\n";

        assert!(matches!(
            playlist_segments(PLAYLIST_URL, body.as_bytes()),
            Err(Error::MasterPlaylist { .. })
        ));
    }

    #[test]
    fn garbage_is_not_a_playlist() {
        assert!(matches!(
            playlist_segments(PLAYLIST_URL, b"<html>oops</html>"),
            Err(Error::Playlist { .. })
        ));
    }

    #[test]
    fn transfer_by_protocol() {
        assert_eq!(
            transfer(&stream("progressive", "mp3-progressive")).unwrap(),
            Transfer::Whole
        );
        assert_eq!(transfer(&stream("hls", "mp3-hls")).unwrap(), Transfer::Segmented);
        assert_eq!(
            transfer(&Stream::original(Some("d"))).unwrap(),
            Transfer::Whole
        );
        assert!(matches!(
            transfer(&stream("ctr-encrypted-hls", "mp3-ctr-encrypted-hls")),
            Err(Error::UnsupportedProtocol { .. })
        ));
    }

    #[tokio::test]
    async fn finished_download_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        let partial = with_extension(&path, PARTIAL_EXTENSION);
        std::fs::write(&partial, b"audio").unwrap();

        settle(Ok(()), &partial, &path).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"audio");
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn failed_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        let partial = with_extension(&path, PARTIAL_EXTENSION);
        std::fs::write(&partial, b"half of the au").unwrap();

        let failed = Err(Error::NoMediaLocation {
            url: "https://cf-media.sndcdn.com/x".to_string(),
        });
        assert!(matches!(
            settle(failed, &partial, &path).await,
            Err(Error::NoMediaLocation { .. })
        ));

        assert!(!partial.exists());
        assert!(!path.exists());
    }

    #[test]
    fn extension_of_original() {
        assert_eq!(
            media_extension("https://cf-media.sndcdn.com/abc.WAV?Policy=x").as_deref(),
            Some("wav")
        );
        assert_eq!(media_extension("https://cf-media.sndcdn.com/abc"), None);
    }

    #[test]
    fn extension_keeps_dots_in_stem() {
        assert_eq!(
            with_extension(Path::new("/tmp/feat. someone [mp3-hls]"), "mp3"),
            PathBuf::from("/tmp/feat. someone [mp3-hls].mp3")
        );
    }

    #[test]
    fn script_discovery() {
        let page = r#"<html><head>
            <script crossorigin src="https://a-v2.sndcdn.com/assets/0-abc.js"></script>
            <script src='https://widget.example/x.js'></script>
            <script>window.inline = true;</script>
            <script crossorigin src = 'https://a-v2.sndcdn.com/assets/49-def.js'></script>
            </head><body></body></html>"#;

        assert_eq!(
            script_urls(page).unwrap(),
            vec![
                "https://a-v2.sndcdn.com/assets/0-abc.js",
                "https://a-v2.sndcdn.com/assets/49-def.js"
            ]
        );
    }

    #[test]
    fn client_id_in_bundle() {
        let pattern = Regex::new(CLIENT_ID_PATTERN).unwrap();

        let script = r#"e.exports={a:1};n({client_id:"a1B2c3D4e5F6g7H8i9J0kLmNoPqRsTuV",env:"production"})"#;
        assert_eq!(
            find_client_id(&pattern, script),
            Some("a1B2c3D4e5F6g7H8i9J0kLmNoPqRsTuV")
        );

        let query = "fetch('/tracks?limit=1&client_id=ZYXWVUTSRQPONMLK12345')";
        assert_eq!(find_client_id(&pattern, query), Some("ZYXWVUTSRQPONMLK12345"));

        assert_eq!(find_client_id(&pattern, r#"{client_id:"short"}"#), None);
    }
}
