//! Canonical track identity and link classification.

use reqwest::Url;

use crate::error::Result;
use crate::providers::Api;

pub(crate) const SHORT_HOSTS: &[&str] = &["on.soundcloud.com", "soundcloud.app.goo.gl"];
pub(crate) const SITE_HOSTS: &[&str] = &["soundcloud.com", "www.soundcloud.com", "m.soundcloud.com"];

/// First path segments that never name a user.
const RESERVED_ROOTS: &[&str] = &[
    "you",
    "search",
    "upload",
    "settings",
    "charts",
    "pages",
    "people",
    "messages",
    "notifications",
    "terms-of-use",
    "imprint",
    "mobile",
];

/// Second path segments that belong to a user's profile pages.
const PROFILE_PAGES: &[&str] = &[
    "tracks",
    "albums",
    "reposts",
    "likes",
    "followers",
    "following",
    "popular-tracks",
    "comments",
    "spotlight",
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum UrlKind {
    Song,
    Station,
    Playlist,
    User,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlInfo {
    pub kind: UrlKind,
    pub user: String,
    pub title: String,
}

impl UrlInfo {
    /// Track identity; slugs are stored lowercase.
    pub fn song(user: &str, title: &str) -> Self {
        Self {
            kind: UrlKind::Song,
            user: user.to_lowercase(),
            title: title.to_lowercase(),
        }
    }

    fn other(kind: UrlKind) -> Self {
        Self {
            kind,
            user: String::new(),
            title: String::new(),
        }
    }

    pub fn is_song(&self) -> bool {
        self.kind == UrlKind::Song
    }

    /// Canonical web location of the track.
    pub fn permalink_url(&self) -> String {
        format!("https://soundcloud.com/{}/{}", self.user, self.title)
    }
}

/// Shape of a link before any network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Identity is encoded in the link itself.
    Direct(UrlInfo),
    /// Shortened link that has to be followed first.
    Short(String),
}

pub fn classify(link: &str) -> Link {
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(_) => return Link::Direct(UrlInfo::other(UrlKind::Unknown)),
    };
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if SHORT_HOSTS.contains(&host.as_str()) {
        return Link::Short(url.into());
    }
    if !SITE_HOSTS.contains(&host.as_str()) {
        return Link::Direct(UrlInfo::other(UrlKind::Unknown));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    Link::Direct(from_segments(&segments))
}

fn from_segments(segments: &[&str]) -> UrlInfo {
    match segments {
        [] => UrlInfo::other(UrlKind::Unknown),
        ["stations", ..] => UrlInfo::other(UrlKind::Station),
        ["discover", "sets", ..] => UrlInfo::other(UrlKind::Playlist),
        [root, ..] if RESERVED_ROOTS.contains(root) || *root == "discover" => {
            UrlInfo::other(UrlKind::Unknown)
        }
        [_, "sets", ..] => UrlInfo::other(UrlKind::Playlist),
        [_] => UrlInfo::other(UrlKind::User),
        [_, page] if PROFILE_PAGES.contains(page) => UrlInfo::other(UrlKind::User),
        [user, title] => UrlInfo::song(user, title),
        // private share links carry a secret token after the slug
        [user, title, token] if token.starts_with("s-") => UrlInfo::song(user, title),
        _ => UrlInfo::other(UrlKind::Unknown),
    }
}

/// Resolves a single extracted link into a track identity.
///
/// Links naming something other than a track are returned with their kind set
/// and empty identity fields; it's up to the caller to refuse them.
pub async fn resolve(api: &dyn Api, link: &str) -> Result<UrlInfo> {
    match classify(link) {
        Link::Direct(info) => Ok(info),
        Link::Short(short) => {
            let location = api.follow_redirects(&short).await?;
            log::debug!("{} redirects to {}", short, location);
            Ok(match classify(&location) {
                Link::Direct(info) => info,
                Link::Short(_) => UrlInfo::other(UrlKind::Unknown),
            })
        }
    }
}
