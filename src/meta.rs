use chrono::{DateTime, Utc};
use serde::Deserialize;

/*
{"kind":"track",
 "id":571185813,
 "permalink":"yasuha-flyday-chinatown",
 "permalink_url":"https://soundcloud.com/unitasprima/yasuha-flyday-chinatown",
 "title":"Yasuha - Flyday Chinatown",
 "duration":226482,
 "created_at":"2019-02-06T12:46:06Z",
 "artwork_url":"https://i1.sndcdn.com/artworks-000490658757-wdd2j6-large.jpg",
 "downloadable":false,
 "user":{"username":"unitasprima", ..},
 "media":{"transcodings":[{"url":"https://api-v2.soundcloud.com/media/soundcloud:tracks:571185813/.../stream/hls",
                           "preset":"mp3_0_0",
                           "format":{"protocol":"hls","mime_type":"audio/mpeg"}}, ..]},
 ..}
*/
#[derive(Deserialize, Debug, Clone)]
pub struct TrackMeta {
    #[serde(default)]
    pub kind: String,
    pub id: u64,
    pub permalink: String,
    pub permalink_url: String,
    pub title: String,
    pub user: User,
    /// Milliseconds.
    pub duration: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub downloadable: bool,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub media: Media,
    //..
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub username: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Media {
    #[serde(default)]
    pub transcodings: Vec<Transcoding>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transcoding {
    pub preset: String,
    pub format: Format,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub protocol: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}
