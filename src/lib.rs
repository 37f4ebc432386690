//! Turns a SoundCloud link, or text containing one, into a tagged audio file.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = scfetch::Config::load()?;
//! let client = scfetch::Client::new(&config)?;
//! let mut track = client
//!     .get("Check this: https://soundcloud.com/unitasprima/yasuha-flyday-chinatown")
//!     .await?;
//! let path = track.get_next().await?;
//! println!("{}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod link;
pub mod meta;
pub mod providers;
pub mod stream;
pub mod tagger;
pub mod track;
pub mod url_info;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::Config;
pub use error::{Error, Result};
pub use stream::Stream;
pub use track::Track;
pub use url_info::{UrlInfo, UrlKind};
