use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::link;
use crate::providers::{Api, Provider};
use crate::tagger::{LoftyTagger, Tagger};
use crate::track::Track;
use crate::url_info::{self, UrlInfo};

/// Collaborators shared by a client and every track it produces.
#[derive(Clone)]
pub struct Backend {
    pub api: Arc<dyn Api>,
    pub tagger: Arc<dyn Tagger>,
    pub download_dir: PathBuf,
}

pub struct Client {
    backend: Backend,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self> {
        let api: Arc<dyn Api> = Arc::new(Provider::new(config)?);
        let tagger = Arc::new(LoftyTagger::new(api.clone()));
        Ok(Self::with_parts(config, api, tagger))
    }

    /// Client over substitute collaborators; only the download dir of
    /// `config` is used.
    pub fn with_parts(config: &Config, api: Arc<dyn Api>, tagger: Arc<dyn Tagger>) -> Self {
        Self {
            backend: Backend {
                api,
                tagger,
                download_dir: config.download_dir.clone(),
            },
        }
    }

    /// Identity of the first link in `text`.
    pub async fn parse(&self, text: &str) -> Result<UrlInfo> {
        let link = link::first_link(text)?;
        url_info::resolve(self.backend.api.as_ref(), link).await
    }

    pub async fn get(&self, text: &str) -> Result<Track> {
        let info = self.parse(text).await?;
        self.get_url(&info).await
    }

    pub async fn get_url(&self, info: &UrlInfo) -> Result<Track> {
        if !info.is_song() {
            return Err(Error::UnsupportedLinkKind { kind: info.kind });
        }

        let meta = self.backend.api.track_metadata(info).await?;
        log::debug!("meta: {:?}", meta);
        Ok(Track::from_meta(meta, self.backend.clone()))
    }
}
