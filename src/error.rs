use std::path::PathBuf;

use crate::url_info::UrlKind;

#[derive(Debug, snafu::Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("no soundcloud link found in the input"))]
    LinkNotFound,
    #[snafu(display("unsupported link kind: {}", kind))]
    UnsupportedLinkKind { kind: UrlKind },
    #[snafu(display("stream has no source url"))]
    EmptyStream,
    #[snafu(display("track has no original stream"))]
    NoOriginalStream,
    #[snafu(display("track has no streams"))]
    NoStreams,
    #[snafu(display("provider error: {}", source))]
    Provider { source: crate::providers::Error },
    #[snafu(display("cannot tag {}: {}", path.display(), source))]
    Tagging {
        path: PathBuf,
        source: crate::tagger::Error,
    },
}

impl Error {
    /// Only an empty stream may be skipped over by the fallback walk.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::EmptyStream)
    }
}

impl From<crate::providers::Error> for Error {
    fn from(source: crate::providers::Error) -> Self {
        Error::Provider { source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
