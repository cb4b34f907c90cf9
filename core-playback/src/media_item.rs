use crate::classifier::is_drive_path;
use crate::error::{PlaybackError, Result};
use std::fmt;
use std::path::Path;
use url::Url;

/// A media URI as the caller wrote it, plus its parsed form.
///
/// Absolute filesystem paths, Windows drive paths included, are accepted and
/// stored as `file://` URLs.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaItem {
    raw: String,
    url: Url,
}

impl MediaItem {
    /// Validate and parse a URI.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for blank input, relative paths, or strings that are
    /// neither a URL nor an absolute path.
    pub fn parse(uri: &str) -> Result<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(PlaybackError::InvalidArgument(
                "Media URI cannot be empty".to_string(),
            ));
        }

        let parsed = if is_drive_path(trimmed) {
            Url::parse(&format!("file:///{}", trimmed.replace('\\', "/")))
        } else {
            Url::parse(trimmed)
        };
        let url = match parsed {
            Ok(url) => url,
            Err(parse_err) => {
                let path = Path::new(trimmed);
                if !path.is_absolute() {
                    return Err(PlaybackError::InvalidArgument(format!(
                        "Unparseable media URI '{}': {}",
                        trimmed, parse_err
                    )));
                }
                Url::from_file_path(path).map_err(|_| {
                    PlaybackError::InvalidArgument(format!("Invalid file path '{}'", trimmed))
                })?
            }
        };

        Ok(Self {
            raw: trimmed.to_string(),
            url,
        })
    }

    /// The URI as supplied (trimmed).
    pub fn uri(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn is_local_file(&self) -> bool {
        self.url.scheme() == "file"
    }
}

impl fmt::Debug for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MediaItem").field(&self.raw).finish()
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
