/// Image loading: the asynchronous step between creating the map image and
/// knowing its natural size.
use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;

use crate::dom::types::Size;
use crate::errors::{MapError, MapResult};

/// Resolves a map image URL to the image's natural size.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> MapResult<Size>;
}

/// Loads images from the local filesystem or inline `data:` URLs.
///
/// Relative paths resolve against `root`. Remote URLs are refused.
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl ImageLoader for FsImageLoader {
    async fn load(&self, url: &str) -> MapResult<Size> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MapError::ImageLoad("empty image URL".into()));
        }

        if let Some(rest) = url.strip_prefix("data:") {
            let bytes = decode_data_url(rest)?;
            let size = dimensions_from_bytes(&bytes)?;
            tracing::debug!(width = size.width, height = size.height, "data URL image decoded");
            return Ok(size);
        }

        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Err(MapError::ImageLoad(format!(
                "remote images are not supported: {url}"
            )));
        }

        let location = url.strip_prefix("file://").unwrap_or(url);
        let path = self.resolve_path(location);
        let probe_path = path.clone();
        let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(&probe_path))
            .await
            .map_err(|e| MapError::ImageLoad(format!("join: {e}")))??;

        tracing::debug!(path = %path.display(), width, height, "map image probed");
        Ok(Size::from((width, height)))
    }
}

/// Decode the part of a `data:` URL after the scheme. Only base64 payloads
/// carry binary images, so anything else is rejected.
fn decode_data_url(rest: &str) -> MapResult<Vec<u8>> {
    let Some((meta, payload)) = rest.split_once(',') else {
        return Err(MapError::ImageLoad("data URL has no payload".into()));
    };
    if !meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(MapError::ImageLoad(
            "data URL is not base64 encoded".into(),
        ));
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

fn dimensions_from_bytes(bytes: &[u8]) -> MapResult<Size> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let dims = reader.into_dimensions()?;
    Ok(Size::from(dims))
}
