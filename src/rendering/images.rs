//! Image sources for `<img>` elements.
//!
//! `data:` URIs are decoded in place. Absolute `http(s)` sources are fetched
//! only when cross-origin loading is enabled; a skipped or unreachable image
//! is simply not painted. Only PNG payloads can be decoded.

use crate::packager::data_url_to_file;
use crate::{Error, ExportConfig, Result};
use futures::stream::{self, StreamExt as _};
use std::collections::HashMap;
use tiny_skia::Pixmap;

/// Images decoded for one capture, keyed by their `src` attribute
#[derive(Debug, Default, Clone)]
pub struct ImageSet {
    images: HashMap<String, Pixmap>,
}

impl ImageSet {
    pub fn insert(&mut self, src: impl Into<String>, pixmap: Pixmap) {
        self.images.insert(src.into(), pixmap);
    }

    pub fn get(&self, src: &str) -> Option<&Pixmap> {
        self.images.get(src)
    }

    pub fn natural_size(&self, src: &str) -> Option<(u32, u32)> {
        self.get(src).map(|p| (p.width(), p.height()))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ImageLoader {
    #[cfg(feature = "remote")]
    client: reqwest::Client,
    base_url: Option<String>,
    concurrency: usize,
}

impl ImageLoader {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        #[cfg(feature = "remote")]
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            #[cfg(feature = "remote")]
            client,
            base_url: config.base_url.clone(),
            concurrency: config.fetch_concurrency.max(1),
        })
    }

    /// Load one image. `Ok(None)` means the image is intentionally left out.
    pub async fn load(&self, src: &str, use_cors: bool) -> Result<Option<Pixmap>> {
        let src = src.trim();
        if src.is_empty() {
            return Ok(None);
        }
        if src.starts_with("data:") {
            let file = data_url_to_file(src, "image")?;
            return decode_png(&file.bytes, src).map(Some);
        }
        self.load_remote(src, use_cors).await
    }

    #[cfg(feature = "remote")]
    async fn load_remote(&self, src: &str, use_cors: bool) -> Result<Option<Pixmap>> {
        let url = self.resolve(src)?;
        if !use_cors {
            log::debug!("cross-origin loading disabled, skipping {}", url);
            return Ok(None);
        }
        log::debug!("fetching image {}", url);
        let bytes = match self.fetch(&url).await {
            Ok(b) => b,
            Err(e) => {
                // broken images are left out, like a browser would
                log::warn!("image {} not loaded: {}", url, e);
                return Ok(None);
            }
        };
        decode_png(&bytes, src).map(Some)
    }

    #[cfg(feature = "remote")]
    async fn fetch(&self, url: &url::Url) -> Result<Vec<u8>> {
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(Error::NetworkError(format!("GET {} returned {}", url, resp.status())));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    #[cfg(not(feature = "remote"))]
    async fn load_remote(&self, src: &str, _use_cors: bool) -> Result<Option<Pixmap>> {
        log::warn!("built without remote support, skipping image {}", short(src));
        Ok(None)
    }

    #[cfg(feature = "remote")]
    fn resolve(&self, src: &str) -> Result<url::Url> {
        match url::Url::parse(src) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(u),
            Ok(u) => Err(Error::RenderError(format!("unsupported image scheme {}", u.scheme()))),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_deref().ok_or_else(|| {
                    Error::RenderError(format!("relative image source {} without a base URL", src))
                })?;
                url::Url::parse(base)
                    .and_then(|b| b.join(src))
                    .map_err(|e| Error::ConfigError(format!("invalid base URL {}: {}", base, e)))
            }
            Err(e) => Err(Error::RenderError(format!("invalid image source {}: {}", short(src), e))),
        }
    }

    /// Load every distinct source, `concurrency` at a time
    pub async fn load_all(&self, srcs: Vec<String>, use_cors: bool) -> Result<ImageSet> {
        let mut unique = srcs;
        unique.sort();
        unique.dedup();

        let results: Vec<(String, Result<Option<Pixmap>>)> = stream::iter(unique)
            .map(|src| async move {
                let loaded = self.load(&src, use_cors).await;
                (src, loaded)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut set = ImageSet::default();
        for (src, loaded) in results {
            if let Some(pixmap) = loaded? {
                set.insert(src, pixmap);
            }
        }
        log::debug!("decoded {} images", set.len());
        Ok(set)
    }
}

fn decode_png(bytes: &[u8], src: &str) -> Result<Pixmap> {
    Pixmap::decode_png(bytes)
        .map_err(|e| Error::RenderError(format!("cannot decode image {}: {}", short(src), e)))
}

/// Keep data URIs readable in messages
fn short(src: &str) -> String {
    const MAX: usize = 48;
    if src.chars().count() <= MAX {
        src.to_string()
    } else {
        let head: String = src.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

/// Average color of the bright pixels of `pixmap`, if any. A pixel is
/// bright when its channel mean is strictly above 100.
pub fn light_color(pixmap: &Pixmap) -> Option<(u8, u8, u8)> {
    let (mut r, mut g, mut b, mut n) = (0u64, 0u64, 0u64, 0u64);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        let (pr, pg, pb) = (c.red() as u64, c.green() as u64, c.blue() as u64);
        if pr + pg + pb > 300 {
            r += pr;
            g += pg;
            b += pb;
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    let avg = |sum: u64| ((sum as f64 / n as f64).round()) as u8;
    Some((avg(r), avg(g), avg(b)))
}

/// Light accent color for a profile image: `rgb(r, g, b)` averaged over its
/// bright pixels, or `#ffffff` when nothing usable can be loaded.
pub async fn light_color_from_image(loader: &ImageLoader, src: &str) -> String {
    let pixmap = match loader.load(src, true).await {
        Ok(Some(p)) => p,
        Ok(None) => return "#ffffff".to_string(),
        Err(e) => {
            log::warn!("light color unavailable for {}: {}", short(src), e);
            return "#ffffff".to_string();
        }
    };
    match light_color(&pixmap) {
        Some((r, g, b)) => format!("rgb({}, {}, {})", r, g, b),
        None => "#ffffff".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::packager::PackagedFile;
    use tiny_skia::Color;

    /// Solid-colored PNG as a data URI
    pub(crate) fn png_data_uri(w: u32, h: u32, rgba: (u8, u8, u8, u8)) -> String {
        let mut p = Pixmap::new(w, h).unwrap();
        p.fill(Color::from_rgba8(rgba.0, rgba.1, rgba.2, rgba.3));
        PackagedFile {
            name: "t.png".into(),
            mime: "image/png".into(),
            bytes: p.encode_png().unwrap(),
        }
        .to_data_url()
    }

    fn loader() -> ImageLoader {
        ImageLoader::new(&ExportConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn data_uri_images_decode() {
        let uri = png_data_uri(3, 2, (10, 20, 30, 255));
        let p = loader().load(&uri, false).await.unwrap().unwrap();
        assert_eq!((p.width(), p.height()), (3, 2));
    }

    #[tokio::test]
    async fn non_png_payload_is_render_error() {
        let err = loader().load("data:image/jpeg;base64,/9j/4AAQ", true).await.unwrap_err();
        assert!(matches!(err, Error::RenderError(_)));
    }

    #[tokio::test]
    async fn light_color_averages_bright_pixels() {
        let light = png_data_uri(2, 2, (200, 180, 160, 255));
        assert_eq!(light_color_from_image(&loader(), &light).await, "rgb(200, 180, 160)");

        let dark = png_data_uri(2, 2, (10, 10, 10, 255));
        assert_eq!(light_color_from_image(&loader(), &dark).await, "#ffffff");

        assert_eq!(light_color_from_image(&loader(), "data:image/png;base64,xx").await, "#ffffff");
    }

    #[tokio::test]
    async fn light_color_threshold_is_the_exact_channel_mean() {
        // mean 100.67, bright despite truncating to 100
        let edge = png_data_uri(1, 1, (101, 101, 100, 255));
        assert_eq!(light_color_from_image(&loader(), &edge).await, "rgb(101, 101, 100)");
        let flat = png_data_uri(1, 1, (100, 100, 100, 255));
        assert_eq!(light_color_from_image(&loader(), &flat).await, "#ffffff");
    }

    #[tokio::test]
    async fn load_all_deduplicates() {
        let uri = png_data_uri(1, 1, (0, 0, 0, 255));
        let set = loader()
            .load_all(vec![uri.clone(), uri.clone(), String::new()], true)
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.natural_size(&uri), Some((1, 1)));
    }

    #[cfg(feature = "remote")]
    #[tokio::test]
    async fn relative_source_without_base_fails() {
        let err = loader().load("img/me.png", true).await.unwrap_err();
        assert!(matches!(err, Error::RenderError(_)));
    }
}
