//! Rendering: layout, display list and software rasterization of a subtree

pub mod fonts;
pub mod images;
pub mod layout;
pub mod paint;
pub mod raster;

use crate::dom::{Document, NodeId};
use crate::packager::data_url_to_file;
use crate::{ExportConfig, Result, Viewport};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::future::BoxFuture;

pub use fonts::{FontFace, Fonts};
pub use images::{light_color_from_image, ImageLoader, ImageSet};

/// Options forwarded to the rasterizer for one capture
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Device pixels per CSS pixel
    pub scale: f32,
    /// Fetch cross-origin images instead of leaving them out
    pub use_cors: bool,
    /// Color painted under everything
    pub background: String,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 3.0,
            use_cors: true,
            background: "#FFFFFF".to_string(),
        }
    }
}

/// Encoded capture result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    /// Width in device pixels
    pub width: u32,
    /// Height in device pixels
    pub height: u32,
}

impl RasterImage {
    pub fn from_png(width: u32, height: u32, png: &[u8]) -> Self {
        Self {
            data_uri: format!("data:image/png;base64,{}", STANDARD.encode(png)),
            width,
            height,
        }
    }

    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        Ok(data_url_to_file(&self.data_uri, "capture.png")?.bytes)
    }
}

/// Turns a document subtree into an image.
///
/// The returned future borrows the document; the capture driver keeps the
/// cloned subtree alive until it resolves.
pub trait Rasterizer: Send + Sync {
    fn rasterize<'a>(
        &'a self,
        doc: &'a Document,
        root: NodeId,
        opts: &'a RasterOptions,
    ) -> BoxFuture<'a, Result<RasterImage>>;
}

/// Built-in rasterizer: block layout plus tiny-skia painting
#[derive(Debug, Clone)]
pub struct SoftwareRasterizer {
    loader: ImageLoader,
    viewport: Viewport,
}

impl SoftwareRasterizer {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        Ok(Self {
            loader: ImageLoader::new(config)?,
            viewport: config.viewport,
        })
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }
}

/// `src` of every `<img>` in the subtree, in document order
pub(crate) fn image_sources(doc: &Document, root: NodeId) -> Vec<String> {
    doc.element_descendants(root, true)
        .into_iter()
        .filter_map(|n| doc.element(n))
        .filter(|e| e.name == "img")
        .filter_map(|e| e.attr("src"))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize<'a>(
        &'a self,
        doc: &'a Document,
        root: NodeId,
        opts: &'a RasterOptions,
    ) -> BoxFuture<'a, Result<RasterImage>> {
        Box::pin(async move {
            let images = self.loader.load_all(image_sources(doc, root), opts.use_cors).await?;

            let tree = layout::LayoutEngine::new(doc, Some(&images))
                .layout_root(root, self.viewport)
                .ok_or_else(|| crate::Error::RenderError("capture root is not rendered".into()))?;
            let commands = paint::build_display_list(doc, &tree);
            log::debug!(
                "painting {} commands over {}x{} css px",
                commands.len(),
                tree.lb.rect.width,
                tree.lb.rect.height
            );
            raster::rasterize_display_list(&commands, tree.lb.rect.width, tree.lb.rect.height, opts, &images)
        })
    }
}
