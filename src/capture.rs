//! Off-screen capture driver.
//!
//! A capture deep-clones the target, parks the clone outside the viewport at
//! the original's measured size, injects a `<style>` with paintable
//! `!important` colors, rasterizes the clone and removes both again. The
//! clone and the style node live in a [`CloneSandbox`] whose `Drop` removes
//! them and hands their arena slots back, so cleanup runs on success, on
//! error, on cancellation and during unwinding, and repeated exports do not
//! grow the document.

use crate::dom::{Document, NodeId};
use crate::packager::{data_url_to_file, PackagedFile};
use crate::rendering::layout::measure;
use crate::rendering::{image_sources, ImageLoader, RasterImage, Rasterizer, SoftwareRasterizer};
use crate::{Error, ExportConfig, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// `id` of the injected override `<style>` element
pub const OVERRIDE_STYLE_ID: &str = "resume-export-override";

/// Marks a capture in progress; released on drop
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| Error::CaptureInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Off-screen clone plus override style, inserted and removed as a pair
pub struct CloneSandbox<'d> {
    doc: &'d mut Document,
    clone: NodeId,
    override_node: NodeId,
    /// Arena length before the sandbox created anything
    mark: usize,
}

impl<'d> CloneSandbox<'d> {
    /// Clone `original` and park the copy off-screen at `width` x `height`
    /// CSS pixels.
    pub fn open(
        doc: &'d mut Document,
        original: NodeId,
        width: f32,
        height: f32,
        config: &ExportConfig,
    ) -> Result<Self> {
        let host = doc
            .body()
            .or_else(|| doc.document_element())
            .ok_or_else(|| Error::InvalidInput("document has no root element".into()))?;
        let style_host = doc.head().unwrap_or(host);

        let mark = doc.node_count();
        let clone = doc.clone_node(original, true)?;
        let placement = [
            ("position", "absolute".to_string()),
            ("top", format!("{}px", config.offscreen_top_px)),
            ("left", "0".to_string()),
            ("opacity", "0".to_string()),
            ("box-sizing", "border-box".to_string()),
            ("width", format!("{}px", width)),
            ("height", format!("{}px", height)),
        ];
        for (name, value) in &placement {
            doc.set_style_property(clone, name, value)?;
        }

        let override_node = doc.create_element("style");
        if let Some(el) = doc.element_mut(override_node) {
            el.set_attr("id", OVERRIDE_STYLE_ID);
        }
        let css = doc.create_text(&config.override_css);
        doc.append_child(override_node, css)?;

        if let Err(e) = doc
            .append_child(host, clone)
            .and_then(|_| doc.append_child(style_host, override_node))
        {
            doc.discard_from(mark);
            return Err(e);
        }
        log::debug!("sandbox opened: clone {:?}, override {:?}", clone, override_node);

        Ok(Self {
            doc,
            clone,
            override_node,
            mark,
        })
    }

    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn clone_id(&self) -> NodeId {
        self.clone
    }

    pub fn override_id(&self) -> NodeId {
        self.override_node
    }
}

impl Drop for CloneSandbox<'_> {
    fn drop(&mut self) {
        self.doc.detach(self.clone);
        self.doc.detach(self.override_node);
        self.doc.discard_from(self.mark);
        log::debug!("sandbox closed");
    }
}

/// Runs captures one at a time through a [`Rasterizer`]
pub struct CaptureDriver<R: Rasterizer = SoftwareRasterizer> {
    config: ExportConfig,
    rasterizer: R,
    /// Loads the target's images so measurement sees their natural size
    loader: ImageLoader,
    in_flight: AtomicBool,
}

impl CaptureDriver<SoftwareRasterizer> {
    pub fn new(config: ExportConfig) -> Result<Self> {
        let rasterizer = SoftwareRasterizer::new(&config)?;
        Self::with_rasterizer(config, rasterizer)
    }
}

impl<R: Rasterizer> CaptureDriver<R> {
    pub fn with_rasterizer(config: ExportConfig, rasterizer: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            loader: ImageLoader::new(&config)?,
            config,
            rasterizer,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Whether a capture is currently running on this driver
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Rasterize `target` through an off-screen clone.
    ///
    /// Fails with [`Error::InvalidInput`] for a missing, non-element or
    /// detached target and with [`Error::CaptureInProgress`] while another
    /// capture runs on this driver; neither case touches the document.
    /// Otherwise the document is back to its previous shape when this
    /// returns, whatever the outcome.
    pub async fn capture_element(&self, doc: &mut Document, target: Option<NodeId>) -> Result<RasterImage> {
        let target = target.ok_or_else(|| Error::InvalidInput("no capture target".into()))?;
        if !doc.contains_node(target) || doc.element(target).is_none() {
            return Err(Error::InvalidInput("capture target must be an element".into()));
        }
        if !doc.is_connected(target) {
            return Err(Error::InvalidInput("capture target is not attached to the document".into()));
        }

        let _guard = FlightGuard::acquire(&self.in_flight)?;

        let images = self
            .loader
            .load_all(image_sources(doc, target), self.config.use_cors)
            .await?;
        let rect = measure(doc, target, self.config.viewport, Some(&images));
        log::debug!("capture target measured at {}x{}", rect.width, rect.height);

        let sandbox = CloneSandbox::open(doc, target, rect.width, rect.height, &self.config)?;
        let opts = self.config.raster_options();
        let image = self
            .rasterizer
            .rasterize(sandbox.document(), sandbox.clone_id(), &opts)
            .await;
        drop(sandbox);

        match &image {
            Ok(img) => log::debug!("captured {}x{} px", img.width, img.height),
            Err(e) => log::warn!("capture failed: {}", e),
        }
        image
    }

    /// Capture `target` and package the PNG as `file_name`
    pub async fn export_element(
        &self,
        doc: &mut Document,
        target: Option<NodeId>,
        file_name: &str,
    ) -> Result<PackagedFile> {
        let image = self.capture_element(doc, target).await?;
        data_url_to_file(&image.data_uri, file_name)
    }
}
