//! Resume Export
//!
//! Off-screen capture of resume documents: snapshot computed styles into
//! inline styles, rewrite colors the rasterizer cannot paint, rasterize a
//! target element to a PNG data URI and package it as a file for upload.
//!
//! # Example
//!
//! ```no_run
//! use resume_export::{CaptureDriver, Document, ExportConfig};
//!
//! # async fn run() -> resume_export::Result<()> {
//! let mut doc = Document::parse(&std::fs::read_to_string("resume.html")?);
//! let target = doc.query_selector("#resume-preview")?;
//! let policy = ExportConfig::default().color_policy;
//!
//! if let Some(root) = target {
//!     resume_export::normalize::inline_all_computed_styles(&mut doc, root, &policy)?;
//! }
//! resume_export::sanitize::fix_unsupported_colors(&mut doc, target, &policy)?;
//!
//! let driver = CaptureDriver::new(ExportConfig::default())?;
//! let file = driver.export_element(&mut doc, target, "thumbnail.png").await?;
//! println!("{} bytes of {}", file.bytes.len(), file.mime);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod dom;
pub use dom::{Document, NodeId};

pub mod style;

pub mod normalize;
pub mod sanitize;

pub mod rendering;
pub use rendering::{RasterImage, RasterOptions, Rasterizer, SoftwareRasterizer};

pub mod capture;
pub use capture::{CaptureDriver, CloneSandbox};

pub mod packager;
pub use packager::{data_url_to_file, PackagedFile};

pub mod text;

// Multipart client for the resume API's image upload endpoint
#[cfg(feature = "remote")]
pub mod upload;
#[cfg(feature = "remote")]
pub use upload::{UploadClient, UploadResponse};

/// Style rule injected during capture. Forces paintable colors everywhere in
/// case a property slipped past normalization and sanitization.
pub const DEFAULT_OVERRIDE_CSS: &str = "* { color: #000 !important; background-color: #fff !important; border-color: #000 !important; box-shadow: none !important; background-image: none !important; }";

/// Which color values count as unpaintable, and what replaces them
///
/// # Examples
///
/// ```
/// let policy = resume_export::ColorPolicy::default();
/// assert!(policy.is_unsupported("oklch(0.62 0.2 260)"));
/// assert!(!policy.is_unsupported("rgb(0, 0, 0)"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPolicy {
    /// Substring marking an unsupported color function
    pub token: String,
    /// Replacement written by the sanitizer
    pub fallback: String,
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self {
            token: "oklch(".to_string(),
            fallback: "#000".to_string(),
        }
    }
}

impl ColorPolicy {
    pub fn is_unsupported(&self, value: &str) -> bool {
        value.contains(self.token.as_str())
    }
}

/// Configuration for the export pipeline
///
/// The defaults mirror what the resume editor uses for thumbnails: 3x
/// oversampling, cross-origin images allowed and an opaque white background.
///
/// # Examples
///
/// ```
/// let cfg = resume_export::ExportConfig::default();
/// assert_eq!(cfg.scale, 3.0);
/// assert!(cfg.use_cors);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Layout viewport used to measure the capture target
    pub viewport: Viewport,
    /// Oversampling factor applied when rasterizing
    pub scale: f32,
    /// Whether cross-origin images are fetched (otherwise they are left out)
    pub use_cors: bool,
    /// Canvas background painted under the capture
    pub background: String,
    pub color_policy: ColorPolicy,
    /// Global rule injected for the duration of a capture
    pub override_css: String,
    /// Vertical offset placing the clone outside the viewport
    pub offscreen_top_px: i32,
    /// Base URL for resolving relative image sources
    pub base_url: Option<String>,
    /// Timeout for remote requests in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with remote requests
    pub user_agent: String,
    /// Maximum number of images fetched at once
    pub fetch_concurrency: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            scale: 3.0,
            use_cors: true,
            background: "#FFFFFF".to_string(),
            color_policy: ColorPolicy::default(),
            override_css: DEFAULT_OVERRIDE_CSS.to_string(),
            offscreen_top_px: -9999,
            base_url: None,
            timeout_ms: 30000,
            user_agent: concat!("resume-export/", env!("CARGO_PKG_VERSION")).to_string(),
            fetch_concurrency: num_cpus::get().max(1),
        }
    }
}

impl ExportConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let cfg: ExportConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::ConfigError(format!("scale must be positive, got {}", self.scale)));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must be non-empty".into()));
        }
        if self.fetch_concurrency == 0 {
            return Err(Error::ConfigError("fetch_concurrency must be at least 1".into()));
        }
        if self.color_policy.token.is_empty() {
            return Err(Error::ConfigError("color_policy.token must not be empty".into()));
        }
        Ok(())
    }

    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions {
            scale: self.scale,
            use_cors: self.use_cors,
            background: self.background.clone(),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
