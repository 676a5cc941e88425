//! Export orchestration: render, save, email, report.
//!
//! Two exporters share one delivery leg. [`CaptureExporter`] captures a
//! rendered page element; [`DeclarativeExporter`] renders a
//! [`DeclarativeDocument`] directly. [`ExportPipeline`] picks the exporter
//! from the [`ExportSource`] variant.
//!
//! Rendering failures abort the export: nothing is saved or emailed and the
//! caller gets `Err`. Once rendering succeeds the document is always saved;
//! email failures are reported in [`ExportResult`] only.

mod chrome;
mod options;
mod relay;
mod result;
mod sink;
mod status;
mod summary;

pub use chrome::{with_hidden_chrome, HiddenChrome, OverlayGuard, OVERLAY_ID};
pub use options::{ExportConfig, ExportOptions, SummaryLabels};
pub use relay::{
    EmailPayload, HttpMailRelay, MailRelay, RelayConfig, RelayResponse, DEFAULT_RELAY_BASE_URL,
    DEFAULT_RELAY_TOKEN, RELAY_PATH,
};
pub use result::{ExportResult, RenderedDocument};
pub use sink::{DirectorySink, DownloadSink, LogNotifier, Notifier};
pub use status::{EmailStatus, StatusTracker};
pub use summary::ReportSummary;

use crate::compose::{compose_document, infer_orientation, Compositor, PageFormat, Rasterizer};
use crate::error::{Error, Result};
use crate::model::{DeclarativeDocument, DocBlock, Page};
use crate::segment::{build_segments, has_table_segments};
use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;

/// What to export.
pub enum ExportSource<'a> {
    /// Capture the element `element_id` of a rendered page
    Capture {
        /// The whole page (chrome is hidden page-wide)
        page: &'a mut Page,
        /// Id of the export root
        element_id: &'a str,
    },
    /// Render a declarative document
    Declarative(&'a DeclarativeDocument),
}

impl ExportSource<'_> {
    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportSource::Capture { .. } => "capture",
            ExportSource::Declarative(_) => "declarative",
        }
    }
}

/// Renders one kind of [`ExportSource`] to a PDF.
#[async_trait]
pub trait DocumentExporter: Send + Sync {
    /// Check the source before any work starts.
    fn validate(&self, source: &ExportSource<'_>) -> Result<()>;

    /// Render the source.
    async fn render(&self, source: ExportSource<'_>, options: &ExportOptions) -> Result<RenderedDocument>;
}

fn wrong_source(exporter: &str, source: &ExportSource<'_>) -> Error {
    Error::Config(format!("{} exporter cannot export a {} source", exporter, source.kind()))
}

/// Exports an element of a rendered page.
pub struct CaptureExporter {
    rasterizer: Arc<dyn Rasterizer>,
    config: ExportConfig,
}

impl CaptureExporter {
    /// Create an exporter capturing through `rasterizer`.
    pub fn new(rasterizer: Arc<dyn Rasterizer>, config: ExportConfig) -> Self {
        Self { rasterizer, config }
    }

    async fn capture(&self, page: &mut Page, element_id: &str, options: &ExportOptions) -> Result<RenderedDocument> {
        let config = &self.config;
        let root_path = page
            .find_path(element_id)
            .ok_or_else(|| Error::CaptureTargetMissing(element_id.to_string()))?;

        let mut overlay = OverlayGuard::show(page, &config.overlay_message, &config.no_export_class);
        let chrome = HiddenChrome::hide(&mut overlay, &config.no_export_class);
        let root = chrome
            .node_at(&root_path)
            .ok_or_else(|| Error::CaptureTargetMissing(element_id.to_string()))?;

        self.rasterizer.fonts_ready().await?;

        let orientation = options.orientation.unwrap_or_else(|| {
            infer_orientation(root, &config.no_export_class, config.landscape_column_threshold)
        });
        log::info!("capturing #{} ({:?})", element_id, orientation);

        let mut compositor = Compositor::new(
            PageFormat::a4(orientation, config.margin),
            self.rasterizer.as_ref(),
            config.compositor_settings(root.style.width),
        );
        if let Some(title) = &chrome.title {
            compositor = compositor.with_title(title.clone());
        }

        let segments = build_segments(root, &config.no_export_class);
        if has_table_segments(&segments) {
            for segment in segments {
                compositor.composite(segment).await?;
            }
        } else {
            compositor.place_nodes(vec![root.clone()]).await?;
        }

        let pages = compositor.page_count();
        let bytes = compositor.finish()?;
        let summary = ReportSummary::scrape(root, &config.summary_labels);

        Ok(RenderedDocument { bytes, pages, summary })
    }
}

#[async_trait]
impl DocumentExporter for CaptureExporter {
    fn validate(&self, source: &ExportSource<'_>) -> Result<()> {
        match source {
            ExportSource::Capture { page, element_id } => match page.find_by_id(element_id) {
                Some(_) => Ok(()),
                None => Err(Error::CaptureTargetMissing(element_id.to_string())),
            },
            other => Err(wrong_source("capture", other)),
        }
    }

    async fn render(&self, source: ExportSource<'_>, options: &ExportOptions) -> Result<RenderedDocument> {
        match source {
            ExportSource::Capture { page, element_id } => self.capture(page, element_id, options).await,
            other => Err(wrong_source("capture", &other)),
        }
    }
}

/// Exports declarative documents.
pub struct DeclarativeExporter {
    config: ExportConfig,
}

impl DeclarativeExporter {
    /// Create the exporter.
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DocumentExporter for DeclarativeExporter {
    fn validate(&self, source: &ExportSource<'_>) -> Result<()> {
        match source {
            ExportSource::Declarative(_) => Ok(()),
            other => Err(wrong_source("declarative", other)),
        }
    }

    async fn render(&self, source: ExportSource<'_>, options: &ExportOptions) -> Result<RenderedDocument> {
        let doc = match source {
            ExportSource::Declarative(doc) => doc,
            other => return Err(wrong_source("declarative", &other)),
        };

        let sheet = compose_document(doc, options.orientation, self.config.margin)?;
        let pages = sheet.page_count();
        let bytes = sheet.finish()?;
        let summary = ReportSummary::from_fields(
            doc.blocks.iter().flat_map(|b| match b {
                DocBlock::Fields { fields } => fields.as_slice(),
                _ => &[][..],
            }),
            &self.config.summary_labels,
        );
        log::info!("rendered declarative document ({} bytes)", bytes.len());
        Ok(RenderedDocument { bytes, pages, summary })
    }
}

/// Runs exports end to end: render, save, email, status.
pub struct ExportPipeline {
    config: ExportConfig,
    rasterizer: Arc<dyn Rasterizer>,
    capture: CaptureExporter,
    declarative: DeclarativeExporter,
    sink: Arc<dyn DownloadSink>,
    relay: Arc<dyn MailRelay>,
    notifier: Arc<dyn Notifier>,
    status: Option<Arc<StatusTracker>>,
}

impl ExportPipeline {
    /// Create a pipeline with the default configuration.
    pub fn new(rasterizer: Arc<dyn Rasterizer>, sink: Arc<dyn DownloadSink>, relay: Arc<dyn MailRelay>) -> Self {
        let config = ExportConfig::default();
        Self {
            capture: CaptureExporter::new(Arc::clone(&rasterizer), config.clone()),
            declarative: DeclarativeExporter::new(config.clone()),
            config,
            rasterizer,
            sink,
            relay,
            notifier: Arc::new(LogNotifier),
            status: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.capture = CaptureExporter::new(Arc::clone(&self.rasterizer), config.clone());
        self.declarative = DeclarativeExporter::new(config.clone());
        self.config = config;
        self
    }

    /// Replace the alert channel.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Report progress to a status slot.
    pub fn with_status(mut self, status: Arc<StatusTracker>) -> Self {
        self.status = Some(status);
        self
    }

    /// Report progress to a fresh status slot using the configured reset delay.
    pub fn with_status_tracking(self) -> Self {
        let tracker = Arc::new(StatusTracker::new(self.config.status_reset_delay));
        self.with_status(tracker)
    }

    /// Status slot, if any.
    pub fn status(&self) -> Option<&Arc<StatusTracker>> {
        self.status.as_ref()
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn exporter_for(&self, source: &ExportSource<'_>) -> &dyn DocumentExporter {
        match source {
            ExportSource::Capture { .. } => &self.capture,
            ExportSource::Declarative(_) => &self.declarative,
        }
    }

    /// Capture `element_id` of `page` and deliver it.
    pub async fn export_capture(&self, page: &mut Page, element_id: &str, options: &ExportOptions) -> Result<ExportResult> {
        self.export(ExportSource::Capture { page, element_id }, options).await
    }

    /// Render a declarative document and deliver it.
    pub async fn export_declarative(&self, doc: &DeclarativeDocument, options: &ExportOptions) -> Result<ExportResult> {
        self.export(ExportSource::Declarative(doc), options).await
    }

    /// Export a source.
    ///
    /// A missing capture target fails before the status leaves idle. Other
    /// rendering failures set the status to error. Both are alerted and
    /// returned as `Err`.
    pub async fn export(&self, source: ExportSource<'_>, options: &ExportOptions) -> Result<ExportResult> {
        let exporter = self.exporter_for(&source);
        if let Err(e) = exporter.validate(&source) {
            self.notifier.alert(&e.to_string());
            return Err(e);
        }

        if let Some(status) = &self.status {
            status.begin();
        }

        let rendered = match exporter.render(source, options).await {
            Ok(rendered) => rendered,
            Err(e) => return Err(self.abort(e)),
        };
        log::info!(
            "rendered {} ({} pages, {} bytes)",
            options.file_name(),
            rendered.pages,
            rendered.bytes.len()
        );

        let filename = options.file_name();
        if let Err(e) = self.sink.save(&filename, &rendered.bytes) {
            return Err(self.abort(e));
        }

        Ok(self.deliver(rendered, &filename, options).await)
    }

    fn abort(&self, error: Error) -> Error {
        self.notifier.alert(&format!("Error generating PDF: {}", error));
        if let Some(status) = &self.status {
            status.fail(error.to_string());
        }
        error
    }

    async fn deliver(&self, rendered: RenderedDocument, filename: &str, options: &ExportOptions) -> ExportResult {
        let Some(to) = options.recipient() else {
            log::info!("no recipient, skipping email");
            if let Some(status) = &self.status {
                status.clear();
            }
            return ExportResult::not_sent();
        };

        let payload = EmailPayload {
            pdf_base64: base64::engine::general_purpose::STANDARD.encode(&rendered.bytes),
            filename: filename.to_string(),
            form_type: options.form_type().to_string(),
            to: to.to_string(),
            additional_message: options
                .additional_message
                .clone()
                .filter(|m| !m.trim().is_empty()),
            summary: rendered.summary,
        };

        let outcome = match self.relay.send(&payload).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };
        let result = ExportResult::from_delivery(outcome);

        match (&result.email_error, &self.status) {
            (None, Some(status)) => status.finish(to),
            (Some(error), Some(status)) => status.fail(error.clone()),
            _ => {}
        }
        if let Some(error) = &result.email_error {
            log::warn!("email to {} failed: {}", to, error);
        } else {
            log::info!("emailed {} to {}", filename, to);
        }
        result
    }
}
