//! Export configuration and per-call options.

use crate::compose::{CompositorSettings, Orientation, TableStyle, DEFAULT_CAPTURE_WIDTH};
use crate::model::Color;
use std::time::Duration;

/// Labels scraped from the rendered root for the email summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLabels {
    /// Report date label
    pub fecha: String,

    /// Well label
    pub pozo: String,

    /// Rig/equipment label
    pub equipo: String,

    /// Operator label
    pub operador: String,
}

impl Default for SummaryLabels {
    fn default() -> Self {
        Self {
            fecha: "Fecha".to_string(),
            pozo: "Pozo".to_string(),
            equipo: "Equipo".to_string(),
            operador: "Operador".to_string(),
        }
    }
}

/// Pipeline-wide settings, shared by every export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Class marking elements excluded from export (e.g. `no-print`)
    pub no_export_class: String,

    /// Minimum table column count that switches to landscape (0 = never)
    pub landscape_column_threshold: usize,

    /// Labels for the email summary
    pub summary_labels: SummaryLabels,

    /// Device pixels per CSS pixel when rasterizing
    pub raster_scale: f32,

    /// Capture width used when the root has no rendered width
    pub default_capture_width: f32,

    /// Colour replacing gradient-clipped text in captures
    pub gradient_fallback: Color,

    /// Page margin (mm)
    pub margin: f32,

    /// Delay before a finished email status returns to idle
    pub status_reset_delay: Duration,

    /// Message shown by the blocking overlay
    pub overlay_message: String,

    /// Table appearance
    pub table_style: TableStyle,
}

impl ExportConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the no-export class.
    pub fn with_no_export_class(mut self, class: impl Into<String>) -> Self {
        self.no_export_class = class.into();
        self
    }

    /// Set the landscape column threshold.
    pub fn with_landscape_threshold(mut self, columns: usize) -> Self {
        self.landscape_column_threshold = columns;
        self
    }

    /// Set the summary labels.
    pub fn with_summary_labels(mut self, labels: SummaryLabels) -> Self {
        self.summary_labels = labels;
        self
    }

    /// Set the raster scale (clamped to 0.5..=4).
    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale.clamp(0.5, 4.0);
        self
    }

    /// Set the page margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    /// Set the status reset delay.
    pub fn with_status_reset_delay(mut self, delay: Duration) -> Self {
        self.status_reset_delay = delay;
        self
    }

    /// Set the overlay message.
    pub fn with_overlay_message(mut self, message: impl Into<String>) -> Self {
        self.overlay_message = message.into();
        self
    }

    /// Set the table style.
    pub fn with_table_style(mut self, style: TableStyle) -> Self {
        self.table_style = style;
        self
    }

    /// Compositor settings for a root rendered `width` CSS px wide.
    pub fn compositor_settings(&self, width: Option<f32>) -> CompositorSettings {
        CompositorSettings {
            raster_scale: self.raster_scale,
            capture_width: width
                .filter(|w| *w > 0.0)
                .unwrap_or(self.default_capture_width),
            gradient_fallback: self.gradient_fallback,
            no_export_class: self.no_export_class.clone(),
            table_style: self.table_style.clone(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            no_export_class: "no-print".to_string(),
            landscape_column_threshold: 10,
            summary_labels: SummaryLabels::default(),
            raster_scale: 2.0,
            default_capture_width: DEFAULT_CAPTURE_WIDTH,
            gradient_fallback: Color::rgb(31, 41, 55),
            margin: 10.0,
            status_reset_delay: Duration::from_secs(6),
            overlay_message: "Generando PDF...".to_string(),
            table_style: TableStyle::default(),
        }
    }
}

/// Options for a single export call.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Base filename, without the `.pdf` extension
    pub filename: String,

    /// Email recipient (no email when unset)
    pub to: Option<String>,

    /// Extra text for the email body
    pub additional_message: Option<String>,

    /// Force an orientation instead of inferring it
    pub orientation: Option<Orientation>,

    /// Form type reported to the relay (defaults to the filename)
    pub form_type: Option<String>,
}

impl ExportOptions {
    /// Create options for a document named `filename`.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Set the recipient.
    pub fn with_recipient(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Set the additional message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.additional_message = Some(message.into());
        self
    }

    /// Force an orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Set the form type.
    pub fn with_form_type(mut self, form_type: impl Into<String>) -> Self {
        self.form_type = Some(form_type.into());
        self
    }

    /// File name of the saved document.
    pub fn file_name(&self) -> String {
        let base = self.filename.trim();
        let base = base.strip_suffix(".pdf").unwrap_or(base);
        if base.is_empty() {
            "documento.pdf".to_string()
        } else {
            format!("{}.pdf", base)
        }
    }

    /// Form type sent to the relay.
    pub fn form_type(&self) -> &str {
        self.form_type.as_deref().unwrap_or(&self.filename)
    }

    /// Recipient, if set and non-blank.
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.no_export_class, "no-print");
        assert_eq!(config.landscape_column_threshold, 10);
        assert_eq!(config.status_reset_delay, Duration::from_secs(6));
        assert_eq!(config.summary_labels.pozo, "Pozo");
    }

    #[test]
    fn test_builder() {
        let config = ExportConfig::new()
            .with_no_export_class("hide")
            .with_landscape_threshold(8)
            .with_raster_scale(10.0)
            .with_margin(-1.0);
        assert_eq!(config.no_export_class, "hide");
        assert_eq!(config.landscape_column_threshold, 8);
        assert_eq!(config.raster_scale, 4.0);
        assert_eq!(config.margin, 0.0);
    }

    #[test]
    fn test_compositor_settings_width() {
        let config = ExportConfig::default();
        assert_eq!(config.compositor_settings(Some(1200.0)).capture_width, 1200.0);
        assert_eq!(config.compositor_settings(None).capture_width, DEFAULT_CAPTURE_WIDTH);
        assert_eq!(config.compositor_settings(Some(0.0)).capture_width, DEFAULT_CAPTURE_WIDTH);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(ExportOptions::new("parte_diario").file_name(), "parte_diario.pdf");
        assert_eq!(ExportOptions::new("informe.pdf").file_name(), "informe.pdf");
        assert_eq!(ExportOptions::new("  ").file_name(), "documento.pdf");
    }

    #[test]
    fn test_form_type_and_recipient() {
        let options = ExportOptions::new("parte_diario").with_recipient("  ");
        assert_eq!(options.form_type(), "parte_diario");
        assert_eq!(options.recipient(), None);

        let options = options.with_form_type("PD-01").with_recipient("ops@example.com");
        assert_eq!(options.form_type(), "PD-01");
        assert_eq!(options.recipient(), Some("ops@example.com"));
    }
}
