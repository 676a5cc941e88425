//! Best-effort metadata scrape for the email body.

use super::options::SummaryLabels;
use crate::model::Node;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Report metadata sent alongside the document. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Report date
    pub fecha: String,
    /// Well
    pub pozo: String,
    /// Rig/equipment
    pub equipo: String,
    /// Operator
    pub operador: String,
}

impl ReportSummary {
    /// Scrape the summary from the text under `root`.
    ///
    /// A text node starting with a label yields the rest of its text as the
    /// value; a bare label (`Pozo:`) takes the next non-empty text instead,
    /// which is how label/input pairs render.
    pub fn scrape(root: &Node, labels: &SummaryLabels) -> Self {
        let texts: Vec<String> = root
            .descendants()
            .filter(|n| !n.is_hidden())
            .filter_map(|n| n.own_text())
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .collect();

        let summary = Self {
            fecha: find_labelled(&texts, &labels.fecha),
            pozo: find_labelled(&texts, &labels.pozo),
            equipo: find_labelled(&texts, &labels.equipo),
            operador: find_labelled(&texts, &labels.operador),
        };
        log::debug!("scraped summary: {:?}", summary);
        summary
    }

    /// Build the summary from label/value pairs (declarative documents).
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a (String, String)>, labels: &SummaryLabels) -> Self {
        let mut summary = Self::default();
        for (label, value) in fields {
            let label = label.trim().trim_end_matches(':').trim();
            let slot = if label.eq_ignore_ascii_case(&labels.fecha) {
                &mut summary.fecha
            } else if label.eq_ignore_ascii_case(&labels.pozo) {
                &mut summary.pozo
            } else if label.eq_ignore_ascii_case(&labels.equipo) {
                &mut summary.equipo
            } else if label.eq_ignore_ascii_case(&labels.operador) {
                &mut summary.operador
            } else {
                continue;
            };
            if slot.is_empty() {
                *slot = value.trim().to_string();
            }
        }
        summary
    }
}

fn label_pattern(label: &str) -> Option<Regex> {
    let pattern = format!(r"(?i)^{}(?:\s*[:\-]\s*|\s+|$)(.*)$", regex::escape(label.trim()));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("invalid summary label {:?}: {}", label, e);
            None
        }
    }
}

fn find_labelled(texts: &[String], label: &str) -> String {
    if label.trim().is_empty() {
        return String::new();
    }
    let Some(re) = label_pattern(label) else {
        return String::new();
    };

    for (i, text) in texts.iter().enumerate() {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let rest = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if !rest.is_empty() {
            return rest.to_string();
        }
        if let Some(next) = texts.get(i + 1) {
            return next.trim().to_string();
        }
    }
    String::new()
}
