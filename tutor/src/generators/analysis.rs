//! CSV data analysis with a bar chart specification.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::llm::{prompt, GenerateRequest, InferenceClient, LlmError};

/// Default model for data analysis.
pub const ANALYSIS_MODEL: &str = "googleai/gemini-2.0-flash";

/// Matches a fenced code block, optionally tagged `json`.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid regex"));

/// Legend entry for one plotted series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Everything needed to draw a bar chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Series key → legend label and color.
    #[serde(default)]
    pub config: BTreeMap<String, ChartSeries>,
    /// Rows of the chart, one object per x-axis category.
    pub data: Vec<Map<String, Value>>,
    /// Row key used for the x-axis.
    pub x_axis_key: String,
    /// Row keys plotted as bars.
    pub y_axis_keys: Vec<String>,
}

impl ChartSpec {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.x_axis_key.trim().is_empty() {
            return Err("chart has no x-axis key".to_string());
        }
        if self.y_axis_keys.is_empty() {
            return Err("chart has no y-axis keys".to_string());
        }
        Ok(())
    }

    /// Legend label for a series, falling back to its key.
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.config.get(key).map_or(key, |s| s.label.as_str())
    }
}

/// Result of a data analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Markdown summary answering the question.
    pub analysis: String,
    pub chart: ChartSpec,
}

/// Reject anything that is not a `.csv` file.
pub fn check_csv_path(path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{} is not a CSV file",
            path.display()
        )))
    }
}

/// Ask the model to analyze `csv` with respect to `question`.
pub async fn analyze_data<C>(client: &C, model: &str, csv: &str, question: &str) -> Result<Analysis>
where
    C: InferenceClient + ?Sized,
{
    if csv.trim().is_empty() || question.trim().is_empty() {
        return Err(Error::InvalidInput(
            "a CSV file and a question are both required".to_string(),
        ));
    }

    let request = GenerateRequest::prompt(model, prompt::analysis(csv, question)).json();
    let raw = client.generate(request).await?.into_text()?;
    Ok(parse_analysis(&raw)?)
}

/// Parse the model's JSON answer, tolerating a surrounding code fence.
fn parse_analysis(raw: &str) -> std::result::Result<Analysis, LlmError> {
    let body = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    let analysis: Analysis = serde_json::from_str(body)
        .map_err(|e| LlmError::Malformed(format!("analysis is not valid JSON: {e}")))?;
    analysis.chart.validate().map_err(LlmError::Malformed)?;
    Ok(analysis)
}
