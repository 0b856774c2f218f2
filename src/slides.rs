// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Slide content produced by the language model, and its rendering into
//! markdown that Gamma's "paste text" import turns into a one-slide deck.

use serde_json::Value;

use crate::error::SlideParseError;

const DEFAULT_TITLE: &str = "Consulting Analysis";
const DEFAULT_CHART_TYPE: &str = "bar";

/// Loosely typed slide payload. Every field is optional on the wire; the
/// coercion rules live in [`SlideContent::from_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct SlideContent {
    pub title: String,
    pub points: Vec<String>,
    pub chart: Option<ChartData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub chart_type: String,
    pub categories: Vec<String>,
    pub values: Vec<String>,
}

impl ChartData {
    /// `(category, value)` pairs, truncated to the shorter sequence
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

impl SlideContent {
    /// Coerce an arbitrary JSON value; never fails.
    ///
    /// - `title`: missing or blank -> default title; non-strings are stringified
    /// - `points`: missing -> empty; a single string -> one point; other
    ///   scalars are stringified into one point; nulls inside lists are skipped
    /// - `chart_data`: kept only when it is an object with a non-empty
    ///   `values` list; `type` defaults to "bar", `categories` to empty
    pub fn from_value(value: &Value) -> Self {
        let title = match value.get("title") {
            Some(Value::Null) | None => DEFAULT_TITLE.to_string(),
            Some(v) => {
                let title = stringify(v);
                if title.trim().is_empty() {
                    DEFAULT_TITLE.to_string()
                } else {
                    title
                }
            }
        };

        let points = match value.get("points") {
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(stringify)
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(Value::Object(_)) => Vec::new(),
            Some(scalar) => vec![stringify(scalar)],
        };

        let chart = value.get("chart_data").and_then(ChartData::from_value);

        Self {
            title,
            points,
            chart,
        }
    }
}

impl ChartData {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let values = sequence(object.get("values"));
        if values.is_empty() {
            return None;
        }

        let chart_type = object
            .get("type")
            .filter(|v| !v.is_null())
            .map(stringify)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHART_TYPE.to_string());

        Some(Self {
            chart_type,
            categories: sequence(object.get("categories")),
            values,
        })
    }
}

fn sequence(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(stringify).collect(),
        _ => Vec::new(),
    }
}

/// Strings as-is, everything else in its JSON spelling
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip code fences around generated JSON: a ```json fence wins, then any ``` fence
pub fn strip_code_fences(raw: &str) -> &str {
    let inner = if let Some((_, rest)) = raw.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if raw.contains("```") {
        raw.split("```").nth(1).unwrap_or(raw)
    } else {
        raw
    };
    inner.trim()
}

/// Parse the model's raw answer into slide content
pub fn parse_generated(raw: &str) -> Result<SlideContent, SlideParseError> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))?;
    if !value.is_object() {
        return Err(SlideParseError::NotAnObject);
    }
    Ok(SlideContent::from_value(&value))
}

/// Render slide content as markdown: title, key insights, then the optional
/// data analysis section with a chart instruction and a backing table
pub fn render(content: &SlideContent) -> String {
    let mut md = format!("# {}\n\n", content.title);

    md.push_str("## Key Insights\n");
    for point in &content.points {
        md.push_str(&format!("- {}\n", point));
    }

    if let Some(chart) = &content.chart {
        md.push_str("\n---\n");
        md.push_str(&format!("\n## Data Analysis: {}\n", content.title));

        let description = chart
            .pairs()
            .map(|(category, value)| format!("{} is {}", category, value))
            .collect::<Vec<_>>()
            .join(", ");

        md.push_str(&format!(
            "> **Design Instruction:** Create a **{} chart** to visualize this data.\n",
            chart.chart_type
        ));
        md.push_str(&format!("> Data points: {}.\n\n", description));

        md.push_str("| Category | Value |\n");
        md.push_str("| :--- | :--- |\n");
        for (category, value) in chart.pairs() {
            md.push_str(&format!("| {} | {} |\n", category, value));
        }
    }

    md.push_str("\n\n");
    md
}

/// Render any JSON payload; total over malformed input
pub fn render_value(value: &Value) -> String {
    render(&SlideContent::from_value(value))
}

/// Markdown used when the model's answer could not be parsed
pub fn render_fallback(raw: &str) -> String {
    format!(
        "# Analysis Result\n\n> Auto-formatting failed, raw output:\n\n{}",
        raw
    )
}

/// Parse and render, falling back to the raw text; the result is never empty
pub fn render_generated(raw: &str) -> (String, Option<SlideParseError>) {
    match parse_generated(raw) {
        Ok(content) => (render(&content), None),
        Err(e) => (render_fallback(raw), Some(e)),
    }
}
