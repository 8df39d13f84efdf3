//! Deterministic report rendering for a completed analysis.
//!
//! The generator turns an `AnalysisResult` into a self-contained HTML
//! document: verdict, explainability table, per-layer evidence sections, and
//! a restatement of the decision rule with this result's actual numbers.
//! For a fixed result and a fixed render time the output is byte-identical;
//! the caller supplies the render time and decides where the document goes.

use chrono::{DateTime, NaiveDate, TimeZone};
use std::fmt::Write as _;

use crate::analysis::{AnalysisResult, Classification, Layer};
use crate::error::AnalysisError;
use crate::scoring;

/// Fixed one-line interpretation shown in the verdict block.
pub fn interpretation(classification: Classification) -> &'static str {
    match classification {
        Classification::Safe => "No significant phishing indicators were found in this email.",
        Classification::Suspicious => {
            "This email shows warning signs and should be treated with caution."
        }
        Classification::Phishing => {
            "This email exhibits strong phishing indicators and should not be trusted."
        }
    }
}

/// Fixed one-line qualitative assessment for a layer, keyed by the layer's
/// own safety band.
pub fn band_assessment(band: Classification) -> &'static str {
    match band {
        Classification::Safe => "No significant concerns detected at this layer",
        Classification::Suspicious => "Moderate concerns detected at this layer",
        Classification::Phishing => "Significant risk indicators detected at this layer",
    }
}

/// Badge label for a verdict or per-layer band.
pub fn badge_label(band: Classification) -> &'static str {
    match band {
        Classification::Safe => "[SAFE]",
        Classification::Suspicious => "[WARNING]",
        Classification::Phishing => "[DANGER]",
    }
}

/// CSS class backing the three-tier color policy.
fn css_class(band: Classification) -> &'static str {
    match band {
        Classification::Safe => "safe",
        Classification::Suspicious => "warning",
        Classification::Phishing => "danger",
    }
}

/// Filename convention for exported reports.
pub fn report_filename(date: NaiveDate) -> String {
    format!("Email_Security_Report_{}.html", date.format("%Y-%m-%d"))
}

/// Pretty-printed JSON export of a result, for machine consumption.
pub fn render_json(result: &AnalysisResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "<strong>YES</strong>",
        Some(false) => "NO",
        None => "Not Available",
    }
}

fn text_or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(text) => escape_html(text),
        None => "Not Available".to_string(),
    }
}

/// Renders the full HTML report for `result` at the given render time.
///
/// Fails with `MissingField` when any of the five `explanations` entries is
/// absent; every row of the explainability table is mandatory. Missing
/// evidence fields are not errors and render as neutral placeholders.
pub fn render_report<Tz: TimeZone>(
    result: &AnalysisResult,
    generated_at: DateTime<Tz>,
) -> Result<String, AnalysisError>
where
    Tz::Offset: std::fmt::Display,
{
    // All five explainability rows are mandatory; check before rendering
    // anything so a partial result never produces a partial document.
    for layer in Layer::ALL {
        result.explanation(layer)?;
    }

    let safety = scoring::safety_score(result.final_score);
    let verdict = result.classification;
    let rendered_at = generated_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let analyzed_at = match &result.timestamp {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "Not Available".to_string(),
    };

    let mut explain_rows = String::new();
    for layer in Layer::ALL {
        let explanation = result.explanation(layer)?;
        let layer_safety = scoring::safety_score(explanation.score);
        let reasons = if explanation.reasons.is_empty() {
            "No specific flags".to_string()
        } else {
            escape_html(&explanation.reasons.join("; "))
        };
        let _ = write!(
            explain_rows,
            "<tr><td>{}</td><td>{:.1}</td><td>{:.0}%</td><td>{}</td></tr>\n",
            layer.label(),
            layer_safety,
            explanation.weight * 100.0,
            reasons
        );
    }

    let mut detail_sections = String::new();
    for (step, layer) in Layer::ALL.iter().enumerate() {
        detail_sections.push_str(&layer_section(result, *layer, step + 1));
    }

    let decision_block = decision_rule_block(result, safety);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Email Security Analysis Report</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #f5f7fa; }}
        .container {{ max-width: 900px; margin: 0 auto; background: white; padding: 40px; border-radius: 12px; }}
        .header {{ text-align: center; margin-bottom: 40px; padding-bottom: 30px; border-bottom: 3px solid #6366f1; }}
        .title {{ font-size: 2.5rem; color: #1f2937; margin: 0; }}
        .subtitle {{ color: #6b7280; margin-top: 10px; }}
        .step {{ margin: 25px 0; padding: 20px; border-left: 4px solid #6366f1; background: #f8fafc; border-radius: 8px; }}
        .step-title {{ font-size: 1.3rem; font-weight: bold; color: #374151; margin-bottom: 15px; }}
        .score-card {{ display: inline-block; margin: 10px 0; padding: 15px 20px; border-radius: 8px; color: white; font-weight: bold; }}
        .safe {{ background: #059669; }}
        .warning {{ background: #d97706; }}
        .danger {{ background: #dc2626; }}
        .final-result {{ text-align: center; padding: 30px; margin: 30px 0; border-radius: 12px; font-size: 1.5rem; color: white; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 12px; text-align: left; border-bottom: 1px solid #e5e7eb; }}
        th {{ background: #f8fafc; font-weight: bold; color: #374151; }}
        .timestamp {{ text-align: center; color: #6b7280; margin-top: 30px; font-style: italic; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1 class="title">Email Security Analysis Report</h1>
            <p class="subtitle">AI-Powered Phishing Detection Analysis</p>
            <p class="subtitle">Report generated: {rendered_at} &middot; Analysis performed: {analyzed_at}</p>
        </div>

        <div class="final-result {verdict_class}">
            <h2>{verdict_badge} {verdict_upper}</h2>
            <p>Safety Score: <strong>{safety:.1}/100</strong></p>
            <p style="font-size: 1rem;">{verdict_line}</p>
        </div>

        <div class="step">
            <div class="step-title">Explainability: Why this verdict</div>
            <table>
                <tr><th>Layer</th><th>Score (0-100)</th><th>Weight</th><th>Reasons</th></tr>
{explain_rows}            </table>
        </div>

{detail_sections}
{decision_block}
        <div class="timestamp">
            Report generated on: {rendered_at}<br>
            Generated by Email Guard AI Security System
        </div>
    </div>
</body>
</html>
"#,
        rendered_at = rendered_at,
        analyzed_at = analyzed_at,
        verdict_class = css_class(verdict),
        verdict_badge = badge_label(verdict),
        verdict_upper = verdict.as_str().to_uppercase(),
        safety = safety,
        verdict_line = interpretation(verdict),
        explain_rows = explain_rows,
        detail_sections = detail_sections,
        decision_block = decision_block,
    );

    Ok(html)
}

/// Evidence table rows for one layer. Unknown values render as placeholders,
/// never as errors.
fn evidence_rows(result: &AnalysisResult, layer: Layer) -> String {
    match layer {
        Layer::Auth => format!(
            "<tr><th>Check</th><th>Result</th></tr>\n\
             <tr><td>SPF (Sender Policy Framework)</td><td>{}</td></tr>\n\
             <tr><td>DKIM (DomainKeys Identified Mail)</td><td>{}</td></tr>\n\
             <tr><td>DMARC (Domain Message Authentication)</td><td>{}</td></tr>",
            text_or_placeholder(result.spf_result.as_deref()),
            text_or_placeholder(result.dkim_result.as_deref()),
            text_or_placeholder(result.dmarc_result.as_deref()),
        ),
        Layer::Content => format!(
            "<tr><th>Factor</th><th>Detected</th></tr>\n\
             <tr><td>Urgency Language</td><td>{}</td></tr>\n\
             <tr><td>Credential Requests</td><td>{}</td></tr>\n\
             <tr><td>Brand Misuse</td><td>{}</td></tr>",
            yes_no(result.urgency_detected),
            yes_no(result.credential_request),
            yes_no(result.brand_misuse),
        ),
        Layer::Url => format!(
            "<tr><th>Metric</th><th>Value</th></tr>\n\
             <tr><td>URLs Found</td><td>{}</td></tr>\n\
             <tr><td>Suspicious URLs</td><td>{}</td></tr>",
            result.urls_found.len(),
            result.suspicious_urls.unwrap_or(0),
        ),
        Layer::Behavior => format!(
            "<tr><th>Behavior</th><th>Status</th></tr>\n\
             <tr><td>New Sender</td><td>{}</td></tr>\n\
             <tr><td>Unusual Timing</td><td>{}</td></tr>",
            yes_no(result.is_new_sender),
            yes_no(result.odd_timing),
        ),
        Layer::Sentiment => format!(
            "<tr><th>Analysis</th><th>Result</th></tr>\n\
             <tr><td>Pressure Tone</td><td>{}</td></tr>",
            yes_no(result.pressure_tone),
        ),
    }
}

fn layer_section(result: &AnalysisResult, layer: Layer, step: usize) -> String {
    let layer_safety = scoring::safety_score(result.layer_score(layer));
    // The per-layer band uses the same thresholds as the final verdict,
    // applied to the layer's own safety score.
    let band = scoring::classify_safety(layer_safety);

    format!(
        r#"        <div class="step">
            <div class="step-title">Step {step}: {label} Analysis</div>
            <table>
{evidence}
            </table>
            <div class="score-card {band_class}">{band_badge} {label} Score: {layer_safety:.1}/100</div>
            <p><strong>Analysis:</strong> {assessment}</p>
        </div>
"#,
        step = step,
        label = layer.label(),
        evidence = evidence_rows(result, layer),
        band_class = css_class(band),
        band_badge = badge_label(band),
        layer_safety = layer_safety,
        assessment = band_assessment(band),
    )
}

/// Restates the fixed weight table and the weighted-sum formula with this
/// result's actual numbers, plus the static band definitions.
fn decision_rule_block(result: &AnalysisResult, safety: f64) -> String {
    let mut terms = String::new();
    let mut formula = String::new();
    for (index, layer) in Layer::ALL.iter().enumerate() {
        let score = result.layer_score(*layer);
        let _ = write!(
            terms,
            "                <p>&bull; {}: risk {:.3} &times; weight {:.0}%</p>\n",
            layer.label(),
            score,
            scoring::weight(*layer) * 100.0
        );
        if index > 0 {
            formula.push_str(" + ");
        }
        let _ = write!(formula, "{:.3}&times;{:.2}", score, scoring::weight(*layer));
    }

    format!(
        r#"        <div class="step">
            <div class="step-title">Step 6: Final Decision Algorithm</div>
            <p><strong>Ensemble Method:</strong> the five layer scores are combined with fixed weights</p>
{terms}                <p><strong>Weighted risk:</strong> {formula} = {final_score:.3}</p>
                <p><strong>Final Safety Score: {safety:.1}/100</strong></p>
                <p><strong>Classification: {classification}</strong></p>
            <p><strong>Decision Logic:</strong></p>
            <ul>
                <li>Score 70-100: Safe</li>
                <li>Score 40-69: Suspicious</li>
                <li>Score 0-39: Phishing</li>
            </ul>
        </div>
"#,
        terms = terms,
        formula = formula,
        final_score = result.final_score,
        safety = safety,
        classification = result.classification,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{LayerExplanation, LayerScores};
    use chrono::Utc;
    use std::collections::HashMap;

    fn sample_result() -> AnalysisResult {
        let scores = LayerScores {
            auth: 0.3,
            content: 0.1,
            url: 0.0,
            behavior: 0.5,
            sentiment: 0.15,
        };
        let verdict = crate::scoring::classify(&scores).unwrap();

        let mut explanations = HashMap::new();
        for layer in Layer::ALL {
            explanations.insert(
                layer,
                LayerExplanation {
                    score: scores.get(layer),
                    weight: crate::scoring::weight(layer),
                    reasons: if layer == Layer::Auth {
                        vec!["SPF=none".to_string(), "DKIM=fail".to_string()]
                    } else {
                        Vec::new()
                    },
                },
            );
        }

        AnalysisResult {
            auth_score: scores.auth,
            content_score: scores.content,
            url_score: scores.url,
            behavior_score: scores.behavior,
            sentiment_score: scores.sentiment,
            final_score: verdict.final_score,
            classification: verdict.classification,
            explanations,
            spf_result: Some("none".to_string()),
            dkim_result: Some("fail".to_string()),
            dmarc_result: None,
            urgency_detected: Some(false),
            credential_request: Some(false),
            brand_misuse: None,
            urls_found: vec!["https://example.com".to_string()],
            suspicious_urls: Some(0),
            is_new_sender: Some(true),
            odd_timing: Some(false),
            pressure_tone: Some(false),
            timestamp: None,
        }
    }

    fn fixed_render_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_report_is_deterministic() {
        let result = sample_result();
        let first = render_report(&result, fixed_render_time()).unwrap();
        let second = render_report(&result, fixed_render_time()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_report_contains_all_sections_in_order() {
        let result = sample_result();
        let html = render_report(&result, fixed_render_time()).unwrap();

        let markers = [
            "Email Security Analysis Report",
            "Safety Score:",
            "Explainability: Why this verdict",
            "Step 1: Authentication Analysis",
            "Step 2: Content Analysis",
            "Step 3: URL / Link Analysis",
            "Step 4: Sender Behavior Analysis",
            "Step 5: Sentiment & Tone Analysis",
            "Step 6: Final Decision Algorithm",
            "Generated by Email Guard AI Security System",
        ];
        let mut cursor = 0;
        for marker in markers {
            let position = html[cursor..]
                .find(marker)
                .unwrap_or_else(|| panic!("missing or out-of-order section: {marker}"));
            cursor += position;
        }
    }

    #[test]
    fn test_empty_reasons_render_placeholder() {
        let result = sample_result();
        let html = render_report(&result, fixed_render_time()).unwrap();
        // Four of the five layers fired no flags.
        assert_eq!(html.matches("No specific flags").count(), 4);
        assert!(html.contains("SPF=none; DKIM=fail"));
    }

    #[test]
    fn test_missing_explanation_fails_with_missing_field() {
        let mut result = sample_result();
        result.explanations.remove(&Layer::Sentiment);
        let err = render_report(&result, fixed_render_time()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingField(_)));
        assert!(err.to_string().contains("sentiment"));
    }

    #[test]
    fn test_missing_evidence_renders_placeholder_not_error() {
        let mut result = sample_result();
        result.spf_result = None;
        result.dkim_result = None;
        result.urgency_detected = None;
        result.pressure_tone = None;
        result.suspicious_urls = None;

        let html = render_report(&result, fixed_render_time()).unwrap();
        assert!(html.contains("Not Available"));
        assert!(html.contains("<td>Suspicious URLs</td><td>0</td>"));
    }

    #[test]
    fn test_verdict_block_formatting() {
        let result = sample_result();
        let safety = crate::scoring::safety_score(result.final_score);
        let html = render_report(&result, fixed_render_time()).unwrap();

        assert!(html.contains(&format!("Safety Score: <strong>{safety:.1}/100</strong>")));
        assert!(html.contains(interpretation(result.classification)));
        assert!(html.contains("Report generated: 2024-03-15 10:30:00"));
        // Analysis timestamp absent but still discoverable as a placeholder.
        assert!(html.contains("Analysis performed: Not Available"));
    }

    #[test]
    fn test_weights_render_as_whole_percentages() {
        let html = render_report(&sample_result(), fixed_render_time()).unwrap();
        for expected in ["<td>25%</td>", "<td>30%</td>", "<td>20%</td>", "<td>15%</td>", "<td>10%</td>"] {
            assert!(html.contains(expected), "missing weight cell {expected}");
        }
    }

    #[test]
    fn test_reasons_are_html_escaped() {
        let mut result = sample_result();
        result
            .explanations
            .get_mut(&Layer::Content)
            .unwrap()
            .reasons
            .push("<script>alert(1)</script>".to_string());

        let html = render_report(&result, fixed_render_time()).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_interpretation_table_is_exhaustive() {
        for classification in [
            Classification::Safe,
            Classification::Suspicious,
            Classification::Phishing,
        ] {
            assert!(!interpretation(classification).is_empty());
            assert!(!band_assessment(classification).is_empty());
            assert!(!badge_label(classification).is_empty());
        }
    }

    #[test]
    fn test_report_filename_convention() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(report_filename(date), "Email_Security_Report_2024-03-15.html");
    }

    #[test]
    fn test_json_export_round_trips() {
        let result = sample_result();
        let json = render_json(&result).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
