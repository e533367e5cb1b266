use std::fmt::Write as _;

use serde_json::{Map as JsonMap, Value as JsonValue};
use shelter_core::core_api::{Capabilities, CapabilityIssue, Session, Summary};
use shelter_core::diagnostics::{HeaderReading, Probe};
use shelter_core::{Analysis, FailureReport, MethodAttempt};

const LABEL_WIDTH: usize = 20;
const METHOD_WIDTH: usize = 15;
const KEYS_PER_LINE: usize = 4;
const PREVIEW_TEXT_CHARS: usize = 200;

pub fn render_summary_json(session: &Session) -> JsonValue {
    let summary = session.summary();
    let mut out = summary_json(&summary);
    out.insert(
        "capabilities".to_string(),
        capabilities_to_json(&session.capabilities()),
    );
    JsonValue::Object(out)
}

pub fn render_summary_text(session: &Session) -> String {
    let summary = session.summary();
    let capabilities = session.capabilities();
    let mut out = String::new();

    writeln!(&mut out, " ::: Save :::").expect("writing to String cannot fail");
    write_field(&mut out, "Format", summary.method.tag());
    write_field(&mut out, "Payload", &format!("{} bytes", summary.payload_len));
    write_field(
        &mut out,
        "Upgrade on save",
        if summary.upgrades_on_save {
            "yes (rewritten as aes-cbc)"
        } else {
            "no"
        },
    );
    for issue in &capabilities.issues {
        write_field(&mut out, "Note", issue_description(*issue));
    }
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(
        &mut out,
        " ::: Top-level keys ({}) :::",
        summary.top_level_keys.len()
    )
    .expect("writing to String cannot fail");
    if summary.top_level_keys.is_empty() {
        writeln!(&mut out, "   none").expect("writing to String cannot fail");
    }
    for row in summary.top_level_keys.chunks(KEYS_PER_LINE) {
        writeln!(&mut out, "   {}", row.join(", ")).expect("writing to String cannot fail");
    }

    out
}

pub fn render_failure_json(report: &FailureReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "error".to_string(),
        JsonValue::String("decode_exhausted".to_string()),
    );
    out.insert(
        "payload_len".to_string(),
        JsonValue::from(report.payload_len),
    );
    out.insert("entropy".to_string(), entropy_to_json(report.entropy));
    out.insert(
        "likely_encrypted".to_string(),
        JsonValue::Bool(report.likely_encrypted),
    );
    out.insert(
        "hex_preview".to_string(),
        JsonValue::String(report.hex_preview.clone()),
    );
    out.insert(
        "attempts".to_string(),
        JsonValue::Array(report.attempts.iter().map(attempt_to_json).collect()),
    );
    JsonValue::Object(out)
}

pub fn render_failure_text(report: &FailureReport) -> String {
    let mut out = String::new();

    writeln!(&mut out, "No decoder accepted the save payload.")
        .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");
    write_field(&mut out, "Payload", &format!("{} bytes", report.payload_len));
    write_field(&mut out, "Entropy", &format!("{:.2} bits/byte", report.entropy));
    write_field(
        &mut out,
        "Likely encrypted",
        yes_no(report.likely_encrypted),
    );
    write_field(&mut out, "Hex preview", &report.hex_preview);
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(&mut out, " ::: Attempts :::").expect("writing to String cannot fail");
    for attempt in &report.attempts {
        let status = if attempt.skipped { "skipped" } else { "failed" };
        writeln!(
            &mut out,
            "   {:<w$}{status}: {}",
            attempt.method.tag(),
            attempt.error,
            w = METHOD_WIDTH
        )
        .expect("writing to String cannot fail");
    }

    out
}

pub fn render_analysis_json(analysis: &Analysis) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("raw_size".to_string(), JsonValue::from(analysis.raw_size));
    out.insert(
        "raw_preview".to_string(),
        JsonValue::String(analysis.raw_preview.clone()),
    );
    out.insert(
        "base64_decoded".to_string(),
        JsonValue::Bool(analysis.base64_decoded),
    );
    out.insert(
        "base64_error".to_string(),
        option_string(analysis.base64_error.as_deref()),
    );
    out.insert(
        "decoded_size".to_string(),
        analysis
            .decoded_size
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
    );
    out.insert(
        "decoded_preview".to_string(),
        option_string(analysis.decoded_preview.as_deref()),
    );
    out.insert(
        "probes".to_string(),
        JsonValue::Array(analysis.probes.iter().map(probe_to_json).collect()),
    );
    out.insert(
        "raw_deflate".to_string(),
        analysis
            .raw_deflate
            .as_ref()
            .map(probe_to_json)
            .unwrap_or(JsonValue::Null),
    );
    out.insert(
        "length_header".to_string(),
        analysis
            .length_header
            .as_ref()
            .map(header_to_json)
            .unwrap_or(JsonValue::Null),
    );
    out.insert(
        "text_preview".to_string(),
        option_string(analysis.text_preview.as_deref()),
    );
    out.insert(
        "entropy".to_string(),
        analysis
            .entropy
            .map(entropy_to_json)
            .unwrap_or(JsonValue::Null),
    );
    out.insert(
        "likely_encrypted".to_string(),
        analysis
            .likely_encrypted
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null),
    );
    out.insert(
        "decoded_by".to_string(),
        option_string(analysis.decoded_by.map(|m| m.tag())),
    );
    out.insert(
        "top_level_keys".to_string(),
        string_array(&analysis.top_level_keys),
    );
    JsonValue::Object(out)
}

pub fn render_analysis_text(analysis: &Analysis) -> String {
    let mut out = String::new();

    writeln!(&mut out, " ::: File :::").expect("writing to String cannot fail");
    write_field(&mut out, "Raw size", &format!("{} bytes", analysis.raw_size));
    write_field(&mut out, "Raw preview", &analysis.raw_preview);
    write_field(&mut out, "Base64 decoded", yes_no(analysis.base64_decoded));
    if let Some(error) = &analysis.base64_error {
        write_field(&mut out, "Base64 error", error);
    }
    if let Some(size) = analysis.decoded_size {
        write_field(&mut out, "Decoded size", &format!("{size} bytes"));
    }
    if let Some(preview) = &analysis.decoded_preview {
        write_field(&mut out, "Decoded preview", preview);
    }

    if !analysis.base64_decoded {
        return out;
    }

    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(&mut out, " ::: Decoders :::").expect("writing to String cannot fail");
    let probes = analysis.probes.iter().chain(analysis.raw_deflate.as_ref());
    for probe in probes {
        let result = match &probe.error {
            None => "ok".to_string(),
            Some(error) => format!("failed: {error}"),
        };
        writeln!(
            &mut out,
            "   {:<w$}{result}",
            probe.name,
            w = METHOD_WIDTH
        )
        .expect("writing to String cannot fail");
    }

    if let Some(header) = &analysis.length_header {
        writeln!(&mut out).expect("writing to String cannot fail");
        writeln!(&mut out, " ::: Length header :::").expect("writing to String cannot fail");
        write_field(
            &mut out,
            "Little-endian",
            &header_reading(header.le, header.le_plausible),
        );
        write_field(
            &mut out,
            "Big-endian",
            &header_reading(header.be, header.be_plausible),
        );
    }

    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(&mut out, " ::: Data :::").expect("writing to String cannot fail");
    if let Some(entropy) = analysis.entropy {
        write_field(&mut out, "Entropy", &format!("{entropy:.2} bits/byte"));
    }
    if let Some(likely) = analysis.likely_encrypted {
        write_field(&mut out, "Likely encrypted", yes_no(likely));
    }
    write_field(
        &mut out,
        "Decoded by",
        analysis.decoded_by.map(|m| m.tag()).unwrap_or("nothing"),
    );
    if !analysis.top_level_keys.is_empty() {
        write_field(&mut out, "Top-level keys", &analysis.top_level_keys.join(", "));
    }
    if let Some(text) = &analysis.text_preview {
        write_field(&mut out, "Text preview", &truncate_chars(text, PREVIEW_TEXT_CHARS));
    }

    out
}

fn summary_json(summary: &Summary) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert(
        "method".to_string(),
        JsonValue::String(summary.method.tag().to_string()),
    );
    out.insert(
        "payload_len".to_string(),
        JsonValue::from(summary.payload_len),
    );
    out.insert(
        "top_level_keys".to_string(),
        string_array(&summary.top_level_keys),
    );
    out.insert(
        "upgrades_on_save".to_string(),
        JsonValue::Bool(summary.upgrades_on_save),
    );
    out
}

fn capabilities_to_json(capabilities: &Capabilities) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "preserves_format".to_string(),
        JsonValue::Bool(capabilities.preserves_format),
    );
    m.insert(
        "issues".to_string(),
        JsonValue::Array(
            capabilities
                .issues
                .iter()
                .map(|issue| JsonValue::String(issue_tag(*issue).to_string()))
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn attempt_to_json(attempt: &MethodAttempt) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "method".to_string(),
        JsonValue::String(attempt.method.tag().to_string()),
    );
    m.insert("skipped".to_string(), JsonValue::Bool(attempt.skipped));
    m.insert(
        "error".to_string(),
        JsonValue::String(attempt.error.to_string()),
    );
    JsonValue::Object(m)
}

fn probe_to_json(probe: &Probe) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("name".to_string(), JsonValue::String(probe.name.clone()));
    m.insert("ok".to_string(), JsonValue::Bool(probe.ok));
    m.insert("error".to_string(), option_string(probe.error.as_deref()));
    JsonValue::Object(m)
}

fn header_to_json(header: &HeaderReading) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("le".to_string(), JsonValue::from(header.le));
    m.insert("be".to_string(), JsonValue::from(header.be));
    m.insert(
        "le_plausible".to_string(),
        JsonValue::Bool(header.le_plausible),
    );
    m.insert(
        "be_plausible".to_string(),
        JsonValue::Bool(header.be_plausible),
    );
    JsonValue::Object(m)
}

// Two decimals, matching the text output.
fn entropy_to_json(entropy: f64) -> JsonValue {
    JsonValue::from((entropy * 100.0).round() / 100.0)
}

fn option_string(value: Option<&str>) -> JsonValue {
    match value {
        Some(v) => JsonValue::String(v.to_string()),
        None => JsonValue::Null,
    }
}

fn string_array(values: &[String]) -> JsonValue {
    JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect())
}

fn issue_tag(issue: CapabilityIssue) -> &'static str {
    match issue {
        CapabilityIssue::FormatUpgradeOnSave => "format_upgrade_on_save",
        CapabilityIssue::NonObjectRoot => "non_object_root",
    }
}

fn issue_description(issue: CapabilityIssue) -> &'static str {
    match issue {
        CapabilityIssue::FormatUpgradeOnSave => "legacy format, saving writes aes-cbc",
        CapabilityIssue::NonObjectRoot => "document root is not an object",
    }
}

fn header_reading(value: u32, plausible: bool) -> String {
    if plausible {
        format!("{value} (plausible)")
    } else {
        format!("{value}")
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn write_field(out: &mut String, label: &str, value: &str) {
    let label = format!("{label}:");
    writeln!(out, " {label:<w$}{value}", w = LABEL_WIDTH).expect("writing to String cannot fail");
}

fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_marks_cut_text() {
        assert_eq!(truncate_chars("abcdef", 10), "abcdef");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }

    #[test]
    fn entropy_json_is_rounded() {
        assert_eq!(entropy_to_json(7.98765), JsonValue::from(7.99));
        assert_eq!(entropy_to_json(0.0), JsonValue::from(0.0));
    }

    #[test]
    fn field_values_start_in_one_column() {
        let mut out = String::new();
        write_field(&mut out, "Format", "aes-cbc");
        write_field(&mut out, "Likely encrypted", "no");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(&lines[0][LABEL_WIDTH + 1..], "aes-cbc");
        assert_eq!(&lines[1][LABEL_WIDTH + 1..], "no");
    }
}
