//! Output Sink: formats the Enriched Answer the pipeline produces and
//! emits it to stdout and, optionally, an append-only file.
//! [`render_with_type`] / [`render_record_only`] are table-driven: the
//! per-type record accessor comes from `RecordSet::for_type`, iterated in
//! [`ALL_QUESTION_TYPES`] canonical order rather than a long conditional.

use std::io::{BufWriter, Write};

use tokio::sync::mpsc;

use crate::config::{Options, OutputFormat};
use crate::types::{EnrichedAnswer, ALL_QUESTION_TYPES};

#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub host: String,
    pub answer: EnrichedAnswer,
}

pub struct OutputSink {
    format: OutputFormat,
    file: Option<BufWriter<std::fs::File>>,
}

impl OutputSink {
    pub fn new(options: &Options) -> crate::error::Result<Self> {
        let file = match &options.output_file {
            Some(path) => {
                let f = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
                Some(BufWriter::new(f))
            }
            None => None,
        };
        Ok(Self { format: options.output_format, file })
    }

    /// Drains `rx` until every producer has closed it. The pipeline's
    /// top-level run awaits this before returning, so the sink always has
    /// a chance to flush the last batch of answers.
    pub async fn run(mut self, mut rx: mpsc::Receiver<OutputRecord>) {
        while let Some(record) = rx.recv().await {
            for line in render(&record, self.format) {
                self.emit_line(&line);
            }
        }
        if let Some(file) = &mut self.file {
            if let Err(e) = file.flush() {
                log::warn!("failed to flush output file: {e}");
            }
        }
    }

    fn emit_line(&mut self, line: &str) {
        println!("{line}");
        if let Some(file) = &mut self.file {
            if let Err(e) = writeln!(file, "{line}") {
                log::warn!("failed to write output file: {e}");
            }
        }
    }
}

/// `[CDN]`/`[ASN]` annotations appended to record-mode output lines.
fn annotation_suffix(answer: &EnrichedAnswer) -> String {
    let mut parts = Vec::new();
    if answer.is_cdn_ip {
        parts.push(format!("[{}]", answer.cdn_name.as_deref().unwrap_or("CDN")));
    }
    if let Some(asn) = &answer.asn {
        parts.push(format!("[AS{} {}, {}]", asn.as_number, asn.org, asn.country));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" {}", parts.join(" "))
    }
}

fn render(record: &OutputRecord, format: OutputFormat) -> Vec<String> {
    match format {
        OutputFormat::Json => vec![String::from_utf8_lossy(&record.answer.to_bytes()).into_owned()],
        OutputFormat::Raw => vec![record.answer.answer.raw.clone()],
        OutputFormat::WithType => render_with_type(record),
        OutputFormat::RecordOnly => render_record_only(record),
        OutputFormat::HostOnly => vec![format!("{}{}", record.host, annotation_suffix(&record.answer))],
        OutputFormat::ResponseCode => vec![format!("{} [{}]", record.host, record.answer.answer.response_code)],
    }
}

/// `-resp`: `host [TYPE] [record] [CDN] [ASN]`.
fn render_with_type(record: &OutputRecord) -> Vec<String> {
    let suffix = annotation_suffix(&record.answer);
    ALL_QUESTION_TYPES
        .into_iter()
        .flat_map(|t| record.answer.answer.records.for_type(t).into_iter().map(move |v| (t, v)))
        .map(|(t, value)| format!("{} [{}] [{}]{}", record.host, t, value, suffix))
        .collect()
}

/// `-resp-only`: `record [CDN] [ASN]`.
fn render_record_only(record: &OutputRecord) -> Vec<String> {
    let suffix = annotation_suffix(&record.answer);
    ALL_QUESTION_TYPES
        .into_iter()
        .flat_map(|t| record.answer.answer.records.for_type(t))
        .map(|value| format!("{value}{suffix}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Answer, RecordSet, ResponseCode};

    fn sample_answer(records: RecordSet) -> EnrichedAnswer {
        EnrichedAnswer::bare(Answer {
            host: "example.com".into(),
            timestamp: chrono::Utc::now(),
            response_code: ResponseCode::NoError,
            records,
            raw: "raw".into(),
            from_hosts_file: false,
        })
    }

    #[test]
    fn host_only_emits_once_regardless_of_record_count() {
        let mut records = RecordSet::default();
        records.a = vec!["1.1.1.1".into(), "2.2.2.2".into()];
        let record = OutputRecord { host: "example.com".into(), answer: sample_answer(records) };
        let lines = render(&record, OutputFormat::HostOnly);
        assert_eq!(lines, vec!["example.com".to_string()]);
    }

    #[test]
    fn with_type_emits_one_line_per_record() {
        let mut records = RecordSet::default();
        records.a = vec!["1.1.1.1".into(), "2.2.2.2".into()];
        let record = OutputRecord { host: "example.com".into(), answer: sample_answer(records) };
        let lines = render(&record, OutputFormat::WithType);
        assert_eq!(lines, vec!["example.com [A] [1.1.1.1]", "example.com [A] [2.2.2.2]"]);
    }

    #[test]
    fn cdn_and_asn_annotations_are_appended() {
        let mut answer = sample_answer(RecordSet::default());
        answer.is_cdn_ip = true;
        answer.cdn_name = Some("Cloudflare".to_string());
        let record = OutputRecord { host: "example.com".into(), answer };
        let lines = render(&record, OutputFormat::HostOnly);
        assert_eq!(lines, vec!["example.com [Cloudflare]".to_string()]);
    }

    #[test]
    fn response_code_mode_renders_textual_rcode() {
        let record = OutputRecord { host: "example.com".into(), answer: sample_answer(RecordSet::default()) };
        let lines = render(&record, OutputFormat::ResponseCode);
        assert_eq!(lines, vec!["example.com [NOERROR]"]);
    }
}
