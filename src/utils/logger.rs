use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use colored::Colorize;
use env_logger::Builder;
use log::kv::{self, Key, Source, Value, VisitSource};
use log::{Level, Record};
use std::io::Write;

use crate::engine::observe::push_field;

/// Output format of the log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

struct CollectFields(Vec<(String, String)>);

impl<'kvs> VisitSource<'kvs> for CollectFields {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
        self.0.push((key.to_string(), value.to_string()));
        Ok(())
    }
}

fn record_fields(record: &Record) -> Vec<(String, String)> {
    let mut fields = CollectFields(Vec::new());
    let _ = record.key_values().visit(&mut fields);
    fields.0
}

/// Record text followed by its ` key=value` fields.
fn text_message(record: &Record) -> String {
    let mut line = record.args().to_string();
    for (key, value) in record_fields(record) {
        push_field(&mut line, &key, &value);
    }
    line
}

/// Numbers and booleans keep their JSON type; everything else is a string.
fn json_value(raw: String) -> serde_json::Value {
    if let Ok(n) = raw.parse::<u64>() {
        return n.into();
    }
    if let Ok(b) = raw.parse::<bool>() {
        return b.into();
    }
    raw.into()
}

/// One JSON object: `time`, `level`, `target`, `msg`, then every record field as its own key.
fn json_line(record: &Record) -> serde_json::Value {
    let mut line = serde_json::Map::new();
    line.insert(
        "time".into(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true).into(),
    );
    line.insert("level".into(), record.level().as_str().into());
    line.insert("target".into(), record.target().into());
    line.insert("msg".into(), record.args().to_string().into());
    for (key, value) in record_fields(record) {
        line.insert(key, json_value(value));
    }
    serde_json::Value::Object(line)
}

pub fn setup_logging(verbose: bool, format: LogFormat) {
    use log::LevelFilter;

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = Builder::from_default_env();
    builder
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_CRATE_NAME"), level); // Our crate: use requested level

    match format {
        LogFormat::Text => builder.format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let path = record.target().to_string().white();
                    format!(
                        "[{} {} {}] {}",
                        name.cyan(),
                        level_str,
                        path,
                        text_message(record)
                    )
                }
                _ => format!("[{}] {}", name.cyan(), text_message(record)),
            };
            writeln!(buf, "{}", line)
        }),
        LogFormat::Json => builder.format(|buf, record| writeln!(buf, "{}", json_line(record))),
    };

    // A second call (e.g. lib caller already set a logger) keeps the first one.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: [(&str, &str); 3] = [
        ("cancelled", "false"),
        ("jobs_cleaned", "3"),
        ("project_path", "hey one"),
    ];

    #[test]
    fn json_line_lifts_fields_to_keys() {
        let kvs: &[(&str, &str)] = &FIELDS;
        let line = json_line(
            &Record::builder()
                .args(format_args!("ending project execution"))
                .level(Level::Info)
                .target("gitlab_sweeper::engine::observe")
                .key_values(&kvs)
                .build(),
        );
        assert_eq!(line["msg"], "ending project execution");
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["target"], "gitlab_sweeper::engine::observe");
        assert_eq!(line["jobs_cleaned"], 3);
        assert_eq!(line["cancelled"], false);
        assert_eq!(line["project_path"], "hey one");
        assert!(line["time"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn text_message_appends_fields() {
        let kvs: &[(&str, &str)] = &FIELDS;
        let text = text_message(
            &Record::builder()
                .args(format_args!("ending project execution"))
                .level(Level::Info)
                .key_values(&kvs)
                .build(),
        );
        assert_eq!(
            text,
            "ending project execution cancelled=false jobs_cleaned=3 project_path=\"hey one\""
        );
    }

    #[test]
    fn record_without_fields_is_plain() {
        let text = text_message(
            &Record::builder()
                .args(format_args!("artifacts cleanup finished"))
                .level(Level::Info)
                .build(),
        );
        assert_eq!(text, "artifacts cleanup finished");
    }
}
