//! JSONL file writer for a run's context log.
//!
//! A `Mutex<BufWriter<File>>` appended to under lock, flushed after every
//! write and on drop, with each line carrying its own `type` and
//! `timestamp` fields merged into the payload.

use conduct_application::ports::context_store::{ContextEntry, ContextStorePort};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub struct JsonlContextStore {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlContextStore {
    /// Create a store appending to `path`, creating parent directories and
    /// the file itself if needed. Returns `None` if the file can't be
    /// created — callers fall back to [`conduct_application::ports::context_store::NoContextStore`]
    /// in that case rather than fail the run over an unwritable log.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "could not create context log directory");
                return None;
            }
        }

        let file = match File::options().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open context log file");
                return None;
            }
        };

        Some(Self { writer: Mutex::new(BufWriter::new(file)), path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContextStorePort for JsonlContextStore {
    fn append(&self, entry: ContextEntry) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = if let serde_json::Value::Object(mut map) = entry.payload {
            map.insert("type".to_string(), serde_json::Value::String(entry.entry_type.to_string()));
            map.insert("timestamp".to_string(), serde_json::Value::String(timestamp));
            serde_json::Value::Object(map)
        } else {
            serde_json::json!({"type": entry.entry_type, "timestamp": timestamp, "data": entry.payload})
        };

        let Ok(line) = serde_json::to_string(&record) else { return };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }

    /// Re-reads the log from disk (flushing first, under lock, so a
    /// concurrent append from the same fan-out is never torn) and buckets
    /// each entry into global discoveries, decisions, or the named
    /// component's own history. Never mutates the file — read-back is
    /// strictly additive to the append-only log.
    fn context_for_prompt(&self, component_id: Option<&str>) -> String {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }

        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return String::new();
        };

        let mut global = Vec::new();
        let mut decisions = Vec::new();
        let mut component = Vec::new();

        for line in content.lines() {
            let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                continue;
            };
            let entry_type = value.get("type").and_then(|v| v.as_str()).unwrap_or("note");
            let line_component = value.get("component").and_then(|v| v.as_str());
            let rendered = format!("- [{entry_type}] {}", render_entry_body(&value));

            if entry_type == "decision" {
                decisions.push(rendered);
            } else if let (Some(cid), Some(target)) = (line_component, component_id) {
                if cid == target {
                    component.push(rendered);
                } else {
                    global.push(rendered);
                }
            } else {
                global.push(rendered);
            }
        }

        let mut sections = Vec::new();
        if !global.is_empty() {
            sections.push(format!("Global discoveries:\n{}", global.join("\n")));
        }
        if !decisions.is_empty() {
            sections.push(format!("Decisions:\n{}", decisions.join("\n")));
        }
        if let Some(cid) = component_id {
            if !component.is_empty() {
                sections.push(format!("Context for component '{cid}':\n{}", component.join("\n")));
            }
        }

        if sections.is_empty() {
            String::new()
        } else {
            format!("Context from Previous Work\n\n{}", sections.join("\n\n"))
        }
    }
}

/// Compact JSON rendering of one context entry, minus the bookkeeping
/// fields already surfaced by the bracketed type tag and section heading.
fn render_entry_body(value: &serde_json::Value) -> String {
    let mut object = value.as_object().cloned().unwrap_or_default();
    object.remove("type");
    object.remove("timestamp");
    object.remove("component");
    serde_json::to_string(&object).unwrap_or_default()
}

impl Drop for JsonlContextStore {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn appends_object_payloads_merged_with_type_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.jsonl");
        let store = JsonlContextStore::new(&path).unwrap();

        store.append(ContextEntry::new("implementation", serde_json::json!({"component": "auth"})));
        store.append(ContextEntry::new("validation", serde_json::json!({"issue_count": 2})));
        drop(store);

        let mut content = String::new();
        File::open(&path).unwrap().read_to_string(&mut content).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "implementation");
        assert_eq!(first["component"], "auth");
        assert!(first.get("timestamp").is_some());
    }

    #[test]
    fn appends_non_object_payload_under_data_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context2.jsonl");
        let store = JsonlContextStore::new(&path).unwrap();
        store.append(ContextEntry::new("note", serde_json::json!("just text")));
        drop(store);

        let mut content = String::new();
        File::open(&path).unwrap().read_to_string(&mut content).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["type"], "note");
        assert_eq!(value["data"], "just text");
    }

    #[test]
    fn context_for_prompt_buckets_global_decisions_and_component_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context3.jsonl");
        let store = JsonlContextStore::new(&path).unwrap();

        store.append(ContextEntry::new("discovery", serde_json::json!({"text": "repo uses sqlx"})));
        store.append(ContextEntry::new("decision", serde_json::json!({"text": "use quick mode"})));
        store.append(ContextEntry::new(
            "implementation",
            serde_json::json!({"component": "auth", "summary": "added login handler"}),
        ));
        store.append(ContextEntry::new(
            "implementation",
            serde_json::json!({"component": "billing", "summary": "added invoice model"}),
        ));

        let rendered = store.context_for_prompt(Some("auth"));
        assert!(rendered.contains("Global discoveries"));
        assert!(rendered.contains("repo uses sqlx"));
        assert!(rendered.contains("Decisions"));
        assert!(rendered.contains("use quick mode"));
        assert!(rendered.contains("Context for component 'auth'"));
        assert!(rendered.contains("added login handler"));
        // The billing component's entry is not "auth"'s own history, so it
        // folds into the global section instead of being dropped.
        assert!(rendered.contains("added invoice model"));
    }

    #[test]
    fn context_for_prompt_is_empty_for_fresh_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context4.jsonl");
        let store = JsonlContextStore::new(&path).unwrap();
        assert_eq!(store.context_for_prompt(None), "");
    }
}
