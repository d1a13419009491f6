//! Text presentation of tool outputs
//!
//! Turns the structured payload of a tool call into readable text blocks,
//! one paragraph per item. Used when the server runs with the `text` output
//! format; the structured payload stays the source of truth.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolOutput;

/// How tool payloads are written into `tools/call` content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Compact JSON of the normalized payload
    #[default]
    Structured,
    /// Human-readable text blocks
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structured" | "json" => Ok(Self::Structured),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown output format '{}' (expected structured or text)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Write an output in the requested format
pub fn format_output(tool: &str, output: &ToolOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Structured => output.payload().to_string(),
        OutputFormat::Text => render(tool, output),
    }
}

/// Render a tool output as text
pub fn render(tool: &str, output: &ToolOutput) -> String {
    match output {
        ToolOutput::Error(body) => render_error(body),
        ToolOutput::Success(body) => render_success(tool, body),
    }
}

/// Local `{error}` payloads render as their message; backend errors as
/// title, description and optional details.
pub fn render_error(body: &Value) -> String {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return format!("{}\n", message);
    }
    let mut out = String::from("Error details:\n\n");
    out.push_str(&line("Title", text(body, "title")));
    out.push_str(&line("Description", text(body, "description")));
    if let Some(details) = body.get("details").filter(|d| !d.is_null()) {
        let details = match details {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str(&line("Details", Some(details)));
    }
    out
}

fn render_success(tool: &str, body: &Value) -> String {
    match tool {
        "get_current_time" => format!(
            "Current time: {}, weekday: {}\n",
            text(body, "current_time").unwrap_or_default(),
            text(body, "weekday").unwrap_or_default()
        ),
        "get_calendar" => render_calendar(body.get("calendar")),
        "search_subjects" | "get_subjects" => render_page(body, subject_brief),
        "get_subject_info" => subject_detail(body),
        "get_subject_image" => format!(
            "![subject image ({})]({})\n",
            text(body, "type").unwrap_or_default(),
            text(body, "url").unwrap_or_default()
        ),
        "get_subject_persons" | "get_character_persons" => render_list(body.get("related_persons"), related_person),
        "get_subject_characters" | "get_person_characters" => {
            render_list(body.get("related_characters"), related_character)
        }
        "get_subject_relations" | "get_character_subjects" | "get_person_subjects" => {
            render_list(body.get("related_subjects"), related_subject)
        }
        "get_episodes" => render_page(body, episode),
        "get_episode_info" => episode(body),
        "search_characters" => render_page(body, character),
        "get_character_info" => character(body),
        "search_persons" => render_page(body, person),
        "get_person_info" => person(body),
        "get_user_info" | "get_me_info" => user(body),
        "get_user_collections" => render_page(body, subject_collection),
        "get_user_collection_info" => subject_collection(body),
        "get_my_episode_collections" => render_page(body, episode_collection),
        "get_my_episode_collection_info" => episode_collection(body),
        "get_user_character_collections" | "get_user_person_collections" => render_page(body, entity_collection),
        "get_user_character_collection_info" | "get_user_person_collection_info" => entity_collection(body),
        "post_character_collection" | "post_person_collection" => "Collected successfully.\n".to_string(),
        "delete_character_collection" | "delete_person_collection" => "Removed from collection.\n".to_string(),
        "post_my_collection" | "patch_my_collection" => "Subject collection saved.\n".to_string(),
        "patch_my_episode_collections" | "put_my_episode_collection_info" => {
            "Episode collection updated.\n".to_string()
        }
        _ => serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string()),
    }
}

// Layout helpers

fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn line(label: &str, value: Option<String>) -> String {
    value.map(|v| format!("{}: {}\n", label, v)).unwrap_or_default()
}

fn joined(value: &Value, key: &str) -> Option<String> {
    let items: Vec<String> = value
        .get(key)?
        .as_array()?
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => text(other, "name").unwrap_or_else(|| other.to_string()),
        })
        .collect();
    (!items.is_empty()).then(|| items.join(", "))
}

fn title(value: &Value) -> String {
    let name = text(value, "name").unwrap_or_else(|| "Unknown".to_string());
    match text(value, "name_cn") {
        Some(cn) if cn != name => format!("{} ({})", name, cn),
        _ => name,
    }
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|l| if l.is_empty() { "\n".to_string() } else { format!("  {}\n", l) })
        .collect()
}

fn render_list(items: Option<&Value>, item: fn(&Value) -> String) -> String {
    let items = items.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    let mut out = format!("{} items:\n\n", items.len());
    for entry in items {
        out.push_str(&item(entry));
        out.push('\n');
    }
    out
}

fn render_page(body: &Value, item: fn(&Value) -> String) -> String {
    let total = text(body, "total").unwrap_or_else(|| "N/A".to_string());
    let mut out = format!("Found {} results:\n\n", total);
    for entry in body.get("data").and_then(Value::as_array).into_iter().flatten() {
        out.push_str(&item(entry));
        out.push('\n');
    }
    out
}

fn render_calendar(days: Option<&Value>) -> String {
    let mut out = String::from("Weekly airing calendar:\n\n");
    for day in days.and_then(Value::as_array).into_iter().flatten() {
        let weekday = day.get("weekday").cloned().unwrap_or(Value::Null);
        let name = text(&weekday, "cn")
            .or_else(|| text(&weekday, "en"))
            .unwrap_or_else(|| "Unknown".to_string());
        let items = day.get("items").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        out.push_str(&format!("{} ({} titles):\n", name, items.len()));
        for item in items {
            out.push_str(&indent(&calendar_item(item)));
        }
        out.push('\n');
    }
    out
}

// Entity templates

fn calendar_item(item: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(item, "id").unwrap_or_default(), title(item));
    out.push_str(&line("Air date", text(item, "air_date")));
    if let Some(rating) = item.get("rating") {
        out.push_str(&line("Score", text(rating, "score")));
    }
    out
}

fn subject_brief(subject: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(subject, "id").unwrap_or_default(), title(subject));
    out.push_str(&line("Type", subject_type(subject.get("type"))));
    out.push_str(&line("Date", text(subject, "date")));
    if let Some(rating) = subject.get("rating") {
        out.push_str(&line("Score", text(rating, "score")));
        out.push_str(&line("Rank", text(rating, "rank")));
    }
    out
}

fn subject_detail(subject: &Value) -> String {
    let mut out = subject_brief(subject);
    out.push_str(&line("Platform", text(subject, "platform")));
    out.push_str(&line("Episodes", text(subject, "total_episodes").or_else(|| text(subject, "eps"))));
    out.push_str(&line("Volumes", text(subject, "volumes")));
    out.push_str(&line("Tags", joined(subject, "tags")));
    for entry in subject.get("infobox").and_then(Value::as_array).into_iter().flatten() {
        let value = match entry.get("value") {
            Some(Value::Array(parts)) => parts
                .iter()
                .filter_map(|p| text(p, "v"))
                .collect::<Vec<_>>()
                .join(", "),
            Some(Value::String(s)) => s.clone(),
            _ => continue,
        };
        out.push_str(&line(&text(entry, "key").unwrap_or_default(), Some(value)));
    }
    out.push_str(&line("Summary", text(subject, "summary")));
    out
}

fn subject_type(kind: Option<&Value>) -> Option<String> {
    let label = match kind?.as_i64()? {
        1 => "Book",
        2 => "Anime",
        3 => "Music",
        4 => "Game",
        6 => "Real",
        _ => return None,
    };
    Some(label.to_string())
}

fn related_person(p: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(p, "id").unwrap_or_default(), title(p));
    out.push_str(&line("Relation", text(p, "relation")));
    out.push_str(&line("Career", joined(p, "career")));
    out
}

fn related_character(c: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(c, "id").unwrap_or_default(), title(c));
    out.push_str(&line("Relation", text(c, "relation")));
    out.push_str(&line("Actors", joined(c, "actors")));
    out.push_str(&line("Subject", text(c, "subject_name_cn").or_else(|| text(c, "subject_name"))));
    out.push_str(&line("Staff", text(c, "staff")));
    out
}

fn related_subject(s: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(s, "id").unwrap_or_default(), title(s));
    out.push_str(&line("Type", subject_type(s.get("type"))));
    out.push_str(&line("Relation", text(s, "relation").or_else(|| text(s, "staff"))));
    out
}

fn episode(e: &Value) -> String {
    let mut out = format!(
        "[{}] Ep.{} {}\n",
        text(e, "id").unwrap_or_default(),
        text(e, "sort").or_else(|| text(e, "ep")).unwrap_or_default(),
        title(e)
    );
    out.push_str(&line("Air date", text(e, "airdate")));
    out.push_str(&line("Duration", text(e, "duration")));
    out.push_str(&line("Comments", text(e, "comment")));
    out.push_str(&line("Description", text(e, "desc")));
    out
}

fn character(c: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(c, "id").unwrap_or_default(), title(c));
    out.push_str(&line("Gender", text(c, "gender")));
    out.push_str(&line("Summary", text(c, "summary")));
    out
}

fn person(p: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(p, "id").unwrap_or_default(), title(p));
    out.push_str(&line("Career", joined(p, "career")));
    out.push_str(&line("Gender", text(p, "gender")));
    out.push_str(&line("Summary", text(p, "summary")));
    out
}

fn user(u: &Value) -> String {
    let mut out = format!(
        "{} (@{})\n",
        text(u, "nickname").unwrap_or_default(),
        text(u, "username").unwrap_or_default()
    );
    out.push_str(&line("ID", text(u, "id")));
    out.push_str(&line("Signature", text(u, "sign")));
    out
}

fn collection_type(kind: Option<&Value>) -> Option<String> {
    let label = match kind?.as_i64()? {
        1 => "Wish",
        2 => "Done",
        3 => "Doing",
        4 => "On hold",
        5 => "Dropped",
        _ => return None,
    };
    Some(label.to_string())
}

fn subject_collection(c: &Value) -> String {
    let subject = c.get("subject").cloned().unwrap_or(Value::Null);
    let mut out = format!("[{}] {}\n", text(c, "subject_id").unwrap_or_default(), title(&subject));
    out.push_str(&line("Status", collection_type(c.get("type"))));
    out.push_str(&line("Rating", text(c, "rate").filter(|r| r != "0")));
    out.push_str(&line("Progress", text(c, "ep_status").filter(|e| e != "0")));
    out.push_str(&line("Tags", joined(c, "tags")));
    out.push_str(&line("Comment", text(c, "comment")));
    out.push_str(&line("Updated", text(c, "updated_at")));
    out
}

fn episode_collection(c: &Value) -> String {
    let episode_value = c.get("episode").cloned().unwrap_or(Value::Null);
    let status = match c.get("type").and_then(Value::as_i64) {
        Some(0) => "Not collected",
        Some(1) => "Wish",
        Some(2) => "Done",
        Some(3) => "Dropped",
        _ => "Unknown",
    };
    format!("{}Status: {}\n", episode(&episode_value), status)
}

fn entity_collection(c: &Value) -> String {
    let mut out = format!("[{}] {}\n", text(c, "id").unwrap_or_default(), title(c));
    out.push_str(&line("Collected at", text(c, "created_at")));
    out
}
