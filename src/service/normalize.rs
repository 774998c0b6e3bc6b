//! Normalization of news webhook payloads.
//!
//! Two shapes arrive at the webhook: a flat object built by hand
//! (`content`, `title`, `author_name`, ...) and a Discord message relayed
//! more or less raw, sometimes through Zapier, which may JSON-encode nested
//! arrays and objects as strings. The payload is classified first and only
//! then read; any field with an unexpected shape is treated as absent.

use serde_json::{Map, Value};

use crate::models::NewNews;

const TITLE_MAX_CHARS: usize = 100;
const DISCORD_CDN: &str = "https://cdn.discordapp.com";
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];
const DISCORD_MARKERS: [&str; 4] = ["attachments", "embeds", "message_snapshots", "channel_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Simple,
    DiscordRelay,
}

pub fn classify(payload: &Map<String, Value>) -> PayloadShape {
    let author_is_object = object(payload.get("author")).is_some();
    if author_is_object || DISCORD_MARKERS.iter().any(|key| payload.contains_key(*key)) {
        PayloadShape::DiscordRelay
    } else {
        PayloadShape::Simple
    }
}

/// Normalizes any JSON value. Non-objects produce an empty row, which the
/// caller rejects for missing content.
pub fn normalize(payload: &Value) -> NewNews {
    let Value::Object(map) = payload else {
        return finish(NewNews::empty());
    };
    let news = match classify(map) {
        PayloadShape::Simple => from_simple(map),
        PayloadShape::DiscordRelay => from_discord(map),
    };
    finish(news)
}

impl NewNews {
    fn empty() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            author_name: None,
            author_avatar: None,
            image_url: None,
            discord_message_id: None,
        }
    }
}

fn from_simple(map: &Map<String, Value>) -> NewNews {
    NewNews {
        title: text(map.get("title")).unwrap_or_default(),
        content: text(map.get("content")).unwrap_or_default(),
        author_name: text(map.get("author_name")),
        author_avatar: text(map.get("author_avatar")),
        image_url: text(map.get("image_url")),
        discord_message_id: text(map.get("discord_message_id")).or_else(|| text(map.get("message_id"))),
    }
}

fn from_discord(map: &Map<String, Value>) -> NewNews {
    let author = object(map.get("author"));
    let snapshot = array(map.get("message_snapshots"))
        .into_iter()
        .find_map(|snap| object(snap.get("message")));

    let mut embeds = array(map.get("embeds"));
    let mut attachments = array(map.get("attachments"));
    if let Some(message) = &snapshot {
        embeds.extend(array(message.get("embeds")));
        attachments.extend(array(message.get("attachments")));
    }

    let content = text(map.get("content"))
        .or_else(|| snapshot.as_ref().and_then(|m| text(m.get("content"))))
        .or_else(|| embeds.iter().find_map(|e| text(e.get("description"))))
        .unwrap_or_default();

    let title = embeds
        .iter()
        .find_map(|e| text(e.get("title")))
        .or_else(|| text(map.get("title")))
        .unwrap_or_default();

    let author_name = author
        .as_ref()
        .and_then(|a| text(a.get("global_name")).or_else(|| text(a.get("username"))))
        .or_else(|| text(map.get("author_name")));

    let author_avatar = author
        .as_ref()
        .and_then(avatar_url)
        .or_else(|| text(map.get("author_avatar")));

    let image_url = attachments
        .iter()
        .filter_map(|a| object(Some(a)))
        .find(is_image_attachment)
        .and_then(|a| text(a.get("url")))
        .or_else(|| embeds.iter().find_map(embed_image))
        .or_else(|| text(map.get("image_url")));

    NewNews {
        title,
        content,
        author_name,
        author_avatar,
        image_url,
        discord_message_id: text(map.get("id")).or_else(|| text(map.get("discord_message_id"))),
    }
}

fn finish(mut news: NewNews) -> NewNews {
    if news.title.is_empty() {
        news.title = derive_title(&news.content);
    }
    news
}

/// First non-empty line of `content`, cut to at most 100 characters.
pub fn derive_title(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(TITLE_MAX_CHARS).collect())
        .unwrap_or_default()
}

fn avatar_url(author: &Map<String, Value>) -> Option<String> {
    let hash = text(author.get("avatar"))?;
    if hash.starts_with("http://") || hash.starts_with("https://") {
        return Some(hash);
    }
    let id = text(author.get("id"))?;
    Some(format!("{DISCORD_CDN}/avatars/{id}/{hash}.png"))
}

fn is_image_attachment(attachment: &Map<String, Value>) -> bool {
    if let Some(content_type) = text(attachment.get("content_type")) {
        return content_type.starts_with("image/");
    }
    text(attachment.get("filename"))
        .or_else(|| text(attachment.get("url")))
        .is_some_and(|name| has_image_extension(&name))
}

fn has_image_extension(name: &str) -> bool {
    let path = name.split(['?', '#']).next().unwrap_or(name);
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn embed_image(embed: &Value) -> Option<String> {
    ["image", "thumbnail"]
        .iter()
        .filter_map(|key| object(embed.get(*key)))
        .find_map(|media| text(media.get("url")))
}

// ── shape-tolerant accessors ─────────────────────────────────────────────────

/// A non-empty trimmed string; numbers are accepted for ids.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_owned),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An object given inline or JSON-encoded in a string.
fn object(value: Option<&Value>) -> Option<Map<String, Value>> {
    match value? {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => match serde_json::from_str(s) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

/// An array given inline or JSON-encoded; a lone object counts as one item.
fn array(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(item @ Value::Object(_)) => vec![item.clone()],
        Some(Value::String(s)) => match serde_json::from_str(s) {
            Ok(Value::Array(items)) => items,
            Ok(item @ Value::Object(_)) => vec![item],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
