use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses a platform counter such as `"1732"` or `"1.2万"`
///
/// Only the first run of ASCII digits is taken; anything without digits is 0.
pub fn parse_count(text: &str) -> u64 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Deserializes a counter sent either as a string or as a number
pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => parse_count(&s),
        _ => 0,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteAuthor {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
}

/// Interaction counters shown on a note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct InteractInfo {
    #[serde(default, deserialize_with = "deserialize_count")]
    pub liked_count: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub collected_count: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub comment_count: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub share_count: u64,
}

#[derive(Debug, Deserialize)]
struct NoteCard {
    #[serde(default)]
    note_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    desc: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    user: NoteAuthor,
    #[serde(default)]
    interact_info: InteractInfo,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    last_update_time: Option<i64>,
}

/// A note as returned by the detail endpoint
///
/// The crawler never changes a note; `raw` keeps the full payload for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub note_id: String,
    pub title: String,
    pub desc: String,
    pub kind: String,
    pub author: NoteAuthor,
    pub interact: InteractInfo,
    pub time: Option<i64>,
    pub last_update_time: Option<i64>,
    pub raw: Value,
}

impl Note {
    /// Builds a note from a `note_card` object
    ///
    /// `requested_id` fills in the id when the card omits it.
    pub fn from_card(requested_id: &str, card: Value) -> Result<Self, String> {
        let parsed: NoteCard =
            serde_json::from_value(card.clone()).map_err(|e| format!("invalid note card: {}", e))?;
        Ok(Self {
            note_id: parsed
                .note_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| requested_id.to_string()),
            title: parsed.title,
            desc: parsed.desc,
            kind: parsed.kind,
            author: parsed.user,
            interact: parsed.interact_info,
            time: parsed.time,
            last_update_time: parsed.last_update_time,
            raw: card,
        })
    }
}
