use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

pub const STORY_START: &str = "story_start";
pub const STORY_UPDATE: &str = "story_update";
pub const CONTEXT: &str = "context";
pub const IMAGE: &str = "image";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// One selectable branch. The backend sends either `{"text": ...}` or a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChoiceRepr")]
pub struct Choice {
    pub text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChoiceRepr {
    Bare(String),
    Object { text: String },
}

impl From<ChoiceRepr> for Choice {
    fn from(value: ChoiceRepr) -> Self {
        match value {
            ChoiceRepr::Bare(text) | ChoiceRepr::Object { text } => Self { text },
        }
    }
}

/// Payload shared by `story_start` and `story_update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub choices: Vec<Choice>,
}

impl ScenePayload {
    pub fn character(&self) -> Option<&str> {
        non_empty(&self.character_name)
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(&self.scene_description)
    }

    pub fn dialog(&self) -> Option<&str> {
        non_empty(&self.dialog)
    }

    pub fn choice_texts(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.text.clone()).collect()
    }
}

/// Age as the backend reports it: whole years, any other number, or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Age {
    Years(u64),
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Years(years) => write!(f, "{years}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A character entry. The backend sends either an object or a preformatted
/// display string, which is kept as the name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SheetRepr")]
pub struct CharacterSheet {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<Age>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SheetRepr {
    Display(String),
    Fields {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        gender: Option<String>,
        #[serde(default)]
        age: Option<Age>,
    },
}

impl From<SheetRepr> for CharacterSheet {
    fn from(value: SheetRepr) -> Self {
        match value {
            SheetRepr::Display(name) => Self {
                name: Some(name),
                ..Self::default()
            },
            SheetRepr::Fields { name, gender, age } => Self { name, gender, age },
        }
    }
}

impl CharacterSheet {
    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }

    pub fn gender(&self) -> Option<&str> {
        non_empty(&self.gender)
    }

    pub fn age(&self) -> Option<String> {
        self.age
            .as_ref()
            .map(ToString::to_string)
            .filter(|age| !age.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentState {
    #[serde(default, alias = "location")]
    pub current_location: Option<String>,
    #[serde(default, alias = "scene")]
    pub current_scene: Option<String>,
    #[serde(default, alias = "goal")]
    pub current_goal: Option<String>,
}

impl CurrentState {
    pub fn location(&self) -> Option<&str> {
        non_empty(&self.current_location)
    }

    pub fn scene(&self) -> Option<&str> {
        non_empty(&self.current_scene)
    }

    pub fn goal(&self) -> Option<&str> {
        non_empty(&self.current_goal)
    }
}

/// Auxiliary story context. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPayload {
    #[serde(default)]
    pub character: Option<CharacterSheet>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub characters: Vec<CharacterSheet>,
    #[serde(default)]
    pub timeline: Option<Vec<String>>,
    #[serde(default)]
    pub current_state: Option<CurrentState>,
}

impl ContextPayload {
    /// The sheet to display: `character` when present, else the first of `characters`.
    pub fn sheet(&self) -> Option<&CharacterSheet> {
        self.character.as_ref().or_else(|| self.characters.first())
    }

    pub fn is_empty(&self) -> bool {
        self.sheet().is_none() && self.timeline.is_none() && self.current_state.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct IllustrationFrame {
    content: String,
    #[serde(default)]
    prompt: Option<String>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryEvent {
    SceneStart(ScenePayload),
    SceneUpdate(ScenePayload),
    ContextUpdate(ContextPayload),
    Illustration { url: String, prompt: Option<String> },
    ErrorNotice(String),
    /// A `type` this client does not know; carries the discriminant (empty when absent).
    Unrecognized(String),
}

impl StoryEvent {
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(raw).map_err(ProtocolError::Malformed)?;
        let Value::Object(mut frame) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = frame
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default();

        match kind.as_str() {
            STORY_START => Ok(Self::SceneStart(payload(&kind, frame.remove("data"))?)),
            STORY_UPDATE => Ok(Self::SceneUpdate(payload(&kind, frame.remove("data"))?)),
            CONTEXT => Ok(Self::ContextUpdate(payload(&kind, frame.remove("content"))?)),
            IMAGE => {
                let image: IllustrationFrame = serde_json::from_value(Value::Object(frame))
                    .map_err(|source| ProtocolError::invalid_payload(&kind, source))?;
                Ok(Self::Illustration {
                    url: image.content,
                    prompt: image.prompt.filter(|p| !p.is_empty()),
                })
            }
            _ => Ok(match frame.remove("error") {
                Some(Value::String(message)) if !message.is_empty() => Self::ErrorNotice(message),
                Some(Value::Null | Value::Bool(false)) | None => Self::Unrecognized(kind),
                Some(Value::String(_)) => Self::Unrecognized(kind),
                Some(other) => Self::ErrorNotice(other.to_string()),
            }),
        }
    }
}

fn payload<T>(kind: &str, value: Option<Value>) -> Result<T, ProtocolError>
where
    T: DeserializeOwned + Default,
{
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value).map_err(|source| ProtocolError::invalid_payload(kind, source))
        }
    }
}

/// Outbound user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    StartStory,
    Next {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_choice: Option<String>,
    },
}

impl ClientAction {
    pub fn next() -> Self {
        Self::Next {
            selected_choice: None,
        }
    }

    pub fn choose(text: impl Into<String>) -> Self {
        Self::Next {
            selected_choice: Some(text.into()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StartStory => "start_story",
            Self::Next {
                selected_choice: None,
            } => "next",
            Self::Next { .. } => "next_with_choice",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
