use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Envelope shared by every Esper list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    pub next: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub device_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub application_name: Option<String>,
    pub package_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppVersion {
    pub id: Uuid,
    #[serde(default, deserialize_with = "lenient_build_number")]
    pub build_number: Option<String>,
    pub version_code: Option<String>,
    pub created_on: Option<String>,
    pub release_comments: Option<String>,
}

/// Build numbers arrive as strings, but a single null or numeric entry must not
/// fail the whole listing.
fn lenient_build_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Device,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandName {
    Install,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandArgs {
    pub app_version: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    pub command_type: CommandType,
    pub devices: Vec<Uuid>,
    pub device_type: &'static str,
    pub command: CommandName,
    pub command_args: CommandArgs,
}

impl CommandRequest {
    pub fn install(device: Uuid, app_version: Uuid) -> Self {
        Self {
            command_type: CommandType::Device,
            devices: vec![device],
            device_type: "all",
            command: CommandName::Install,
            command_args: CommandArgs { app_version },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Command {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CommandState {
    Success,
    Failure,
    TimeOut,
    Cancelled,
    Pending(String),
}

impl From<String> for CommandState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "Command Success" => CommandState::Success,
            "Command Failure" => CommandState::Failure,
            "Command TimeOut" => CommandState::TimeOut,
            "Command Cancelled" => CommandState::Cancelled,
            _ => CommandState::Pending(state),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandStatus {
    pub state: CommandState,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}
