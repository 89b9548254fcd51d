use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// Esper device names look like `ABC-DEF-1234`.
static DEVICE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]{3,4}-[a-zA-Z0-9]{3,4}-[a-zA-Z0-9]{4}$").unwrap());
static PACKAGE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z\d_]*\.)+[a-zA-Z][a-zA-Z\d_]*$").unwrap());
static BUILD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9][0-9]*$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Payload is missing device ID, or the device ID is malformed")]
    DeviceId,
    #[error("Payload is missing package name, or the package name is malformed")]
    PackageName,
    #[error("Payload is missing build number, or the build number is malformed")]
    BuildNumber,
}

/// Body as posted by the caller. Fields stay untyped so a wrong JSON type is
/// reported the same way as a missing field.
#[derive(Debug, Default, Deserialize)]
pub struct RawRequest {
    pub device_id: Option<Value>,
    pub pkg: Option<Value>,
    pub build_number: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub device_id: String,
    pub pkg: String,
    pub build_number: u64,
}

impl TryFrom<RawRequest> for UpdateRequest {
    type Error = ValidationError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        let device_id = device_id(raw.device_id.as_ref()).ok_or(ValidationError::DeviceId)?;
        let pkg = package_name(raw.pkg.as_ref()).ok_or(ValidationError::PackageName)?;
        let build_number =
            build_number(raw.build_number.as_ref()).ok_or(ValidationError::BuildNumber)?;

        Ok(UpdateRequest {
            device_id,
            pkg,
            build_number,
        })
    }
}

fn device_id(value: Option<&Value>) -> Option<String> {
    let device_id = value?.as_str()?;
    DEVICE_ID_RE.is_match(device_id).then(|| device_id.to_string())
}

fn package_name(value: Option<&Value>) -> Option<String> {
    let pkg = value?.as_str()?;
    PACKAGE_NAME_RE.is_match(pkg).then(|| pkg.to_string())
}

/// Accepts `"42"` as well as `42`. Zero, signs, leading zeros and values that
/// overflow `u64` are rejected.
fn build_number(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(text) if BUILD_NUMBER_RE.is_match(text) => text.parse().ok(),
        Value::Number(number) => number.as_u64().filter(|n| *n > 0),
        _ => None,
    }
}
