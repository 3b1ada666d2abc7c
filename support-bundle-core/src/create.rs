//! Bundle creation: ask the source server to start generating a support bundle.

use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::contract::{OptionsProvider, Transport, TransportRequest};
use crate::error::BundleError;
use crate::options::BundleParameters;

pub const SUPPORT_BUNDLE_ENDPOINT: &str = "api/system/support/bundle";

/// Opaque identifier of a bundle generation job on the source server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleId(String);

impl BundleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
pub struct CreationRequest {
    pub name: String,
    pub description: String,
    pub parameters: BundleParameters,
}

impl CreationRequest {
    pub fn new(case_number: &str, generated_on: &str, parameters: BundleParameters) -> Self {
        Self {
            name: format!("JFrog Support Case number {case_number}"),
            description: format!("Generated on {generated_on}"),
            parameters,
        }
    }
}

/// Body of a successful creation call.
#[derive(Debug)]
struct CreationResponse {
    id: String,
}

enum Field<'a> {
    Found(&'a str),
    Absent,
    WrongType,
}

impl CreationResponse {
    fn decode(body: &[u8]) -> Result<Self, BundleError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| BundleError::MalformedResponse(format!("body is not valid JSON: {e}")))?;
        let object = value.as_object().ok_or_else(|| {
            BundleError::MalformedResponse("body is not a JSON object".to_string())
        })?;
        let id = match object.get("id") {
            Some(Value::String(s)) => Field::Found(s),
            Some(_) => Field::WrongType,
            None => Field::Absent,
        };
        match id {
            Field::Found(id) => Ok(Self { id: id.to_string() }),
            Field::Absent => Err(BundleError::MalformedResponse(
                "property id not found".to_string(),
            )),
            Field::WrongType => Err(BundleError::MalformedResponse(
                "property id is not a string".to_string(),
            )),
        }
    }
}

/// Requests creation of a support bundle for `case_number` and returns its id.
///
/// Creation is a single synchronous call: anything but `200 OK` is final.
pub async fn create_bundle<T>(
    transport: &T,
    case_number: &str,
    now: &Clock,
    options: &dyn OptionsProvider,
) -> Result<BundleId, BundleError>
where
    T: Transport + ?Sized,
{
    info!(
        case_number,
        server = %transport.base_url(),
        "Creating support bundle"
    );
    let generated_on = now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    let request = CreationRequest::new(case_number, &generated_on, options.parameters());
    let payload = serde_json::to_vec(&request)
        .map_err(|e| BundleError::MalformedResponse(format!("unserializable request: {e}")))?;

    let response = transport
        .send(TransportRequest::post_json(SUPPORT_BUNDLE_ENDPOINT, payload))
        .await?;
    let status = response.status;
    let body = response.into_bytes().await?;
    debug!(%status, body = %String::from_utf8_lossy(&body), "Creation response");

    if status != StatusCode::OK {
        return Err(BundleError::UnexpectedStatus { status });
    }
    let decoded = CreationResponse::decode(&body)?;
    info!(bundle_id = %decoded.id, "Support bundle creation accepted");
    Ok(BundleId(decoded.id))
}
