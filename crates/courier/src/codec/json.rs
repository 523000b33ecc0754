//! JSON codec: one JSON object per frame.
//!
//! Requests name their target and carry an arbitrary JSON payload:
//!
//! ```json
//! {"service":"system","method":"echo","payload":{"text":"hi"}}
//! ```
//!
//! Replies echo the route and carry either the handler's JSON result or a
//! tagged error:
//!
//! ```json
//! {"service":"system","method":"echo","status":"ok","result":{"text":"hi"}}
//! {"service":"system","method":"nope","status":"error","error":{"kind":"unknown_method","message":"unknown method 'nope' for service 'system'"}}
//! ```
//!
//! Decode failures have no route, so their replies omit `service` and
//! `method`. Only the object form is accepted; a positional array such as
//! `["system","echo",5]` is an invalid request.

use std::fmt;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::{CodecError, FaultKind, Outcome, ProtocolCodec, Request, Response, Route};

const NULL_PAYLOAD: &[u8] = b"null";

/// Default codec speaking the JSON envelope described in the module docs.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates the codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug)]
struct WireRequest {
    service: String,
    method: String,
    payload: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "lowercase")]
enum WireField {
    Service,
    Method,
    Payload,
    #[serde(other)]
    Unknown,
}

impl<'de> Deserialize<'de> for WireRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(WireRequestVisitor)
    }
}

struct WireRequestVisitor;

impl<'de> Visitor<'de> for WireRequestVisitor {
    type Value = WireRequest;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a request object with service and method")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<WireRequest, M::Error> {
        let mut service = None;
        let mut method = None;
        let mut payload = None;
        while let Some(field) = map.next_key()? {
            match field {
                WireField::Service => set_once(&mut service, "service", map.next_value()?)?,
                WireField::Method => set_once(&mut method, "method", map.next_value()?)?,
                WireField::Payload => set_once(&mut payload, "payload", map.next_value()?)?,
                WireField::Unknown => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(WireRequest {
            service: service.ok_or_else(|| de::Error::missing_field("service"))?,
            method: method.ok_or_else(|| de::Error::missing_field("method"))?,
            payload: payload.flatten(),
        })
    }
}

fn set_once<T, E: de::Error>(slot: &mut Option<T>, name: &'static str, value: T) -> Result<(), E> {
    if slot.is_some() {
        return Err(E::duplicate_field(name));
    }
    *slot = Some(value);
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum WireStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize)]
struct WireFault<'a> {
    kind: FaultKind,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct WireResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    status: WireStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<WireFault<'a>>,
}

impl ProtocolCodec for JsonCodec {
    fn decode(&self, frame: &[u8]) -> Result<Request, CodecError> {
        let trimmed = frame.trim_ascii();
        if trimmed.is_empty() {
            return Err(CodecError::malformed("empty frame"));
        }

        let wire: WireRequest = serde_json::from_slice(trimmed).map_err(|error| {
            if error.is_data() {
                CodecError::invalid_structure(error.to_string())
            } else {
                CodecError::from_json_error(error)
            }
        })?;

        let route = Route::new(wire.service, wire.method)
            .map_err(|error| CodecError::invalid_structure(error.to_string()))?;
        let payload = wire.payload.map_or_else(
            || NULL_PAYLOAD.to_vec(),
            |raw| raw.get().as_bytes().to_vec(),
        );
        Ok(Request::new(route, payload))
    }

    fn encode(&self, response: &Response) -> Result<Vec<u8>, CodecError> {
        let route = response.route();
        let mut wire = WireResponse {
            service: route.map(|route| route.service().as_str()),
            method: route.map(|route| route.method().as_str()),
            status: WireStatus::Ok,
            result: None,
            error: None,
        };

        match response.outcome() {
            Outcome::Success(result) => {
                wire.result = Some(parse_result(result)?);
            }
            Outcome::Failure(fault) => {
                wire.status = WireStatus::Error;
                wire.error = Some(WireFault {
                    kind: fault.kind(),
                    message: fault.message(),
                });
            }
        }

        Ok(serde_json::to_vec(&wire)?)
    }
}

fn parse_result(result: &[u8]) -> Result<&RawValue, CodecError> {
    let text = std::str::from_utf8(result)
        .map_err(|error| CodecError::invalid_result(format!("result is not UTF-8: {error}")))?;
    serde_json::from_str(text)
        .map_err(|error| CodecError::invalid_result(format!("result is not JSON: {error}")))
}
