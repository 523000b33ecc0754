//! Values passed between the codec and the dispatcher.

use std::fmt;

use serde::Serialize;

use crate::ids::{EmptyIdentifier, MethodId, ServiceId};

/// Service and method a request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    service: ServiceId,
    method: MethodId,
}

impl Route {
    /// Builds a route from raw identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyIdentifier`] when either identifier is blank.
    pub fn new(
        service: impl Into<String>,
        method: impl Into<String>,
    ) -> Result<Self, EmptyIdentifier> {
        Ok(Self {
            service: ServiceId::new(service)?,
            method: MethodId::new(method)?,
        })
    }

    /// Builds a route from validated identifiers.
    #[must_use]
    pub fn from_ids(service: ServiceId, method: MethodId) -> Self {
        Self { service, method }
    }

    /// Target service.
    #[must_use]
    pub fn service(&self) -> &ServiceId {
        &self.service
    }

    /// Target method.
    #[must_use]
    pub fn method(&self) -> &MethodId {
        &self.method
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}", self.service, self.method)
    }
}

/// One decoded inbound frame: the routing triple.
///
/// Produced once per frame and consumed by a single handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    route: Route,
    payload: Vec<u8>,
}

impl Request {
    /// Pairs a route with its opaque payload.
    #[must_use]
    pub fn new(route: Route, payload: Vec<u8>) -> Self {
        Self { route, payload }
    }

    /// Target of the request.
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Opaque payload handed to the handler.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Splits the request into route and payload.
    #[must_use]
    pub fn into_parts(self) -> (Route, Vec<u8>) {
        (self.route, self.payload)
    }
}

/// Stage at which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The frame could not be decoded.
    Decode,
    /// No service is registered under the requested identifier.
    UnknownService,
    /// The service has no such method.
    UnknownMethod,
    /// The handler reported a business error.
    Handler,
}

impl FaultKind {
    /// Stable wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::UnknownService => "unknown_service",
            Self::UnknownMethod => "unknown_method",
            Self::Handler => "handler",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error reply carried back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    message: String,
}

impl Fault {
    /// Creates a fault with a human-readable message.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Stage that failed.
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Opaque result produced by the handler.
    Success(Vec<u8>),
    /// The request failed before or during handling.
    Failure(Fault),
}

/// One outbound reply.
///
/// The route is absent when the inbound frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    route: Option<Route>,
    outcome: Outcome,
}

impl Response {
    /// Successful reply for `route`.
    #[must_use]
    pub fn success(route: Route, result: Vec<u8>) -> Self {
        Self {
            route: Some(route),
            outcome: Outcome::Success(result),
        }
    }

    /// Failed reply, with the route when it is known.
    #[must_use]
    pub fn failure(route: Option<Route>, fault: Fault) -> Self {
        Self {
            route,
            outcome: Outcome::Failure(fault),
        }
    }

    /// Route the reply answers, if known.
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Success or failure payload.
    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns the fault for failed replies.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(fault) => Some(fault),
        }
    }
}
