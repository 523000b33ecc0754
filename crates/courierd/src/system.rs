//! Built-in `system` service shipped with the daemon.
//!
//! `describe` answers from a snapshot taken at registration time, so the
//! service should be registered after every other service.

use serde::Serialize;
use serde_json::Value;

use courier::{HandlerError, JsonMethod, RegistryError, Server, ServiceDescription};

/// Identifier the service is registered under.
pub const SYSTEM_SERVICE: &str = "system";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ServiceSummary {
    service: String,
    methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Catalogue {
    services: Vec<ServiceSummary>,
}

const SYSTEM_METHODS: [&str; 3] = ["describe", "echo", "ping"];

fn catalogue(server: &Server) -> Catalogue {
    let mut services: Vec<ServiceSummary> = server
        .services()
        .into_iter()
        .map(|description| ServiceSummary {
            service: description.id().to_string(),
            methods: description
                .method_ids()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        })
        .collect();
    services.push(ServiceSummary {
        service: SYSTEM_SERVICE.to_owned(),
        methods: SYSTEM_METHODS.iter().map(|&method| method.to_owned()).collect(),
    });
    services.sort_by(|left, right| left.service.cmp(&right.service));
    Catalogue { services }
}

/// Registers the `system` service on `server`.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateService`] when a `system` service is
/// already registered.
pub fn register_system_service(server: &mut Server) -> Result<(), RegistryError> {
    let snapshot = catalogue(server);
    let description = ServiceDescription::builder(SYSTEM_SERVICE)?
        .method(
            "ping",
            JsonMethod::new(|_: Value| Ok::<_, HandlerError>("pong")),
        )?
        .method("echo", |payload: &[u8]| {
            Ok::<_, HandlerError>(payload.to_vec())
        })?
        .method(
            "describe",
            JsonMethod::new(move |_: Value| Ok::<_, HandlerError>(snapshot.clone())),
        )?
        .build();
    server.register_service(description)
}
