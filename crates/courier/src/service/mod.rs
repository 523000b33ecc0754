//! Service descriptions and the registry that routes to them.
//!
//! A service is a named table of [`MethodHandler`]s. Business modules build a
//! [`ServiceDescription`] once at startup and hand it to the server, which
//! keeps every description in a [`ServiceRegistry`]:
//!
//! ```rust,ignore
//! let accounts = ServiceDescription::builder("accounts")?
//!     .method("balance", JsonMethod::new(balance))?
//!     .method("deposit", JsonMethod::new(deposit))?
//!     .build();
//! server.register_service(accounts)?;
//! ```

mod description;
mod errors;
mod handler;
mod registry;

pub use self::description::{ServiceBuilder, ServiceDescription};
pub use self::errors::RegistryError;
#[cfg(test)]
pub(crate) use self::handler::MockMethodHandler;
pub use self::handler::{HandlerError, JsonMethod, MethodHandler};
pub use self::registry::ServiceRegistry;
