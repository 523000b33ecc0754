//! Routing identifiers for services and their methods.

use std::borrow::Borrow;
use std::fmt;

use thiserror::Error;

/// Raised when an identifier is empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} identifier must not be empty")]
pub struct EmptyIdentifier {
    kind: &'static str,
}

impl EmptyIdentifier {
    /// Which identifier was rejected (`service` or `method`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Builds an identifier, rejecting empty or whitespace-only values.
            ///
            /// Identifiers compare exactly; no case folding or trimming is
            /// applied to accepted values.
            pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdentifier> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(EmptyIdentifier { kind: $kind });
                }
                Ok(Self(value))
            }

            /// Returns the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

identifier!(
    /// Identifies a registered service within one server.
    ServiceId,
    "service"
);

identifier!(
    /// Identifies a method within one service description.
    MethodId,
    "method"
);
