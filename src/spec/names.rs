//! Strategy and type names used in specification documents.
//!
//! Each name set is closed, with an `Unknown` variant holding whatever text
//! the document contained. Unknown names load fine and select the no-op
//! behaviour of the component that interprets them.

use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use std::borrow::Cow;

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Name not recognised; handled as a no-op
            Unknown(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Unknown(other) => other.as_str(),
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Unknown(_))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Unknown(s),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name::from(s.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl JsonSchema for $name {
            fn schema_name() -> Cow<'static, str> {
                Cow::Borrowed(stringify!($name))
            }

            fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
                json_schema!({
                    "type": "string",
                    "examples": [$($text),+]
                })
            }
        }
    };
}

named_enum! {
    /// Row-selection strategy for a table
    SubsetStrategy {
        /// Every row
        All => "all",
        /// Bounded, optionally time-windowed, ordered sample
        Sample => "sample",
        /// Rows referencing already-selected parent rows
        FkClosure => "fk_closure",
    }
}

named_enum! {
    /// Per-column transform strategy
    ColumnStrategy {
        Keep => "keep",
        Mask => "mask",
        Synthesize => "synthesize",
    }
}

named_enum! {
    /// Masking transform applied to a column
    MaskType {
        Username => "username",
        NumericNoise => "numeric_noise",
        CategoryMap => "category_map",
    }
}

named_enum! {
    /// Synthetic value generator for a column
    SynthType {
        Email => "email",
        PasswordHash => "password_hash",
        Address => "address",
        CreditCard => "credit_card",
    }
}

impl Default for MaskType {
    fn default() -> Self {
        MaskType::Unknown(String::new())
    }
}

impl Default for SynthType {
    fn default() -> Self {
        SynthType::Unknown(String::new())
    }
}
