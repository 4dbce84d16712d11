//! Resource ID parsing and formatting
//!
//! Every Azure resource is addressed by a hierarchical path such as
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{provider}/{type}/{name}`.
//! Each typed ID in this crate declares an ordered template of [`Segment`]s and
//! the shared [`Parser`] does the rest: case-sensitive and case-insensitive
//! parsing, formatting back to the canonical string and describing the ID in
//! error messages.
//!
//! # Module Structure
//!
//! - [`parser`] - segment-template parser shared by every typed ID
//! - [`common`] - IDs referenced by more than one service (subnets, identities, ...)
//! - [`generic`] - parsing and re-casing of arbitrary ARM IDs
//!
//! # Example
//!
//! ```ignore
//! use azurerm_provider::resourceids::{ResourceGroupId, ResourceId};
//!
//! let id = ResourceGroupId::parse("/subscriptions/0000/resourceGroups/example")?;
//! assert_eq!(id.resource_group_name, "example");
//! assert_eq!(id.id(), "/subscriptions/0000/resourceGroups/example");
//! ```

use thiserror::Error;

/// One component of a resource ID template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Fixed text such as `subscriptions` or `servers`
    Static { value: &'static str },
    /// Fixed resource provider namespace such as `Microsoft.KeyVault`
    ResourceProvider { value: &'static str },
    /// The subscription ID value
    SubscriptionId,
    /// The resource group name value
    ResourceGroup,
    /// Any other user supplied value
    UserSpecified {
        name: &'static str,
        example: &'static str,
    },
}

impl Segment {
    pub const fn fixed(value: &'static str) -> Self {
        Self::Static { value }
    }

    pub const fn provider(value: &'static str) -> Self {
        Self::ResourceProvider { value }
    }

    pub const fn subscription_id() -> Self {
        Self::SubscriptionId
    }

    pub const fn resource_group() -> Self {
        Self::ResourceGroup
    }

    pub const fn user(name: &'static str, example: &'static str) -> Self {
        Self::UserSpecified { name, example }
    }

    /// Key used for this segment in a [`ParseResult`]
    pub fn name(&self) -> &'static str {
        match *self {
            Self::Static { value } | Self::ResourceProvider { value } => value,
            Self::SubscriptionId => "subscriptionId",
            Self::ResourceGroup => "resourceGroupName",
            Self::UserSpecified { name, .. } => name,
        }
    }

    /// The canonical text for static segments, `None` for value segments
    pub fn fixed_value(&self) -> Option<&'static str> {
        match *self {
            Self::Static { value } | Self::ResourceProvider { value } => Some(value),
            _ => None,
        }
    }

    pub fn example(&self) -> &'static str {
        match *self {
            Self::Static { value } | Self::ResourceProvider { value } => value,
            Self::SubscriptionId => "12345678-1234-9876-4563-123456789012",
            Self::ResourceGroup => "example-resource-group",
            Self::UserSpecified { example, .. } => example,
        }
    }

    /// Human readable label, e.g. `resourceGroupName` -> `Resource Group Name`
    pub fn display_name(&self) -> String {
        if let Self::SubscriptionId = self {
            return "Subscription".to_string();
        }

        let mut out = String::new();
        for (i, c) in self.name().chars().enumerate() {
            if i == 0 {
                out.extend(c.to_uppercase());
            } else if c.is_ascii_uppercase() {
                out.push(' ');
                out.push(c);
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Errors raised while parsing a resource ID
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    #[error("parsing {id_type} ID {input:?}: the ID must begin with `/`")]
    MissingLeadingSlash { id_type: &'static str, input: String },

    #[error("parsing {id_type} ID {input:?}: the ID must not end with `/`")]
    TrailingSlash { id_type: &'static str, input: String },

    #[error("parsing {id_type} ID {input:?}: segment {position} is empty")]
    EmptySegment {
        id_type: &'static str,
        input: String,
        position: usize,
    },

    #[error("parsing {id_type} ID {input:?}: the segment {name:?} (e.g. {example:?}) is missing")]
    MissingSegment {
        id_type: &'static str,
        input: String,
        name: &'static str,
        example: &'static str,
    },

    #[error("parsing {id_type} ID {input:?}: expected {expected:?} at segment {position} but got {actual:?}")]
    UnexpectedSegment {
        id_type: &'static str,
        input: String,
        position: usize,
        expected: &'static str,
        actual: String,
    },

    #[error("parsing {id_type} ID {input:?}: unexpected trailing segments {extra:?}")]
    TooManySegments {
        id_type: &'static str,
        input: String,
        extra: String,
    },
}

/// A typed resource ID backed by a fixed segment template
pub trait ResourceId: Sized + std::fmt::Display {
    /// Short type name used in descriptions and errors, e.g. `Server`
    const ID_TYPE: &'static str;

    fn segments() -> &'static [Segment];

    fn from_parse_result(result: &ParseResult) -> Result<Self, ResourceIdError>;

    /// Values of the user-specified segments, in template order
    fn user_values(&self) -> Vec<&str>;

    /// Parse an ID whose static segments use the canonical casing
    fn parse(input: &str) -> Result<Self, ResourceIdError> {
        let result = Parser::new(Self::ID_TYPE, Self::segments()).parse(input, false)?;
        Self::from_parse_result(&result)
    }

    /// Parse an ID, accepting any casing of the static segments
    fn parse_insensitively(input: &str) -> Result<Self, ResourceIdError> {
        let result = Parser::new(Self::ID_TYPE, Self::segments()).parse(input, true)?;
        Self::from_parse_result(&result)
    }

    /// Format the ID back into its canonical string form
    fn id(&self) -> String {
        format_segments(Self::segments(), &self.user_values())
    }

    fn describe(&self) -> String {
        let values = self.user_values();
        let parts: Vec<String> = Self::segments()
            .iter()
            .filter(|s| s.fixed_value().is_none())
            .zip(values)
            .map(|(segment, value)| format!("{}: {:?}", segment.display_name(), value))
            .collect();
        format!("{} ({})", Self::ID_TYPE, parts.join(" / "))
    }

    /// An example ID built from the segment examples
    fn example() -> String {
        let values: Vec<&str> = Self::segments()
            .iter()
            .filter(|s| s.fixed_value().is_none())
            .map(|s| s.example())
            .collect();
        format_segments(Self::segments(), &values)
    }
}

/// Render a template with the given user values
pub fn format_segments(segments: &[Segment], values: &[&str]) -> String {
    let mut values = values.iter();
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        match segment.fixed_value() {
            Some(value) => out.push_str(value),
            None => out.push_str(values.next().copied().unwrap_or_default()),
        }
    }
    out
}

/// A template reference used where IDs are handled without knowing their type
#[derive(Debug, Clone, Copy)]
pub struct IdTemplate {
    pub id_type: &'static str,
    pub segments: &'static [Segment],
}

impl IdTemplate {
    pub fn of<T: ResourceId>() -> Self {
        Self {
            id_type: T::ID_TYPE,
            segments: T::segments(),
        }
    }
}

/// Declare a typed resource ID.
///
/// The struct fields map, in order, to the user-specified segments of the
/// template (subscription, resource group and user segments).
macro_rules! resource_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($id_type:literal) {
            $( $field:ident ),+ $(,)?
        }
        segments = $segments:expr;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis struct $name {
            $( pub $field: String, )+
        }

        impl $name {
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: impl Into<String> ),+) -> Self {
                Self {
                    $( $field: $field.into(), )+
                }
            }
        }

        impl $crate::resourceids::ResourceId for $name {
            const ID_TYPE: &'static str = $id_type;

            fn segments() -> &'static [$crate::resourceids::Segment] {
                const SEGMENTS: &[$crate::resourceids::Segment] = $segments;
                SEGMENTS
            }

            fn from_parse_result(
                result: &$crate::resourceids::ParseResult,
            ) -> Result<Self, $crate::resourceids::ResourceIdError> {
                let mut values = result.user_values(Self::segments())?.into_iter();
                Ok(Self {
                    $( $field: values.next().unwrap_or_default(), )+
                })
            }

            fn user_values(&self) -> Vec<&str> {
                vec![$( self.$field.as_str() ),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", $crate::resourceids::ResourceId::describe(self))
            }
        }
    };
}

pub(crate) use resource_id;

pub mod common;
pub mod generic;
pub mod parser;

pub use common::*;
pub use generic::{normalise_resource_id, parse_generic, GenericResourceId};
pub use parser::{ParseResult, Parser};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_splits_camel_case() {
        assert_eq!(Segment::resource_group().display_name(), "Resource Group Name");
        assert_eq!(Segment::subscription_id().display_name(), "Subscription");
        assert_eq!(
            Segment::user("videoAnalyzerName", "analyzer1").display_name(),
            "Video Analyzer Name"
        );
    }

    #[test]
    fn test_format_segments() {
        let segments = [
            Segment::fixed("subscriptions"),
            Segment::subscription_id(),
            Segment::fixed("resourceGroups"),
            Segment::resource_group(),
        ];
        assert_eq!(
            format_segments(&segments, &["sub", "rg"]),
            "/subscriptions/sub/resourceGroups/rg"
        );
    }

    #[test]
    fn test_describe_lists_user_segments() {
        let id = ResourceGroupId::new("sub", "rg");
        assert_eq!(
            id.to_string(),
            "Resource Group (Subscription: \"sub\" / Resource Group Name: \"rg\")"
        );
    }
}
