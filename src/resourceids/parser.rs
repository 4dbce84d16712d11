//! Segment-template parser shared by every typed resource ID

use super::{ResourceIdError, Segment};
use std::collections::HashMap;

/// Parses resource ID strings against a fixed template
pub struct Parser {
    id_type: &'static str,
    segments: &'static [Segment],
}

/// Values extracted from a resource ID, keyed by segment name
#[derive(Debug, Clone)]
pub struct ParseResult {
    id_type: &'static str,
    input: String,
    values: HashMap<&'static str, String>,
}

impl Parser {
    pub fn new(id_type: &'static str, segments: &'static [Segment]) -> Self {
        Self { id_type, segments }
    }

    /// Parse `input` against the template.
    ///
    /// Static segments must match their canonical text exactly unless
    /// `insensitively` is set, in which case any casing is accepted and the
    /// canonical text is recorded. The first mismatch wins.
    pub fn parse(&self, input: &str, insensitively: bool) -> Result<ParseResult, ResourceIdError> {
        let Some(path) = input.strip_prefix('/') else {
            return Err(ResourceIdError::MissingLeadingSlash {
                id_type: self.id_type,
                input: input.to_string(),
            });
        };

        if path.ends_with('/') {
            return Err(ResourceIdError::TrailingSlash {
                id_type: self.id_type,
                input: input.to_string(),
            });
        }

        let components: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };

        let mut values = HashMap::with_capacity(self.segments.len());

        for (position, segment) in self.segments.iter().enumerate() {
            let Some(component) = components.get(position) else {
                return Err(ResourceIdError::MissingSegment {
                    id_type: self.id_type,
                    input: input.to_string(),
                    name: segment.name(),
                    example: segment.example(),
                });
            };

            if component.is_empty() {
                return Err(ResourceIdError::EmptySegment {
                    id_type: self.id_type,
                    input: input.to_string(),
                    position,
                });
            }

            match segment.fixed_value() {
                Some(expected) => {
                    let matches = if insensitively {
                        component.eq_ignore_ascii_case(expected)
                    } else {
                        *component == expected
                    };
                    if !matches {
                        return Err(ResourceIdError::UnexpectedSegment {
                            id_type: self.id_type,
                            input: input.to_string(),
                            position,
                            expected,
                            actual: component.to_string(),
                        });
                    }
                    values.insert(segment.name(), expected.to_string());
                }
                None => {
                    values.insert(segment.name(), component.to_string());
                }
            }
        }

        if components.len() > self.segments.len() {
            return Err(ResourceIdError::TooManySegments {
                id_type: self.id_type,
                input: input.to_string(),
                extra: components[self.segments.len()..].join("/"),
            });
        }

        Ok(ParseResult {
            id_type: self.id_type,
            input: input.to_string(),
            values,
        })
    }
}

impl ParseResult {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Values of the non-static segments of `segments`, in order
    pub fn user_values(&self, segments: &[Segment]) -> Result<Vec<String>, ResourceIdError> {
        segments
            .iter()
            .filter(|s| s.fixed_value().is_none())
            .map(|segment| {
                self.get(segment.name())
                    .map(str::to_string)
                    .ok_or_else(|| ResourceIdError::MissingSegment {
                        id_type: self.id_type,
                        input: self.input.clone(),
                        name: segment.name(),
                        example: segment.example(),
                    })
            })
            .collect()
    }
}
