//! Classifies fcsh's free-text error and warning messages into typed problems.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Location, Member, TypeName};

/// Pre-compiled message patterns, tried top-down; first match wins.
struct Patterns {
    leading_tag: Regex,
    undefined_import: Regex,
    undefined_method_typed: Regex,
    undefined_method: Regex,
    undefined_property: Regex,
    possibly_undefined_property: Regex,
    wrong_package: Regex,
    undefined_type: Regex,
    constant_assignment: Regex,
    missing_return_type: Regex,
    interface_not_found: Regex,
    type_mismatch: Regex,
    missing_implementation: Regex,
}

impl Patterns {
    fn new() -> Self {
        Self {
            leading_tag: Regex::new(r"^(Error|Warning):\s+").expect("valid tag regex"),
            undefined_import: Regex::new(r"(?i)^Definition (\S+) could not be found\.$")
                .expect("valid undefined import regex"),
            undefined_method_typed: Regex::new(
                r"(?i)^Call to a possibly undefined method (\S+) .* type (\S+)\.$",
            )
            .expect("valid typed undefined method regex"),
            undefined_method: Regex::new(r"(?i)^Call to a possibly undefined method (\S+)\.$")
                .expect("valid undefined method regex"),
            undefined_property: Regex::new(r"(?i)^Access of undefined property (\S+)\.$")
                .expect("valid undefined property regex"),
            possibly_undefined_property: Regex::new(
                r"(?i)^Access of possibly undefined property (\S+)",
            )
            .expect("valid possibly undefined property regex"),
            wrong_package: Regex::new(r"(?i)^A file found in a source-path must have .*? '(\S+?)'")
                .expect("valid wrong package regex"),
            undefined_type: Regex::new(
                r"(?i)^Type was not found or was not a compile-time constant: (\S+)\.$",
            )
            .expect("valid undefined type regex"),
            constant_assignment: Regex::new(
                r"(?i)^Illegal assignment to a variable specified as constant\.$",
            )
            .expect("valid constant assignment regex"),
            missing_return_type: Regex::new(
                r"(?i)^return value for function '(\S+)' has no type declaration\.$",
            )
            .expect("valid missing return type regex"),
            interface_not_found: Regex::new(r"(?i)^Interface (\S+) was not found\.$")
                .expect("valid interface not found regex"),
            type_mismatch: Regex::new(
                r"(?i)^Implicit coercion of a value of type (\S+) to an unrelated type (\S+)\.$",
            )
            .expect("valid type mismatch regex"),
            missing_implementation: Regex::new(
                r"(?i)^Interface method ((?:get |set )?\S+) in namespace (\S+) not implemented by class (\S+)\.$",
            )
            .expect("valid missing implementation regex"),
        }
    }
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(Patterns::new);

/// One compiler-reported problem, as a closed set of variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    UndefinedImport(TypeName),
    UndefinedMethod(Member),
    UndefinedProperty(Member),
    WrongPackage(TypeName),
    UndefinedType(TypeName),
    ConstantAssignment,
    MissingReturnType(Member),
    InterfaceNotFound(TypeName),
    TypeMismatch {
        expected: TypeName,
        actual: TypeName,
    },
    MissingImplementation {
        member: Member,
        implementing_type: TypeName,
    },
    /// Anything the patterns above don't recognize, kept verbatim.
    Unknown(String),
}

impl Problem {
    /// Classify a raw message. A leading `Error:`/`Warning:` tag is stripped
    /// before matching, but an unrecognized message is preserved as given.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let p = &*PATTERNS;
        let stripped = p.leading_tag.replace(message, "");
        let text = stripped.as_ref();

        if let Some(c) = p.undefined_import.captures(text) {
            return Self::UndefinedImport(TypeName::parse(&c[1]));
        }
        if let Some(c) = p.undefined_method_typed.captures(text) {
            return Self::UndefinedMethod(Member::new(Some(TypeName::parse(&c[2])), &c[1]));
        }
        if let Some(c) = p.undefined_method.captures(text) {
            return Self::UndefinedMethod(Member::new(None, &c[1]));
        }
        if let Some(c) = p.undefined_property.captures(text) {
            return Self::UndefinedProperty(Member::new(None, &c[1]));
        }
        if let Some(c) = p.possibly_undefined_property.captures(text) {
            return Self::UndefinedProperty(Member::new(None, &c[1]));
        }
        if let Some(c) = p.wrong_package.captures(text) {
            return Self::WrongPackage(TypeName {
                package: Some(c[1].to_string()),
                name: None,
            });
        }
        if let Some(c) = p.undefined_type.captures(text) {
            return Self::UndefinedType(TypeName::parse(&c[1]));
        }
        if p.constant_assignment.is_match(text) {
            return Self::ConstantAssignment;
        }
        if let Some(c) = p.missing_return_type.captures(text) {
            return Self::MissingReturnType(Member::new(None, &c[1]));
        }
        if let Some(c) = p.interface_not_found.captures(text) {
            return Self::InterfaceNotFound(TypeName::parse(&c[1]));
        }
        if let Some(c) = p.type_mismatch.captures(text) {
            return Self::TypeMismatch {
                expected: TypeName::parse(&c[2]),
                actual: TypeName::parse(&c[1]),
            };
        }
        if let Some(c) = p.missing_implementation.captures(text) {
            return Self::MissingImplementation {
                member: Member::new(Some(TypeName::parse(&c[2])), &c[1]),
                implementing_type: TypeName::parse(&c[3]),
            };
        }
        Self::Unknown(message.to_string())
    }
}

/// The secondary line printed under a diagnostic's headline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details {
    /// `* content` bullet.
    Bullet(String),
    /// Plain source echo.
    Snippet(String),
    /// Source echo with the offending identifier delineated.
    Identifier {
        before: String,
        identifier: String,
        after: String,
    },
}

/// A classified problem, optionally anchored to a source location.
///
/// Immutable once built; the owning file's inferred type is written exactly
/// once, when the diagnostic is inserted into a `ProblematicFile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    problem: Problem,
    location: Option<Location>,
    file_type: Option<TypeName>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(problem: Problem, location: Option<Location>) -> Self {
        Self {
            problem,
            location,
            file_type: None,
        }
    }

    #[must_use]
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub(crate) fn set_file_type(&mut self, file_type: Option<TypeName>) {
        self.file_type = file_type;
    }

    /// Diagnostics without a location sort before everything else.
    #[must_use]
    pub fn sort_key(&self) -> (u32, u32) {
        self.location.as_ref().map_or((0, 0), Location::sort_key)
    }

    #[must_use]
    pub fn line_number(&self) -> Option<u32> {
        self.location.as_ref().map(|l| l.line_number)
    }

    /// Short human-readable message. Consecutive diagnostics sharing a
    /// headline are collapsed at render time.
    #[must_use]
    pub fn headline(&self) -> String {
        match &self.problem {
            Problem::ConstantAssignment => "Attempt to modify constant:".to_string(),
            Problem::UndefinedImport(_) => "Import not found:".to_string(),
            Problem::UndefinedMethod(_) => "Undefined method:".to_string(),
            Problem::UndefinedProperty(_) => "Undefined property:".to_string(),
            Problem::WrongPackage(package) => format!("Package should be {package}."),
            Problem::UndefinedType(_) => "Undefined type:".to_string(),
            Problem::MissingReturnType(_) => "Missing return type:".to_string(),
            Problem::InterfaceNotFound(_) => "Interface not found:".to_string(),
            Problem::TypeMismatch { expected, actual } => {
                format!("Expected {expected} but was {actual}:")
            }
            Problem::MissingImplementation {
                implementing_type, ..
            } => {
                if self.file_type.as_ref() == Some(implementing_type) {
                    "Missing implementation:".to_string()
                } else {
                    format!("Missing implementation in {implementing_type}:")
                }
            }
            Problem::Unknown(message) => message.clone(),
        }
    }

    #[must_use]
    pub fn details(&self) -> Option<Details> {
        match &self.problem {
            Problem::ConstantAssignment
            | Problem::UndefinedMethod(_)
            | Problem::UndefinedProperty(_)
            | Problem::UndefinedType(_)
            | Problem::TypeMismatch { .. } => self.identifier_details(),
            Problem::UndefinedImport(import) => Some(Details::Bullet(import.full_name())),
            Problem::MissingReturnType(member) => Some(Details::Bullet(member.to_string())),
            Problem::InterfaceNotFound(interface) => Some(Details::Bullet(interface.to_string())),
            Problem::MissingImplementation { member, .. } => {
                Some(Details::Bullet(match &member.owner {
                    Some(owner) => format!("{} ({owner})", member.name),
                    None => member.name.clone(),
                }))
            }
            Problem::WrongPackage(_) => None,
            Problem::Unknown(_) => self.snippet().map(Details::Snippet),
        }
    }

    /// The trimmed source line, with a continuation marker unless it ends a
    /// statement or block.
    fn snippet(&self) -> Option<String> {
        let location = self.location.as_ref()?;
        let trimmed = location.source_line.trim();
        let mut snippet = trimmed.to_string();
        if !matches!(trimmed.chars().last(), Some(';' | '{' | '}')) {
            snippet.push_str(" ...");
        }
        Some(snippet)
    }

    /// Locate the offending identifier inside the trimmed snippet. The
    /// reported column is adjusted for the indentation the trim removed.
    fn identifier_details(&self) -> Option<Details> {
        let location = self.location.as_ref()?;
        let snippet = self.snippet()?;
        let indentation = location
            .source_line
            .chars()
            .take_while(|c| c.is_whitespace())
            .count();
        let column = (location.column_number as usize).saturating_sub(indentation);
        match split_identifier(&snippet, column) {
            Some((before, identifier, after)) => Some(Details::Identifier {
                before,
                identifier,
                after,
            }),
            None => Some(Details::Snippet(snippet)),
        }
    }
}

/// Split `line` at character offset `column` if an identifier starts there.
fn split_identifier(line: &str, column: usize) -> Option<(String, String, String)> {
    let start = line.char_indices().nth(column).map(|(i, _)| i)?;
    let rest = &line[start..];
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some((
        line[..start].to_string(),
        rest[..end].to_string(),
        rest[end..].to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(problem: Problem, line: u32, column: u32, source: &str) -> Diagnostic {
        Diagnostic::new(
            problem,
            Some(Location {
                line_number: line,
                column_number: column,
                source_line: source.to_string(),
            }),
        )
    }

    #[test]
    fn classifies_undefined_import() {
        let problem = Problem::classify("Definition com.example:Foo could not be found.");
        assert_eq!(
            problem,
            Problem::UndefinedImport(TypeName::parse("com.example:Foo"))
        );
    }

    #[test]
    fn classifies_undefined_method_with_owner() {
        let problem = Problem::classify(
            "Call to a possibly undefined method frobnicate through a reference with static type com.example:Foo.",
        );
        assert_eq!(
            problem,
            Problem::UndefinedMethod(Member::new(
                Some(TypeName::parse("com.example:Foo")),
                "frobnicate"
            ))
        );
    }

    #[test]
    fn classifies_undefined_method_without_owner() {
        let problem = Problem::classify("Call to a possibly undefined method frobnicate.");
        assert_eq!(
            problem,
            Problem::UndefinedMethod(Member::new(None, "frobnicate"))
        );
    }

    #[test]
    fn classifies_undefined_property_variants() {
        assert_eq!(
            Problem::classify("Access of undefined property baz."),
            Problem::UndefinedProperty(Member::new(None, "baz"))
        );
        assert_eq!(
            Problem::classify("Access of possibly undefined property baz through a reference"),
            Problem::UndefinedProperty(Member::new(None, "baz"))
        );
    }

    #[test]
    fn classifies_wrong_package() {
        let problem = Problem::classify(
            "A file found in a source-path must have the same package structure 'com.example'",
        );
        assert_eq!(
            problem,
            Problem::WrongPackage(TypeName {
                package: Some("com.example".to_string()),
                name: None,
            })
        );
    }

    #[test]
    fn classifies_undefined_type() {
        assert_eq!(
            Problem::classify("Type was not found or was not a compile-time constant: Foo."),
            Problem::UndefinedType(TypeName::parse("Foo"))
        );
    }

    #[test]
    fn classifies_constant_assignment() {
        assert_eq!(
            Problem::classify("Illegal assignment to a variable specified as constant."),
            Problem::ConstantAssignment
        );
    }

    #[test]
    fn classifies_missing_return_type() {
        assert_eq!(
            Problem::classify("return value for function 'frob' has no type declaration."),
            Problem::MissingReturnType(Member::new(None, "frob"))
        );
    }

    #[test]
    fn classifies_interface_not_found() {
        assert_eq!(
            Problem::classify("Interface IFoo was not found."),
            Problem::InterfaceNotFound(TypeName::parse("IFoo"))
        );
    }

    #[test]
    fn classifies_type_mismatch_with_swapped_payload() {
        let problem = Problem::classify(
            "Implicit coercion of a value of type String to an unrelated type Number.",
        );
        assert_eq!(
            problem,
            Problem::TypeMismatch {
                expected: TypeName::parse("Number"),
                actual: TypeName::parse("String"),
            }
        );
    }

    #[test]
    fn classifies_missing_implementation_with_accessor_prefix() {
        let problem = Problem::classify(
            "Interface method get size in namespace com.example:IContainer not implemented by class com.example:Box.",
        );
        assert_eq!(
            problem,
            Problem::MissingImplementation {
                member: Member::new(Some(TypeName::parse("com.example:IContainer")), "get size"),
                implementing_type: TypeName::parse("com.example:Box"),
            }
        );
    }

    #[test]
    fn strips_leading_tag_before_matching() {
        assert_eq!(
            Problem::classify("Error: Access of undefined property baz."),
            Problem::UndefinedProperty(Member::new(None, "baz"))
        );
        assert_eq!(
            Problem::classify("Warning: return value for function 'f' has no type declaration."),
            Problem::MissingReturnType(Member::new(None, "f"))
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            Problem::classify("ACCESS OF UNDEFINED PROPERTY baz."),
            Problem::UndefinedProperty(Member::new(None, "baz"))
        );
    }

    #[test]
    fn unknown_preserves_message_verbatim() {
        let message = "Something nobody has seen before";
        assert_eq!(
            Problem::classify(message),
            Problem::Unknown(message.to_string())
        );
    }

    #[test]
    fn headline_for_type_mismatch() {
        let diagnostic = Diagnostic::new(
            Problem::classify(
                "Implicit coercion of a value of type String to an unrelated type Number.",
            ),
            None,
        );
        assert_eq!(diagnostic.headline(), "Expected Number but was String:");
    }

    #[test]
    fn missing_implementation_headline_depends_on_owning_file() {
        let problem = Problem::classify(
            "Interface method run in namespace com.example:IRunnable not implemented by class com.example:Task.",
        );
        let mut diagnostic = Diagnostic::new(problem, None);
        assert_eq!(
            diagnostic.headline(),
            "Missing implementation in Task:"
        );
        diagnostic.set_file_type(Some(TypeName::parse("com.example:Task")));
        assert_eq!(diagnostic.headline(), "Missing implementation:");
    }

    #[test]
    fn identifier_details_adjust_for_indentation() {
        let diagnostic = located(
            Problem::classify("Access of undefined property baz."),
            12,
            4,
            "    baz.value = 1;",
        );
        assert_eq!(
            diagnostic.details(),
            Some(Details::Identifier {
                before: String::new(),
                identifier: "baz".to_string(),
                after: ".value = 1;".to_string(),
            })
        );
    }

    #[test]
    fn snippet_gets_continuation_marker() {
        let diagnostic = located(
            Problem::Unknown("whatever".to_string()),
            3,
            0,
            "  if (foo",
        );
        assert_eq!(
            diagnostic.details(),
            Some(Details::Snippet("if (foo ...".to_string()))
        );
    }

    #[test]
    fn identifier_details_fall_back_to_snippet() {
        // Column points at punctuation, not an identifier.
        let diagnostic = located(
            Problem::classify("Access of undefined property baz."),
            3,
            7,
            "foo.bar(;",
        );
        assert_eq!(
            diagnostic.details(),
            Some(Details::Snippet("foo.bar(;".to_string()))
        );
    }

    #[test]
    fn diagnostic_without_location_sorts_first() {
        let unlocated = Diagnostic::new(Problem::ConstantAssignment, None);
        let anchored = located(Problem::ConstantAssignment, 1, 0, "x = 1;");
        assert!(unlocated.sort_key() < anchored.sort_key());
    }
}
