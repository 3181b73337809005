//! Value records shared by the parser, classifier and session.

use std::fmt;
use std::path::PathBuf;

/// A fully or partially qualified ActionScript type.
///
/// fcsh writes qualified names with a colon between package and type
/// (`flash.events:Event`); a bare identifier has no package part. Package
/// notices carry a package with no type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub package: Option<String>,
    pub name: Option<String>,
}

impl TypeName {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.split_once(':') {
            Some((package, name)) => Self {
                package: Some(package.to_string()),
                name: Some(name.to_string()),
            },
            None => Self {
                package: None,
                name: Some(input.to_string()),
            },
        }
    }

    /// `package.Name`, with either side empty when missing.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "{}.{}",
            self.package.as_deref().unwrap_or_default(),
            self.name.as_deref().unwrap_or_default()
        )
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.package) {
            (Some(name), _) => f.write_str(name),
            (None, Some(package)) => f.write_str(package),
            (None, None) => Ok(()),
        }
    }
}

/// A method or property reference, optionally scoped to a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub owner: Option<TypeName>,
    pub name: String,
}

impl Member {
    #[must_use]
    pub fn new(owner: Option<TypeName>, name: &str) -> Self {
        Self {
            owner,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Where a diagnostic points inside a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// One-based, as reported.
    pub line_number: u32,
    /// Zero-based; fcsh reports one-based columns and the parser subtracts one.
    pub column_number: u32,
    /// The offending source line, taken from the context block that follows
    /// a diagnostic header.
    pub source_line: String,
}

impl Location {
    #[must_use]
    pub fn sort_key(&self) -> (u32, u32) {
        (self.line_number, self.column_number)
    }
}

/// Whether missing-type-declaration warnings are worth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Typing {
    #[default]
    Static,
    Dynamic,
}

/// One compile target: what to build and how.
///
/// Built once by the CLI, read-only afterwards. The session renders it into
/// an `mxmlc` invocation on the first compile of a session.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub source_file: PathBuf,
    pub source_directories: Vec<PathBuf>,
    pub library_paths: Vec<PathBuf>,
    pub output_file: PathBuf,
    pub production: bool,
    pub test: bool,
    pub test_port: u16,
    pub typing: Typing,
}

impl CompileRequest {
    /// The full `mxmlc` command line sent on the first compile.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut command = String::from("mxmlc");
        for directory in &self.source_directories {
            command.push_str(&format!(
                " -compiler.source-path={}",
                directory.display()
            ));
        }
        for library in &self.library_paths {
            command.push_str(&format!(" -compiler.library-path={}", library.display()));
        }
        command.push_str(&format!(" -output={}", self.output_file.display()));
        command.push_str(" -static-link-runtime-shared-libraries");
        command.push_str(" -compiler.strict");
        if !self.production {
            command.push_str(" -debug");
        }
        command.push_str(&format!(" {}", self.source_file.display()));
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompileRequest {
        CompileRequest {
            source_file: PathBuf::from("/proj/src/Main.as"),
            source_directories: vec![PathBuf::from("/proj/src"), PathBuf::from("/proj/test")],
            library_paths: vec![PathBuf::from("/proj/lib/asspec.swc")],
            output_file: PathBuf::from("/tmp/out.swf"),
            production: false,
            test: false,
            test_port: 50102,
            typing: Typing::Static,
        }
    }

    #[test]
    fn parse_qualified_type() {
        let t = TypeName::parse("flash.events:Event");
        assert_eq!(t.package.as_deref(), Some("flash.events"));
        assert_eq!(t.name.as_deref(), Some("Event"));
        assert_eq!(t.full_name(), "flash.events.Event");
        assert_eq!(t.to_string(), "Event");
    }

    #[test]
    fn parse_bare_type() {
        let t = TypeName::parse("Sprite");
        assert_eq!(t.package, None);
        assert_eq!(t.name.as_deref(), Some("Sprite"));
        assert_eq!(t.to_string(), "Sprite");
    }

    #[test]
    fn package_only_type_displays_package() {
        let t = TypeName {
            package: Some("com.example".to_string()),
            name: None,
        };
        assert_eq!(t.to_string(), "com.example");
    }

    #[test]
    fn member_display_with_and_without_owner() {
        let owned = Member::new(Some(TypeName::parse("com.example:Foo")), "bar");
        assert_eq!(owned.to_string(), "Foo.bar");
        let bare = Member::new(None, "bar");
        assert_eq!(bare.to_string(), "bar");
    }

    #[test]
    fn location_sort_key() {
        let location = Location {
            line_number: 12,
            column_number: 4,
            source_line: "    x = 1;".to_string(),
        };
        assert_eq!(location.sort_key(), (12, 4));
    }

    #[test]
    fn command_line_contains_all_flags_in_order() {
        let command = request().command_line();
        assert_eq!(
            command,
            "mxmlc -compiler.source-path=/proj/src -compiler.source-path=/proj/test \
             -compiler.library-path=/proj/lib/asspec.swc -output=/tmp/out.swf \
             -static-link-runtime-shared-libraries -compiler.strict -debug \
             /proj/src/Main.as"
        );
    }

    #[test]
    fn command_line_omits_debug_in_production() {
        let mut request = request();
        request.production = true;
        let command = request.command_line();
        assert!(!command.contains(" -debug "));
        assert!(command.contains(" -compiler.strict "));
    }
}
