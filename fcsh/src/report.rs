//! Per-file aggregation of diagnostics, kept sorted for display.

use std::path::{Path, PathBuf};

use crate::problem::Diagnostic;
use crate::types::TypeName;

/// All diagnostics attributed to one source file, or to no file at all for
/// global compiler errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblematicFile {
    file_name: Option<String>,
    source_directories: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl ProblematicFile {
    #[must_use]
    pub fn new(file_name: Option<String>, source_directories: Vec<PathBuf>) -> Self {
        Self {
            file_name,
            source_directories,
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Always in non-decreasing `(line, column)` order; diagnostics without
    /// a location first.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Insert and re-sort. Per-file counts are tens at most, so a stable
    /// full sort on every insert is fine.
    pub fn push(&mut self, mut diagnostic: Diagnostic) {
        diagnostic.set_file_type(self.type_name());
        self.diagnostics.push(diagnostic);
        self.diagnostics.sort_by_key(Diagnostic::sort_key);
    }

    /// The diagnostic immediately preceding `diagnostic` in display order,
    /// used to collapse repeated headlines.
    #[must_use]
    pub fn problem_before(&self, diagnostic: &Diagnostic) -> Option<&Diagnostic> {
        let index = self.diagnostics.iter().position(|d| d == diagnostic)?;
        index.checked_sub(1).map(|i| &self.diagnostics[i])
    }

    #[must_use]
    pub fn basename(&self) -> String {
        match &self.file_name {
            None => "(compiler error)".to_string(),
            Some(name) => Path::new(name)
                .file_name()
                .map_or_else(|| name.clone(), |n| n.to_string_lossy().into_owned()),
        }
    }

    /// The file name with the longest matching source-directory prefix
    /// stripped; the full path when no known directory matches. A prefix
    /// only counts when it ends at a path boundary, so `/proj/src` never
    /// claims files under `/proj/src-extra`.
    #[must_use]
    pub fn stripped_file_name(&self) -> Option<String> {
        let name = self.file_name.as_ref()?;
        let stripped = self
            .source_directories
            .iter()
            .filter_map(|directory| {
                let rest = name.strip_prefix(&*directory.to_string_lossy())?;
                (rest.is_empty() || rest.starts_with(['/', '\\'])).then_some(rest)
            })
            .min_by_key(|rest| rest.len());
        Some(match stripped {
            Some(rest) => rest.trim_start_matches(['/', '\\']).to_string(),
            None => name.clone(),
        })
    }

    /// Directory part of the display name; `.` for files at a source root.
    #[must_use]
    pub fn dirname(&self) -> Option<String> {
        let stripped = self.stripped_file_name()?;
        let parent = Path::new(&stripped).parent()?;
        let text = parent.to_string_lossy();
        Some(if text.is_empty() {
            ".".to_string()
        } else {
            text.into_owned()
        })
    }

    /// The type a file of this name would define: package from the directory
    /// part, name from the basename without extension.
    #[must_use]
    pub fn type_name(&self) -> Option<TypeName> {
        self.file_name.as_ref()?;
        let package = self.dirname()?.replace(['/', '\\'], ".");
        let name = self
            .basename()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Some(TypeName {
            package: Some(package),
            name: Some(name),
        })
    }
}
