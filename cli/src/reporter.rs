//! Terminal rendering of compile settings and problem reports.
//!
//! Reports are laid out in two columns: the message column, then a narrow
//! right-justified line-number column. Column math works on plain character
//! widths so color codes never skew the alignment.

use std::path::Path;

use owo_colors::OwoColorize;

use aswatch_fcsh::{CompilationOutcome, CompileRequest, Details, Diagnostic, ProblematicFile};

const MESSAGE_COLUMN_WIDTH: usize = 56;
const LINE_NUMBER_COLUMN_WIDTH: usize = 4;
const FILE_NAME_COLUMN_WIDTH: usize = 40;
const SETTING_LABEL_WIDTH: usize = 21;

/// Echo the effective compile settings once at startup.
pub fn print_header(request: &CompileRequest, temporary_output: bool) {
    print_setting("Source file:", &format_path(&request.source_file));
    for directory in &request.source_directories {
        print_setting("Source directory:", &format_path(directory));
    }
    for library in &request.library_paths {
        print_setting("Library:", &format_path(library));
    }
    let output = if temporary_output {
        format!("{} (temporary)", format_path(&request.output_file))
    } else {
        format_path(&request.output_file)
    };
    print_setting("Output file:", &output);
    if request.test {
        print_setting("Test port:", &request.test_port.to_string());
    }
    println!();
}

pub fn print_report(outcome: &CompilationOutcome) {
    for line in outcome.unrecognized_lines() {
        println!("{} {line}", "??".red().bold());
    }
    for file in outcome.files() {
        println!();
        print_file_heading(file);
        for diagnostic in file.diagnostics() {
            print_diagnostic(file, diagnostic);
        }
    }
    if outcome.has_problems() || !outcome.unrecognized_lines().is_empty() {
        println!();
    }
}

fn print_file_heading(file: &ProblematicFile) {
    let basename = file.basename();
    match file.dirname() {
        Some(dirname) if dirname != "." => {
            let padding = FILE_NAME_COLUMN_WIDTH.saturating_sub(basename.chars().count());
            println!("{}{}(in {dirname})", basename.bold(), " ".repeat(padding));
        }
        _ => println!("{}", basename.bold()),
    }
}

/// One diagnostic: a headline row unless the previous diagnostic already
/// printed the same one, then a detail row. Whichever row comes last carries
/// the line number.
fn print_diagnostic(file: &ProblematicFile, diagnostic: &Diagnostic) {
    let headline = diagnostic.headline();
    let repeated = file
        .problem_before(diagnostic)
        .is_some_and(|previous| previous.headline() == headline);
    let details = diagnostic.details();
    let line_number = diagnostic.line_number();

    if !repeated {
        let headline_number = if details.is_none() { line_number } else { None };
        println!("{}", row(&headline, headline.chars().count(), headline_number));
    }
    if let Some(details) = details {
        let (rendered, plain_width) = render_details(&details);
        println!("{}", row(&rendered, plain_width, line_number));
    }
}

/// Render a detail line, returning the text and its plain display width.
fn render_details(details: &Details) -> (String, usize) {
    match details {
        Details::Bullet(content) => (format!("* {content}"), 2 + content.chars().count()),
        Details::Snippet(snippet) => (format!("... {snippet}"), 4 + snippet.chars().count()),
        Details::Identifier {
            before,
            identifier,
            after,
        } => {
            let rendered = format!("... {before}{}{after}", identifier.bold().underline());
            let plain_width = 4
                + before.chars().count()
                + identifier.chars().count()
                + after.chars().count();
            (rendered, plain_width)
        }
    }
}

/// Indent, pad the message column to its plain width, and right-justify the
/// line number. An overlong message pushes the number out instead of
/// truncating.
fn row(rendered: &str, plain_width: usize, line_number: Option<u32>) -> String {
    let mut out = String::from("  ");
    out.push_str(rendered);
    if let Some(number) = line_number {
        let number = number.to_string();
        out.push_str(&" ".repeat(MESSAGE_COLUMN_WIDTH.saturating_sub(plain_width)));
        out.push_str(&" ".repeat(LINE_NUMBER_COLUMN_WIDTH.saturating_sub(number.len())));
        out.push_str(&number);
    }
    out
}

fn print_setting(label: &str, value: &str) {
    println!("{label:<width$} {value}", width = SETTING_LABEL_WIDTH);
}

fn format_path(path: &Path) -> String {
    let text = path.to_string_lossy().into_owned();
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => contract_home(&text, &home),
        _ => text,
    }
}

/// Abbreviate a home-directory prefix to `~`.
fn contract_home(text: &str, home: &str) -> String {
    match text.strip_prefix(home) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
            format!("~{rest}")
        }
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_pads_message_and_right_justifies_line_number() {
        let line = row("Undefined property:", 19, Some(12));
        assert_eq!(line.len(), 2 + MESSAGE_COLUMN_WIDTH + LINE_NUMBER_COLUMN_WIDTH);
        assert!(line.starts_with("  Undefined property:"));
        assert!(line.ends_with("  12"));
    }

    #[test]
    fn row_without_line_number_is_left_alone() {
        assert_eq!(row("Import not found:", 17, None), "  Import not found:");
    }

    #[test]
    fn overlong_message_still_gets_its_line_number() {
        let message = "m".repeat(MESSAGE_COLUMN_WIDTH + 10);
        let line = row(&message, message.len(), Some(3));
        assert!(line.ends_with("   3"));
    }

    #[test]
    fn bullet_and_snippet_widths_count_their_markers() {
        let (bullet, width) = render_details(&Details::Bullet("com.example.Foo".to_string()));
        assert_eq!(bullet, "* com.example.Foo");
        assert_eq!(width, bullet.len());

        let (snippet, width) = render_details(&Details::Snippet("foo();".to_string()));
        assert_eq!(snippet, "... foo();");
        assert_eq!(width, snippet.len());
    }

    #[test]
    fn identifier_width_ignores_color_codes() {
        let (rendered, width) = render_details(&Details::Identifier {
            before: String::new(),
            identifier: "baz".to_string(),
            after: ".value = 1;".to_string(),
        });
        assert_eq!(width, "... baz.value = 1;".len());
        assert!(rendered.len() >= width);
    }

    #[test]
    fn contracts_home_directory_prefix() {
        assert_eq!(contract_home("/home/dev/proj/Main.as", "/home/dev"), "~/proj/Main.as");
        assert_eq!(contract_home("/home/dev", "/home/dev"), "~");
        assert_eq!(contract_home("/home/developer/x", "/home/dev"), "/home/developer/x");
        assert_eq!(contract_home("/srv/proj/Main.as", "/home/dev"), "/srv/proj/Main.as");
    }
}
