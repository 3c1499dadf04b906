// Interactive menu over a RagQna session

#[cfg(test)]
mod tests;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use thiserror::Error;
use tracing::{debug, warn};

use crate::loader::is_supported;
use crate::rag::{RagQna, SessionState};

/// Never offered for selection even though it has a supported extension
const EXCLUDED_FILE: &str = "requirements.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    AddFiles,
    ShowFiles,
    CountFiles,
    CountChunks,
    ShowProcessed,
    ClearStore,
    Ask,
    Quit,
}

impl MenuChoice {
    pub const ALL: [Self; 8] = [
        Self::AddFiles,
        Self::ShowFiles,
        Self::CountFiles,
        Self::CountChunks,
        Self::ShowProcessed,
        Self::ClearStore,
        Self::Ask,
        Self::Quit,
    ];

    /// Key typed to select this entry
    #[inline]
    pub fn key(self) -> char {
        match self {
            Self::AddFiles => '1',
            Self::ShowFiles => '2',
            Self::CountFiles => '3',
            Self::CountChunks => '4',
            Self::ShowProcessed => '5',
            Self::ClearStore => '6',
            Self::Ask => '7',
            Self::Quit => '0',
        }
    }

    #[inline]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL.into_iter().find(|choice| {
            let mut chars = input.chars();
            chars.next() == Some(choice.key()) && chars.next().is_none()
        })
    }
}

impl fmt::Display for MenuChoice {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AddFiles => "📂 Add Files",
            Self::ShowFiles => "📄 Show Existing Added Files",
            Self::CountFiles => "🔢 Number of Files Added",
            Self::CountChunks => "🔍 Number of Chunks",
            Self::ShowProcessed => "📁 Show Processed Files",
            Self::ClearStore => "🗑️ Clear Vector Store",
            Self::Ask => "❓ Ask a Question",
            Self::Quit => "🚪 Quit",
        };
        write!(f, "{}. {}", self.key(), label)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No file numbers given")]
    Empty,
    #[error("File number {0} is out of range (1-{1})")]
    OutOfRange(usize, usize),
}

/// Supported documents directly inside `dir`, sorted by path
#[inline]
pub fn list_supported_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || !is_supported(&path) {
            continue;
        }
        if path.file_name().is_some_and(|name| name == EXCLUDED_FILE) {
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Parse comma-separated 1-based file numbers into 0-based indices.
///
/// Tokens that are not numbers are ignored; repeated numbers are kept once.
#[inline]
pub fn parse_selection(input: &str, available: usize) -> Result<Vec<usize>, SelectionError> {
    let mut indices = Vec::new();

    for token in input.split(',').map(str::trim) {
        let Ok(number) = token.parse::<usize>() else {
            if !token.is_empty() {
                debug!("Ignoring non-numeric selection {:?}", token);
            }
            continue;
        };
        if number == 0 || number > available {
            return Err(SelectionError::OutOfRange(number, available));
        }
        if !indices.contains(&(number - 1)) {
            indices.push(number - 1);
        }
    }

    if indices.is_empty() {
        return Err(SelectionError::Empty);
    }
    Ok(indices)
}

/// Run the numbered menu until the user quits
#[inline]
pub async fn run_shell(rag: &mut RagQna, documents_dir: &Path) -> Result<()> {
    println!("📁 Place your document files in {}", documents_dir.display());
    println!("📄 Supported formats: PDF, TXT, PPTX");

    loop {
        print_menu();
        let input = read_line("\n👉 Enter your choice")?;

        let Some(choice) = MenuChoice::parse(&input) else {
            println!("{}", style("❌ Invalid choice. Please try again.").red());
            continue;
        };

        match choice {
            MenuChoice::AddFiles => add_files(rag, documents_dir)?,
            MenuChoice::ShowFiles => print_paths(rag.get_files(), "📄 Files added:", "No files added yet."),
            MenuChoice::CountFiles => {
                println!("🔢 Number of files added: {}", rag.number_of_files());
            }
            MenuChoice::CountChunks => {
                println!("🔍 Number of chunked documents: {}", rag.size_chunks());
            }
            MenuChoice::ShowProcessed => {
                print_paths(
                    rag.get_processed_files(),
                    "📁 Processed files:",
                    "No files processed yet.",
                );
                if !rag.get_failed_files().is_empty() {
                    print_paths(rag.get_failed_files(), "⚠️  Skipped (could not be loaded):", "");
                }
            }
            MenuChoice::ClearStore => match rag.clear().await {
                Ok(()) => println!(
                    "{}",
                    style("✅ Vector store, chunks, and processed files cleared!").green()
                ),
                Err(e) => print_error(&e),
            },
            MenuChoice::Ask => ask_questions(rag).await?,
            MenuChoice::Quit => {
                println!("👋 Exiting. Goodbye!");
                return Ok(());
            }
        }
    }
}

fn print_menu() {
    println!("\n{}", style("📌 Menu:").bold());
    for choice in MenuChoice::ALL {
        println!("{}", choice);
    }
}

fn read_line(prompt: &str) -> Result<String> {
    let line: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(line.trim().to_string())
}

fn print_error(error: &dyn std::error::Error) {
    println!("{}", style(format!("❌ Error: {}", error)).red());
}

fn print_paths(paths: &[PathBuf], heading: &str, empty: &str) {
    if paths.is_empty() {
        println!("📭 {}", empty);
        return;
    }

    println!("{}", heading);
    for path in paths {
        println!("   - {}", display_name(path));
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn add_files(rag: &mut RagQna, documents_dir: &Path) -> Result<()> {
    let available = match list_supported_files(documents_dir) {
        Ok(files) => files,
        Err(e) => {
            warn!("Could not list documents: {:#}", e);
            println!("{}", style(format!("❌ {:#}", e)).red());
            return Ok(());
        }
    };

    if available.is_empty() {
        println!(
            "{}",
            style(format!(
                "❌ No supported files found in {}",
                documents_dir.display()
            ))
            .red()
        );
        return Ok(());
    }

    println!("📚 Found {} file(s):", available.len());
    for (i, path) in available.iter().enumerate() {
        println!("{}. {}", i + 1, display_name(path));
    }

    let input = read_line("\nSelect file numbers to add (comma separated)")?;
    let selected: Vec<&PathBuf> = match parse_selection(&input, available.len()) {
        Ok(indices) => indices.into_iter().map(|i| &available[i]).collect(),
        Err(e) => {
            println!("{}", style(format!("❌ Invalid selection: {}", e)).red());
            return Ok(());
        }
    };

    match rag.add_files(&selected) {
        Ok(added) => println!("{}", style(format!("✅ Added {} file(s).", added)).green()),
        Err(e) => print_error(&e),
    }
    Ok(())
}

async fn ask_questions(rag: &mut RagQna) -> Result<()> {
    if rag.number_of_files() == 0 {
        println!(
            "{}",
            style("⚠️ No files added. Add files before asking questions.").yellow()
        );
        return Ok(());
    }

    if rag.state() != SessionState::Ready {
        println!("🔄 Processing files...");
        if let Err(e) = rag.process_files().await {
            println!("{}", style(format!("❌ Failed to process: {}", e)).red());
            return Ok(());
        }
        println!("{}", style("✅ Documents processed successfully!").green());
    }

    loop {
        let question = read_line("\n❓ Ask your question (or type 'back' to return)")?;
        if question.eq_ignore_ascii_case("back") {
            return Ok(());
        }
        if question.is_empty() {
            println!("{}", style("⚠️ Please enter a valid question.").yellow());
            continue;
        }

        println!("🔍 Searching for relevant information...");
        match rag.query(&question).await {
            Ok(answer) => println!("\n🤖 Answer: {}", answer),
            Err(e) => print_error(&e),
        }
    }
}
