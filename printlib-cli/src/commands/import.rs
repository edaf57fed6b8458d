//! `import` command: bulk import with a progress bar.

use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use printlib::{
    ImportCallbacks, ImportOutcome, ImportProgress, LibraryConfig, LibraryProvider, LocatorPath,
    LocatorSegment, DATABASE_PROVIDER_KEY,
};

use super::common::{build_selector, LIBRARY_NAME};
use crate::error::CliError;

const PROGRESS_TEMPLATE: &str = "{spinner} [{bar:40}] {pos}/{len} {wide_msg}";

/// Import `files` into the collection addressed by `into`, or the library root.
pub fn run(config: &LibraryConfig, files: &[PathBuf], into: Option<&str>) -> Result<(), CliError> {
    let selector = build_selector(config)?;
    let target = match into {
        Some(text) => text.parse::<LocatorPath>()?,
        None => library_root(config),
    };

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let progress_bar = bar.clone();
    let completion_bar = bar.clone();
    let callbacks = ImportCallbacks::none()
        .with_progress(Arc::new(move |progress: &ImportProgress| {
            progress_bar.set_position(progress.completed as u64);
            if let Some(current) = &progress.current {
                progress_bar.set_message(current.display().to_string());
            }
        }))
        .with_completion(Box::new(move |outcome: &ImportOutcome| {
            completion_bar.finish_with_message(format!("{} imported", outcome.imported));
            for (path, reason) in &outcome.failed {
                eprintln!("  failed: {} ({})", path.display(), reason);
            }
        }));

    selector.add_items(files, &target, callbacks)?;
    if !bar.is_finished() {
        bar.finish_and_clear();
    }
    Ok(())
}

/// Locator of the canonical store's root under the top-level selector.
fn library_root(config: &LibraryConfig) -> LocatorPath {
    LocatorPath::from(vec![
        LocatorSegment::new(config.selector_key(), ".."),
        LocatorSegment::new(DATABASE_PROVIDER_KEY, LIBRARY_NAME),
    ])
}
