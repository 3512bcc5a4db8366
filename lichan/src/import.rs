//! NDJSON game export → PGN files.

use std::io::BufRead;

use chess::GameRecord;

use crate::store::{GameStore, StoreError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Store every game of an NDJSON export for `user`. Lines that fail to
/// decode are logged and skipped; write failures abort the import.
pub fn import_ndjson<R: BufRead>(
    reader: R,
    user: &str,
    store: &GameStore,
) -> Result<ImportSummary, StoreError> {
    let mut summary = ImportSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match GameRecord::from_api_json(&line) {
            Ok(record) => {
                store.save_game(user, &record)?;
                summary.written += 1;
            }
            Err(e) => {
                tracing::warn!(line = index + 1, "Skipping game: {}", e);
                summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        user,
        written = summary.written,
        skipped = summary.skipped,
        "Import finished"
    );
    Ok(summary)
}
