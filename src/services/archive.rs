use crate::api::ApiError;
use crate::services::batch::BatchReport;
use crate::utils::validation::{archive_path, unique_entry_name};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::{Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// `<prefix>-<UTC timestamp>.zip`
pub fn archive_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}.zip", prefix, at.format("%Y%m%dT%H%M%SZ"))
}

/// Writes every successful file of the batch into a zip archive, laid out
/// as root label / folders / file name. Returns the entry names in order.
pub fn write_archive<W: Write + Seek>(
    writer: W,
    report: &BatchReport,
) -> Result<Vec<String>, ApiError> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut taken = HashSet::new();
    let mut entries = Vec::new();

    for (file, exported) in report.successes() {
        let mut segments = file.folders.clone();
        segments.push(exported.file_name());
        let entry = unique_entry_name(&mut taken, &archive_path(&segments));

        tracing::debug!("Adding {} ({} bytes)", entry, exported.bytes.len());
        zip.start_file(entry.as_str(), options)?;
        zip.write_all(&exported.bytes)?;
        entries.push(entry);
    }

    zip.finish()?;
    tracing::info!("🗜️  Archive written with {} entries", entries.len());
    Ok(entries)
}
