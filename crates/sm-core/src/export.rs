//! CSV export of the whole story collection.

use crate::error::{AppError, Result};
use crate::models::Story;

pub const CSV_FILE_NAME: &str = "stories.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Lets spreadsheet tools detect UTF-8 (Korean text otherwise turns to mojibake).
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_HEADERS: [&str; 8] = [
    "id",
    "title",
    "author",
    "content",
    "product",
    "created_at",
    "qr_code",
    "url",
];

/// Serializes every field of every story, BOM first, one row per story.
/// The header row is always written.
pub fn export_csv(stories: &[Story]) -> Result<Vec<u8>> {
    let mut buf = UTF8_BOM.to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&mut buf);

        writer.write_record(CSV_HEADERS).map_err(csv_error)?;
        for story in stories {
            writer.serialize(story).map_err(csv_error)?;
        }
        writer
            .flush()
            .map_err(|e| AppError::Internal(format!("csv flush failed: {e}")))?;
    }
    Ok(buf)
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(format!("csv export failed: {e}"))
}
