//! CSV output: the fixed-schema results file.
//!
//! The schema is fixed — [`crate::fields::CSV_COLUMNS`], header always
//! written — so downstream spreadsheet imports never have to guess columns
//! from whichever fields the first document happened to contain.
//!
//! ## Why rewrite the whole file each time?
//!
//! The batch saves after every processed document so an interrupted run
//! keeps everything done so far. Rewriting the whole file (rather than
//! appending) keeps the writer stateless across saves, and the atomic
//! temp-file-plus-rename means a crash mid-save leaves the previous
//! complete file, never a torn one. At batch sizes where a vision API call
//! costs seconds per file, rewriting a few kilobytes of CSV is noise.

use crate::error::ExtractError;
use crate::fields::CSV_COLUMNS;
use crate::output::FileResult;
use std::path::Path;
use tracing::debug;

/// Write the CSV for all results so far, atomically.
///
/// Rows are written only for results that carry fields (full or partial
/// extractions); fully failed files produce no row.
pub fn write_results(path: &Path, results: &[FileResult]) -> Result<(), ExtractError> {
    let io_err = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }

    // Temp file in the destination directory: rename is only atomic within
    // one filesystem.
    let tmp = tempfile::NamedTempFile::new_in(parent.unwrap_or(Path::new(".")))
        .map_err(io_err)?;

    let mut writer = csv::Writer::from_writer(tmp);
    writer.write_record(CSV_COLUMNS).map_err(csv_err(path))?;

    let mut rows = 0usize;
    for result in results {
        let Some(ref fields) = result.fields else {
            continue;
        };
        let mut record = Vec::with_capacity(CSV_COLUMNS.len());
        record.push(result.filename.as_str());
        record.extend(fields.csv_values());
        writer.write_record(&record).map_err(csv_err(path))?;
        rows += 1;
    }

    let tmp = writer.into_inner().map_err(|e| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    })?;

    tmp.persist(path)
        .map_err(|e| io_err(e.error))?;

    debug!("Wrote {} rows to {}", rows, path.display());
    Ok(())
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> ExtractError + '_ {
    move |e| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::DocumentFields;
    use tempfile::TempDir;

    fn result_with(filename: &str, surname: Option<&str>) -> FileResult {
        FileResult {
            filename: filename.to_string(),
            fields: surname.map(|s| DocumentFields {
                surname: Some(s.to_string()),
                document_type: Some("Passport".to_string()),
                ..Default::default()
            }),
            raw_response: None,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            retries: 0,
            error: None,
        }
    }

    #[test]
    fn header_matches_documented_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_results(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            "filename,documentType,country,passportNumber,surname,givenName,\
             dateOfBirth,gender,placeOfBirth,placeOfIssue,dateOfIssue,dateOfExpiry"
        );
    }

    #[test]
    fn failed_files_produce_no_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let results = vec![
            result_with("good.jpg", Some("SILVA")),
            result_with("bad.jpg", None),
            result_with("also_good.pdf", Some("NAKAMURA")),
        ];
        write_results(&path, &results).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3, "header + 2 rows");
        assert!(lines[1].starts_with("good.jpg,Passport"));
        assert!(lines[2].starts_with("also_good.pdf,"));
        assert!(!content.contains("bad.jpg"));
    }

    #[test]
    fn missing_fields_are_empty_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_results(&path, &[result_with("p.jpg", Some("GARCIA"))]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        // 12 columns → 11 commas, most cells empty.
        assert_eq!(row.matches(',').count(), 11);
        assert_eq!(row, "p.jpg,Passport,,,GARCIA,,,,,,,");
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut r = result_with("q.jpg", Some("DE LA CRUZ"));
        r.fields.as_mut().unwrap().place_of_birth = Some("Rotterdam, Netherlands".into());
        write_results(&path, &[r]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Rotterdam, Netherlands\""));

        // And it reads back as one cell.
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[8], "Rotterdam, Netherlands");
    }

    #[test]
    fn rewrite_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_results(&path, &[result_with("one.jpg", Some("A"))]).unwrap();
        write_results(
            &path,
            &[
                result_with("one.jpg", Some("A")),
                result_with("two.jpg", Some("B")),
            ],
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("one.jpg").count(), 1, "no duplicated rows");
    }

    #[test]
    fn creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/out.csv");
        write_results(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
