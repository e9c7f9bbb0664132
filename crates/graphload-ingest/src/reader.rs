//! Tabular record reader
//!
//! Every file in an entity's data directory holds one record per line, fields
//! split by a single-byte delimiter. Files are visited in file-name order and
//! lines in file order. Blank lines are skipped.

use crate::error::RecordError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Default field separator
pub const DEFAULT_DELIMITER: u8 = b'\t';

/// One line of a data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw field values in positional order
    pub fields: Vec<String>,
    /// 1-based line number in the source file
    pub line: u64,
}

impl Record {
    pub fn new(fields: Vec<String>, line: u64) -> Self {
        Self { fields, line }
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.fields.get(position).map(String::as_str)
    }
}

/// Field delimiter and optional quote character of the data files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabularProfile {
    pub delimiter: u8,
    /// `None` reads quote characters as ordinary field content
    pub quote: Option<u8>,
}

impl Default for TabularProfile {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            quote: None,
        }
    }
}

impl TabularProfile {
    /// Open a data file for record-by-record reading
    pub fn open(&self, path: &Path) -> io::Result<RecordReader> {
        let file = File::open(path)?;

        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter);
        match self.quote {
            Some(quote) => builder.quote(quote),
            None => builder.quoting(false),
        };

        Ok(RecordReader {
            path: path.to_path_buf(),
            records: builder.from_reader(file).into_byte_records(),
        })
    }
}

/// Iterator over the records of one data file
///
/// Fields that are not valid UTF-8 are decoded lossily.
pub struct RecordReader {
    path: PathBuf,
    records: csv::ByteRecordsIntoIter<File>,
}

impl Iterator for RecordReader {
    type Item = Result<Record, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.records.next()?;
        Some(
            item.map(|record| {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                let fields = record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect();
                Record::new(fields, line)
            })
            .map_err(|e| RecordError::Read(format!("{}: {}", self.path.display(), e))),
        )
    }
}

/// Regular files directly under `dir`, sorted by file name
pub fn list_data_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn read_all(profile: &TabularProfile, path: &Path) -> Vec<Record> {
        profile.open(path).unwrap().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_tab_separated_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.tsv");
        fs::write(&path, "1\tAlice\n2\tBob\textra\n\n3\r\n").unwrap();

        let records = read_all(&TabularProfile::default(), &path);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].fields, vec!["1", "Alice"]);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[1].fields, vec!["2", "Bob", "extra"]);
        assert_eq!(records[2].fields, vec!["3"]);
        assert!(records[2].line > records[1].line);
    }

    #[test]
    fn test_quotes_are_content_by_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quoted.tsv");
        fs::write(&path, "\"1\"\tsays \"hi\"\n").unwrap();

        let records = read_all(&TabularProfile::default(), &path);
        assert_eq!(records[0].fields, vec!["\"1\"", "says \"hi\""]);
    }

    #[test]
    fn test_comma_profile_unquotes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "1,\"Smith, Anna\"\n").unwrap();

        let profile = TabularProfile {
            delimiter: b',',
            quote: Some(b'"'),
        };
        let records = read_all(&profile, &path);
        assert_eq!(records[0].fields, vec!["1", "Smith, Anna"]);
    }

    #[test]
    fn test_semicolon_profile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cities.csv");
        fs::write(&path, "7;\"Rue; Haute\";Paris\n").unwrap();

        let profile = TabularProfile {
            delimiter: b';',
            quote: Some(b'"'),
        };
        let records = read_all(&profile, &path);
        assert_eq!(records[0].fields, vec!["7", "Rue; Haute", "Paris"]);
    }

    #[test]
    fn test_invalid_utf8_decoded_lossily() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.tsv");
        fs::write(&path, b"1\tAl\xffice\n2\tBob\n").unwrap();

        let records = read_all(&TabularProfile::default(), &path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields, vec!["1", "Al\u{FFFD}ice"]);
        assert_eq!(records[1].fields, vec!["2", "Bob"]);
    }

    #[test]
    fn test_list_data_files_sorted_and_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.tsv"), "").unwrap();
        fs::write(dir.path().join("a.tsv"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_data_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.tsv", "b.tsv"]);
    }

    #[test]
    fn test_list_missing_directory() {
        assert!(list_data_files(Path::new("/nonexistent/graphload")).is_err());
    }
}
