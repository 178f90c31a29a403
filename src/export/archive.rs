//! Unpacking downloaded export archives
//!
//! Qualtrics delivers exports as zip files holding one data file. The file is
//! read in full and parsed as delimited text.

use std::io::{Cursor, Read};

use futures::StreamExt;
use log::{debug, warn};
use serde::Serialize;
use zip::ZipArchive;

use super::ExportFormat;
use crate::client::{ByteStream, Record};
use crate::error::{ExportError, Result};

const UTF8_BOM: char = '\u{feff}';

/// Buffer a download stream into memory.
pub async fn collect_stream(mut stream: ByteStream) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

/// Parse the first file of an export archive as a table.
pub fn extract_table(bytes: &[u8], format: ExportFormat) -> Result<Table> {
    let delimiter = format
        .delimiter()
        .ok_or_else(|| ExportError::UnsupportedFormat(format.to_string()))?;

    if bytes.is_empty() {
        return Err(ExportError::EmptyArchive.into());
    }

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExportError::Archive(e.to_string()))?;

    let mut files = Vec::new();
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| ExportError::Archive(e.to_string()))?;
        if !entry.is_dir() {
            files.push((index, entry.name().to_string()));
        }
    }

    let Some((index, name)) = files.first().cloned() else {
        return Err(ExportError::NoFiles.into());
    };
    if files.len() > 1 {
        warn!(
            "Export archive holds {} files; using the first one, '{}'",
            files.len(),
            name
        );
    }

    let mut contents = Vec::new();
    archive
        .by_index(index)
        .map_err(|e| ExportError::Archive(e.to_string()))?
        .read_to_end(&mut contents)
        .map_err(|e| ExportError::Archive(format!("failed to read '{}': {}", name, e)))?;

    Table::parse(&name, &contents, delimiter)
}

/// Delimited export file: a header row plus data rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Question ID (column name) paired with its question text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyQuestion {
    pub question_id: String,
    pub text: String,
}

impl Table {
    fn parse(file: &str, contents: &[u8], delimiter: u8) -> Result<Self> {
        let table_error = |reason: String| ExportError::Table {
            file: file.to_string(),
            reason,
        };

        let text = std::str::from_utf8(contents).map_err(|e| table_error(e.to_string()))?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| table_error(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() {
            return Err(table_error("no header row".to_string()).into());
        }

        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| table_error(e.to_string()))
            })
            .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;

        debug!("Parsed '{}': {} rows", file, rows.len());
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, by header name.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Each column paired with its entry in the first data row, which holds
    /// the question text in Qualtrics response exports.
    pub fn questions(&self) -> Vec<SurveyQuestion> {
        let first = self.rows.first();
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| SurveyQuestion {
                question_id: header.clone(),
                text: first
                    .and_then(|row| row.get(i))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Rows as header-keyed records.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .zip(row)
                    .map(|(h, v)| (h.clone(), serde_json::Value::String(v.clone())))
                    .collect()
            })
            .collect()
    }
}
