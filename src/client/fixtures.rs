//! Test fixtures for Qualtrics response bodies
//!
//! Builders for envelopes, collection pages, export status bodies and export
//! archives. Import via `use crate::client::fixtures::*` in test modules.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::ops::Range;

use serde_json::{Value, json};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// ============================================================================
// Envelopes
// ============================================================================

/// `200 - OK` envelope around a result.
pub fn ok_envelope_with(result: Value) -> Value {
    json!({
        "meta": { "httpStatus": "200 - OK", "requestId": "test-request" },
        "result": result
    })
}

/// Error envelope as Qualtrics returns it.
pub fn error_envelope(http_status: &str, code: &str, message: &str) -> Value {
    json!({
        "meta": {
            "httpStatus": http_status,
            "requestId": "test-request",
            "error": { "errorCode": code, "errorMessage": message }
        }
    })
}

// ============================================================================
// Collections
// ============================================================================

/// One collection page with an explicit `nextPage` (null when `None`).
pub fn page_envelope(elements: Vec<Value>, next_page: Option<String>) -> Value {
    ok_envelope_with(json!({
        "elements": elements,
        "nextPage": next_page
    }))
}

/// Directory contacts numbered by `range`.
pub fn contact_elements(range: Range<usize>) -> Vec<Value> {
    range
        .map(|n| {
            json!({
                "contactId": format!("CID_{:015}", n),
                "firstName": format!("First{}", n),
                "lastName": format!("Last{}", n),
                "email": format!("contact{}@example.com", n),
                "phone": null,
                "unsubscribed": false,
                "language": "en",
                "extRef": format!("ext-{}", n)
            })
        })
        .collect()
}

// ============================================================================
// Export jobs
// ============================================================================

/// Body returned by an export submission.
pub fn export_started(job_id: &str) -> Value {
    ok_envelope_with(json!({
        "progressId": job_id,
        "percentComplete": 0.0,
        "status": "inProgress"
    }))
}

/// Status poll body for a running job.
pub fn export_in_progress(percent: f64) -> Value {
    ok_envelope_with(json!({
        "percentComplete": percent,
        "status": "inProgress"
    }))
}

/// Status poll body for a finished job.
pub fn export_complete(file_id: &str) -> Value {
    ok_envelope_with(json!({
        "percentComplete": 100.0,
        "status": "complete",
        "fileId": file_id
    }))
}

/// Status poll body for a failed job.
pub fn export_failed(percent: f64) -> Value {
    ok_envelope_with(json!({
        "percentComplete": percent,
        "status": "failed"
    }))
}

// ============================================================================
// Archives
// ============================================================================

/// Zip archive holding the given `(name, contents)` files in order.
/// Names ending in `/` become directory entries.
pub fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, contents) in files {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Qualtrics-style responses CSV: header row, question-text row, then
/// `responses` data rows.
pub fn responses_csv(responses: usize) -> String {
    let mut csv = String::from(
        "\u{feff}ResponseId,Q1,Q2\nResponse ID,How satisfied are you?,\"Comments, if any\"\n",
    );
    for n in 0..responses {
        csv.push_str(&format!("R_{:015},{},text {}\n", n, n % 5 + 1, n));
    }
    csv
}
