//! Source Map Revision 3 output.
//!
//! Flattened output records byte ranges. Tools consuming generated
//! JavaScript expect line/column mappings encoded as base64 VLQ segments, so
//! [`StandardSourceMap`] converts every entry whose file and source start are
//! known into a [`Mapping`] and serializes them in the standard JSON layout.

use indexmap::{IndexMap, IndexSet};
use kotoba_core::line_index::{LineColumn, LineIndex};
use log::debug;
use serde::Serialize;

use crate::fragment::SourceMapEntry;

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A generated position and the original position it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub generated: LineColumn,
    pub source: String,
    pub original: LineColumn,
}

/// Standard source map of one generated file.
#[derive(Debug, Clone, Default)]
pub struct StandardSourceMap {
    file: Option<String>,
    sources: IndexSet<String>,
    mappings: Vec<Mapping>,
}

#[derive(Serialize)]
struct Document<'a> {
    version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    sources: Vec<&'a str>,
    names: Vec<&'a str>,
    mappings: String,
}

impl StandardSourceMap {
    /// Convert flattened entries of `code`.
    ///
    /// `sources` holds the text of every original file by name. Entries
    /// without a file, without a source start, or naming a file missing from
    /// `sources` produce no mapping.
    pub fn build(
        code: &str,
        entries: &[SourceMapEntry],
        sources: &IndexMap<String, String>,
        output_file: Option<&str>,
    ) -> Self {
        let generated_index = LineIndex::new(code);
        let source_indexes: IndexMap<&str, LineIndex<'_>> = sources
            .iter()
            .map(|(name, text)| (name.as_str(), LineIndex::new(text)))
            .collect();

        let mut map = Self {
            file: output_file.map(str::to_string),
            ..Self::default()
        };
        for entry in entries {
            let (Some(file), Some(start)) = (entry.file.as_deref(), entry.source.start) else {
                continue;
            };
            let Some(original_index) = source_indexes.get(file) else {
                continue;
            };
            map.sources.insert(file.to_string());
            map.mappings.push(Mapping {
                generated: generated_index.line_column(entry.output.start),
                source: file.to_string(),
                original: original_index.line_column(start),
            });
        }
        map.mappings.sort_by_key(|m| m.generated);
        map.mappings.dedup();
        debug!(mappings = map.mappings.len(); "Source map built");
        map
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// The `mappings` field: one `;`-separated group per generated line.
    pub fn encoded_mappings(&self) -> String {
        let mut out = String::new();
        let mut line = 0;
        let mut previous_column = 0i64;
        let mut previous_source = 0i64;
        let mut previous_line = 0i64;
        let mut previous_original_column = 0i64;
        let mut first_in_line = true;

        for mapping in &self.mappings {
            while line < mapping.generated.line {
                out.push(';');
                line += 1;
                previous_column = 0;
                first_in_line = true;
            }
            if !first_in_line {
                out.push(',');
            }
            first_in_line = false;

            let source = self.sources.get_index_of(&mapping.source).unwrap_or(0) as i64;
            let column = mapping.generated.column as i64;
            let original_line = mapping.original.line as i64;
            let original_column = mapping.original.column as i64;

            encode_vlq(column - previous_column, &mut out);
            encode_vlq(source - previous_source, &mut out);
            encode_vlq(original_line - previous_line, &mut out);
            encode_vlq(original_column - previous_original_column, &mut out);

            previous_column = column;
            previous_source = source;
            previous_line = original_line;
            previous_original_column = original_column;
        }
        out
    }

    /// Serialize as a Revision 3 JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let document = Document {
            version: 3,
            file: self.file.as_deref(),
            sources: self.sources.iter().map(String::as_str).collect(),
            names: Vec::new(),
            mappings: self.encoded_mappings(),
        };
        serde_json::to_string(&document)
    }
}

/// Append `value` as a base64 VLQ.
fn encode_vlq(value: i64, out: &mut String) {
    let zigzag = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    let mut rest = zigzag as u64;
    loop {
        let mut digit = (rest & 0b11111) as usize;
        rest >>= 5;
        if rest > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64_DIGITS[digit] as char);
        if rest == 0 {
            break;
        }
    }
}
