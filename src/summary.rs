use std::collections::BTreeMap;
use std::io::BufRead;

use serde::Serialize;
use tracing::warn;

use crate::error::NgdError;

const HEADER_MARKER: &str = "assembly_accession";
const COMMENT_PREFIX: &str = "# ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssemblyEntry {
    fields: BTreeMap<String, String>,
}

impl AssemblyEntry {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn accession(&self) -> &str {
        self.get("assembly_accession")
    }

    pub fn organism_name(&self) -> &str {
        self.get("organism_name")
    }

    pub fn ftp_path(&self) -> &str {
        self.get("ftp_path")
    }

    pub fn assembly_level(&self) -> &str {
        self.get("assembly_level")
    }

    pub fn refseq_category(&self) -> &str {
        self.get("refseq_category")
    }

    pub fn relation_to_type_material(&self) -> &str {
        self.get("relation_to_type_material")
    }

    pub fn species_taxid(&self) -> &str {
        self.get("species_taxid")
    }

    pub fn taxid(&self) -> &str {
        self.get("taxid")
    }
}

pub struct SummaryReader<R> {
    reader: R,
    fields: Vec<String>,
    line_number: usize,
    buffer: String,
}

impl<R: BufRead> SummaryReader<R> {
    pub fn new(mut reader: R) -> Result<Self, NgdError> {
        let mut buffer = String::new();
        let mut line_number = 0;
        let fields = loop {
            buffer.clear();
            let read = reader
                .read_line(&mut buffer)
                .map_err(|err| NgdError::Filesystem(format!("read summary: {err}")))?;
            if read == 0 {
                warn!("assembly summary has no header line");
                break Vec::new();
            }
            line_number += 1;
            let line = buffer.trim_end_matches(['\n', '\r']);
            if line.contains(HEADER_MARKER) {
                let line = line.strip_prefix(COMMENT_PREFIX).unwrap_or(line);
                break line.split('\t').map(str::to_string).collect();
            }
        };

        Ok(Self {
            reader,
            fields,
            line_number,
            buffer,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl<R: BufRead> Iterator for SummaryReader<R> {
    type Item = Result<AssemblyEntry, NgdError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fields.is_empty() {
            return None;
        }
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => {
                    return Some(Err(NgdError::Filesystem(format!("read summary: {err}"))));
                }
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() != self.fields.len() {
                warn!(
                    line = self.line_number,
                    expected = self.fields.len(),
                    found = parts.len(),
                    "skipping malformed summary line"
                );
                continue;
            }

            let entry = AssemblyEntry::from_pairs(
                self.fields
                    .iter()
                    .zip(parts)
                    .map(|(field, value)| (field.clone(), value)),
            );
            return Some(Ok(entry));
        }
    }
}
