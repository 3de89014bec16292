use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::Utf8Path;

use crate::error::NgdError;
use crate::fs_util;
use crate::summary::AssemblyEntry;

pub const LOCAL_FILENAME: &str = "local_filename";

pub const DEFAULT_COLUMNS: &[&str] = &[
    "assembly_accession",
    "bioproject",
    "biosample",
    "wgs_master",
    "excluded_from_refseq",
    "refseq_category",
    "relation_to_type_material",
    "taxid",
    "species_taxid",
    "organism_name",
    "infraspecific_name",
    "isolate",
    "version_status",
    "assembly_level",
    "release_type",
    "genome_rep",
    "seq_rel_date",
    "asm_name",
    "submitter",
    "gbrs_paired_asm",
    "paired_asm_comp",
    "ftp_path",
    LOCAL_FILENAME,
];

#[derive(Debug)]
pub struct MetadataTable {
    columns: Vec<String>,
    rows: Mutex<Vec<Vec<String>>>,
}

impl Default for MetadataTable {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.iter().map(|col| col.to_string()).collect(),
            rows: Mutex::new(Vec::new()),
        }
    }
}

impl MetadataTable {
    pub fn with_columns<I, S>(columns: I) -> Result<Self, NgdError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if !columns.iter().any(|col| col == LOCAL_FILENAME) {
            return Err(NgdError::MissingLocalFilenameColumn);
        }
        Ok(Self {
            columns,
            rows: Mutex::new(Vec::new()),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Stored as `./` plus the path relative to the cwd.
    pub fn add(&self, entry: &AssemblyEntry, local_file: &Utf8Path) -> Result<(), NgdError> {
        let cwd = std::env::current_dir()
            .map_err(|err| NgdError::Filesystem(err.to_string()))?;
        let cwd = camino::Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| NgdError::Filesystem("non-utf8 working directory".to_string()))?;
        let relative = if local_file.is_relative() {
            fs_util::normalize(local_file)
        } else {
            fs_util::relative_path(&fs_util::normalize(&cwd), &fs_util::normalize(local_file))
        };
        self.add_row(entry, &format!("./{relative}"))
    }

    fn add_row(&self, entry: &AssemblyEntry, local_filename: &str) -> Result<(), NgdError> {
        let row = self
            .columns
            .iter()
            .map(|col| {
                if col == LOCAL_FILENAME {
                    local_filename.to_string()
                } else {
                    entry.get(col).to_string()
                }
            })
            .collect();
        self.lock_rows()?.push(row);
        Ok(())
    }

    fn lock_rows(&self) -> Result<MutexGuard<'_, Vec<Vec<String>>>, NgdError> {
        self.rows
            .lock()
            .map_err(|_| NgdError::Filesystem("metadata table lock poisoned".to_string()))
    }

    pub fn write<W: Write>(&self, mut handle: W) -> Result<(), NgdError> {
        let io_err = |err: std::io::Error| NgdError::Filesystem(err.to_string());
        writeln!(handle, "{}", self.columns.join("\t")).map_err(io_err)?;
        let rows = self.lock_rows()?;
        for row in rows.iter() {
            writeln!(handle, "{}", row.join("\t")).map_err(io_err)?;
        }
        handle.flush().map_err(io_err)
    }

    pub fn write_to_path(&self, path: &Utf8Path) -> Result<(), NgdError> {
        let file = File::create(path.as_std_path())
            .map_err(|err| NgdError::Filesystem(format!("create {path}: {err}")))?;
        self.write(BufWriter::new(file))
    }
}
