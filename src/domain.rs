use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::NgdError;

pub const ALL: &str = "all";
pub const ANY: &str = "any";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Refseq,
    Genbank,
}

impl Section {
    pub const CHOICES: [&'static str; 2] = ["refseq", "genbank"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Refseq => "refseq",
            Section::Genbank => "genbank",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Section {
    type Err = NgdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "refseq" => Ok(Section::Refseq),
            "genbank" => Ok(Section::Genbank),
            other => Err(NgdError::UnsupportedChoice {
                field: "section",
                value: other.to_string(),
            }),
        }
    }
}

// Expanding `all` yields the keys in table order.
#[derive(Debug)]
pub struct DomainTable {
    name: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

impl DomainTable {
    pub const fn new(name: &'static str, entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(candidate, _)| *candidate == key)
    }

    pub fn get(&self, key: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, content)| *content)
    }

    pub fn key_for(&self, content: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, candidate)| *candidate == content)
            .map(|(key, _)| *key)
    }
}

pub const GROUPS: &[&str] = &[
    "archaea",
    "bacteria",
    "fungi",
    "invertebrate",
    "plant",
    "protozoa",
    "vertebrate_mammalian",
    "vertebrate_other",
    "viral",
];

pub const VIRAL_GROUP: &str = "viral";

pub static FORMATS: DomainTable = DomainTable::new(
    "file format",
    &[
        ("genbank", "_genomic.gbff.gz"),
        ("fasta", "_genomic.fna.gz"),
        ("rm", "_rm.out.gz"),
        ("features", "_feature_table.txt.gz"),
        ("gff", "_genomic.gff.gz"),
        ("protein-fasta", "_protein.faa.gz"),
        ("genpept", "_protein.gpff.gz"),
        ("wgs", "_wgsmaster.gbff.gz"),
        ("cds-fasta", "_cds_from_genomic.fna.gz"),
        ("rna-fna", "_rna.fna.gz"),
        ("rna-fasta", "_rna_from_genomic.fna.gz"),
        ("assembly-report", "_assembly_report.txt"),
        ("assembly-stats", "_assembly_stats.txt"),
        ("translated-cds", "_translated_cds.faa.gz"),
    ],
);

pub static ASSEMBLY_LEVELS: DomainTable = DomainTable::new(
    "assembly level",
    &[
        ("complete", "Complete Genome"),
        ("chromosome", "Chromosome"),
        ("scaffold", "Scaffold"),
        ("contig", "Contig"),
    ],
);

pub static REFSEQ_CATEGORIES: DomainTable = DomainTable::new(
    "refseq category",
    &[
        ("reference", "reference genome"),
        ("representative", "representative genome"),
        ("na", "na"),
    ],
);

pub static TYPE_MATERIALS: DomainTable = DomainTable::new(
    "type material",
    &[
        ("type", "assembly from type material"),
        ("reference", "assembly from reference material"),
        ("synonym", "assembly from synonym type material"),
        ("proxytype", "assembly from proxytype material"),
        ("neotype", "assembly designated as neotype"),
    ],
);
