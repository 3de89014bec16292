use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::domain::{
    ALL, ANY, ASSEMBLY_LEVELS, DomainTable, FORMATS, GROUPS, REFSEQ_CATEGORIES, Section,
    TYPE_MATERIALS,
};
use crate::error::NgdError;

pub const DEFAULT_URI: &str = "https://ftp.ncbi.nih.gov/genomes";

pub const FIELDS: &[&str] = &[
    "section",
    "groups",
    "file_formats",
    "assembly_levels",
    "refseq_categories",
    "type_materials",
    "genera",
    "strains",
    "species_taxids",
    "taxids",
    "assembly_accessions",
    "fuzzy_genus",
    "fuzzy_accessions",
    "output",
    "uri",
    "parallel",
    "human_readable",
    "flat_output",
    "use_cache",
    "dry_run",
    "decompress",
    "metadata_table",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListInput {
    Values(Vec<String>),
    Text(String),
}

impl From<&str> for ListInput {
    fn from(value: &str) -> Self {
        ListInput::Text(value.to_string())
    }
}

impl From<String> for ListInput {
    fn from(value: String) -> Self {
        ListInput::Text(value)
    }
}

impl From<Vec<String>> for ListInput {
    fn from(value: Vec<String>) -> Self {
        ListInput::Values(value)
    }
}

impl From<Vec<&str>> for ListInput {
    fn from(value: Vec<&str>) -> Self {
        ListInput::Values(value.into_iter().map(str::to_string).collect())
    }
}

pub fn create_list(input: ListInput, allow_filename: bool) -> Result<Vec<String>, NgdError> {
    match input {
        ListInput::Values(values) => Ok(values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()),
        ListInput::Text(text) => {
            if allow_filename && Path::new(&text).is_file() {
                let content = fs::read_to_string(&text)
                    .map_err(|err| NgdError::InvalidListSource(format!("{text}: {err}")))?;
                return Ok(content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect());
            }
            Ok(text
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect())
        }
    }
}

#[derive(Debug, Clone)]
pub struct NgdConfig {
    section: Section,
    groups: Vec<String>,
    file_formats: Vec<String>,
    assembly_levels: Vec<String>,
    refseq_categories: Vec<String>,
    type_materials: Vec<String>,
    genera: Vec<String>,
    genus_patterns: Vec<Regex>,
    strains: Vec<String>,
    species_taxids: Vec<String>,
    taxids: Vec<String>,
    assembly_accessions: Vec<String>,
    fuzzy_genus: bool,
    fuzzy_accessions: bool,
    output: Utf8PathBuf,
    uri: String,
    parallel: usize,
    human_readable: bool,
    flat_output: bool,
    use_cache: bool,
    dry_run: bool,
    decompress: bool,
    metadata_table: Option<Utf8PathBuf>,
}

impl Default for NgdConfig {
    fn default() -> Self {
        Self {
            section: Section::Refseq,
            groups: owned(GROUPS.iter().copied()),
            file_formats: vec!["genbank".to_string()],
            assembly_levels: owned(ASSEMBLY_LEVELS.keys()),
            refseq_categories: owned(REFSEQ_CATEGORIES.keys()),
            type_materials: vec![ANY.to_string()],
            genera: Vec::new(),
            genus_patterns: Vec::new(),
            strains: Vec::new(),
            species_taxids: Vec::new(),
            taxids: Vec::new(),
            assembly_accessions: Vec::new(),
            fuzzy_genus: false,
            fuzzy_accessions: false,
            output: Utf8PathBuf::from("."),
            uri: DEFAULT_URI.to_string(),
            parallel: 1,
            human_readable: false,
            flat_output: false,
            use_cache: false,
            dry_run: false,
            decompress: false,
            metadata_table: None,
        }
    }
}

impl NgdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, NgdError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.set(key.as_ref(), value.as_ref())?;
        }
        Ok(config)
    }

    pub fn set(&mut self, field: &str, value: &str) -> Result<(), NgdError> {
        match field {
            "section" => self.set_section(value.parse()?),
            "groups" => self.set_groups(value)?,
            "file_formats" => self.set_file_formats(value)?,
            "assembly_levels" => self.set_assembly_levels(value)?,
            "refseq_categories" => self.set_refseq_categories(value)?,
            "type_materials" => self.set_type_materials(value)?,
            "genera" => self.set_genera(value)?,
            "strains" => self.set_strains(value)?,
            "species_taxids" => self.set_species_taxids(value)?,
            "taxids" => self.set_taxids(value)?,
            "assembly_accessions" => self.set_assembly_accessions(value)?,
            "fuzzy_genus" => self.set_fuzzy_genus(parse_bool("fuzzy_genus", value)?),
            "fuzzy_accessions" => {
                self.set_fuzzy_accessions(parse_bool("fuzzy_accessions", value)?)
            }
            "output" => self.set_output(value),
            "uri" => self.set_uri(value),
            "parallel" => {
                let parallel = value.trim().parse().map_err(|_| NgdError::InvalidValue {
                    field: "parallel",
                    value: value.to_string(),
                })?;
                self.set_parallel(parallel)?
            }
            "human_readable" => self.set_human_readable(parse_bool("human_readable", value)?),
            "flat_output" => self.set_flat_output(parse_bool("flat_output", value)?),
            "use_cache" => self.set_use_cache(parse_bool("use_cache", value)?),
            "dry_run" => self.set_dry_run(parse_bool("dry_run", value)?),
            "decompress" => self.set_decompress(parse_bool("decompress", value)?),
            "metadata_table" => {
                let trimmed = value.trim();
                self.set_metadata_table((!trimmed.is_empty()).then(|| Utf8PathBuf::from(trimmed)))
            }
            other => return Err(NgdError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    pub fn set_section(&mut self, section: Section) {
        self.section = section;
    }

    pub fn set_groups(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        let values = create_list(value.into(), false)?;
        self.groups = expand_choices("group", values, GROUPS)?;
        Ok(())
    }

    pub fn set_file_formats(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        self.file_formats = expand_table(&FORMATS, create_list(value.into(), false)?)?;
        Ok(())
    }

    pub fn set_assembly_levels(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        self.assembly_levels = expand_table(&ASSEMBLY_LEVELS, create_list(value.into(), false)?)?;
        Ok(())
    }

    pub fn set_refseq_categories(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        self.refseq_categories =
            expand_table(&REFSEQ_CATEGORIES, create_list(value.into(), false)?)?;
        Ok(())
    }

    pub fn set_type_materials(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        let values = create_list(value.into(), false)?;
        if values.iter().any(|value| value == ANY) {
            if let Some(bad) = values
                .iter()
                .find(|value| *value != ANY && *value != ALL && !TYPE_MATERIALS.contains(value))
            {
                return Err(NgdError::UnsupportedChoice {
                    field: TYPE_MATERIALS.name(),
                    value: bad.clone(),
                });
            }
            self.type_materials = vec![ANY.to_string()];
            return Ok(());
        }
        self.type_materials = expand_table(&TYPE_MATERIALS, values)?;
        Ok(())
    }

    pub fn set_genera(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        let genera = create_list(value.into(), true)?;
        let patterns = genera
            .iter()
            .map(|genus| {
                RegexBuilder::new(&regex::escape(genus))
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| NgdError::InvalidValue {
                        field: "genera",
                        value: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.genera = genera;
        self.genus_patterns = patterns;
        Ok(())
    }

    pub fn set_strains(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        self.strains = create_list(value.into(), true)?;
        Ok(())
    }

    pub fn set_species_taxids(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        self.species_taxids = create_list(value.into(), true)?;
        Ok(())
    }

    pub fn set_taxids(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        self.taxids = create_list(value.into(), true)?;
        Ok(())
    }

    pub fn set_assembly_accessions(&mut self, value: impl Into<ListInput>) -> Result<(), NgdError> {
        self.assembly_accessions = create_list(value.into(), true)?;
        Ok(())
    }

    pub fn set_fuzzy_genus(&mut self, fuzzy: bool) {
        self.fuzzy_genus = fuzzy;
    }

    pub fn set_fuzzy_accessions(&mut self, fuzzy: bool) {
        self.fuzzy_accessions = fuzzy;
    }

    pub fn set_output(&mut self, output: impl Into<Utf8PathBuf>) {
        self.output = output.into();
    }

    pub fn set_uri(&mut self, uri: &str) {
        self.uri = uri.trim().trim_end_matches('/').to_string();
    }

    pub fn set_parallel(&mut self, parallel: usize) -> Result<(), NgdError> {
        if parallel == 0 {
            return Err(NgdError::InvalidValue {
                field: "parallel",
                value: parallel.to_string(),
            });
        }
        self.parallel = parallel;
        Ok(())
    }

    pub fn set_human_readable(&mut self, human_readable: bool) {
        self.human_readable = human_readable;
    }

    pub fn set_flat_output(&mut self, flat_output: bool) {
        self.flat_output = flat_output;
    }

    pub fn set_use_cache(&mut self, use_cache: bool) {
        self.use_cache = use_cache;
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn set_decompress(&mut self, decompress: bool) {
        self.decompress = decompress;
    }

    pub fn set_metadata_table(&mut self, path: Option<Utf8PathBuf>) {
        self.metadata_table = path;
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn file_formats(&self) -> &[String] {
        &self.file_formats
    }

    pub fn assembly_levels(&self) -> &[String] {
        &self.assembly_levels
    }

    pub fn refseq_categories(&self) -> &[String] {
        &self.refseq_categories
    }

    pub fn type_materials(&self) -> &[String] {
        &self.type_materials
    }

    pub fn genera(&self) -> &[String] {
        &self.genera
    }

    pub fn strains(&self) -> &[String] {
        &self.strains
    }

    pub fn species_taxids(&self) -> &[String] {
        &self.species_taxids
    }

    pub fn taxids(&self) -> &[String] {
        &self.taxids
    }

    pub fn assembly_accessions(&self) -> &[String] {
        &self.assembly_accessions
    }

    pub fn fuzzy_genus(&self) -> bool {
        self.fuzzy_genus
    }

    pub fn fuzzy_accessions(&self) -> bool {
        self.fuzzy_accessions
    }

    pub fn output(&self) -> &Utf8Path {
        &self.output
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn parallel(&self) -> usize {
        self.parallel
    }

    pub fn human_readable(&self) -> bool {
        self.human_readable
    }

    pub fn flat_output(&self) -> bool {
        self.flat_output
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn decompress(&self) -> bool {
        self.decompress
    }

    pub fn metadata_table(&self) -> Option<&Utf8Path> {
        self.metadata_table.as_deref()
    }

    pub fn is_compatible_assembly_accession(&self, accession: &str) -> bool {
        if self.assembly_accessions.is_empty() {
            return true;
        }
        if self.fuzzy_accessions {
            return self
                .assembly_accessions
                .iter()
                .any(|prefix| accession.starts_with(prefix.as_str()));
        }
        self.assembly_accessions
            .iter()
            .any(|candidate| candidate == accession)
    }

    pub fn is_compatible_assembly_level(&self, ncbi_level: &str) -> bool {
        is_configured(&ASSEMBLY_LEVELS, &self.assembly_levels, ncbi_level)
    }

    pub fn is_compatible_refseq_category(&self, ncbi_category: &str) -> bool {
        is_configured(&REFSEQ_CATEGORIES, &self.refseq_categories, ncbi_category)
    }

    pub fn is_compatible_type_material(&self, relation: &str) -> bool {
        if self.type_materials.iter().any(|value| value == ANY) {
            return true;
        }
        !relation.is_empty() && is_configured(&TYPE_MATERIALS, &self.type_materials, relation)
    }

    pub fn is_compatible_genus(&self, organism_name: &str) -> bool {
        if self.genera.is_empty() {
            return true;
        }
        if self.fuzzy_genus {
            return self
                .genus_patterns
                .iter()
                .any(|pattern| pattern.is_match(organism_name));
        }
        self.genera.iter().any(|genus| {
            organism_name.starts_with(genus.as_str())
                || organism_name.starts_with(capitalize(genus).as_str())
        })
    }

    pub fn is_compatible_strain(&self, label: &str) -> bool {
        self.strains.is_empty() || self.strains.iter().any(|strain| strain == label)
    }

    pub fn is_compatible_species_taxid(&self, species_taxid: &str) -> bool {
        self.species_taxids.is_empty() || self.species_taxids.iter().any(|id| id == species_taxid)
    }

    pub fn is_compatible_taxid(&self, taxid: &str) -> bool {
        self.taxids.is_empty() || self.taxids.iter().any(|id| id == taxid)
    }

    pub fn get_choices(field: &str) -> Result<Vec<String>, NgdError> {
        let choices = match field {
            "section" => owned(Section::CHOICES.iter().copied()),
            "groups" => owned(std::iter::once(ALL).chain(GROUPS.iter().copied())),
            "file_formats" => owned(FORMATS.keys().chain(std::iter::once(ALL))),
            "assembly_levels" => owned(std::iter::once(ALL).chain(ASSEMBLY_LEVELS.keys())),
            "refseq_categories" => owned(std::iter::once(ALL).chain(REFSEQ_CATEGORIES.keys())),
            "type_materials" => owned([ANY, ALL].into_iter().chain(TYPE_MATERIALS.keys())),
            other if FIELDS.contains(&other) => {
                return Err(NgdError::NoChoices(other.to_string()));
            }
            other => return Err(NgdError::UnknownOption(other.to_string())),
        };
        Ok(choices)
    }

    pub fn get_default(field: &str) -> Result<String, NgdError> {
        let value = match field {
            "section" => "refseq",
            "groups" | "assembly_levels" | "refseq_categories" => ALL,
            "file_formats" => "genbank",
            "type_materials" => ANY,
            "genera" | "strains" | "species_taxids" | "taxids" | "assembly_accessions"
            | "metadata_table" => "",
            "fuzzy_genus" | "fuzzy_accessions" | "human_readable" | "flat_output"
            | "use_cache" | "dry_run" | "decompress" => "false",
            "output" => ".",
            "uri" => DEFAULT_URI,
            "parallel" => "1",
            other => return Err(NgdError::UnknownOption(other.to_string())),
        };
        Ok(value.to_string())
    }
}

fn owned<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values.map(str::to_string).collect()
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, NgdError> {
    value.trim().parse().map_err(|_| NgdError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn expand_choices(
    field: &'static str,
    values: Vec<String>,
    domain: &[&str],
) -> Result<Vec<String>, NgdError> {
    if values.is_empty() {
        return Err(NgdError::InvalidValue {
            field,
            value: String::new(),
        });
    }
    if let Some(bad) = values
        .iter()
        .find(|value| *value != ALL && !domain.contains(&value.as_str()))
    {
        return Err(NgdError::UnsupportedChoice {
            field,
            value: bad.clone(),
        });
    }
    if values.iter().any(|value| value == ALL) {
        return Ok(owned(domain.iter().copied()));
    }
    Ok(values)
}

fn expand_table(table: &DomainTable, values: Vec<String>) -> Result<Vec<String>, NgdError> {
    let domain: Vec<&str> = table.keys().collect();
    expand_choices(table.name(), values, &domain)
}

fn is_configured(table: &DomainTable, configured: &[String], ncbi_value: &str) -> bool {
    table
        .key_for(ncbi_value)
        .map(|key| configured.iter().any(|value| value == key))
        .unwrap_or(false)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub section: Option<Section>,
    #[serde(default)]
    pub groups: Option<ListEntry>,
    #[serde(default)]
    pub file_formats: Option<ListEntry>,
    #[serde(default)]
    pub assembly_levels: Option<ListEntry>,
    #[serde(default)]
    pub refseq_categories: Option<ListEntry>,
    #[serde(default)]
    pub type_materials: Option<ListEntry>,
    #[serde(default)]
    pub genera: Option<ListEntry>,
    #[serde(default)]
    pub strains: Option<ListEntry>,
    #[serde(default)]
    pub species_taxids: Option<ListEntry>,
    #[serde(default)]
    pub taxids: Option<ListEntry>,
    #[serde(default)]
    pub assembly_accessions: Option<ListEntry>,
    #[serde(default)]
    pub fuzzy_genus: Option<bool>,
    #[serde(default)]
    pub fuzzy_accessions: Option<bool>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub parallel: Option<usize>,
    #[serde(default)]
    pub human_readable: Option<bool>,
    #[serde(default)]
    pub flat_output: Option<bool>,
    #[serde(default)]
    pub use_cache: Option<bool>,
    #[serde(default)]
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub decompress: Option<bool>,
    #[serde(default)]
    pub metadata_table: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEntry {
    Shorthand(String),
    Detailed(Vec<String>),
}

impl From<ListEntry> for ListInput {
    fn from(value: ListEntry) -> Self {
        match value {
            ListEntry::Shorthand(text) => ListInput::Text(text),
            ListEntry::Detailed(values) => ListInput::Values(values),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: &Path) -> Result<NgdConfig, NgdError> {
        let content = fs::read_to_string(path)
            .map_err(|_| NgdError::ConfigRead(PathBuf::from(path)))?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|err| NgdError::ConfigParse(err.to_string()))?;
        Self::resolve_config(file)
    }

    pub fn resolve_config(file: ConfigFile) -> Result<NgdConfig, NgdError> {
        let mut config = NgdConfig::default();

        if let Some(section) = file.section {
            config.set_section(section);
        }
        if let Some(groups) = file.groups {
            config.set_groups(groups)?;
        }
        if let Some(formats) = file.file_formats {
            config.set_file_formats(formats)?;
        }
        if let Some(levels) = file.assembly_levels {
            config.set_assembly_levels(levels)?;
        }
        if let Some(categories) = file.refseq_categories {
            config.set_refseq_categories(categories)?;
        }
        if let Some(types) = file.type_materials {
            config.set_type_materials(types)?;
        }
        if let Some(genera) = file.genera {
            config.set_genera(genera)?;
        }
        if let Some(strains) = file.strains {
            config.set_strains(strains)?;
        }
        if let Some(ids) = file.species_taxids {
            config.set_species_taxids(ids)?;
        }
        if let Some(ids) = file.taxids {
            config.set_taxids(ids)?;
        }
        if let Some(accessions) = file.assembly_accessions {
            config.set_assembly_accessions(accessions)?;
        }
        if let Some(output) = file.output {
            config.set_output(output);
        }
        if let Some(uri) = file.uri {
            config.set_uri(&uri);
        }
        if let Some(parallel) = file.parallel {
            config.set_parallel(parallel)?;
        }
        config.set_fuzzy_genus(file.fuzzy_genus.unwrap_or(false));
        config.set_fuzzy_accessions(file.fuzzy_accessions.unwrap_or(false));
        config.set_human_readable(file.human_readable.unwrap_or(false));
        config.set_flat_output(file.flat_output.unwrap_or(false));
        config.set_use_cache(file.use_cache.unwrap_or(false));
        config.set_dry_run(file.dry_run.unwrap_or(false));
        config.set_decompress(file.decompress.unwrap_or(false));
        config.set_metadata_table(file.metadata_table.map(Utf8PathBuf::from));

        Ok(config)
    }
}
