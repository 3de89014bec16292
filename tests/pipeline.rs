use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;

use ncbi_genome_download::app::{Downloader, Outcome};
use ncbi_genome_download::cache::SummaryCache;
use ncbi_genome_download::checksum::{self, ChecksumEntry};
use ncbi_genome_download::client::ArchiveClient;
use ncbi_genome_download::config::NgdConfig;
use ncbi_genome_download::error::NgdError;
use ncbi_genome_download::jobs::create_downloadjob;
use ncbi_genome_download::select::select_candidates;
use ncbi_genome_download::worker::Cancellation;

const URI: &str = "https://fake/genomes";
const SUMMARY_URL: &str = "https://fake/genomes/refseq/bacteria/assembly_summary.txt";

const ROWS: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    // accession, organism, infraspecific, isolate, level, category, type material
    (
        "GCF_000001.1",
        "Example species",
        "strain=ABC 1234",
        "",
        "Complete Genome",
        "representative genome",
        "",
    ),
    ("GCF_000002.1", "Example other", "", "ISO1", "Scaffold", "na", ""),
    (
        "GCF_000003.1",
        "Other genus",
        "",
        "",
        "Contig",
        "reference genome",
        "assembly from type material",
    ),
    ("GCF_000004.1", "Example third XYZ", "", "", "Chromosome", "na", ""),
];

struct MockArchive {
    resources: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
    offline: bool,
}

impl MockArchive {
    fn new() -> Self {
        Self {
            resources: HashMap::new(),
            requests: Mutex::new(Vec::new()),
            offline: false,
        }
    }

    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::new()
        }
    }

    fn insert(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.resources.insert(url.into(), body.into());
    }

    fn lookup(&self, url: &str) -> Result<&[u8], NgdError> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.offline {
            return Err(NgdError::Connection(format!("offline: {url}")));
        }
        self.resources
            .get(url)
            .map(Vec::as_slice)
            .ok_or_else(|| NgdError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }

    fn requested(&self, url: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|seen| seen == url)
    }

    fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl ArchiveClient for MockArchive {
    fn get_text(&self, url: &str) -> Result<String, NgdError> {
        Ok(String::from_utf8_lossy(self.lookup(url)?).into_owned())
    }

    fn download(
        &self,
        url: &str,
        destination: &Path,
        _cancel: &Cancellation,
    ) -> Result<(), NgdError> {
        let body = self.lookup(url)?;
        fs::write(destination, body).map_err(|err| NgdError::Filesystem(err.to_string()))
    }
}

fn summary_text() -> String {
    let mut text = String::from("#   See ftp://fake/README_assembly_summary.txt\n");
    text.push_str(
        "# assembly_accession\ttaxid\tspecies_taxid\torganism_name\tinfraspecific_name\t\
         isolate\tassembly_level\trefseq_category\trelation_to_type_material\tftp_path\n",
    );
    for (index, row) in ROWS.iter().enumerate() {
        let (accession, organism, strain, isolate, level, category, relation) = row;
        text.push_str(&format!(
            "{accession}\t{taxid}\t{species_taxid}\t{organism}\t{strain}\t{isolate}\t\
             {level}\t{category}\t{relation}\t{ftp}\n",
            taxid = 1000 + index,
            species_taxid = 2000 + index,
            ftp = ftp_path(accession),
        ));
    }
    text
}

fn ftp_path(accession: &str) -> String {
    format!("ftp://fake/genomes/all/{accession}")
}

fn file_url(accession: &str, file: &str) -> String {
    format!("https://fake/genomes/all/{accession}/{file}")
}

fn manifest_url(accession: &str) -> String {
    file_url(accession, "md5checksums.txt")
}

fn genbank_name(accession: &str) -> String {
    format!("{accession}_genomic.gbff.gz")
}

fn archive() -> MockArchive {
    let mut archive = MockArchive::new();
    archive.insert(SUMMARY_URL, summary_text());
    for (accession, ..) in ROWS {
        let name = genbank_name(accession);
        let body = format!("LOCUS {accession}\n").into_bytes();
        let fasta = format!("{accession}_genomic.fna.gz");
        let fasta_body = gzip(format!(">{accession}\nACGT\n").as_bytes());
        archive.insert(
            manifest_url(accession),
            format!(
                "{}  ./{name}\n{}  ./{fasta}\n",
                md5_hex(&body),
                md5_hex(&fasta_body)
            ),
        );
        archive.insert(file_url(accession, &name), body);
        archive.insert(file_url(accession, &fasta), fasta_body);
    }
    archive
}

fn md5_hex(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}

fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, path)
}

fn config(output: &Utf8Path) -> NgdConfig {
    let mut config = NgdConfig::default();
    config.set_groups("bacteria").unwrap();
    config.set_uri(URI);
    config.set_output(output);
    config
}

fn assembly_file(output: &Utf8Path, accession: &str) -> Utf8PathBuf {
    output
        .join("refseq")
        .join("bacteria")
        .join(accession)
        .join(genbank_name(accession))
}

#[test]
fn every_row_matches_default_filters() {
    let (_guard, output) = scratch();
    let archive = archive();
    let candidates = select_candidates(&config(&output), &archive, None).unwrap();
    assert_eq!(candidates.len(), 4);
    assert!(candidates.iter().all(|candidate| candidate.group == "bacteria"));

    let report = Downloader::new(archive, None)
        .download(&config(&output), &Cancellation::new())
        .unwrap();
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.candidates, 4);
    assert_eq!(report.jobs, 4);
    assert_eq!(report.done, 4);
    for (accession, ..) in ROWS {
        let file = assembly_file(&output, accession);
        assert_eq!(fs::read_to_string(&file).unwrap(), format!("LOCUS {accession}\n"));
        assert!(file.parent().unwrap().join("MD5SUMS").is_file());
    }
}

#[test]
fn assembly_level_selects_complete_genomes() {
    let (_guard, output) = scratch();
    let mut config = config(&output);
    config.set_assembly_levels("complete").unwrap();
    let candidates = select_candidates(&config, &archive(), None).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].entry.assembly_level(), "Complete Genome");
}

#[test]
fn changed_local_file_gets_expected_checksum() {
    let (_guard, output) = scratch();
    let archive = archive();
    let config = config(&output);
    let candidate = select_candidates(&config, &archive, None).unwrap().remove(0);
    let accession = candidate.entry.accession().to_string();

    let local = assembly_file(&output, &accession);
    fs::create_dir_all(local.parent().unwrap()).unwrap();
    fs::write(&local, "tampered").unwrap();

    let manifest = archive.get_text(&manifest_url(&accession)).unwrap();
    let checksums = checksum::parse_checksums(&manifest);
    assert!(checksum::has_file_changed(local.parent().unwrap(), &checksums, "genbank").unwrap());

    let jobs = create_downloadjob(&candidate.entry, "bacteria", &config, &archive, None).unwrap();
    assert_eq!(jobs.len(), 1);
    let expected = &checksum::lookup(&checksums, "genbank").unwrap().checksum;
    assert_eq!(jobs[0].expected_checksum.as_ref(), Some(expected));
    assert_ne!(Some(&md5_hex(b"tampered")), jobs[0].expected_checksum.as_ref());
}

#[test]
fn no_matches_skips_job_building() {
    let (_guard, output) = scratch();
    let archive = archive();
    let mut config = config(&output);
    config.set_genera("Nonexistent").unwrap();

    let downloader = Downloader::new(archive, None);
    let report = downloader.download(&config, &Cancellation::new()).unwrap();
    assert_eq!(report.outcome, Outcome::NoMatches);
    assert_eq!(report.outcome.code(), 1);
    assert!(downloader.client().requested(SUMMARY_URL));
    for (accession, ..) in ROWS {
        assert!(!downloader.client().requested(&manifest_url(accession)));
    }
    assert!(!output.join("refseq").as_std_path().exists());
}

#[test]
fn connection_errors_ask_for_a_retry() {
    let (_guard, output) = scratch();
    let report = Downloader::new(MockArchive::offline(), None)
        .download(&config(&output), &Cancellation::new())
        .unwrap();
    assert_eq!(report.outcome, Outcome::Retry);
    assert_eq!(report.outcome.code(), 75);
}

#[test]
fn second_run_downloads_nothing() {
    let (_guard, output) = scratch();
    let downloader = Downloader::new(archive(), None);
    let config = config(&output);

    let first = downloader.download(&config, &Cancellation::new()).unwrap();
    assert_eq!(first.jobs, 4);

    downloader.client().clear_requests();
    let second = downloader.download(&config, &Cancellation::new()).unwrap();
    assert_eq!(second.outcome, Outcome::Success);
    assert_eq!(second.jobs, 0);
    for (accession, ..) in ROWS {
        assert!(!downloader.client().requested(&manifest_url(accession)));
    }
}

#[test]
fn human_readable_tree_on_existing_files_needs_only_symlinks() {
    let (_guard, output) = scratch();
    let archive = archive();
    let mut config = config(&output);
    Downloader::new(archive, None)
        .download(&config, &Cancellation::new())
        .unwrap();

    config.set_human_readable(true);
    let archive = self::archive();
    let candidates = select_candidates(&config, &archive, None).unwrap();
    let mut jobs = Vec::new();
    for candidate in &candidates {
        let built = create_downloadjob(&candidate.entry, "bacteria", &config, &archive, None);
        jobs.extend(built.unwrap());
    }
    assert_eq!(jobs.len(), 4);
    assert!(jobs.iter().all(|job| job.full_url.is_none() && job.symlink_path.is_some()));

    let report = Downloader::new(archive, None)
        .download(&config, &Cancellation::new())
        .unwrap();
    assert_eq!(report.done, 4);

    let link = output
        .join("human_readable/refseq/bacteria/Example/species/ABC_1234")
        .join(genbank_name("GCF_000001.1"));
    assert!(fs::read_link(&link).unwrap().is_relative());
    assert_eq!(fs::read_to_string(&link).unwrap(), "LOCUS GCF_000001.1\n");

    let fourth = output
        .join("human_readable/refseq/bacteria/Example/third/XYZ")
        .join(genbank_name("GCF_000004.1"));
    assert!(fourth.as_std_path().exists());

    let again = Downloader::new(self::archive(), None)
        .download(&config, &Cancellation::new())
        .unwrap();
    assert_eq!(again.jobs, 0);
}

#[test]
fn stricter_filters_select_a_subset() {
    let (_guard, output) = scratch();
    let archive = archive();
    let loose = config(&output);
    let mut strict = config(&output);
    strict.set_genera("Example").unwrap();
    strict.set_refseq_categories("na").unwrap();

    let accessions = |config: &NgdConfig| -> Vec<String> {
        select_candidates(config, &archive, None)
            .unwrap()
            .into_iter()
            .map(|candidate| candidate.entry.accession().to_string())
            .collect()
    };
    let all = accessions(&loose);
    let some = accessions(&strict);
    assert_eq!(some, ["GCF_000002.1", "GCF_000004.1"]);
    assert!(some.iter().all(|accession| all.contains(accession)));
}

fn selected(config: &NgdConfig, archive: &MockArchive) -> Vec<String> {
    select_candidates(config, archive, None)
        .unwrap()
        .into_iter()
        .map(|candidate| candidate.entry.accession().to_string())
        .collect()
}

#[test]
fn type_material_filter() {
    let (_guard, output) = scratch();
    let archive = archive();
    let mut config = config(&output);

    config.set_type_materials("type").unwrap();
    assert_eq!(selected(&config, &archive), ["GCF_000003.1"]);

    config.set_type_materials("neotype").unwrap();
    assert!(selected(&config, &archive).is_empty());

    config.set_type_materials("any").unwrap();
    assert_eq!(selected(&config, &archive).len(), 4);
}

#[test]
fn taxid_and_species_taxid_filters_are_separate() {
    let (_guard, output) = scratch();
    let archive = archive();

    let mut by_taxid = config(&output);
    by_taxid.set_taxids("1002").unwrap();
    assert_eq!(selected(&by_taxid, &archive), ["GCF_000003.1"]);
    by_taxid.set_taxids("2002").unwrap();
    assert!(selected(&by_taxid, &archive).is_empty());

    let mut by_species = config(&output);
    by_species.set_species_taxids("2003").unwrap();
    assert_eq!(selected(&by_species, &archive), ["GCF_000004.1"]);
    by_species.set_species_taxids("1003").unwrap();
    assert!(selected(&by_species, &archive).is_empty());
}

#[test]
fn fuzzy_accessions_match_prefixes() {
    let (_guard, output) = scratch();
    let archive = archive();
    let mut config = config(&output);
    config.set_assembly_accessions("GCF_000003").unwrap();
    assert!(select_candidates(&config, &archive, None).unwrap().is_empty());

    config.set_fuzzy_accessions(true);
    let candidates = select_candidates(&config, &archive, None).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].entry.accession(), "GCF_000003.1");
}

#[test]
fn dry_run_lists_without_writing() {
    let (_guard, output) = scratch();
    let mut config = config(&output);
    config.set_dry_run(true);
    let report = Downloader::new(archive(), None)
        .download(&config, &Cancellation::new())
        .unwrap();
    assert_eq!(report.outcome, Outcome::Success);
    let listing = report.dry_run.unwrap();
    assert_eq!(listing.len(), 4);
    assert_eq!(listing[0].strain, "ABC_1234");
    assert_eq!(listing[1].strain, "ISO1");
    assert_eq!(listing[2].strain, "GCF_000003.1");
    assert!(!output.join("refseq").as_std_path().exists());
}

#[test]
fn metadata_table_has_a_row_per_download() {
    let (_guard, output) = scratch();
    let table = output.join("metadata.tsv");
    let mut config = config(&output);
    config.set_file_formats("genbank,fasta").unwrap();
    config.set_metadata_table(Some(table.clone()));

    let report = Downloader::new(archive(), None)
        .download(&config, &Cancellation::new())
        .unwrap();
    assert_eq!(report.jobs, 8);

    let content = fs::read_to_string(&table).unwrap();
    let mut lines = content.lines();
    let header: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert_eq!(header.len(), 23);
    assert_eq!(header.last(), Some(&"local_filename"));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|row| row.split('\t').last().unwrap().starts_with("./")));
    assert!(rows[0].starts_with("GCF_000001.1\t"));
}

#[test]
fn flat_output_fetches_manifests_every_time() {
    let (_guard, output) = scratch();
    let mut config = config(&output);
    config.set_flat_output(true);
    let downloader = Downloader::new(archive(), None);
    downloader.download(&config, &Cancellation::new()).unwrap();

    for (accession, ..) in ROWS {
        assert!(output.join(genbank_name(accession)).is_file());
    }
    assert!(!output.join("MD5SUMS").as_std_path().exists());

    downloader.client().clear_requests();
    let second = downloader.download(&config, &Cancellation::new()).unwrap();
    assert_eq!(second.jobs, 0);
    assert!(downloader.client().requested(&manifest_url("GCF_000001.1")));
}

#[test]
fn missing_format_skips_only_that_format() {
    let (_guard, output) = scratch();
    let mut config = config(&output);
    config.set_file_formats("genbank,gff").unwrap();
    let report = Downloader::new(archive(), None)
        .download(&config, &Cancellation::new())
        .unwrap();
    assert_eq!(report.jobs, 4);
    assert_eq!(report.failed, 0);
}

#[test]
fn parallel_runs_download_everything() {
    let (_guard, output) = scratch();
    let mut config = config(&output);
    config.set_parallel(3).unwrap();
    config.set_file_formats("fasta").unwrap();
    config.set_decompress(true);
    let report = Downloader::new(archive(), None)
        .download(&config, &Cancellation::new())
        .unwrap();
    assert_eq!(report.done, 4);
    assert_eq!(report.failed, 0);

    let dir = output.join("refseq/bacteria/GCF_000002.1");
    assert_eq!(
        fs::read_to_string(dir.join("GCF_000002.1_genomic.fna")).unwrap(),
        ">GCF_000002.1\nACGT\n"
    );
    assert!(dir.join("GCF_000002.1_genomic.fna.gz").is_file());
}

#[test]
fn cached_summary_is_reused() {
    let (_guard, output) = scratch();
    let cache = SummaryCache::new(output.join("cache"));
    let mut config = config(&output.join("data"));
    config.set_use_cache(true);

    let downloader = Downloader::new(archive(), Some(cache.clone()));
    config.set_dry_run(true);
    downloader.download(&config, &Cancellation::new()).unwrap();
    assert!(cache.path(config.section(), "bacteria").is_file());

    downloader.client().clear_requests();
    let report = downloader.download(&config, &Cancellation::new()).unwrap();
    assert_eq!(report.candidates, 4);
    assert!(!downloader.client().requested(SUMMARY_URL));
}

#[test]
fn interrupted_runs_report_failure() {
    let (_guard, output) = scratch();
    let cancel = Cancellation::new();
    cancel.cancel();
    let report = Downloader::new(archive(), None)
        .download(&config(&output), &cancel)
        .unwrap();
    assert_eq!(report.outcome, Outcome::Failure);
}

#[test]
fn path_conflicts_are_fatal() {
    let (_guard, output) = scratch();
    fs::create_dir_all(output.join("refseq/bacteria")).unwrap();
    fs::write(output.join("refseq/bacteria/GCF_000001.1"), "not a dir").unwrap();
    let result = Downloader::new(archive(), None).download(&config(&output), &Cancellation::new());
    assert_matches!(result, Err(NgdError::NotADirectory(_)));
}

#[test]
fn checksum_lines_survive_parsing() {
    let entries = [
        ChecksumEntry::new("d3c2634cedd0efe05cbf8a5f5384d921", "X_genomic.fna.gz"),
        ChecksumEntry::new("42c1bb1447aea2512a17aeb3645b55e9", "X_cds_from_genomic.fna.gz"),
    ];
    let manifest: String = entries
        .iter()
        .map(|entry| format!("{}  ./{}\n", entry.checksum, entry.file))
        .collect();
    let parsed = checksum::parse_checksums(&manifest);
    assert_eq!(
        checksum::get_name_and_checksum(&parsed, "_genomic.fna.gz").unwrap(),
        &entries[0]
    );
    assert_eq!(
        checksum::get_name_and_checksum(&parsed, "_cds_from_genomic.fna.gz").unwrap(),
        &entries[1]
    );
}
