use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::time::{Duration, SystemTime};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::error::NgdError;

pub fn ensure_dir(path: &Utf8Path) -> Result<(), NgdError> {
    if path.as_std_path().exists() && !path.is_dir() {
        return Err(NgdError::NotADirectory(path.to_path_buf()));
    }
    fs::create_dir_all(path.as_std_path()).map_err(|err| {
        if path.as_std_path().exists() && !path.is_dir() {
            NgdError::NotADirectory(path.to_path_buf())
        } else {
            NgdError::Filesystem(format!("create {path}: {err}"))
        }
    })
}

pub fn md5sum(path: &Utf8Path) -> Result<String, NgdError> {
    let mut file = File::open(path.as_std_path())
        .map_err(|err| NgdError::Filesystem(format!("open {path}: {err}")))?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|err| NgdError::Filesystem(format!("read {path}: {err}")))?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

pub fn is_fresh(path: &Utf8Path, max_age: Duration) -> bool {
    fs::metadata(path.as_std_path())
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age < max_age)
        .unwrap_or(false)
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), NgdError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    let mut temp = NamedTempFile::new_in(parent.as_std_path())
        .map_err(|err| NgdError::Filesystem(format!("temp file in {parent}: {err}")))?;
    temp.write_all(content)
        .map_err(|err| NgdError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| NgdError::Filesystem(format!("persist {path}: {err}")))?;
    Ok(())
}

// Lexical only, symlinks are not resolved.
pub fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, NgdError> {
    let absolute = std::path::absolute(path.as_std_path())
        .map_err(|err| NgdError::Filesystem(format!("resolve {path}: {err}")))?;
    let absolute = Utf8PathBuf::from_path_buf(absolute)
        .map_err(|_| NgdError::Filesystem(format!("non-utf8 path: {path}")))?;
    Ok(normalize(&absolute))
}

pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let last = normalized.components().next_back();
                if matches!(last, Some(Utf8Component::Normal(_))) {
                    normalized.pop();
                } else if !matches!(
                    last,
                    Some(Utf8Component::RootDir | Utf8Component::Prefix(_))
                ) {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_str()),
        }
    }
    normalized
}

pub fn relative_path(base_dir: &Utf8Path, target: &Utf8Path) -> Utf8PathBuf {
    let base: Vec<_> = base_dir.components().collect();
    let target_parts: Vec<_> = target.components().collect();
    let common = base
        .iter()
        .zip(&target_parts)
        .take_while(|(left, right)| left == right)
        .count();

    let mut relative = Utf8PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_str());
    }
    relative
}

pub fn create_symlink(local_file: &Utf8Path, symlink_path: &Utf8Path) -> Result<(), NgdError> {
    if fs::symlink_metadata(symlink_path.as_std_path()).is_ok() {
        fs::remove_file(symlink_path.as_std_path())
            .map_err(|err| NgdError::Filesystem(format!("remove {symlink_path}: {err}")))?;
    }

    let local_file = absolute(local_file)?;
    let link = absolute(symlink_path)?;
    let link_dir = link
        .parent()
        .ok_or_else(|| NgdError::Filesystem(format!("symlink has no parent: {link}")))?;
    let target = relative_path(link_dir, &local_file);

    symlink_file(&target, &link)
        .map_err(|err| NgdError::Filesystem(format!("symlink {link} -> {target}: {err}")))
}

pub fn points_to(symlink_path: &Utf8Path, local_file: &Utf8Path) -> Result<bool, NgdError> {
    let Ok(target) = fs::read_link(symlink_path.as_std_path()) else {
        return Ok(false);
    };
    let Ok(target) = Utf8PathBuf::from_path_buf(target) else {
        return Ok(false);
    };
    let link = absolute(symlink_path)?;
    let resolved = match link.parent() {
        Some(parent) if target.is_relative() => normalize(&parent.join(&target)),
        _ => normalize(&target),
    };
    Ok(resolved == absolute(local_file)?)
}

pub fn gunzip(path: &Utf8Path) -> Result<Utf8PathBuf, NgdError> {
    let target = Utf8PathBuf::from(path.as_str().trim_end_matches(".gz"));
    let input = File::open(path.as_std_path())
        .map_err(|err| NgdError::Filesystem(format!("open {path}: {err}")))?;
    let mut decoder = GzDecoder::new(input);
    let mut output = File::create(target.as_std_path())
        .map_err(|err| NgdError::Filesystem(format!("create {target}: {err}")))?;
    io::copy(&mut decoder, &mut output)
        .map_err(|err| NgdError::Filesystem(format!("decompress {path}: {err}")))?;
    Ok(target)
}

#[cfg(unix)]
fn symlink_file(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target.as_std_path(), link.as_std_path())
}

#[cfg(windows)]
fn symlink_file(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target.as_std_path(), link.as_std_path())
}
