use crate::archive;
use crate::error::SubwrapError;
use crate::processor::{self, WrapOpts};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const EXTENSION: &str = ".srt";

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub recursive: bool,
    pub archive: bool,
    pub wrap: WrapOpts,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Rewritten,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct Report {
    pub archive: Option<PathBuf>,
    pub rewritten: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rewraps every subtitle file under `root`.
///
/// When archiving is enabled, all originals are stored before the first file
/// is touched; if that fails nothing is rewritten. A file that cannot be read,
/// decoded or written back is recorded in the report and the rest of the batch
/// carries on.
pub fn run(root: &Path, opts: Options) -> Result<Report> {
    if !root.is_dir() {
        return Err(SubwrapError::InvalidDirectory(root.to_path_buf()).into());
    }

    let files = discover(root, opts.recursive);
    let mut report = Report::default();
    if files.is_empty() {
        info!(dir = %root.display(), "No subtitle files found");
        return Ok(report);
    }

    if opts.archive {
        report.archive = Some(archive::archive(root, &files)?);
    }

    for file in files {
        info!(file = %file.display(), "Processing");
        match rewrap_file(&file, opts.wrap) {
            Ok(Outcome::Rewritten) => {
                info!(file = %file.display(), "Rewrapped");
                report.rewritten.push(file);
            }
            Ok(Outcome::Unchanged) => {
                info!(file = %file.display(), "Already wrapped, left untouched");
                report.unchanged.push(file);
            }
            Err(err) => {
                warn!(file = %file.display(), error = %format!("{:#}", err), "Skipping file");
                report.failed.push((file, err));
            }
        }
    }

    info!(
        rewritten = report.rewritten.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        archive = ?report.archive,
        "Batch finished"
    );
    Ok(report)
}

/// Lists the `.srt` files in `root`, descending into subdirectories only when
/// `recursive` is set. Entries are sorted by name within each directory.
/// Symlinks to regular files count as files; linked directories are not
/// entered.
pub fn discover(root: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| is_subtitle(entry.path()) && entry.path().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn is_subtitle(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.ends_with(EXTENSION))
}

/// Rewraps one file in place. Nothing is written unless the whole document
/// was read and decoded, and the new content replaces the old in one rename.
pub fn rewrap_file(path: &Path, opts: WrapOpts) -> Result<Outcome> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let data = String::from_utf8(bytes).map_err(|_| SubwrapError::NotUtf8(path.to_path_buf()))?;

    let processed = processor::process(&data, opts);
    debug!(
        file = %path.display(),
        subtitles = processed.subtitles,
        opaque = processed.opaque,
        "Parsed document"
    );
    if processed.text == data {
        return Ok(Outcome::Unchanged);
    }

    write_atomic(path, processed.text.as_bytes())
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(Outcome::Rewritten)
}

// Writes through symlinks: the link's target is what gets replaced.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let target = fs::canonicalize(path)?;
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(&target)?.permissions();
    if permissions.readonly() {
        return Err(SubwrapError::ReadOnly(path.to_path_buf()).into());
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(&target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str =
        "1\n00:00:01,000 --> 00:00:04,000\nThe quick brown fox jumps over the lazy dog repeatedly today\n";
    const WRAPPED: &str =
        "1\n00:00:01,000 --> 00:00:04,000\nThe quick brown fox\njumps over the lazy\ndog repeatedly today\n";

    const BROKEN: &[u8] = &[0xff, 0xfe, 0x00, 0x31];

    fn opts(recursive: bool, archive: bool) -> Options {
        Options {
            recursive,
            archive,
            wrap: WrapOpts { width: 20 },
        }
    }

    fn archived_names(path: &Path) -> Vec<String> {
        let file = fs::File::open(path).unwrap();
        let zip = zip::ZipArchive::new(file).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn only_srt_files_are_processed_and_archived() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.srt"), LONG).unwrap();
        fs::write(dir.path().join("b.srt"), LONG).unwrap();
        fs::write(dir.path().join("notes.txt"), LONG).unwrap();

        let report = run(dir.path(), opts(false, true)).unwrap();

        assert!(report.is_success());
        assert_eq!(report.rewritten.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("a.srt")).unwrap(), WRAPPED);
        assert_eq!(fs::read_to_string(dir.path().join("b.srt")).unwrap(), WRAPPED);
        assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), LONG);

        let archive = report.archive.unwrap();
        assert_eq!(archive, dir.path().join("backup.zip"));
        assert_eq!(archived_names(&archive), vec!["a.srt", "b.srt"]);
    }

    #[test]
    fn archive_holds_original_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.srt"), LONG).unwrap();

        let report = run(dir.path(), opts(false, true)).unwrap();

        let file = fs::File::open(report.archive.unwrap()).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut zip.by_name("a.srt").unwrap(), &mut contents).unwrap();
        assert_eq!(contents, LONG);
    }

    #[test]
    fn no_archive_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.srt", "b.srt", "c.srt"] {
            fs::write(dir.path().join(name), LONG).unwrap();
        }

        let report = run(dir.path(), opts(false, false)).unwrap();

        assert_eq!(report.rewritten.len(), 3);
        assert!(report.archive.is_none());
        assert!(!dir.path().join("backup.zip").exists());
    }

    #[test]
    fn recursion_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("top.srt"), LONG).unwrap();
        fs::write(sub.join("nested.srt"), LONG).unwrap();

        run(dir.path(), opts(false, false)).unwrap();
        assert_eq!(fs::read_to_string(sub.join("nested.srt")).unwrap(), LONG);

        let report = run(dir.path(), opts(true, true)).unwrap();
        assert_eq!(fs::read_to_string(sub.join("nested.srt")).unwrap(), WRAPPED);
        assert_eq!(report.rewritten, vec![sub.join("nested.srt")]);
        assert_eq!(report.unchanged, vec![dir.path().join("top.srt")]);
        assert_eq!(
            archived_names(&report.archive.unwrap()),
            vec!["sub/nested.srt", "top.srt"]
        );
    }

    #[test]
    fn bad_file_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.srt");
        fs::write(&broken, BROKEN).unwrap();
        fs::write(dir.path().join("good.srt"), LONG).unwrap();

        let report = run(dir.path(), opts(false, true)).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, broken);
        assert!(matches!(
            report.failed[0].1.downcast_ref::<SubwrapError>(),
            Some(SubwrapError::NotUtf8(_))
        ));
        assert_eq!(fs::read(&broken).unwrap(), BROKEN);
        assert_eq!(fs::read_to_string(dir.path().join("good.srt")).unwrap(), WRAPPED);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("missing"), opts(false, true)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SubwrapError>(),
            Some(SubwrapError::InvalidDirectory(_))
        ));
    }

    #[test]
    fn empty_directory_writes_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(dir.path(), opts(true, true)).unwrap();
        assert!(report.is_success());
        assert!(report.archive.is_none());
        assert!(!dir.path().join("backup.zip").exists());
    }

    #[test]
    fn rewrap_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(rewrap_file(&dir.path().join("gone.srt"), WrapOpts::default()).is_err());
    }

    #[test]
    fn extension_is_case_sensitive() {
        assert!(is_subtitle(Path::new("dir/movie.srt")));
        assert!(!is_subtitle(Path::new("dir/movie.SRT")));
        assert!(!is_subtitle(Path::new("dir/movie.srt.bak")));
    }

    #[test]
    fn archive_failure_leaves_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("backup.zip");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "occupied").unwrap();
        fs::write(dir.path().join("a.srt"), LONG).unwrap();
        fs::write(dir.path().join("b.srt"), LONG).unwrap();

        let err = run(dir.path(), opts(false, true)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SubwrapError>(),
            Some(SubwrapError::Archive(_))
        ));
        assert_eq!(fs::read_to_string(dir.path().join("a.srt")).unwrap(), LONG);
        assert_eq!(fs::read_to_string(dir.path().join("b.srt")).unwrap(), LONG);
    }

    #[test]
    fn read_only_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        fs::write(&path, LONG).unwrap();
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();

        let err = rewrap_file(&path, WrapOpts { width: 20 }).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SubwrapError>(),
            Some(SubwrapError::ReadOnly(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), LONG);
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.srt");
        fs::write(&path, LONG).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let outcome = rewrap_file(&path, WrapOpts { width: 20 }).unwrap();

        assert_eq!(outcome, Outcome::Rewritten);
        assert_eq!(fs::read_to_string(&path).unwrap(), WRAPPED);
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_rewritten_through_the_link() {
        let dir = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        let real = store.path().join("real.srt");
        let link = dir.path().join("link.srt");
        fs::write(&real, LONG).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(discover(dir.path(), false), vec![link.clone()]);

        let report = run(dir.path(), opts(false, true)).unwrap();

        assert_eq!(report.rewritten, vec![link.clone()]);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), WRAPPED);
        assert_eq!(archived_names(&report.archive.unwrap()), vec!["link.srt"]);
    }
}
