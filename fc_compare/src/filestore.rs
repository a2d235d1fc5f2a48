use std::{
    fs,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::Context;

/// Access to the store holding experiment data
///
/// copy() transfers a single file from the store to a local path.  A returned error
/// just means that the file could not be copied: the caller decides if it matters.
pub trait FileStore: Sync {
    fn copy(&self, src: &str, dst: &Path) -> anyhow::Result<()>;
}

/// Filestore on a local (or mounted) file system
#[derive(Debug, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn copy(&self, src: &str, dst: &Path) -> anyhow::Result<()> {
        fs::copy(src, dst)
            .with_context(|| format!("Error copying {} to {}", src, dst.display()))?;
        Ok(())
    }
}

/// Filestore accessed by an external copy command called as `<program> <args> <src> <dst>`.
/// The copy fails if the command exits with a non-zero status
#[derive(Debug)]
pub struct CommandFileStore {
    program: String,
    args: Vec<String>,
}

impl CommandFileStore {
    pub fn new<S: AsRef<str>>(program: S, args: &[S]) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: args.iter().map(|s| s.as_ref().to_owned()).collect(),
        }
    }

    /// Google cloud storage via gsutil
    pub fn gsutil() -> Self {
        Self::new("gsutil", &["cp"])
    }
}

impl FileStore for CommandFileStore {
    fn copy(&self, src: &str, dst: &Path) -> anyhow::Result<()> {
        trace!("Running {} {:?} {} {}", self.program, self.args, src, dst.display());
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(src)
            .arg(dst)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to execute {}", self.program))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} failed to copy {} ({}): {}",
                self.program,
                src,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

/// Choose filestore access from the form of the filestore root
pub fn filestore_for(root: &str) -> Box<dyn FileStore> {
    if root.starts_with("gs://") {
        debug!("Using gsutil for filestore {}", root);
        Box::new(CommandFileStore::gsutil())
    } else {
        debug!("Using local file system for filestore {}", root);
        Box::new(LocalFileStore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.json");
        fs::write(&src, "[]").unwrap();
        let dst = dir.path().join("b.json");
        LocalFileStore
            .copy(src.to_str().unwrap(), &dst)
            .unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "[]");
    }

    #[test]
    fn local_copy_missing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.json");
        let dst = dir.path().join("b.json");
        assert!(LocalFileStore.copy(src.to_str().unwrap(), &dst).is_err());
        assert!(!dst.exists());
    }

    #[cfg(unix)]
    #[test]
    fn command_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.json");
        fs::write(&src, "[[1]]").unwrap();
        let dst = dir.path().join("b.json");
        let fs_cmd = CommandFileStore::new("cp", &[]);
        fs_cmd.copy(src.to_str().unwrap(), &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "[[1]]");

        let missing = dir.path().join("missing.json");
        assert!(fs_cmd.copy(missing.to_str().unwrap(), &dst).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn command_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let fs_cmd = CommandFileStore::new("false", &[]);
        assert!(fs_cmd.copy("x", &dir.path().join("y")).is_err());
        let fs_cmd = CommandFileStore::new("no-such-program-for-copy", &[]);
        assert!(fs_cmd.copy("x", &dir.path().join("y")).is_err());
    }
}
