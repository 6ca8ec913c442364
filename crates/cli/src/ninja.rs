use anyhow::{bail, Context, Result};
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

#[cfg(windows)]
const NINJA_NAMES: &[&str] = &["ninja.exe", "ninja.bat", "ninja"];
#[cfg(not(windows))]
const NINJA_NAMES: &[&str] = &["ninja"];

/// Resolve the ninja executable: an explicit path wins, otherwise the first
/// match on `PATH`.
pub fn find_ninja(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let path_var = env::var_os("PATH").unwrap_or_default();
    search_dirs(env::split_paths(&path_var), NINJA_NAMES)
        .context("ninja not found on PATH (use --ninja or BUILDCOST_NINJA)")
}

fn search_dirs(dirs: impl IntoIterator<Item = PathBuf>, names: &[&str]) -> Option<PathBuf> {
    dirs.into_iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Blocking `ninja -t ...` runner for one build directory.
pub struct NinjaTool {
    exe: PathBuf,
    build_dir: PathBuf,
}

impl NinjaTool {
    pub fn new(exe: PathBuf, build_dir: PathBuf) -> Self {
        Self { exe, build_dir }
    }

    /// Output of `ninja -t deps`
    pub fn deps(&self) -> Result<String> {
        self.run(["-t", "deps"])
    }

    /// Output of `ninja -t commands <target>`
    pub fn commands(&self, target: &str) -> Result<String> {
        self.run(["-t", "commands", target])
    }

    fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.exe);
        command.arg("-C").arg(&self.build_dir).args(args);
        log::debug!("Running {command:?}");

        let output = command
            .output()
            .with_context(|| format!("Failed to run {}", self.exe.display()))?;
        if !output.status.success() {
            bail!(
                "{:?} exited with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
