use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Expands `~`, `$VAR` and `${VAR}`; unknown variables leave the path as is.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

pub trait PathExt {
    /// True when the file carries the given document extension.
    fn has_extension(&self, ext: &str) -> bool;
    /// Appends `ext` unless the path already ends with it.
    fn with_default_extension(&self, ext: &str) -> PathBuf;
}

impl PathExt for Path {
    fn has_extension(&self, ext: &str) -> bool {
        self.extension() == Some(OsStr::new(ext))
    }

    fn with_default_extension(&self, ext: &str) -> PathBuf {
        if self.has_extension(ext) {
            self.to_path_buf()
        } else {
            let mut name = self.as_os_str().to_os_string();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_bare_name_when_adding_default_extension_then_appended() {
        assert_eq!(
            Path::new("plan").with_default_extension("wbs"),
            PathBuf::from("plan.wbs")
        );
        assert_eq!(
            Path::new("plan.wbs").with_default_extension("wbs"),
            PathBuf::from("plan.wbs")
        );
    }

    #[test]
    fn given_env_var_when_expanding_then_substituted() {
        let home = std::env::var("HOME").expect("HOME should be set");
        assert_eq!(expand_path(Path::new("$HOME/plans")), PathBuf::from(format!("{home}/plans")));
    }
}
