//! Ignore rules for directories and files.
//!
//! All comparisons are exact and case-sensitive. There is no globbing: an
//! ignored directory entry `media/cache` matches only that relative path.

use crate::config::Config;
use std::collections::HashSet;

/// Why a file was excluded from reference checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileIgnore {
    Hidden,
    Extension,
}

#[derive(Debug, Clone, Default)]
pub struct PathRules {
    ignored_dirs: HashSet<String>,
    ignored_extensions: HashSet<String>,
}

impl PathRules {
    pub fn new<I, J, S, T>(ignored_dirs: I, ignored_extensions: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            ignored_dirs: ignored_dirs.into_iter().map(Into::into).collect(),
            ignored_extensions: ignored_extensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ignore_paths.iter().cloned(),
            config.ignore_extensions.iter().cloned(),
        )
    }

    pub fn is_directory_ignored(&self, relative_path: &str) -> bool {
        self.ignored_dirs.contains(relative_path)
    }

    pub fn is_file_ignored(&self, relative_path: &str, basename: &str) -> bool {
        self.file_ignore_reason(relative_path, basename).is_some()
    }

    /// Hidden files take precedence over the extension rule.
    pub fn file_ignore_reason(&self, _relative_path: &str, basename: &str) -> Option<FileIgnore> {
        if basename.starts_with('.') {
            return Some(FileIgnore::Hidden);
        }

        match extension_of(basename) {
            Some(ext) if self.ignored_extensions.contains(ext) => Some(FileIgnore::Extension),
            _ => None,
        }
    }
}

/// Substring from the last `.` to the end, dot included.
pub fn extension_of(basename: &str) -> Option<&str> {
    basename.rfind('.').map(|pos| &basename[pos..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rules() -> PathRules {
        PathRules::new(["cache", "media/tmp"], [".php", ".css", ".js"])
    }

    #[test]
    fn test_directory_exact_match_only() {
        let rules = rules();
        assert!(rules.is_directory_ignored("cache"));
        assert!(rules.is_directory_ignored("media/tmp"));
        assert!(!rules.is_directory_ignored("media"));
        assert!(!rules.is_directory_ignored("cache/sub"));
        assert!(!rules.is_directory_ignored("Cache"));
        assert!(!rules.is_directory_ignored("other/cache"));
    }

    #[test]
    fn test_hidden_files() {
        let rules = rules();
        assert_eq!(
            rules.file_ignore_reason(".htaccess", ".htaccess"),
            Some(FileIgnore::Hidden)
        );
        assert_eq!(
            rules.file_ignore_reason("img/.hidden.php", ".hidden.php"),
            Some(FileIgnore::Hidden)
        );
    }

    #[test]
    fn test_extension_rule() {
        let rules = rules();
        assert_eq!(
            rules.file_ignore_reason("index.php", "index.php"),
            Some(FileIgnore::Extension)
        );
        assert_eq!(
            rules.file_ignore_reason("js/app.min.js", "app.min.js"),
            Some(FileIgnore::Extension)
        );
        assert_eq!(rules.file_ignore_reason("index.PHP", "index.PHP"), None);
        assert_eq!(rules.file_ignore_reason("logo.png", "logo.png"), None);
    }

    #[test]
    fn test_no_dot_is_never_ignored() {
        let rules = PathRules::new(Vec::<String>::new(), ["README", ""]);
        assert!(!rules.is_file_ignored("README", "README"));
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn test_last_dot_wins() {
        assert_eq!(extension_of("archive.tar.gz"), Some(".gz"));
        assert_eq!(extension_of("trailing."), Some("."));
    }

    proptest! {
        #[test]
        fn prop_ignored_extension_always_ignored(stem in "[a-zA-Z0-9_-]{1,16}", idx in 0usize..3) {
            let exts = [".php", ".css", ".js"];
            let name = format!("{}{}", stem, exts[idx]);
            prop_assert_eq!(
                rules().file_ignore_reason(&name, &name),
                Some(FileIgnore::Extension)
            );
        }

        #[test]
        fn prop_dotted_names_are_hidden(rest in "[a-zA-Z0-9._-]{0,16}") {
            let name = format!(".{}", rest);
            prop_assert_eq!(rules().file_ignore_reason(&name, &name), Some(FileIgnore::Hidden));
        }

        #[test]
        fn prop_dotless_names_pass(name in "[a-zA-Z0-9_-]{1,16}") {
            prop_assert!(!rules().is_file_ignored(&name, &name));
        }

        #[test]
        fn prop_directory_rule_is_exact(suffix in "[a-z]{1,8}") {
            let rules = rules();
            let nested = format!("cache/{}", suffix);
            let prefixed = format!("{}cache", suffix);
            prop_assert!(!rules.is_directory_ignored(&nested));
            prop_assert!(!rules.is_directory_ignored(&prefixed));
        }
    }
}
