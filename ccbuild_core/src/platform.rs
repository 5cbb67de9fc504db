#![deny(clippy::unwrap_used)]

use regex::Regex;

/// Host operating systems the toolchain and source filter know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    Macos,
    Windows,
}

impl HostOs {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    pub fn object_suffix(self) -> &'static str {
        match self {
            Self::Windows => ".obj",
            _ => ".o",
        }
    }

    /// Source suffix conventions: `foo.linux.cc` builds only on Linux,
    /// `foo.posix.cc` everywhere but Windows, and so on. Returns
    /// `(include, exclude)` pattern sets; exclusion wins.
    pub(crate) fn source_patterns(self) -> (Vec<Regex>, Vec<Regex>) {
        let (include, exclude): (&[&str], &[&str]) = match self {
            Self::Macos => (
                &[r"\.macos\.cc?$", r"\.posix\.cc?$"],
                &[r"\.linux\.cc?$", r"\.windows\.cc?$"],
            ),
            Self::Linux => (
                &[r"\.linux\.cc?$", r"\.posix\.cc?$"],
                &[r"\.macos\.cc?$", r"\.windows\.cc?$"],
            ),
            Self::Windows => (
                &[r"\.windows\.cc?$"],
                &[r"\.macos\.cc?$", r"\.linux\.cc?$", r"\.posix\.cc?$"],
            ),
        };
        let mut include: Vec<Regex> = include.iter().map(|p| compile(p)).collect();
        include.push(compile(r"\.cc?$"));
        let exclude = exclude.iter().map(|p| compile(p)).collect();
        (include, exclude)
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object_suffix_per_os() {
        assert_eq!(HostOs::Linux.object_suffix(), ".o");
        assert_eq!(HostOs::Macos.object_suffix(), ".o");
        assert_eq!(HostOs::Windows.object_suffix(), ".obj");
    }

    #[test]
    fn linux_patterns_admit_posix() {
        let (include, exclude) = HostOs::Linux.source_patterns();
        assert!(include.iter().any(|p| p.is_match("net.posix.cc")));
        assert!(include.iter().any(|p| p.is_match("net.linux.cc")));
        assert!(exclude.iter().any(|p| p.is_match("net.windows.cc")));
        assert!(exclude.iter().any(|p| p.is_match("net.macos.cc")));
    }

    #[test]
    fn windows_patterns_reject_posix() {
        let (_, exclude) = HostOs::Windows.source_patterns();
        assert!(exclude.iter().any(|p| p.is_match("net.posix.cc")));
    }
}
