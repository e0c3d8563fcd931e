//! Platform identification and platform-conditional output naming.

use std::fmt;

/// The three platform identifiers the rule emitter distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Darwin,
    /// Anything else, keeping the reported name for display
    Other(String),
}

impl Platform {
    /// Platform of the running host
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Darwin
        } else {
            Platform::Other(capitalize(std::env::consts::OS))
        }
    }

    /// Parse a platform identifier such as `Windows`, `Darwin` or `Linux`.
    ///
    /// Matching is exact for the two named platforms; every other string is `Other`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Windows" => Platform::Windows,
            "Darwin" => Platform::Darwin,
            other => Platform::Other(other.to_string()),
        }
    }

    pub fn executable_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            _ => "",
        }
    }

    pub fn shared_library_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".dll",
            Platform::Darwin => ".dylib",
            Platform::Other(_) => ".so",
        }
    }

    pub fn static_library_suffix(&self) -> &'static str {
        match self {
            Platform::Windows => ".lib",
            _ => ".a",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "Windows"),
            Platform::Darwin => write!(f, "Darwin"),
            Platform::Other(name) => write!(f, "{}", name),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Platform::from_name("Windows"), Platform::Windows);
        assert_eq!(Platform::from_name("Darwin"), Platform::Darwin);
        assert_eq!(
            Platform::from_name("Linux"),
            Platform::Other("Linux".to_string())
        );
    }

    #[test]
    fn test_suffixes() {
        let linux = Platform::from_name("Linux");
        assert_eq!(Platform::Windows.executable_suffix(), ".exe");
        assert_eq!(linux.executable_suffix(), "");
        assert_eq!(Platform::Windows.shared_library_suffix(), ".dll");
        assert_eq!(Platform::Darwin.shared_library_suffix(), ".dylib");
        assert_eq!(linux.shared_library_suffix(), ".so");
        assert_eq!(Platform::Windows.static_library_suffix(), ".lib");
        assert_eq!(Platform::Darwin.static_library_suffix(), ".a");
    }

    #[test]
    fn test_host_display_is_capitalized() {
        let name = Platform::host().to_string();
        assert!(name.chars().next().is_some_and(|c| c.is_uppercase()));
    }
}
