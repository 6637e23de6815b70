//! Version parsing and minimum-version policy for detection probes.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Lowest Java feature release the suite runs on.
pub const MIN_JAVA_FEATURE: u32 = 8;

fn java_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"version\s+"(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:_(\d+))?"#)
            .expect("java version regex is valid")
    })
}

/// A Java version as printed by `java -version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: Option<u32>,
}

impl JavaVersion {
    /// Parses the first `version "X.Y.Z_B"` occurrence in probe output.
    pub fn parse(output: &str) -> Option<Self> {
        let caps = java_version_regex().captures(output)?;
        let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

        Some(Self {
            major: number(1)?,
            minor: number(2).unwrap_or(0),
            patch: number(3).unwrap_or(0),
            build: number(4),
        })
    }

    /// The Java feature release: `8` for both `1.8.0_212` and `8.1.2_3`.
    pub fn feature(&self) -> u32 {
        if self.major == 1 {
            self.minor
        } else {
            self.major
        }
    }

    pub fn is_supported(&self) -> bool {
        self.feature() >= MIN_JAVA_FEATURE
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(build) = self.build {
            write!(f, "_{}", build)?;
        }
        Ok(())
    }
}

/// A `major.minor` version reported by a tool's `--version` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ToolVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses the first `major.minor` pair in probe output, e.g.
    /// `"Vagrant 1.7.4"` or `"5.0.8r103449"`.
    pub fn parse(output: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"(\d+)\.(\d+)").expect("tool version regex is valid"));

        let caps = re.captures(output)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
        })
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Extracts the `java.home` property from `-XshowSettings:properties` output.
pub fn parse_java_home(output: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"java\.home\s*=\s*(.+)").expect("java.home regex is valid"));

    re.captures(output)
        .map(|caps| caps[1].trim().to_string())
        .filter(|home| !home.is_empty())
}
