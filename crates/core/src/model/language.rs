use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown programming language: {0}")]
pub struct UnknownLanguage(pub String);

/// A learner track. Serialized with its display name so persisted progress
/// stays readable (`"C/C++"`, `"C#"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProgrammingLanguage {
    Python,
    JavaScript,
    Java,
    #[serde(rename = "C/C++")]
    Cpp,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "PHP")]
    Php,
    Swift,
    Go,
    #[serde(rename = "SQL")]
    Sql,
    Rust,
}

impl ProgrammingLanguage {
    pub const ALL: [ProgrammingLanguage; 10] = [
        ProgrammingLanguage::Python,
        ProgrammingLanguage::JavaScript,
        ProgrammingLanguage::Java,
        ProgrammingLanguage::Cpp,
        ProgrammingLanguage::CSharp,
        ProgrammingLanguage::Php,
        ProgrammingLanguage::Swift,
        ProgrammingLanguage::Go,
        ProgrammingLanguage::Sql,
        ProgrammingLanguage::Rust,
    ];

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            ProgrammingLanguage::Python => "Python",
            ProgrammingLanguage::JavaScript => "JavaScript",
            ProgrammingLanguage::Java => "Java",
            ProgrammingLanguage::Cpp => "C/C++",
            ProgrammingLanguage::CSharp => "C#",
            ProgrammingLanguage::Php => "PHP",
            ProgrammingLanguage::Swift => "Swift",
            ProgrammingLanguage::Go => "Go",
            ProgrammingLanguage::Sql => "SQL",
            ProgrammingLanguage::Rust => "Rust",
        }
    }

    /// Lowercase ASCII key used in achievement ids and on the command line.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ProgrammingLanguage::Python => "python",
            ProgrammingLanguage::JavaScript => "javascript",
            ProgrammingLanguage::Java => "java",
            ProgrammingLanguage::Cpp => "cpp",
            ProgrammingLanguage::CSharp => "csharp",
            ProgrammingLanguage::Php => "php",
            ProgrammingLanguage::Swift => "swift",
            ProgrammingLanguage::Go => "go",
            ProgrammingLanguage::Sql => "sql",
            ProgrammingLanguage::Rust => "rust",
        }
    }

    /// One-line pitch shown on the track picker.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ProgrammingLanguage::Python => {
                "A versatile language known for its simplicity and readability."
            }
            ProgrammingLanguage::JavaScript => "The language of the web.",
            ProgrammingLanguage::Java => {
                "A platform-independent language for enterprise systems and Android apps."
            }
            ProgrammingLanguage::Cpp => {
                "A high-performance language for games, systems and embedded work."
            }
            ProgrammingLanguage::CSharp => "Windows apps and game development with Unity.",
            ProgrammingLanguage::Php => "A veteran of the web powering millions of sites.",
            ProgrammingLanguage::Swift => "The primary language for Apple platforms.",
            ProgrammingLanguage::Go => "Efficient, scalable cloud and network services.",
            ProgrammingLanguage::Sql => "The standard language for querying databases.",
            ProgrammingLanguage::Rust => "A modern language focused on safety and performance.",
        }
    }
}

impl fmt::Display for ProgrammingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProgrammingLanguage {
    type Err = UnknownLanguage;

    /// Accepts either the slug or the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|lang| {
                lang.slug().eq_ignore_ascii_case(needle)
                    || lang.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownLanguage(needle.to_string()))
    }
}
