//! Bundled lessons and quizzes that never need the network.

use std::collections::HashMap;

use tutor_core::model::{ContentKey, LessonId, ProgrammingLanguage, QuizQuestion};

/// Lesson text and a fixed question set for one content key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineEntry {
    pub lesson: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Default)]
pub struct OfflineDataset {
    entries: HashMap<ContentKey, OfflineEntry>,
}

impl OfflineDataset {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The dataset shipped with the binary.
    #[must_use]
    pub fn bundled() -> Self {
        let mut dataset = Self::empty();
        for entry in BUNDLED {
            let questions = entry
                .questions
                .iter()
                .filter_map(|question| match question.build() {
                    Ok(question) => Some(question),
                    Err(err) => {
                        tracing::warn!(
                            language = %entry.language,
                            topic = entry.topic,
                            error = %err,
                            "skipping invalid bundled question"
                        );
                        None
                    }
                })
                .collect();
            dataset.insert(
                ContentKey::new(entry.language, LessonId::new(entry.topic)),
                OfflineEntry {
                    lesson: entry.lesson.to_string(),
                    questions,
                },
            );
        }
        dataset
    }

    pub fn insert(&mut self, key: ContentKey, entry: OfflineEntry) {
        self.entries.insert(key, entry);
    }

    #[must_use]
    pub fn lesson(&self, key: &ContentKey) -> Option<&str> {
        self.entries.get(key).map(|entry| entry.lesson.as_str())
    }

    /// Questions for `key`. Entries without questions count as a miss.
    #[must_use]
    pub fn quiz(&self, key: &ContentKey) -> Option<&[QuizQuestion]> {
        self.entries
            .get(key)
            .map(|entry| entry.questions.as_slice())
            .filter(|questions| !questions.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//
// ─── BUNDLED DATA ──────────────────────────────────────────────────────────────
//

struct BundledEntry {
    language: ProgrammingLanguage,
    topic: &'static str,
    lesson: &'static str,
    questions: &'static [BundledQuestion],
}

struct BundledQuestion {
    prompt: &'static str,
    options: &'static [&'static str],
    correct: usize,
    explanation: &'static str,
}

impl BundledQuestion {
    fn build(&self) -> Result<QuizQuestion, tutor_core::model::QuestionError> {
        QuizQuestion::new(
            self.prompt,
            self.options.iter().map(|option| (*option).to_string()).collect(),
            self.correct,
            self.explanation,
        )
    }
}

const BUNDLED: &[BundledEntry] = &[
    BundledEntry {
        language: ProgrammingLanguage::Python,
        topic: "intro",
        lesson: "# Introduction to Python\n\n\
Python is a general-purpose language known for readable code. It is used for \
scripting, web backends, data analysis and machine learning.\n\n\
```python\nprint(\"Hello, world!\")\n```\n\n\
Python runs your file top to bottom through an interpreter, so there is no \
separate compile step.\n\n\
**Summary:** Python trades raw speed for clarity and a huge ecosystem.",
        questions: &[
            BundledQuestion {
                prompt: "Which function prints text to the console in Python?",
                options: &["echo()", "print()", "console.log()", "puts()"],
                correct: 1,
                explanation: "`print()` writes its arguments to standard output.",
            },
            BundledQuestion {
                prompt: "How is a Python program usually executed?",
                options: &[
                    "By an interpreter",
                    "Only after compiling to machine code",
                    "Inside a web browser",
                    "On a virtual DOM",
                ],
                correct: 0,
                explanation: "The CPython interpreter reads and runs the source directly.",
            },
            BundledQuestion {
                prompt: "What does Python use to mark code blocks?",
                options: &["Curly braces", "BEGIN/END keywords", "Indentation", "Semicolons"],
                correct: 2,
                explanation: "Blocks are delimited by consistent indentation.",
            },
        ],
    },
    BundledEntry {
        language: ProgrammingLanguage::Python,
        topic: "variables",
        lesson: "# Variables in Python\n\n\
A variable is a name bound to a value. Python infers the type from the value.\n\n\
```python\nname = \"Ada\"\nage = 36\nage = age + 1\n```\n\n\
Names are case sensitive and conventionally written in `snake_case`.\n\n\
**Summary:** assign with `=`, no declarations needed.",
        questions: &[
            BundledQuestion {
                prompt: "Which line assigns 10 to a variable named count?",
                options: &["int count = 10", "count := 10;", "count = 10", "let count = 10"],
                correct: 2,
                explanation: "Python assigns with a plain `=` and no type annotation.",
            },
            BundledQuestion {
                prompt: "What naming style does Python recommend for variables?",
                options: &["camelCase", "snake_case", "PascalCase", "kebab-case"],
                correct: 1,
                explanation: "PEP 8 recommends lowercase words separated by underscores.",
            },
            BundledQuestion {
                prompt: "Are `Total` and `total` the same variable?",
                options: &["Yes", "No"],
                correct: 1,
                explanation: "Identifiers are case sensitive.",
            },
        ],
    },
    BundledEntry {
        language: ProgrammingLanguage::JavaScript,
        topic: "intro",
        lesson: "# Introduction to JavaScript\n\n\
JavaScript is the language of the web browser and, through Node.js, of many \
servers.\n\n\
```javascript\nconsole.log(\"Hello, world!\");\n```\n\n\
**Summary:** one language for the page and the backend.",
        questions: &[
            BundledQuestion {
                prompt: "Which call prints to the browser console?",
                options: &["print()", "console.log()", "System.out.println()", "echo"],
                correct: 1,
                explanation: "`console.log` writes to the developer console.",
            },
            BundledQuestion {
                prompt: "Which runtime lets JavaScript run outside the browser?",
                options: &["JVM", "Node.js", "CPython", ".NET CLR"],
                correct: 1,
                explanation: "Node.js embeds the V8 engine for server-side code.",
            },
            BundledQuestion {
                prompt: "Which keyword declares a block-scoped constant?",
                options: &["var", "let", "const", "static"],
                correct: 2,
                explanation: "`const` bindings cannot be reassigned.",
            },
        ],
    },
    BundledEntry {
        language: ProgrammingLanguage::Rust,
        topic: "intro",
        lesson: "# Introduction to Rust\n\n\
Rust is a systems language that guarantees memory safety without a garbage \
collector, using ownership and borrowing checked at compile time.\n\n\
```rust\nfn main() {\n    println!(\"Hello, world!\");\n}\n```\n\n\
**Summary:** C-like performance with the compiler catching whole classes of bugs.",
        questions: &[
            BundledQuestion {
                prompt: "How does Rust manage memory safely?",
                options: &[
                    "A tracing garbage collector",
                    "Ownership and borrowing rules",
                    "Manual malloc and free",
                    "Reference counting everything",
                ],
                correct: 1,
                explanation: "The borrow checker enforces ownership at compile time.",
            },
            BundledQuestion {
                prompt: "What does the `!` in `println!` indicate?",
                options: &["A macro", "A negation", "An unsafe call", "A constant"],
                correct: 0,
                explanation: "Names ending in `!` are macro invocations.",
            },
            BundledQuestion {
                prompt: "Which tool builds and runs Rust projects?",
                options: &["npm", "pip", "cargo", "maven"],
                correct: 2,
                explanation: "Cargo is Rust's build tool and package manager.",
            },
        ],
    },
    BundledEntry {
        language: ProgrammingLanguage::Sql,
        topic: "intro",
        lesson: "# Introduction to SQL\n\n\
SQL is a declarative language for querying relational databases. You describe \
the rows you want and the database decides how to fetch them.\n\n\
```sql\nSELECT name FROM students WHERE grade > 90;\n```\n\n\
**Summary:** say what you want, not how to get it.",
        questions: &[
            BundledQuestion {
                prompt: "Which statement reads rows from a table?",
                options: &["GET", "SELECT", "FETCH ALL", "READ"],
                correct: 1,
                explanation: "`SELECT` retrieves rows matching its clauses.",
            },
            BundledQuestion {
                prompt: "Which clause filters rows?",
                options: &["ORDER BY", "GROUP BY", "WHERE", "LIMIT"],
                correct: 2,
                explanation: "`WHERE` keeps only rows whose condition is true.",
            },
            BundledQuestion {
                prompt: "SQL is best described as which kind of language?",
                options: &["Declarative", "Assembly", "Markup", "Object-oriented"],
                correct: 0,
                explanation: "Queries state the desired result, not the steps.",
            },
        ],
    },
];
