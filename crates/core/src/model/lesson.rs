use crate::model::ids::LessonId;
use crate::model::language::ProgrammingLanguage;

/// A catalog entry. Every track shares the same fundamentals curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lesson {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub order: u32,
}

const LESSONS: &[Lesson] = &[
    Lesson {
        id: "intro",
        title: "Introduction",
        description: "What is this language and why use it?",
        order: 1,
    },
    Lesson {
        id: "setup",
        title: "Setup & Installation",
        description: "Getting your environment ready.",
        order: 2,
    },
    Lesson {
        id: "variables",
        title: "Variables & Data Types",
        description: "Storing and managing information.",
        order: 3,
    },
    Lesson {
        id: "operators",
        title: "Operators",
        description: "Performing math and logic.",
        order: 4,
    },
    Lesson {
        id: "conditionals",
        title: "Conditionals (If/Else)",
        description: "Making decisions in code.",
        order: 5,
    },
    Lesson {
        id: "loops",
        title: "Loops",
        description: "Repeating actions efficiently.",
        order: 6,
    },
    Lesson {
        id: "functions",
        title: "Functions",
        description: "Reusable blocks of code.",
        order: 7,
    },
    Lesson {
        id: "project",
        title: "Mini Project",
        description: "Building something real.",
        order: 8,
    },
];

/// Ordered lesson catalog for a track.
#[must_use]
pub fn lessons(_language: ProgrammingLanguage) -> &'static [Lesson] {
    LESSONS
}

impl Lesson {
    /// Looks up a lesson in the track's catalog.
    #[must_use]
    pub fn find(language: ProgrammingLanguage, id: &LessonId) -> Option<&'static Lesson> {
        lessons(language).iter().find(|lesson| lesson.id == id.as_str())
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        LessonId::new(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ordered() {
        let catalog = lessons(ProgrammingLanguage::Rust);
        assert_eq!(catalog.len(), 8);
        assert!(catalog.windows(2).all(|w| w[0].order < w[1].order));
    }

    #[test]
    fn find_rejects_unknown_ids() {
        let lang = ProgrammingLanguage::Python;
        assert!(Lesson::find(lang, &LessonId::new("loops")).is_some());
        assert!(Lesson::find(lang, &LessonId::new("monads")).is_none());
    }
}
