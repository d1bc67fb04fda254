//! Achievement catalog and the rule evaluator that runs over `UserProgress`.
//!
//! Rules are independent predicates over a single snapshot. Evaluation is a
//! pure function: it only ever adds ids, so an achievement present before an
//! update is present after it.

use std::collections::BTreeSet;

use crate::model::{AchievementId, ProgrammingLanguage, UserProgress, lessons};

/// Whether an achievement is tied to the whole profile or to a single track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementKind {
    Global,
    Language(ProgrammingLanguage),
}

/// Unlock condition of an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementRule {
    /// Completed lessons across every track reach the threshold.
    LessonsCompleted(usize),
    /// Tracks with an entry in `language_data` reach the threshold.
    LanguagesStarted(usize),
    /// Any stored quiz score is 100.
    PerfectQuiz,
    /// Every lesson of the track's catalog is completed.
    TrackMastered(ProgrammingLanguage),
}

impl AchievementRule {
    #[must_use]
    pub fn holds(self, progress: &UserProgress) -> bool {
        match self {
            AchievementRule::LessonsCompleted(min) => progress.total_completed_lessons() >= min,
            AchievementRule::LanguagesStarted(min) => progress.started_languages() >= min,
            AchievementRule::PerfectQuiz => progress
                .language_data()
                .values()
                .flat_map(|data| data.quiz_scores().values())
                .any(|score| score.is_perfect()),
            AchievementRule::TrackMastered(language) => {
                let total = lessons(language).len();
                progress
                    .language(language)
                    .is_some_and(|data| total > 0 && data.completed_lessons().len() == total)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub rule: AchievementRule,
}

impl Achievement {
    #[must_use]
    pub fn kind(&self) -> AchievementKind {
        match self.rule {
            AchievementRule::TrackMastered(language) => AchievementKind::Language(language),
            _ => AchievementKind::Global,
        }
    }

    #[must_use]
    pub fn achievement_id(&self) -> AchievementId {
        AchievementId::new(self.id)
    }

    /// Catalog lookup by id.
    #[must_use]
    pub fn find(id: &AchievementId) -> Option<&'static Achievement> {
        ACHIEVEMENTS.iter().find(|a| a.id == id.as_str())
    }
}

const fn mastery(
    id: &'static str,
    title: &'static str,
    description: &'static str,
    language: ProgrammingLanguage,
) -> Achievement {
    Achievement {
        id,
        title,
        description,
        rule: AchievementRule::TrackMastered(language),
    }
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_step",
        title: "First Step",
        description: "Complete your first lesson.",
        rule: AchievementRule::LessonsCompleted(1),
    },
    Achievement {
        id: "quiz_master",
        title: "Quiz Master",
        description: "Get a perfect 100% on any quiz.",
        rule: AchievementRule::PerfectQuiz,
    },
    Achievement {
        id: "polyglot",
        title: "The Polyglot",
        description: "Start learning at least 3 different languages.",
        rule: AchievementRule::LanguagesStarted(3),
    },
    Achievement {
        id: "dedicated",
        title: "Dedicated Student",
        description: "Complete 10 total lessons across any path.",
        rule: AchievementRule::LessonsCompleted(10),
    },
    mastery("master_python", "Pythonista", "Complete all Python lessons.", ProgrammingLanguage::Python),
    mastery("master_javascript", "Web Wizard", "Complete all JavaScript lessons.", ProgrammingLanguage::JavaScript),
    mastery("master_java", "Java Duke", "Complete all Java lessons.", ProgrammingLanguage::Java),
    mastery("master_cpp", "System Architect", "Complete all C++ lessons.", ProgrammingLanguage::Cpp),
    mastery("master_csharp", "Unity Master", "Complete all C# lessons.", ProgrammingLanguage::CSharp),
    mastery("master_php", "Server Sage", "Complete all PHP lessons.", ProgrammingLanguage::Php),
    mastery("master_swift", "Apple Core", "Complete all Swift lessons.", ProgrammingLanguage::Swift),
    mastery("master_go", "Cloud Gopher", "Complete all Go lessons.", ProgrammingLanguage::Go),
    mastery("master_sql", "Data Guru", "Complete all SQL lessons.", ProgrammingLanguage::Sql),
    mastery("master_rust", "Iron Crab", "Complete all Rust lessons.", ProgrammingLanguage::Rust),
];

/// Returns the unlocked set for `progress`: everything already unlocked plus
/// every catalog achievement whose rule holds.
#[must_use]
pub fn evaluate(progress: &UserProgress) -> BTreeSet<AchievementId> {
    let mut unlocked = progress.unlocked_achievements().clone();
    unlocked.extend(
        ACHIEVEMENTS
            .iter()
            .filter(|achievement| achievement.rule.holds(progress))
            .map(Achievement::achievement_id),
    );
    unlocked
}

/// Ids present in `after` but not in `before`, for celebratory feedback.
#[must_use]
pub fn newly_unlocked(
    before: &BTreeSet<AchievementId>,
    after: &BTreeSet<AchievementId>,
) -> BTreeSet<AchievementId> {
    after.difference(before).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonId, QuizScore};

    fn complete(
        progress: UserProgress,
        language: ProgrammingLanguage,
        ids: &[&str],
        score: u32,
    ) -> UserProgress {
        let mut progress = progress.select_language(language);
        for id in ids {
            progress = progress
                .record_quiz_result(language, &LessonId::new(*id), QuizScore::new(score).unwrap())
                .unwrap();
        }
        progress
    }

    fn ids(set: &BTreeSet<AchievementId>) -> Vec<&str> {
        set.iter().map(AchievementId::as_str).collect()
    }

    const ALL_LESSONS: [&str; 8] = [
        "intro",
        "setup",
        "variables",
        "operators",
        "conditionals",
        "loops",
        "functions",
        "project",
    ];

    #[test]
    fn empty_progress_unlocks_nothing() {
        assert!(evaluate(&UserProgress::default()).is_empty());
    }

    #[test]
    fn perfect_intro_unlocks_first_step_and_quiz_master() {
        let progress = complete(
            UserProgress::default(),
            ProgrammingLanguage::Python,
            &["intro"],
            100,
        );
        let unlocked = evaluate(&progress);
        assert_eq!(ids(&unlocked), vec!["first_step", "quiz_master"]);
    }

    #[test]
    fn dedicated_boundary_across_two_languages() {
        let nine = complete(
            complete(UserProgress::default(), ProgrammingLanguage::Go, &ALL_LESSONS[..5], 50),
            ProgrammingLanguage::Rust,
            &ALL_LESSONS[..4],
            50,
        );
        assert_eq!(nine.total_completed_lessons(), 9);
        assert!(!evaluate(&nine).contains(&AchievementId::new("dedicated")));

        let ten = complete(nine, ProgrammingLanguage::Rust, &ALL_LESSONS[4..5], 50);
        assert_eq!(ten.total_completed_lessons(), 10);
        assert!(evaluate(&ten).contains(&AchievementId::new("dedicated")));
    }

    #[test]
    fn bare_selection_counts_for_polyglot_only() {
        let progress = UserProgress::default()
            .select_language(ProgrammingLanguage::Python)
            .select_language(ProgrammingLanguage::JavaScript);
        assert!(evaluate(&progress).is_empty());

        let progress = progress.select_language(ProgrammingLanguage::Java);
        let unlocked = evaluate(&progress);
        assert_eq!(ids(&unlocked), vec!["polyglot"]);
    }

    #[test]
    fn mastery_requires_full_catalog() {
        let almost = complete(
            UserProgress::default(),
            ProgrammingLanguage::Sql,
            &ALL_LESSONS[..7],
            60,
        );
        assert!(!evaluate(&almost).contains(&AchievementId::new("master_sql")));

        let done = complete(almost, ProgrammingLanguage::Sql, &ALL_LESSONS[7..], 60);
        let unlocked = evaluate(&done);
        assert!(unlocked.contains(&AchievementId::new("master_sql")));
        assert!(!unlocked.contains(&AchievementId::new("master_rust")));
    }

    #[test]
    fn evaluation_never_revokes() {
        let progress =
            UserProgress::default().grant_achievements([AchievementId::new("quiz_master")]);
        let unlocked = evaluate(&progress);
        assert!(unlocked.contains(&AchievementId::new("quiz_master")));
    }

    #[test]
    fn newly_unlocked_is_set_difference() {
        let before: BTreeSet<_> = [AchievementId::new("first_step")].into_iter().collect();
        let after: BTreeSet<_> = [
            AchievementId::new("first_step"),
            AchievementId::new("quiz_master"),
        ]
        .into_iter()
        .collect();
        assert_eq!(ids(&newly_unlocked(&before, &after)), vec!["quiz_master"]);
    }

    #[test]
    fn catalog_ids_are_unique_and_mastery_covers_every_language() {
        let mut seen = BTreeSet::new();
        assert!(ACHIEVEMENTS.iter().all(|a| seen.insert(a.id)));
        for language in ProgrammingLanguage::ALL {
            let id = AchievementId::new(format!("master_{}", language.slug()));
            let achievement = Achievement::find(&id).unwrap();
            assert_eq!(achievement.kind(), AchievementKind::Language(language));
        }
    }
}
