//! Built-in course and achievement catalogs.
//!
//! Seeded into an empty store; the engine treats both catalogs as read-only.

use super::types::{
    Achievement, AchievementCriteria, AchievementType, Course, CourseLesson, CourseRewards,
    Difficulty, Rarity,
};

/// Lessons from `(title, description, objective)` triples.
fn lessons(items: &[(&str, &str, &str)]) -> Vec<CourseLesson> {
    items
        .iter()
        .enumerate()
        .map(|(index, (title, description, objective))| CourseLesson {
            id: index as u32,
            title: title.to_string(),
            description: description.to_string(),
            objectives: vec![objective.to_string()],
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn course(
    id: &str,
    title: &str,
    description: &str,
    category: &str,
    difficulty: Difficulty,
    topics: &[&str],
    lessons: Vec<CourseLesson>,
    reward_xp: u64,
    badge: Option<&str>,
) -> Course {
    let estimated_minutes = lessons.len() as u32 * 15;
    Course {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        difficulty,
        topics: topics.iter().map(|t| t.to_string()).collect(),
        lessons,
        rewards: CourseRewards {
            xp: reward_xp,
            badge: badge.map(str::to_string),
        },
        estimated_minutes,
    }
}

/// Default course catalog.
pub fn default_courses() -> Vec<Course> {
    vec![
        course(
            "photosynthesis",
            "Photosynthesis",
            "How plants convert sunlight into energy",
            "Biology",
            Difficulty::Beginner,
            &["chlorophyll", "light reactions", "Calvin cycle"],
            lessons(&[
                ("Why Plants Need Light", "What a plant does with sunlight", "Name the inputs of photosynthesis"),
                ("Inside the Chloroplast", "Where the work happens", "Describe the role of chlorophyll"),
                ("The Light Reactions", "Capturing energy", "Explain how ATP is produced"),
                ("The Calvin Cycle", "Building sugar from carbon dioxide", "Trace carbon through the cycle"),
            ]),
            100,
            Some("green_thumb"),
        ),
        course(
            "quadratic-equations",
            "Quadratic Equations",
            "Solving ax² + bx + c = 0",
            "Mathematics",
            Difficulty::Intermediate,
            &["factoring", "completing the square", "quadratic formula"],
            lessons(&[
                ("What Makes an Equation Quadratic", "Recognizing the form", "Identify a, b and c"),
                ("Factoring", "Splitting into linear factors", "Factor simple trinomials"),
                ("Completing the Square", "Rewriting as a perfect square", "Complete the square for any quadratic"),
                ("The Quadratic Formula", "A formula that always works", "Derive and apply the formula"),
                ("The Discriminant", "How many roots", "Predict the number of real roots"),
            ]),
            200,
            Some("root_finder"),
        ),
        course(
            "javascript-closures",
            "JavaScript Closures",
            "Understanding scope and lexical environment",
            "Programming",
            Difficulty::Intermediate,
            &["scope", "lexical environment", "higher-order functions"],
            lessons(&[
                ("Scope", "Where variables are visible", "Distinguish block and function scope"),
                ("Functions as Values", "Passing and returning functions", "Return a function from a function"),
                ("Capturing Variables", "What a closure remembers", "Predict captured values"),
            ]),
            150,
            None,
        ),
        course(
            "climate-change",
            "Climate Change",
            "Scientific evidence and environmental impact",
            "Science",
            Difficulty::Intermediate,
            &["greenhouse effect", "carbon cycle", "feedback loops"],
            lessons(&[
                ("The Greenhouse Effect", "Why the planet is warm", "Explain radiative balance"),
                ("Reading the Evidence", "Temperature and ice records", "Interpret a temperature series"),
                ("Feedback Loops", "Changes that amplify change", "Give two examples of feedback"),
                ("Impacts", "Effects on people and ecosystems", "Connect warming to sea level"),
            ]),
            200,
            None,
        ),
        course(
            "world-war-ii-causes",
            "World War II Causes",
            "Complex factors leading to global conflict",
            "History",
            Difficulty::Advanced,
            &["Treaty of Versailles", "Great Depression", "appeasement"],
            lessons(&[
                ("The Peace That Failed", "Versailles and its critics", "Evaluate the treaty's terms"),
                ("Economic Collapse", "The Depression's political effects", "Link economics to extremism"),
                ("Appeasement", "Why Europe hesitated", "Weigh the case for appeasement"),
            ]),
            300,
            Some("historian"),
        ),
        course(
            "shakespearean-sonnets",
            "Shakespearean Sonnets",
            "Structure and themes in English poetry",
            "Literature",
            Difficulty::Advanced,
            &["iambic pentameter", "volta", "imagery"],
            lessons(&[
                ("Fourteen Lines", "The shape of a sonnet", "Mark the rhyme scheme"),
                ("Meter", "Hearing iambic pentameter", "Scan a line of verse"),
                ("The Turn", "Where the argument shifts", "Locate the volta"),
                ("Themes of Time", "Love, beauty and decay", "Compare two sonnets on time"),
            ]),
            300,
            Some("bard"),
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn achievement(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    kind: AchievementType,
    criteria: AchievementCriteria,
    reward_xp: u64,
    rarity: Rarity,
) -> Achievement {
    Achievement {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        kind,
        criteria,
        reward_xp,
        rarity,
    }
}

/// Default achievement catalog.
pub fn default_achievements() -> Vec<Achievement> {
    vec![
        achievement(
            "first_course",
            "Graduate",
            "Complete your first course",
            "🎓",
            AchievementType::Completion,
            AchievementCriteria::default(),
            100,
            Rarity::Common,
        ),
        achievement(
            "good_score",
            "Sharp Mind",
            "Score 80 or more on a lesson",
            "✨",
            AchievementType::Score,
            AchievementCriteria {
                min_score: Some(80),
                ..Default::default()
            },
            25,
            Rarity::Common,
        ),
        achievement(
            "three_sessions",
            "Getting Started",
            "Finish three learning sessions",
            "📚",
            AchievementType::Engagement,
            AchievementCriteria {
                sessions_completed: Some(3),
                ..Default::default()
            },
            50,
            Rarity::Common,
        ),
        achievement(
            "perfect_score",
            "Flawless",
            "Score 100 on a lesson",
            "💯",
            AchievementType::Score,
            AchievementCriteria {
                min_score: Some(100),
                ..Default::default()
            },
            75,
            Rarity::Rare,
        ),
        achievement(
            "streak_3",
            "On a Roll",
            "Learn three days in a row",
            "🔥",
            AchievementType::Streak,
            AchievementCriteria {
                streak_days: Some(3),
                ..Default::default()
            },
            75,
            Rarity::Rare,
        ),
        achievement(
            "deep_conversation",
            "Deep Conversation",
            "Exchange 20 messages in one session",
            "💬",
            AchievementType::Engagement,
            AchievementCriteria {
                messages_in_session: Some(20),
                ..Default::default()
            },
            50,
            Rarity::Rare,
        ),
        achievement(
            "socratic_thinker",
            "Socratic Thinker",
            "Work through 10 guiding questions in one session",
            "🤔",
            AchievementType::Mastery,
            AchievementCriteria {
                socratic_interactions: Some(10),
                ..Default::default()
            },
            150,
            Rarity::Epic,
        ),
        achievement(
            "streak_7",
            "Week Warrior",
            "Learn seven days in a row",
            "📅",
            AchievementType::Streak,
            AchievementCriteria {
                streak_days: Some(7),
                ..Default::default()
            },
            200,
            Rarity::Epic,
        ),
        achievement(
            "five_courses",
            "Polymath",
            "Complete five courses",
            "🏆",
            AchievementType::Completion,
            AchievementCriteria {
                courses_completed: Some(5),
                ..Default::default()
            },
            500,
            Rarity::Legendary,
        ),
    ]
}
