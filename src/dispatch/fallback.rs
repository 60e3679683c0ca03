/// Deterministic fallback responses
///
/// Used when the completion service is missing, exhausted or disabled.
/// The task parser is a best-effort keyword heuristic, not a grammar.

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analytics::Priority;
use crate::dispatch::features;

const MAX_TITLE_CHARS: usize = 50;
const MIN_TAG_CHARS: usize = 4;

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));

/// Words that end the title part of a sentence
static TITLE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(today|tomorrow|tonight|at|on|by|before|after|next|every|due)\b")
        .expect("valid title marker regex")
});

static TWELVE_HOUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").expect("valid 12-hour time regex")
});

static TWENTY_FOUR_HOUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("valid 24-hour time regex")
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

static HIGH_PRIORITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(urgent|asap|important|critical|immediately)\b")
        .expect("valid priority regex")
});

static LOW_PRIORITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(someday|whenever|eventually|low priority)\b").expect("valid priority regex")
});

/// Keyword tables, checked in order; the first table with a hit wins
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "health",
        &[
            "workout", "gym", "run", "running", "exercise", "yoga", "doctor", "dentist", "health",
            "meditate", "meditation", "walk",
        ],
    ),
    (
        "work",
        &[
            "meeting", "report", "email", "client", "presentation", "deadline", "project", "review",
            "office", "work",
        ],
    ),
    (
        "finance",
        &["pay", "bill", "bills", "budget", "invoice", "bank", "tax", "taxes", "rent", "finance"],
    ),
    (
        "learning",
        &["read", "study", "course", "learn", "lesson", "book", "practice", "learning"],
    ),
    (
        "personal",
        &[
            "call", "family", "friend", "birthday", "clean", "groceries", "shop", "shopping",
            "laundry", "personal",
        ],
    ),
];

const DEFAULT_CATEGORY: &str = "general";

const STOP_WORDS: &[&str] = &[
    "this", "that", "with", "from", "have", "will", "about", "into", "before", "after", "today",
    "tomorrow", "tonight", "next", "every", "need", "should", "please",
];

/// Task fields extracted from free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTask {
    pub title: String,
    pub category: String,
    pub due_date: Option<NaiveDate>,
    /// "HH:MM", 24-hour clock
    pub due_time: Option<String>,
    pub priority: Priority,
    pub tags: Vec<String>,
}

/// Parse a sentence such as "Call the bank tomorrow at 3pm #finance"
///
/// `today` anchors the relative dates "today" and "tomorrow".
pub fn parse_task(text: &str, today: NaiveDate) -> ParsedTask {
    let hashtags: Vec<String> = HASHTAG_RE
        .captures_iter(text)
        .map(|c| c[1].to_lowercase())
        .collect();
    let without_hashtags = HASHTAG_RE.replace_all(text, "");
    let sentence = without_hashtags.split_whitespace().collect::<Vec<_>>().join(" ");
    let words: Vec<String> = WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect();

    ParsedTask {
        title: title(&sentence),
        category: category(&words, &hashtags),
        due_date: due_date(text, today),
        due_time: due_time(text),
        priority: priority(text),
        tags: tags(&words),
    }
}

fn title(sentence: &str) -> String {
    let before_marker = TITLE_MARKER_RE
        .find(sentence)
        .map(|m| sentence[..m.start()].trim())
        .filter(|prefix| !prefix.is_empty());

    match before_marker {
        Some(prefix) => prefix.to_string(),
        None => sentence.chars().take(MAX_TITLE_CHARS).collect::<String>().trim().to_string(),
    }
}

fn category(words: &[String], hashtags: &[String]) -> String {
    // an explicit hashtag naming a known category takes precedence
    if let Some((name, _)) = CATEGORY_KEYWORDS
        .iter()
        .find(|(name, _)| hashtags.iter().any(|tag| tag == name))
    {
        return name.to_string();
    }

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|w| keywords.contains(&w.as_str())))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

fn due_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.to_lowercase();
    if lower.contains("today") {
        Some(today)
    } else if lower.contains("tomorrow") {
        Some(today + Duration::days(1))
    } else {
        None
    }
}

fn due_time(text: &str) -> Option<String> {
    if let Some(caps) = TWELVE_HOUR_RE.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if !(1..=12).contains(&hour) || minute > 59 {
            return None;
        }
        let pm = caps[3].eq_ignore_ascii_case("pm");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return Some(format!("{:02}:{:02}", hour, minute));
    }

    TWENTY_FOUR_HOUR_RE.captures(text).and_then(|caps| {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        Some(format!("{:02}:{:02}", hour, minute))
    })
}

fn priority(text: &str) -> Priority {
    if HIGH_PRIORITY_RE.is_match(text) {
        Priority::High
    } else if LOW_PRIORITY_RE.is_match(text) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

fn tags(words: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for word in words {
        if word.chars().count() >= MIN_TAG_CHARS
            && !STOP_WORDS.contains(&word.as_str())
            && !tags.contains(word)
        {
            tags.push(word.clone());
        }
    }
    tags
}

/// Which canned advice a feature falls back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceTemplate {
    Goal,
    Habit,
    Project,
    Finance,
    Time,
    Generic,
}

impl AdviceTemplate {
    pub fn for_feature(feature_id: &str) -> Self {
        match feature_id {
            features::GOAL_ANALYSIS => AdviceTemplate::Goal,
            features::HABIT_COACHING => AdviceTemplate::Habit,
            features::PROJECT_PLANNING => AdviceTemplate::Project,
            features::FINANCE_ADVICE => AdviceTemplate::Finance,
            features::TIME_MANAGEMENT => AdviceTemplate::Time,
            _ => AdviceTemplate::Generic,
        }
    }

    pub fn render(&self) -> String {
        let (heading, tips): (&str, &[&str]) = match self {
            AdviceTemplate::Goal => (
                "Goal planning",
                &[
                    "Make the goal specific and measurable.",
                    "Split it into milestones you can reach within two weeks each.",
                    "Review progress weekly and adjust the next milestone.",
                ],
            ),
            AdviceTemplate::Habit => (
                "Habit building",
                &[
                    "Start with a version of the habit that takes under two minutes.",
                    "Attach it to something you already do every day.",
                    "Track each day you complete it and aim not to miss twice in a row.",
                ],
            ),
            AdviceTemplate::Project => (
                "Project planning",
                &[
                    "Write down the outcome that marks the project as done.",
                    "List the phases, then the first three tasks of the first phase.",
                    "Mark tasks that block others and schedule them first.",
                ],
            ),
            AdviceTemplate::Finance => (
                "Budgeting",
                &[
                    "Track every expense for one month before changing anything.",
                    "Set aside savings at the start of the month, not the end.",
                    "Review recurring subscriptions and cancel the unused ones.",
                ],
            ),
            AdviceTemplate::Time => (
                "Time management",
                &[
                    "Pick the three most important tasks for tomorrow before you stop today.",
                    "Block 90 minutes of focused work in your most productive hours.",
                    "Batch small tasks like email into one or two fixed slots.",
                ],
            ),
            AdviceTemplate::Generic => (
                "Productivity",
                &[
                    "Break large tasks into steps you can finish in one sitting.",
                    "Take a 15 minute break every 90 minutes of focused work.",
                    "Review what you finished at the end of each day.",
                ],
            ),
        };

        let mut lines = vec![format!("{} tips:", heading)];
        lines.extend(tips.iter().map(|tip| format!("- {}", tip)));
        lines.join("\n")
    }
}

/// Maps feature identifiers to deterministic responses
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResolver;

impl FallbackResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve with dates relative to `today`
    pub fn resolve(&self, feature_id: &str, prompt: &str, today: NaiveDate) -> serde_json::Value {
        if feature_id == features::NATURAL_LANGUAGE_TASK {
            let task = parse_task(prompt, today);
            return serde_json::to_value(&task)
                .unwrap_or_else(|_| serde_json::Value::String(task.title));
        }
        serde_json::Value::String(AdviceTemplate::for_feature(feature_id).render())
    }
}
