/// Registry of AI features the dispatcher accepts

use std::collections::BTreeMap;

use serde::Serialize;

pub const GOAL_ANALYSIS: &str = "goal_analysis";
pub const HABIT_COACHING: &str = "habit_coaching";
pub const PROJECT_PLANNING: &str = "project_planning";
pub const FINANCE_ADVICE: &str = "finance_advice";
pub const TIME_MANAGEMENT: &str = "time_management";
pub const NATURAL_LANGUAGE_TASK: &str = "natural_language_task";
pub const PRODUCTIVITY_INSIGHTS: &str = "productivity_insights";

/// One dispatchable feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureDescriptor {
    pub identifier: String,
    pub description: String,
    /// Instructions prepended to the user prompt before delivery
    pub instruction_template: String,
}

impl FeatureDescriptor {
    pub fn new(identifier: &str, description: &str, instruction_template: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            description: description.to_string(),
            instruction_template: instruction_template.to_string(),
        }
    }

    /// Full prompt sent to the completion service
    pub fn render_prompt(&self, prompt: &str) -> String {
        format!("{}\n\n{}", self.instruction_template, prompt.trim())
    }
}

/// Read-only lookup table of features, fixed once the dispatcher is built
#[derive(Debug, Clone)]
pub struct FeatureRegistry {
    features: BTreeMap<String, FeatureDescriptor>,
}

impl FeatureRegistry {
    pub fn empty() -> Self {
        Self {
            features: BTreeMap::new(),
        }
    }

    /// Add or replace a feature
    pub fn with_feature(mut self, feature: FeatureDescriptor) -> Self {
        self.features.insert(feature.identifier.clone(), feature);
        self
    }

    pub fn get(&self, identifier: &str) -> Option<&FeatureDescriptor> {
        self.features.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.features.contains_key(identifier)
    }

    /// Features in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &FeatureDescriptor> {
        self.features.values()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::empty()
            .with_feature(FeatureDescriptor::new(
                GOAL_ANALYSIS,
                "Analyze a goal and suggest milestones",
                "You are a goal-setting coach. Break the goal below into measurable milestones \
                 with realistic deadlines and point out risks.",
            ))
            .with_feature(FeatureDescriptor::new(
                HABIT_COACHING,
                "Coaching for building or breaking a habit",
                "You are a habit coach. Suggest a small daily action, a trigger and a way to \
                 track the habit described below.",
            ))
            .with_feature(FeatureDescriptor::new(
                PROJECT_PLANNING,
                "Plan a project into phases and tasks",
                "You are a project planner. Split the project below into phases, list the tasks \
                 of each phase and flag dependencies.",
            ))
            .with_feature(FeatureDescriptor::new(
                FINANCE_ADVICE,
                "General budgeting and saving guidance",
                "You are a personal finance assistant. Give practical budgeting and saving \
                 guidance for the situation below. Do not give investment advice.",
            ))
            .with_feature(FeatureDescriptor::new(
                TIME_MANAGEMENT,
                "Organize time and priorities",
                "You are a time management assistant. Suggest how to prioritize and schedule \
                 the work described below.",
            ))
            .with_feature(FeatureDescriptor::new(
                NATURAL_LANGUAGE_TASK,
                "Turn a sentence into a structured task",
                "Extract a task from the text below. Reply with JSON containing title, category, \
                 due_date (YYYY-MM-DD), due_time (HH:MM), priority and tags.",
            ))
            .with_feature(FeatureDescriptor::new(
                PRODUCTIVITY_INSIGHTS,
                "Explain productivity metrics in plain language",
                "You are a productivity analyst. Explain the metrics below and suggest one \
                 concrete improvement.",
            ))
    }
}
