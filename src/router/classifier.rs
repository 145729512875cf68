//! Keyword-based task classification
//!
//! Categories are checked in declared order and keywords in declared order
//! within each category; the first substring hit wins. That order is the
//! tie-break when a prompt mentions terms from several categories.

use crate::config::RoutingConfig;
use crate::router::TaskCategory;

/// Maps prompt text to a task category
#[derive(Debug, Clone)]
pub struct TaskClassifier {
    /// (category, lowercased keywords) in declared order
    rules: Vec<(TaskCategory, Vec<String>)>,
    default: TaskCategory,
}

impl TaskClassifier {
    /// Build a classifier from the routing policy
    pub fn new(routing: &RoutingConfig) -> Self {
        let rules = routing
            .categories
            .iter()
            .map(|category| {
                let keywords = category
                    .keywords
                    .iter()
                    .filter(|k| !k.is_empty())
                    .map(|k| k.to_lowercase())
                    .collect();
                (TaskCategory::new(category.name.clone()), keywords)
            })
            .collect();

        Self {
            rules,
            default: TaskCategory::new(routing.default_category.clone()),
        }
    }

    /// Classify a prompt; no match (or an empty prompt) yields the default category
    pub fn classify(&self, prompt: &str) -> TaskCategory {
        if prompt.is_empty() {
            return self.default.clone();
        }

        let prompt = prompt.to_lowercase();
        for (category, keywords) in &self.rules {
            if let Some(keyword) = keywords.iter().find(|k| prompt.contains(k.as_str())) {
                tracing::debug!(
                    category = %category,
                    keyword = %keyword,
                    "Prompt classified by keyword"
                );
                return category.clone();
            }
        }

        tracing::debug!(
            category = %self.default,
            "No keyword matched, using default category"
        );
        self.default.clone()
    }

    /// Default category
    pub fn default_category(&self) -> &TaskCategory {
        &self.default
    }

    /// Declared categories in match order
    pub fn categories(&self) -> impl Iterator<Item = &TaskCategory> {
        self.rules.iter().map(|(category, _)| category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryPolicy;
    use std::collections::HashMap;

    fn policy(categories: &[(&str, &[&str])]) -> RoutingConfig {
        RoutingConfig {
            categories: categories
                .iter()
                .map(|(name, keywords)| CategoryPolicy {
                    name: name.to_string(),
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                    weights: HashMap::new(),
                })
                .collect(),
            ..RoutingConfig::default()
        }
    }

    fn bridge_policy() -> RoutingConfig {
        policy(&[
            ("analysis", &["analyze", "analysis", "impact"]),
            ("conversation", &["hello", "how are you"]),
            ("summarization", &["summarize", "summary"]),
            ("planning", &["plan", "strategy"]),
            ("coding", &["python", "function", "code"]),
        ])
    }

    #[test]
    fn test_each_category_matches_its_keywords() {
        let classifier = TaskClassifier::new(&bridge_policy());

        let cases = [
            ("Analyze the impact of AI", "analysis"),
            ("Hello, how are you?", "conversation"),
            ("Summarize this document", "summarization"),
            ("Plan a marketing launch", "planning"),
            ("Write a Python function", "coding"),
        ];
        for (prompt, expected) in cases {
            assert_eq!(classifier.classify(prompt).as_str(), expected, "prompt: {prompt}");
        }
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let classifier = TaskClassifier::new(&policy(&[("coding", &["Python"])]));
        assert_eq!(classifier.classify("i love PYTHON").as_str(), "coding");
        assert_eq!(classifier.classify("i love python").as_str(), "coding");
    }

    #[test]
    fn test_no_match_falls_back_to_default() {
        let classifier = TaskClassifier::new(&bridge_policy());
        assert_eq!(classifier.classify("Translate to French").as_str(), "analysis");
    }

    #[test]
    fn test_empty_prompt_uses_default() {
        let mut routing = policy(&[("coding", &["code"])]);
        routing.default_category = "conversation".to_string();
        let classifier = TaskClassifier::new(&routing);
        assert_eq!(classifier.classify("").as_str(), "conversation");
    }

    #[test]
    fn test_earlier_category_wins_when_several_match() {
        // "plan" (planning) and "code" (coding) both appear; planning is declared first
        let classifier = TaskClassifier::new(&policy(&[
            ("planning", &["plan"]),
            ("coding", &["code"]),
        ]));
        assert_eq!(classifier.classify("write code for the plan").as_str(), "planning");

        let reversed = TaskClassifier::new(&policy(&[
            ("coding", &["code"]),
            ("planning", &["plan"]),
        ]));
        assert_eq!(reversed.classify("write code for the plan").as_str(), "coding");
    }

    #[test]
    fn test_keyword_matches_as_substring() {
        let classifier = TaskClassifier::new(&policy(&[("planning", &["plan"])]));
        // substring semantics: "planet" contains "plan"
        assert_eq!(classifier.classify("describe the planet").as_str(), "planning");
    }

    #[test]
    fn test_empty_keywords_never_match() {
        let classifier = TaskClassifier::new(&policy(&[("coding", &[""])]));
        assert_eq!(classifier.classify("anything").as_str(), "analysis");
    }

    #[test]
    fn test_categories_listed_in_declared_order() {
        let classifier = TaskClassifier::new(&bridge_policy());
        let names: Vec<_> = classifier.categories().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["analysis", "conversation", "summarization", "planning", "coding"]
        );
        assert_eq!(classifier.default_category().as_str(), "analysis");
    }
}
