use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

use super::types::{CaseDraft, GenerationMode};

/// Ordered, id-deduplicated store of drafted cases.
///
/// Collisions keep the latest payload at the original position and produce
/// a single warning per id for the current stage.
#[derive(Debug)]
pub struct CaseRegistry {
    mode: GenerationMode,
    cases: IndexMap<String, CaseDraft>,
    next_fallback: usize,
    stage: String,
    warned: HashSet<String>,
}

impl CaseRegistry {
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            mode,
            cases: IndexMap::new(),
            next_fallback: 1,
            stage: "writer".to_string(),
            warned: HashSet::new(),
        }
    }

    /// Start a new stage; duplicate warnings are tracked per stage
    pub fn begin_stage(&mut self, stage: &str) {
        self.stage = stage.to_string();
        self.warned.clear();
    }

    /// Insert a case, assigning a fallback id when it has none.
    ///
    /// Returns a warning the first time an id collides during this stage.
    pub fn insert(&mut self, mut case: CaseDraft) -> Option<String> {
        let id = case.id().trim().to_string();
        let id = if id.is_empty() {
            let fallback = self.fallback_id();
            case.set_id(fallback.clone());
            fallback
        } else {
            if id != case.id() {
                case.set_id(id.clone());
            }
            id
        };

        let previous = self.cases.insert(id.clone(), case);
        if previous.is_some() && self.warned.insert(id.clone()) {
            return Some(format!(
                "Duplicate case id {} during {}; keeping the latest version",
                id, self.stage
            ));
        }
        None
    }

    /// Overwrite or add a case without collision bookkeeping
    pub fn replace(&mut self, case: CaseDraft) {
        let id = case.id().to_string();
        debug!("Replacing case {}", id);
        self.cases.insert(id, case);
    }

    pub fn get(&self, id: &str) -> Option<&CaseDraft> {
        self.cases.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cases.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn cases(&self) -> impl Iterator<Item = &CaseDraft> {
        self.cases.values()
    }

    pub fn snapshot(&self) -> Vec<CaseDraft> {
        self.cases.values().cloned().collect()
    }

    pub fn into_cases(self) -> Vec<CaseDraft> {
        self.cases.into_values().collect()
    }

    fn fallback_id(&mut self) -> String {
        loop {
            let candidate = format!("{}-{}", self.mode.id_prefix(), self.next_fallback);
            self.next_fallback += 1;
            if !self.cases.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::HighLevelCase;

    fn case(id: &str, title: &str) -> CaseDraft {
        CaseDraft::HighLevel(HighLevelCase {
            id: id.to_string(),
            title: title.to_string(),
            area: String::new(),
            scenario: String::new(),
            description: String::new(),
        })
    }

    #[test]
    fn test_fallback_ids_use_mode_prefix() {
        let mut registry = CaseRegistry::new(GenerationMode::HighLevel);
        assert!(registry.insert(case("", "a")).is_none());
        assert!(registry.insert(case("  ", "b")).is_none());
        let ids: Vec<&str> = registry.cases().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["TS-1", "TS-2"]);

        let mut detailed = CaseRegistry::new(GenerationMode::Detailed);
        detailed.insert(case("", "a"));
        assert!(detailed.contains("TC-1"));
    }

    #[test]
    fn test_fallback_skips_taken_ids() {
        let mut registry = CaseRegistry::new(GenerationMode::HighLevel);
        registry.insert(case("TS-1", "explicit"));
        registry.insert(case("", "generated"));
        assert_eq!(registry.get("TS-2").map(|c| c.title()), Some("generated"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_collision_last_write_wins_single_warning() {
        let mut registry = CaseRegistry::new(GenerationMode::HighLevel);
        registry.insert(case("TS-1", "first"));
        registry.insert(case("TS-2", "other"));

        let warning = registry.insert(case("TS-1", "second"));
        assert_eq!(
            warning.as_deref(),
            Some("Duplicate case id TS-1 during writer; keeping the latest version")
        );
        assert!(registry.insert(case("TS-1", "third")).is_none());

        let titles: Vec<&str> = registry.cases().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["third", "other"]);
    }

    #[test]
    fn test_warnings_reset_per_stage() {
        let mut registry = CaseRegistry::new(GenerationMode::HighLevel);
        registry.insert(case("TS-1", "a"));
        assert!(registry.insert(case("TS-1", "b")).is_some());
        registry.begin_stage("revision");
        let warning = registry.insert(case("TS-1", "c")).unwrap();
        assert!(warning.contains("during revision"));
    }

    #[test]
    fn test_replace_is_silent() {
        let mut registry = CaseRegistry::new(GenerationMode::HighLevel);
        registry.insert(case("TS-1", "a"));
        registry.replace(case("TS-1", "revised"));
        assert_eq!(registry.get("TS-1").map(|c| c.title()), Some("revised"));
        assert_eq!(registry.snapshot().len(), 1);
        assert_eq!(registry.into_cases()[0].title(), "revised");
    }
}
