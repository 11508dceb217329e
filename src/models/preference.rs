//! Per-user analysis preferences.

use serde::{Deserialize, Serialize};

/// Stored analysis preferences for one user, injected into section prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    /// Free-form instructions appended to every section prompt.
    pub custom_instructions: Option<String>,
    /// Topics the user wants emphasized.
    pub focus_areas: Vec<String>,
}

impl UserPreferences {
    /// Render preferences as a prompt directive block, if any are set.
    pub fn prompt_block(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(instructions) = &self.custom_instructions {
            if !instructions.is_empty() {
                parts.push(format!("User instructions: {instructions}"));
            }
        }
        if !self.focus_areas.is_empty() {
            parts.push(format!("Emphasize these areas: {}", self.focus_areas.join(", ")));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_block_empty() {
        let prefs = UserPreferences {
            user_id: "u1".to_string(),
            custom_instructions: None,
            focus_areas: vec![],
        };
        assert!(prefs.prompt_block().is_none());
    }

    #[test]
    fn test_prompt_block_full() {
        let prefs = UserPreferences {
            user_id: "u1".to_string(),
            custom_instructions: Some("be terse".to_string()),
            focus_areas: vec!["economics".to_string()],
        };
        let block = prefs.prompt_block().unwrap();
        assert!(block.contains("be terse"));
        assert!(block.contains("economics"));
    }
}
