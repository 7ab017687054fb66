//! Static dangerous-command detection
//!
//! A match only ever flags the decision's metadata; it never blocks.

use crate::utils::normalize_text;

#[derive(Debug, Clone)]
pub struct DangerousCommandDetector {
    patterns: Vec<String>,
}

impl DangerousCommandDetector {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| normalize_text(p))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Denylist entries found in `command` (case- and spacing-insensitive)
    pub fn matches(&self, command: &str) -> Vec<String> {
        let command = normalize_text(command);
        self.patterns
            .iter()
            .filter(|p| command.contains(p.as_str()))
            .cloned()
            .collect()
    }
}

impl Default for DangerousCommandDetector {
    fn default() -> Self {
        Self::new(&crate::config::CoordinationConfig::default().dangerous_patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_known_patterns() {
        let detector = DangerousCommandDetector::default();
        assert_eq!(detector.matches("sudo rm -rf /"), vec!["rm -rf /"]);
        assert!(!detector.matches("git   push  --force origin main").is_empty());
        assert!(!detector.matches("psql -c 'DROP TABLE users'").is_empty());
    }

    #[test]
    fn test_ignores_safe_commands() {
        let detector = DangerousCommandDetector::default();
        assert!(detector.matches("cargo test --all").is_empty());
        assert!(detector.matches("rm -r target/debug").is_empty());
    }

    #[test]
    fn test_custom_patterns() {
        let detector =
            DangerousCommandDetector::new(&["Terraform Destroy".to_string(), " ".to_string()]);
        assert_eq!(detector.matches("terraform destroy -auto-approve").len(), 1);
        assert!(detector.matches("terraform plan").is_empty());
    }
}
