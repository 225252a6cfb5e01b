//! Library and argument rule evaluation
//!
//! A rule list starts out disallowed; every rule whose constraints match the
//! current environment overrides the verdict with its own action. An empty
//! list always allows.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

use crate::system;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct OsRule {
    pub name: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
}

/// The environment rules are matched against
#[derive(Debug, Clone)]
pub struct Environment {
    pub os_name: String,
    pub os_arch: String,
    pub os_version: String,
    pub features: HashMap<String, bool>,
}

impl Environment {
    pub fn current() -> Self {
        Self {
            os_name: system::os_name().to_string(),
            os_arch: system::os_arch().to_string(),
            os_version: system::os_version(),
            features: HashMap::new(),
        }
    }

    pub fn with_feature(mut self, name: &str, enabled: bool) -> Self {
        self.features.insert(name.to_string(), enabled);
        self
    }

    fn feature(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }
}

impl Rule {
    pub fn matches(&self, env: &Environment) -> bool {
        if let Some(os) = &self.os {
            if let Some(name) = &os.name {
                if name != &env.os_name {
                    return false;
                }
            }
            if let Some(arch) = &os.arch {
                // Mojang uses "x86" to mean 32-bit Intel only
                if arch != &env.os_arch {
                    return false;
                }
            }
            if let Some(pattern) = &os.version {
                match Regex::new(pattern) {
                    Ok(re) if re.is_match(&env.os_version) => {}
                    _ => return false,
                }
            }
        }

        if let Some(features) = &self.features {
            if features.iter().any(|(name, wanted)| env.feature(name) != *wanted) {
                return false;
            }
        }

        true
    }
}

pub fn rules_allow(rules: &[Rule], env: &Environment) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if rule.matches(env) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(os: &str) -> Environment {
        Environment {
            os_name: os.to_string(),
            os_arch: "x86_64".to_string(),
            os_version: "10.0".to_string(),
            features: HashMap::new(),
        }
    }

    fn parse(json: &str) -> Vec<Rule> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_rules_allow() {
        assert!(rules_allow(&[], &env("linux")));
    }

    #[test]
    fn test_allow_then_disallow_osx() {
        let rules = parse(r#"[{"action": "allow"}, {"action": "disallow", "os": {"name": "osx"}}]"#);
        assert!(rules_allow(&rules, &env("linux")));
        assert!(rules_allow(&rules, &env("windows")));
        assert!(!rules_allow(&rules, &env("osx")));
    }

    #[test]
    fn test_allow_only_for_os() {
        let rules = parse(r#"[{"action": "allow", "os": {"name": "windows"}}]"#);
        assert!(rules_allow(&rules, &env("windows")));
        assert!(!rules_allow(&rules, &env("linux")));
    }

    #[test]
    fn test_arch_and_version_constraints() {
        let rules = parse(r#"[{"action": "allow", "os": {"arch": "x86"}}]"#);
        assert!(!rules_allow(&rules, &env("windows")));

        let rules = parse(r#"[{"action": "allow", "os": {"name": "windows", "version": "^10\\."}}]"#);
        assert!(rules_allow(&rules, &env("windows")));

        // Broken regex never matches
        let rules = parse(r#"[{"action": "allow", "os": {"version": "(("}}]"#);
        assert!(!rules_allow(&rules, &env("windows")));
    }

    #[test]
    fn test_features() {
        let rules = parse(r#"[{"action": "allow", "features": {"has_custom_resolution": true}}]"#);
        assert!(!rules_allow(&rules, &env("linux")));
        assert!(rules_allow(
            &rules,
            &env("linux").with_feature("has_custom_resolution", true)
        ));

        let demo = parse(r#"[{"action": "allow", "features": {"is_demo_user": true}}]"#);
        assert!(!rules_allow(&demo, &env("linux")));
    }
}
