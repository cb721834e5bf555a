//! Navigation actions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// A new entry was added
    Push,
    /// The current entry was overwritten
    Replace,
    /// An existing entry became current
    Pop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Push => "PUSH",
            Action::Replace => "REPLACE",
            Action::Pop => "POP",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PUSH" => Ok(Action::Push),
            "REPLACE" => Ok(Action::Replace),
            "POP" => Ok(Action::Pop),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_strings() {
        assert_eq!(Action::Push.to_string(), "PUSH");
        assert_eq!("replace".parse::<Action>().unwrap(), Action::Replace);
        assert!("jump".parse::<Action>().is_err());
        assert_eq!(serde_json::to_string(&Action::Pop).unwrap(), "\"POP\"");
    }
}
