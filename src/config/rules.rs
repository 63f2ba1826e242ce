use crate::engine::{ RuleTable, RulesError };
use log::info;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug)]
pub enum RuleFileError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    Invalid(RulesError),
}

impl fmt::Display for RuleFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFileError::IoError(e) => write!(f, "Rule file IO error: {}", e),
            RuleFileError::JsonError(e) => write!(f, "Rule file JSON parsing error: {}", e),
            RuleFileError::Invalid(e) => write!(f, "Invalid rule table: {}", e),
        }
    }
}

impl Error for RuleFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuleFileError::IoError(e) => Some(e),
            RuleFileError::JsonError(e) => Some(e),
            RuleFileError::Invalid(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for RuleFileError {
    fn from(err: std::io::Error) -> Self {
        RuleFileError::IoError(err)
    }
}

impl From<serde_json::Error> for RuleFileError {
    fn from(err: serde_json::Error) -> Self {
        RuleFileError::JsonError(err)
    }
}

impl From<RulesError> for RuleFileError {
    fn from(err: RulesError) -> Self {
        RuleFileError::Invalid(err)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub table: RuleTable,
    /// Modification time of the file the table was read from. `None` when
    /// the platform does not report one.
    pub file_modified: Option<SystemTime>,
}

pub fn load_rules_from_str(json: &str) -> Result<RuleTable, RuleFileError> {
    let table: RuleTable = serde_json::from_str(json)?;
    Ok(table.validated()?)
}

pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<LoadedRules, RuleFileError> {
    let file_modified = fs::metadata(&path)?.modified().ok();
    let content = fs::read_to_string(&path)?;
    let table = load_rules_from_str(&content)?;
    info!(
        "Loaded {} rules from '{}'",
        table.rules().len(),
        path.as_ref().display()
    );
    Ok(LoadedRules { table, file_modified })
}

/// Canonical table unless a rule file is configured.
pub fn resolve_rules(path: Option<&str>) -> Result<RuleTable, RuleFileError> {
    match path {
        Some(p) if !p.trim().is_empty() => Ok(load_rules(p)?.table),
        _ => {
            info!("Using built-in rule table");
            Ok(RuleTable::canonical())
        }
    }
}

pub fn reload_rules_if_changed<P: AsRef<Path>>(
    path: P,
    current: &LoadedRules
) -> Result<Option<LoadedRules>, RuleFileError> {
    let modified = fs::metadata(&path)?.modified().ok();
    if modified.is_some() && modified != current.file_modified {
        info!("Rule file changed, reloading...");
        return Ok(Some(load_rules(path)?));
    }
    Ok(None)
}
