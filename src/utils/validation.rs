//! Name validation utilities.
//!
//! Node names end up in interface names, namespace names and log file names,
//! so they are restricted to a conservative character set.

use regex::Regex;
use std::sync::OnceLock;

fn node_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("node name regex"))
}

/// Validate a switch or host name
///
/// # Examples
/// ```
/// use switchnet::utils::validation::validate_node_name;
///
/// assert!(validate_node_name("s1").is_ok());
/// assert!(validate_node_name("edge_2").is_ok());
/// assert!(validate_node_name("1s").is_err());
/// assert!(validate_node_name("s-1").is_err());
/// ```
pub fn validate_node_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("node name cannot be empty".to_string());
    }
    if !node_name_regex().is_match(name) {
        return Err(format!(
            "node name '{}' must start with a letter and contain only letters, digits or '_'",
            name
        ));
    }
    Ok(())
}
