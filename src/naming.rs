// ABOUTME: Hierarchical container naming for DVM workspaces.
// ABOUTME: generate_name/parse_name are pure inverses over hyphen-joined parts.

use thiserror::Error;

/// Fixed prefix token identifying DVM-managed container names.
pub const NAME_PREFIX: &str = "dvm";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name component cannot be empty: {0}")]
    EmptyComponent(&'static str),

    #[error("name component contains a hyphen: {0}")]
    HyphenInComponent(String),

    #[error("ecosystem requires a domain to be set")]
    EcosystemWithoutDomain,

    #[error("not a DVM container name: {0}")]
    InvalidName(String),
}

/// Parsed hierarchy of a workspace container name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub ecosystem: Option<String>,
    pub domain: Option<String>,
    pub app: String,
    pub workspace: String,
}

/// Build the canonical container name `dvm-[ecosystem-][domain-]app-workspace`.
///
/// Components are lower-cased (names are case-insensitive identities) and may
/// not contain hyphens, since the hyphen is the separator `parse_name` splits
/// on. An ecosystem without a domain would be indistinguishable from a domain
/// on parse, so it is rejected.
pub fn generate_name(
    ecosystem: Option<&str>,
    domain: Option<&str>,
    app: &str,
    workspace: &str,
) -> Result<String, NameError> {
    if ecosystem.is_some_and(|e| !e.is_empty()) && domain.is_none_or(str::is_empty) {
        return Err(NameError::EcosystemWithoutDomain);
    }

    let mut parts: Vec<String> = vec![NAME_PREFIX.to_string()];
    for (label, value, required) in [
        ("ecosystem", ecosystem, false),
        ("domain", domain, false),
        ("app", Some(app), true),
        ("workspace", Some(workspace), true),
    ] {
        match value {
            Some(v) if !v.is_empty() => {
                if v.contains('-') {
                    return Err(NameError::HyphenInComponent(v.to_string()));
                }
                parts.push(v.to_ascii_lowercase());
            }
            _ if required => return Err(NameError::EmptyComponent(label)),
            _ => {}
        }
    }

    Ok(parts.join("-"))
}

/// Left inverse of [`generate_name`].
///
/// Rejects names that lack the `dvm` prefix or carry fewer than two or more
/// than four components after it.
pub fn parse_name(name: &str) -> Result<NameParts, NameError> {
    let mut parts = name.split('-');
    if parts.next() != Some(NAME_PREFIX) {
        return Err(NameError::InvalidName(name.to_string()));
    }

    let rest: Vec<&str> = parts.collect();
    if rest.iter().any(|p| p.is_empty()) {
        return Err(NameError::InvalidName(name.to_string()));
    }

    match rest.as_slice() {
        [app, workspace] => Ok(NameParts {
            ecosystem: None,
            domain: None,
            app: (*app).to_string(),
            workspace: (*workspace).to_string(),
        }),
        [domain, app, workspace] => Ok(NameParts {
            ecosystem: None,
            domain: Some((*domain).to_string()),
            app: (*app).to_string(),
            workspace: (*workspace).to_string(),
        }),
        [ecosystem, domain, app, workspace] => Ok(NameParts {
            ecosystem: Some((*ecosystem).to_string()),
            domain: Some((*domain).to_string()),
            app: (*app).to_string(),
            workspace: (*workspace).to_string(),
        }),
        _ => Err(NameError::InvalidName(name.to_string())),
    }
}
