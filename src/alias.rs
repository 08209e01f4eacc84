use crate::ledger::store::{LedgerError, LedgerStore};

#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    #[error("alias `{alias}` is invalid: {reason}")]
    InvalidAlias { alias: String, reason: String },
    #[error("alias `{alias}` is already used by workflow {owner}")]
    AliasAlreadyExists { alias: String, owner: String },
    #[error("workflow {run_id} is not in the ledger")]
    UnknownWorkflow { run_id: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Assigns (or, with an empty alias, clears) the alias on a ledger row. All
/// validation runs before any mutation; a failed check leaves the ledger
/// untouched. The returned string, when present, is an informational warning
/// that an existing alias was replaced or removed.
pub fn set_alias(
    run_id: &str,
    new_alias: &str,
    store: &LedgerStore,
) -> Result<Option<String>, AliasError> {
    validate_alias_syntax(new_alias)?;

    let records = store.read_all()?;
    if !new_alias.is_empty() {
        if let Some(owner) = records
            .iter()
            .find(|row| row.alias == new_alias && row.run_id != run_id)
        {
            return Err(AliasError::AliasAlreadyExists {
                alias: new_alias.to_string(),
                owner: owner.run_id.clone(),
            });
        }
    }
    let target = records
        .iter()
        .find(|row| row.run_id == run_id)
        .ok_or_else(|| AliasError::UnknownWorkflow {
            run_id: run_id.to_string(),
        })?;

    let warning = if target.has_alias() && target.alias != new_alias {
        if new_alias.is_empty() {
            Some(format!(
                "removing existing alias `{}` from workflow {run_id}",
                target.alias
            ))
        } else {
            Some(format!(
                "replacing existing alias `{}` with `{new_alias}` on workflow {run_id}",
                target.alias
            ))
        }
    } else {
        None
    };

    store.update_alias(run_id, new_alias)?;
    Ok(warning)
}

/// Aliases may not look like the resolver's other token kinds: no leading `-`
/// (relative index / flag), no whitespace, not all digits.
fn validate_alias_syntax(alias: &str) -> Result<(), AliasError> {
    let invalid = |reason: &str| AliasError::InvalidAlias {
        alias: alias.to_string(),
        reason: reason.to_string(),
    };
    if alias.starts_with('-') {
        return Err(invalid("must not start with `-`"));
    }
    if alias.chars().any(|ch| ch.is_whitespace()) {
        return Err(invalid("must not contain whitespace"));
    }
    if !alias.is_empty() && alias.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(invalid("must not be composed entirely of digits"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_syntax_rejects_index_like_and_spaced_values() {
        assert!(validate_alias_syntax("-bad").is_err());
        assert!(validate_alias_syntax("has space").is_err());
        assert!(validate_alias_syntax("tab\there").is_err());
        assert!(validate_alias_syntax("123").is_err());
        assert!(validate_alias_syntax("good-alias").is_ok());
        assert!(validate_alias_syntax("goodalias-").is_ok());
        assert!(validate_alias_syntax("").is_ok());
    }
}
