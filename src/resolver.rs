use crate::ledger::record::SubmissionRecord;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("workflow reference `{token}` is invalid: relative index zero has no row")]
    InvalidReference { token: String },
    #[error("workflow reference `{token}` is out of range; the ledger has {rows} rows")]
    OutOfRange { token: String, rows: usize },
    #[error("no workflow in the ledger has alias `{token}`")]
    AliasNotFound { token: String },
}

/// Resolves a user-supplied workflow reference into a canonical run id.
/// Precedence is strict: run-id shape first, then signed relative index into
/// the ledger rows, then exact alias match. A run-id-shaped token is returned
/// unchanged without consulting the ledger; callers that need the record must
/// verify existence themselves.
pub fn resolve(token: &str, records: &[SubmissionRecord]) -> Result<String, ResolveError> {
    if is_run_id_shaped(token) {
        return Ok(token.to_string());
    }
    if let Some(index) = parse_relative_index(token) {
        if index == 0 {
            return Err(ResolveError::InvalidReference {
                token: token.to_string(),
            });
        }
        let rows = records.len();
        let offset = index.unsigned_abs() as usize;
        if offset > rows {
            return Err(ResolveError::OutOfRange {
                token: token.to_string(),
                rows,
            });
        }
        let position = if index > 0 { offset - 1 } else { rows - offset };
        return Ok(records[position].run_id.clone());
    }
    records
        .iter()
        .find(|row| row.has_alias() && row.alias == token)
        .map(|row| row.run_id.clone())
        .ok_or_else(|| ResolveError::AliasNotFound {
            token: token.to_string(),
        })
}

/// `8-4-4-4-12` lowercase-or-uppercase hex groups, dash separated.
pub fn is_run_id_shaped(token: &str) -> bool {
    const GROUP_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];
    let mut groups = token.split('-');
    for expected in GROUP_LENGTHS {
        let Some(group) = groups.next() else {
            return false;
        };
        if group.len() != expected || !group.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return false;
        }
    }
    groups.next().is_none()
}

fn parse_relative_index(token: &str) -> Option<i64> {
    let digits = token.strip_prefix('-').unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
