// RecordScope -> SQL predicate

use kissan_core::port::RecordScope;
use sqlx::{QueryBuilder, Sqlite};

/// Append ` AND <predicate>` restricting `applications` aliased as `alias`
pub(crate) fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, alias: &str, scope: &RecordScope) {
    match scope {
        RecordScope::All => {}
        RecordScope::Applicant(user_id) => {
            qb.push(format!(" AND {}.applicant_id = ", alias))
                .push_bind(user_id.clone());
        }
        RecordScope::Villages(ids) if ids.is_empty() => {
            qb.push(" AND 1 = 0");
        }
        RecordScope::Villages(ids) => {
            qb.push(format!(" AND {}.village_id IN (", alias));
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");
        }
    }
}
