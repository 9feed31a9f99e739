//! Schema of the administrative side: accounts and sessions.

use std::sync::Arc;

use stratum_core::Migration;

mod v1_0_0_create_accounts;
mod v1_3_0_backfill_mfa_flag;
mod v1_4_0_drop_legacy_sessions;

pub fn migrations() -> Vec<Arc<dyn Migration>> {
    vec![
        Arc::new(v1_0_0_create_accounts::CreateAccounts),
        Arc::new(v1_3_0_backfill_mfa_flag::BackfillMfaFlag),
        Arc::new(v1_4_0_drop_legacy_sessions::DropLegacySessions),
    ]
}
