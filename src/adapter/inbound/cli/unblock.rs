//! Handler for the `unblock` command.

use chrono::Utc;
use serde_json::json;
use tracing::warn;

use crate::adapter::inbound::cli::command::UnblockArgs;
use crate::adapter::inbound::cli::output;
use crate::application::monitor::load_refreshed;
use crate::domain::{Account, AccountId, AlertLevel, Symbol};
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::open_storage;
use crate::infrastructure::config::Config;
use crate::port::{AccountStore, ReportSink};

/// What an operator unblock changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnblockOutcome {
    /// The account block was lifted and monitoring resumes next tick.
    AccountResumed,
    /// A single symbol block was lifted.
    SymbolCleared(Symbol),
    /// Nothing was blocked.
    NotBlocked,
}

impl UnblockOutcome {
    fn message(&self) -> String {
        match self {
            Self::AccountResumed => "Account unblocked by operator. Monitoring resumed.".to_string(),
            Self::SymbolCleared(symbol) => format!("{symbol} unblocked by operator."),
            Self::NotBlocked => "Nothing to unblock.".to_string(),
        }
    }
}

/// Lift the account block, or one symbol block when `symbol` is given.
///
/// Lifting the account block also reactivates the account.
pub fn apply(account: &mut Account, symbol: Option<&Symbol>) -> UnblockOutcome {
    match symbol {
        Some(symbol) => {
            if account.blocking.clear_symbol_block(symbol) {
                UnblockOutcome::SymbolCleared(symbol.clone())
            } else {
                UnblockOutcome::NotBlocked
            }
        }
        None => {
            let cleared = account.blocking.clear_account_block();
            if cleared || !account.is_active {
                account.is_active = true;
                UnblockOutcome::AccountResumed
            } else {
                UnblockOutcome::NotBlocked
            }
        }
    }
}

/// Execute the unblock command.
pub async fn execute(args: &UnblockArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let storage = open_storage(&config)?;
    let store: &dyn AccountStore = storage.store.as_ref();

    let id = AccountId::try_new(args.account.as_str())?;
    let symbol = args
        .symbol
        .as_deref()
        .map(Symbol::try_new)
        .transpose()?;

    let mut account = load_refreshed(store, &id, Utc::now())
        .await?
        .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;

    let outcome = apply(&mut account, symbol.as_ref());
    let message = outcome.message();

    if outcome != UnblockOutcome::NotBlocked {
        store.save_account(&account).await?;
        let context = json!({
            "source": "operator",
            "symbol": symbol.as_ref().map(Symbol::as_str),
        });
        if let Err(e) = storage
            .sink
            .record_alert(&id, AlertLevel::Info, &message, &context)
            .await
        {
            warn!(account = %id, error = %e, "Failed to record unblock alert");
        }
    }

    if output::is_json() {
        output::json_document(&json!({
            "command": "unblock",
            "account": id.as_str(),
            "symbol": symbol.as_ref().map(Symbol::as_str),
            "changed": outcome != UnblockOutcome::NotBlocked,
            "message": message,
        }));
    } else if outcome == UnblockOutcome::NotBlocked {
        output::warning(&format!("{id}: {message}"));
    } else {
        output::success(&format!("{id}: {message}"));
    }
    Ok(())
}
