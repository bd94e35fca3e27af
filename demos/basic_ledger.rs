//! Basic ledger usage example

use std::str::FromStr;

use bigdecimal::BigDecimal;
use ledger_core::utils::MemoryAccountStore;
use ledger_core::{telemetry, LedgerConfig, LedgerService, Operation, Request, Response};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LedgerConfig::from_env()?;
    telemetry::init_from_config(&config);

    println!("Ledger Core - Basic Ledger Example\n");

    let store = MemoryAccountStore::with_lock_timeout(config.lock_timeout());
    let service = LedgerService::from_config(store, &config);
    let scheme = config.credential_scheme.clone();

    // 1. Open two accounts
    let mut accounts = Vec::new();
    for name in ["Ana", "Bruno"] {
        let response = service
            .handle(Request::new(Operation::Create {
                display_name: name.to_string(),
            }))
            .await
            .map_err(|e| anyhow::anyhow!(e.message))?;
        if let Response::Account(account) = response {
            println!("  Created account {} - {} (balance {})", account.id, account.display_name, account.balance);
            accounts.push(account);
        }
    }
    let (ana, bruno) = (&accounts[0], &accounts[1]);
    let as_ana = format!("{} {}", scheme, ana.credential);

    // 2. Fund Ana and move part of it to Bruno
    service
        .handle(
            Request::new(Operation::Deposit {
                id: ana.id,
                amount: BigDecimal::from_str("100.00")?,
            })
            .with_credential(as_ana.clone()),
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;
    println!("\n  Deposited 100.00 into {}", ana.display_name);

    service
        .handle(
            Request::new(Operation::Transfer {
                source_id: ana.id,
                destination_id: bruno.id,
                amount: BigDecimal::from_str("40.00")?,
            })
            .with_credential(as_ana.clone()),
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.message))?;
    println!("  Transferred 40.00 from {} to {}", ana.display_name, bruno.display_name);

    // 3. Rejections: overdraft and reading someone else's account
    let overdraft = service
        .handle(
            Request::new(Operation::Transfer {
                source_id: ana.id,
                destination_id: bruno.id,
                amount: BigDecimal::from_str("1000.00")?,
            })
            .with_credential(as_ana.clone()),
        )
        .await;
    if let Err(body) = overdraft {
        println!("\n  Overdraft rejected: {} ({})", body.message, body.status);
    }

    let snoop = service
        .handle(Request::new(Operation::Find { id: bruno.id }).with_credential(as_ana))
        .await;
    if let Err(body) = snoop {
        println!("  Cross-account read rejected: {} ({})", body.message, body.status);
    }

    // 4. Final balances
    println!("\n  Final balances:");
    for account in service.ledger().list_accounts().await? {
        println!("    {} {}: {}", account.id, account.display_name, account.balance);
    }
    println!("  Total: {}", service.ledger().total_balance().await?);

    Ok(())
}
