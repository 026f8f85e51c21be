//! Credit commands

use super::CreditsCommand;
use anyhow::{bail, Result};
use console::style;
use framescan::credits::TransactionType;
use framescan::engine::FrameEngine;

pub fn run(engine: &FrameEngine, action: CreditsCommand) -> Result<()> {
    match action {
        CreditsCommand::Balance => balance(engine),
        CreditsCommand::History { limit } => history(engine, limit),
        CreditsCommand::Buy { package } => {
            if !engine.purchase_credits(&package) {
                let known: Vec<&str> = engine
                    .config()
                    .credits
                    .packages
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect();
                bail!(
                    "Unknown package '{}'. Available packages: {}",
                    package,
                    known.join(", ")
                );
            }
            println!("{} Purchased {}", style("✓").green(), style(&package).cyan());
            balance(engine)
        }
        CreditsCommand::Bonus { amount, reason } => {
            engine.add_bonus_credits(amount, &reason)?;
            println!(
                "{} Added {} bonus credit(s): {}",
                style("✓").green(),
                amount,
                reason
            );
            balance(engine)
        }
    }
}

fn balance(engine: &FrameEngine) -> Result<()> {
    let balance = engine.credit_balance();
    println!(
        "{} {} available ({} credits + {} bonus)",
        style("Credits:").bold(),
        style(balance.available()).bold().cyan(),
        balance.credits,
        balance.bonus_credits
    );
    println!(
        "{}",
        style(format!(
            "purchased {}, used {}",
            balance.total_purchased, balance.total_used
        ))
        .dim()
    );
    Ok(())
}

fn history(engine: &FrameEngine, limit: usize) -> Result<()> {
    let transactions = engine.credit_transactions();
    if transactions.is_empty() {
        println!("{}", style("No credit transactions yet.").dim());
        return Ok(());
    }

    let shown = if limit == 0 { transactions.len() } else { limit };
    for txn in transactions.iter().rev().take(shown) {
        let amount = match txn.kind {
            TransactionType::Use => style(format!("{:+}", txn.amount)).red(),
            _ => style(format!("{:+}", txn.amount)).green(),
        };
        println!(
            "{}  {:<8} {:>5}  {}{}",
            style(txn.created_at.format("%Y-%m-%d %H:%M")).dim(),
            txn.kind.to_string(),
            amount,
            txn.reason.as_deref().unwrap_or(""),
            txn.scan_report_id
                .as_deref()
                .map(|id| format!(" ({})", id))
                .unwrap_or_default()
        );
    }
    Ok(())
}
