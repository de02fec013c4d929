//! Demo dataset so a fresh node is explorable out of the box: two investors,
//! two entrepreneurs, one funded deal and one still pending.

use fundry_common::currency::Currency;
use fundry_common::deal::DealStatus;
use fundry_common::error::LedgerError;
use fundry_common::ledger::Ledger;
use fundry_common::wallet::UserId;

pub fn seed_demo_data(ledger: &mut Ledger) -> Result<(), LedgerError> {
    let i1 = UserId("i1".into());
    let i2 = UserId("i2".into());
    let e1 = UserId("e1".into());
    let e2 = UserId("e2".into());

    ledger.open_wallet(i1.clone(), Currency::Usd, 5_000_000)?;
    ledger.open_wallet(i2.clone(), Currency::Usd, 3_000_000)?;
    ledger.open_wallet(e1.clone(), Currency::Usd, 50_000)?;
    ledger.open_wallet(e2.clone(), Currency::Usd, 25_000)?;

    // A funded deal: i1 backs e1, which moves the money on completion.
    let funded = ledger.create_deal(
        &i1,
        &e1,
        1_500_000,
        15.0,
        "Series A funding for TechWave AI",
    )?;
    ledger.transition_deal(&funded.id, DealStatus::Approved)?;
    ledger.transition_deal(&funded.id, DealStatus::Completed)?;

    // A deal still waiting on approval.
    ledger.create_deal(
        &i2,
        &e2,
        2_000_000,
        20.0,
        "Seed funding for GreenLife Solutions",
    )?;

    Ok(())
}
