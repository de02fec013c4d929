use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::currency::Currency;
use crate::deal::{DealId, DealStatus, FundingDeal};
use crate::error::LedgerError;
use crate::wallet::{
    balance_from_entries, Transaction, TransactionKind, TransactionMetadata, TransactionStatus,
    UserId, Wallet, WalletId,
};

/// The book of record: wallets, the append-only entry log, and funding deals.
///
/// Single-threaded by design. Callers that share a `Ledger` across tasks wrap
/// it in a lock and take the write side for postings, so every posting
/// validates and applies as one unit: a failed posting leaves no trace, and
/// the balance/entry-sum invariant holds at every observation point.
#[derive(Debug)]
pub struct Ledger {
    wallets: BTreeMap<WalletId, Wallet>,
    /// One wallet per user.
    owners: BTreeMap<UserId, WalletId>,
    /// Append-only. Entries are never mutated once completed, never removed.
    entries: Vec<Transaction>,
    deals: BTreeMap<DealId, FundingDeal>,
    next_entry_id: u64,
    next_wallet_seq: u64,
    next_deal_seq: u64,
    next_reference_seq: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            wallets: BTreeMap::new(),
            owners: BTreeMap::new(),
            entries: Vec::new(),
            deals: BTreeMap::new(),
            next_entry_id: 1,
            next_wallet_seq: 1,
            next_deal_seq: 1,
            next_reference_seq: 1,
        }
    }

    // ─── Wallets ─────────────────────────────────────────────────────────────

    /// Provision a wallet for `user`. One wallet per user; a non-zero opening
    /// balance is recorded as an initial deposit entry so the balance equals
    /// the ledger sum from the very first observation.
    pub fn open_wallet(
        &mut self,
        user: UserId,
        currency: Currency,
        opening_balance: i64,
    ) -> Result<Wallet, LedgerError> {
        if opening_balance < 0 {
            return Err(LedgerError::Validation(format!(
                "opening balance must not be negative, got {opening_balance}"
            )));
        }
        if self.owners.contains_key(&user) {
            return Err(LedgerError::WalletExists(user.to_string()));
        }

        let now = Utc::now();
        let id = WalletId(format!("w-{}", self.next_wallet_seq));
        self.next_wallet_seq += 1;

        let wallet = Wallet {
            id: id.clone(),
            user_id: user.clone(),
            balance: 0,
            currency,
            created_at: now,
            updated_at: now,
        };
        self.owners.insert(user.clone(), id.clone());
        self.wallets.insert(id.clone(), wallet);

        if opening_balance > 0 {
            self.deposit(&user, opening_balance, "Opening balance", None)?;
        }
        self.wallet_by_user(&user).cloned()
    }

    pub fn wallet_by_user(&self, user: &UserId) -> Result<&Wallet, LedgerError> {
        self.owners
            .get(user)
            .and_then(|id| self.wallets.get(id))
            .ok_or_else(|| LedgerError::WalletNotFound(user.to_string()))
    }

    // ─── Single-entry postings ───────────────────────────────────────────────

    /// Post a deposit: one positive entry plus the matching balance credit.
    pub fn deposit(
        &mut self,
        user: &UserId,
        amount: i64,
        description: &str,
        payment_method: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        self.post_single(user, TransactionKind::Deposit, amount, description, payment_method)
    }

    /// Post a withdrawal: one negative entry plus the matching balance debit.
    /// Fails with `InsufficientFunds` if the balance would go below zero.
    pub fn withdraw(
        &mut self,
        user: &UserId,
        amount: i64,
        description: &str,
        payment_method: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        self.post_single(user, TransactionKind::Withdraw, amount, description, payment_method)
    }

    /// Validation happens before anything is written: if the posting cannot
    /// commit, no entry exists and no balance moved.
    fn post_single(
        &mut self,
        user: &UserId,
        kind: TransactionKind,
        amount: i64,
        description: &str,
        payment_method: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        require_positive(amount)?;
        let signed = match kind {
            TransactionKind::Withdraw => -amount,
            _ => amount,
        };

        let (wallet_id, currency) = {
            let wallet = self.wallet_by_user(user)?;
            if wallet.balance + signed < 0 {
                return Err(LedgerError::InsufficientFunds {
                    available: wallet.balance,
                    requested: amount,
                });
            }
            (wallet.id.clone(), wallet.currency)
        };

        let now = Utc::now();
        let reference = self.make_reference(kind, now);
        let id = self.take_entry_id();
        let tx = Transaction {
            id,
            wallet_id: wallet_id.clone(),
            kind,
            amount: signed,
            currency,
            sender_id: None,
            receiver_id: None,
            description: description.to_string(),
            status: TransactionStatus::Completed,
            metadata: TransactionMetadata {
                deal_id: None,
                payment_method,
                reference: Some(reference),
            },
            created_at: now,
            updated_at: now,
        };

        // Nothing below can fail: the entry and the balance move together.
        let wallet = self
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| LedgerError::WalletNotFound(user.to_string()))?;
        wallet.balance += signed;
        wallet.updated_at = now;
        self.entries.push(tx.clone());
        Ok(tx)
    }

    // ─── Paired postings ─────────────────────────────────────────────────────

    /// Post an all-or-nothing transfer pair: debit `from`, credit `to`.
    ///
    /// With a caller-supplied `reference`, replaying the same transfer
    /// returns the already-posted pair instead of posting again.
    pub fn transfer(
        &mut self,
        from: &UserId,
        to: &UserId,
        amount: i64,
        debit_description: &str,
        credit_description: &str,
        reference: Option<String>,
    ) -> Result<(Transaction, Transaction), LedgerError> {
        self.post_pair(
            TransactionKind::Transfer,
            from,
            to,
            amount,
            debit_description,
            credit_description,
            reference,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn post_pair(
        &mut self,
        kind: TransactionKind,
        sender: &UserId,
        receiver: &UserId,
        amount: i64,
        debit_description: &str,
        credit_description: &str,
        reference: Option<String>,
        deal_id: Option<DealId>,
    ) -> Result<(Transaction, Transaction), LedgerError> {
        require_positive(amount)?;
        if sender == receiver {
            return Err(LedgerError::Validation(
                "sender and receiver must differ".to_string(),
            ));
        }

        // Idempotent replay: a reference we have already posted under returns
        // the original pair untouched.
        if let Some(ref supplied) = reference {
            if let Some(pair) = self.pair_by_reference(kind, supplied) {
                return Ok(pair);
            }
        }

        let (sender_wallet_id, sender_currency, sender_balance) = {
            let wallet = self.wallet_by_user(sender)?;
            (wallet.id.clone(), wallet.currency, wallet.balance)
        };
        let (receiver_wallet_id, receiver_currency) = {
            let wallet = self.wallet_by_user(receiver)?;
            (wallet.id.clone(), wallet.currency)
        };
        if sender_currency != receiver_currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: sender_currency,
                found: receiver_currency,
            });
        }
        if sender_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                available: sender_balance,
                requested: amount,
            });
        }

        let now = Utc::now();
        let reference = match reference {
            Some(supplied) => supplied,
            None => self.make_reference(kind, now),
        };
        let metadata = TransactionMetadata {
            deal_id,
            payment_method: None,
            reference: Some(reference),
        };
        let debit = Transaction {
            id: self.take_entry_id(),
            wallet_id: sender_wallet_id.clone(),
            kind,
            amount: -amount,
            currency: sender_currency,
            sender_id: Some(sender.clone()),
            receiver_id: Some(receiver.clone()),
            description: debit_description.to_string(),
            status: TransactionStatus::Completed,
            metadata: metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        let credit = Transaction {
            id: self.take_entry_id(),
            wallet_id: receiver_wallet_id.clone(),
            amount,
            description: credit_description.to_string(),
            ..debit.clone()
        };

        // Nothing below can fail: both balances and both entries move as one.
        if let Some(wallet) = self.wallets.get_mut(&sender_wallet_id) {
            wallet.balance -= amount;
            wallet.updated_at = now;
        }
        if let Some(wallet) = self.wallets.get_mut(&receiver_wallet_id) {
            wallet.balance += amount;
            wallet.updated_at = now;
        }
        self.entries.push(debit.clone());
        self.entries.push(credit.clone());
        Ok((debit, credit))
    }

    fn pair_by_reference(
        &self,
        kind: TransactionKind,
        reference: &str,
    ) -> Option<(Transaction, Transaction)> {
        let mut matches = self
            .entries
            .iter()
            .filter(|tx| tx.kind == kind && tx.metadata.reference.as_deref() == Some(reference));
        // The debit is always posted first.
        let debit = matches.next()?.clone();
        let credit = matches.next()?.clone();
        Some((debit, credit))
    }

    // ─── Funding deals ───────────────────────────────────────────────────────

    /// Record a new funding deal between two provisioned users.
    pub fn create_deal(
        &mut self,
        investor: &UserId,
        entrepreneur: &UserId,
        amount: i64,
        equity: f64,
        description: &str,
    ) -> Result<FundingDeal, LedgerError> {
        require_positive(amount)?;
        if !(equity > 0.0 && equity <= 100.0) {
            return Err(LedgerError::Validation(format!(
                "equity must be in (0, 100], got {equity}"
            )));
        }
        if investor == entrepreneur {
            return Err(LedgerError::Validation(
                "investor and entrepreneur must differ".to_string(),
            ));
        }
        let investor_currency = self.wallet_by_user(investor)?.currency;
        let entrepreneur_currency = self.wallet_by_user(entrepreneur)?.currency;
        if investor_currency != entrepreneur_currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: investor_currency,
                found: entrepreneur_currency,
            });
        }

        let now = Utc::now();
        let id = DealId(format!("deal-{}", self.next_deal_seq));
        self.next_deal_seq += 1;
        let deal = FundingDeal {
            id: id.clone(),
            investor_id: investor.clone(),
            entrepreneur_id: entrepreneur.clone(),
            amount,
            currency: investor_currency,
            equity,
            status: DealStatus::Pending,
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.deals.insert(id, deal.clone());
        Ok(deal)
    }

    pub fn deal(&self, id: &DealId) -> Result<&FundingDeal, LedgerError> {
        self.deals
            .get(id)
            .ok_or_else(|| LedgerError::DealNotFound(id.to_string()))
    }

    /// Drive a deal along its state machine.
    ///
    /// Completing posts the funding pair investor→entrepreneur, tagged with
    /// the deal id; if that posting fails the status is left untouched.
    /// Completed deals reject every further transition, so a deal funds
    /// exactly once.
    pub fn transition_deal(
        &mut self,
        id: &DealId,
        next: DealStatus,
    ) -> Result<FundingDeal, LedgerError> {
        let deal = self.deal(id)?.clone();
        if !deal.status.can_transition_to(&next) {
            return Err(LedgerError::InvalidTransition {
                from: deal.status,
                to: next,
            });
        }

        if next == DealStatus::Completed {
            // Post first: a rejected posting must leave the deal untouched.
            self.post_pair(
                TransactionKind::Funding,
                &deal.investor_id,
                &deal.entrepreneur_id,
                deal.amount,
                &format!("Funding: {}", deal.description),
                &format!("Funding received: {}", deal.description),
                None,
                Some(deal.id.clone()),
            )?;
        }

        let now = Utc::now();
        let deal = self
            .deals
            .get_mut(id)
            .ok_or_else(|| LedgerError::DealNotFound(id.to_string()))?;
        deal.status = next;
        deal.updated_at = now;
        Ok(deal.clone())
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Entries touching one wallet, newest first; entries with equal
    /// timestamps keep their insertion order (stable sort).
    pub fn entries_for_wallet(&self, wallet: &WalletId) -> Vec<Transaction> {
        let mut out: Vec<Transaction> = self
            .entries
            .iter()
            .filter(|tx| tx.wallet_id == *wallet)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn entries_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, LedgerError> {
        let wallet = self.wallet_by_user(user)?;
        Ok(self.entries_for_wallet(&wallet.id))
    }

    /// Deals where `user` is either party, newest first.
    pub fn deals_for_user(&self, user: &UserId) -> Vec<FundingDeal> {
        let mut out: Vec<FundingDeal> = self
            .deals
            .values()
            .filter(|d| d.investor_id == *user || d.entrepreneur_id == *user)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn deal_count(&self) -> usize {
        self.deals.len()
    }

    /// Recompute every balance from completed entries and report the first
    /// divergence. The cached balance and the ledger must never disagree.
    pub fn verify_balances(&self) -> Result<(), LedgerError> {
        for wallet in self.wallets.values() {
            let derived = balance_from_entries(&wallet.id, &self.entries);
            if derived != wallet.balance {
                return Err(LedgerError::Validation(format!(
                    "wallet {} balance {} does not match ledger sum {derived}",
                    wallet.id, wallet.balance
                )));
            }
        }
        Ok(())
    }

    // ─── Identifiers ─────────────────────────────────────────────────────────

    fn take_entry_id(&mut self) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }

    /// Posting references keep the familiar "{PREFIX}-{millis}-{seq}" shape,
    /// but uniqueness comes from the trailing sequence number: wall clocks
    /// collide under concurrent postings, the counter does not.
    fn make_reference(&mut self, kind: TransactionKind, now: DateTime<Utc>) -> String {
        let seq = self.next_reference_seq;
        self.next_reference_seq += 1;
        format!(
            "{}-{}-{seq}",
            kind.reference_prefix(),
            now.timestamp_millis()
        )
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn require_positive(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}
