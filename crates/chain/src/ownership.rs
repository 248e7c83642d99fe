//! Ownership rules a block's transactions must satisfy against chain state.
//!
//! Every introduction must name an item with no history, and every transfer
//! must spend the newest transaction of its item and be sold by that
//! transaction's buyer. Leaves are replayed in order, so an item may move
//! several times inside one block.

use crate::blockchain::Blockchain;
use crate::error::{LedgerError, Result};
use itemchain_core::{Block, Hash, PubKeyHash, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// The newest move of each tracked item: its `tx_id` and the holder after it.
#[derive(Debug, Default)]
pub struct OwnershipView {
    latest: HashMap<Hash, (Hash, PubKeyHash)>,
}

impl OwnershipView {
    /// Check `tx` against the view and record it.
    pub fn apply(&mut self, tx: &Transaction) -> Result<()> {
        let previous = self.latest.get(&tx.item_hash);

        match (tx.seller_hash, tx.utxo_id, previous) {
            (None, None, None) => {}
            (None, None, Some(_)) => return Err(LedgerError::DuplicateItem(tx.item_hash)),
            (Some(_), _, None) => return Err(LedgerError::ItemNotFound(tx.item_hash)),
            (Some(seller), utxo, Some(&(last_id, owner))) => {
                if seller != owner {
                    return Err(LedgerError::NotOwner {
                        item: tx.item_hash,
                        owner,
                    });
                }
                if utxo != Some(last_id) {
                    return Err(LedgerError::UtxoMismatch {
                        item: tx.item_hash,
                        expected: last_id,
                        found: utxo,
                    });
                }
            }
            (None, Some(_), _) => {
                return Err(LedgerError::Corrupted(format!(
                    "transaction {} has a utxo id but no seller",
                    tx.tx_id
                )))
            }
        }

        self.latest.insert(tx.item_hash, (tx.tx_id, tx.buyer_hash));
        Ok(())
    }
}

impl<'a> Blockchain<'a> {
    /// View of the items in `transactions` as of the block `from`.
    ///
    /// One backward pass that stops once every item has been seen.
    pub fn ownership_view(&self, from: Hash, transactions: &[Transaction]) -> Result<OwnershipView> {
        let mut wanted: HashSet<Hash> = transactions.iter().map(|tx| tx.item_hash).collect();
        let mut view = OwnershipView::default();

        for block in self.iter_from(from) {
            if wanted.is_empty() {
                break;
            }
            let block = block?;
            for tx in block.transactions().iter().rev() {
                if wanted.remove(&tx.item_hash) {
                    view.latest.insert(tx.item_hash, (tx.tx_id, tx.buyer_hash));
                }
            }
        }
        Ok(view)
    }

    /// Replay the block's leaves on top of its parent.
    ///
    /// A block whose parent is not stored is left to the store, which
    /// refuses anything that does not extend the tip.
    pub fn check_ownership(&self, block: &Block) -> Result<()> {
        let Some(parent) = block.header.previous_hash else {
            return Ok(());
        };
        if block.tx_count() == 0 || !self.chain().has_block(&parent)? {
            return Ok(());
        }

        let mut view = self.ownership_view(parent, block.transactions())?;
        for tx in block.transactions() {
            view.apply(tx)?;
        }
        Ok(())
    }

    /// Split `candidates` into those that can be mined on the tip, in order,
    /// and those that conflict with the chain or an earlier candidate.
    pub fn partition_by_ownership(
        &self,
        candidates: Vec<Transaction>,
    ) -> Result<(Vec<Transaction>, Vec<Transaction>)> {
        let mut view = self.ownership_view(self.tip_hash(), &candidates)?;
        let mut accepted = Vec::with_capacity(candidates.len());
        let mut rejected = Vec::new();

        for tx in candidates {
            match view.apply(&tx) {
                Ok(()) => accepted.push(tx),
                Err(e) => {
                    warn!(tx_id = %tx.tx_id, item = %tx.item_hash, error = %e, "Dropping conflicting transaction");
                    rejected.push(tx);
                }
            }
        }
        Ok((accepted, rejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::error::ErrorKind;
    use itemchain_consensus::DifficultyPolicy;
    use itemchain_core::{hash, Wallet};
    use itemchain_storage::Storage;

    fn config() -> LedgerConfig {
        LedgerConfig {
            difficulty: DifficultyPolicy::Fixed { difficulty: 1 },
            ..Default::default()
        }
    }

    fn intro(wallet: &Wallet, item: &[u8]) -> Transaction {
        Transaction::introduction(wallet.pubkey_hash(), hash(item), 100, 1).signed(wallet)
    }

    fn sell(prev: &Transaction, from: &Wallet, to: &Wallet) -> Transaction {
        Transaction::transfer(
            prev.tx_id,
            from.pubkey_hash(),
            to.pubkey_hash(),
            prev.item_hash,
            5,
            prev.timestamp + 1,
        )
        .signed(from)
    }

    #[test]
    fn test_view_replays_in_order() {
        let a = Wallet::generate();
        let b = Wallet::generate();
        let x = intro(&a, b"x");
        let to_b = sell(&x, &a, &b);
        let back = sell(&to_b, &b, &a);

        let mut view = OwnershipView::default();
        view.apply(&x).unwrap();
        view.apply(&to_b).unwrap();
        view.apply(&back).unwrap();

        assert_eq!(view.apply(&x).unwrap_err().kind(), ErrorKind::DuplicateItem);
        // Spending an older transaction of the item.
        let stale = sell(&x, &a, &b);
        assert!(matches!(
            view.apply(&stale),
            Err(LedgerError::UtxoMismatch { expected, .. }) if expected == back.tx_id
        ));
        // b no longer holds it.
        let err = view.apply(&sell(&back, &b, &b)).unwrap_err();
        assert!(matches!(err, LedgerError::NotOwner { owner, .. } if owner == a.pubkey_hash()));
    }

    #[test]
    fn test_view_unknown_item() {
        let a = Wallet::generate();
        let ghost = sell(&intro(&a, b"ghost"), &a, &a);
        let err = OwnershipView::default().apply(&ghost).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_ownership_view_reads_chain() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let a = Wallet::generate();
        let b = Wallet::generate();

        let x = intro(&a, b"x");
        let block = chain.mine_block(vec![x.clone()], &a.pubkey_hash()).unwrap();
        chain.add_block(&block).unwrap();

        let to_b = sell(&x, &a, &b);
        let mut view = chain.ownership_view(chain.tip_hash(), &[to_b.clone()]).unwrap();
        view.apply(&to_b).unwrap();

        // The same view from genesis has never seen the item.
        let mut view = chain
            .ownership_view(Block::genesis_hash(), &[to_b.clone()])
            .unwrap();
        assert_eq!(view.apply(&to_b).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_partition_keeps_first_claim() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let a = Wallet::generate();
        let b = Wallet::generate();

        let first = intro(&a, b"x");
        let second = Transaction::introduction(b.pubkey_hash(), hash(b"x"), 7, 2).signed(&b);
        let other = intro(&b, b"y");

        let (accepted, rejected) = chain
            .partition_by_ownership(vec![first.clone(), second.clone(), other.clone()])
            .unwrap();
        assert_eq!(accepted, vec![first, other]);
        assert_eq!(rejected, vec![second]);
    }
}
