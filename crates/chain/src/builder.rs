//! Builders for signed transactions that respect the chain's ownership rules.

use crate::blockchain::Blockchain;
use crate::error::{LedgerError, Result};
use itemchain_core::{current_timestamp, Hash, PubKeyHash, Transaction, Wallet};
use tracing::debug;

impl<'a> Blockchain<'a> {
    /// Build and sign a transaction that mints `item_hash` to `wallet`.
    ///
    /// Fails if the item already has history or the wallet has not mined
    /// enough blocks for another introduction.
    pub fn build_introduction(
        &self,
        wallet: &Wallet,
        item_hash: Hash,
        amount: u64,
    ) -> Result<Transaction> {
        if self.item_exists(&item_hash)? {
            return Err(LedgerError::DuplicateItem(item_hash));
        }
        let pubkey_hash = wallet.pubkey_hash();
        self.check_funds(&pubkey_hash)?;

        let tx = Transaction::introduction(pubkey_hash, item_hash, amount, current_timestamp())
            .signed(wallet);
        debug!(tx_id = %tx.tx_id, item = %item_hash, "Built introduction transaction");
        Ok(tx)
    }

    /// Build and sign a transaction moving `item_hash` from `wallet` to the
    /// wallet at `destination_address`.
    pub fn build_transfer(
        &self,
        wallet: &Wallet,
        destination_address: &str,
        item_hash: Hash,
        amount: u64,
    ) -> Result<Transaction> {
        let buyer = PubKeyHash::from_address(destination_address)?;
        let previous = self.last_tx_for_item(&item_hash)?;

        let seller = wallet.pubkey_hash();
        if previous.buyer_hash != seller {
            return Err(LedgerError::NotOwner {
                item: item_hash,
                owner: previous.buyer_hash,
            });
        }

        let tx = Transaction::transfer(
            previous.tx_id,
            seller,
            buyer,
            item_hash,
            amount,
            current_timestamp(),
        )
        .signed(wallet);
        debug!(tx_id = %tx.tx_id, item = %item_hash, utxo = %previous.tx_id, "Built transfer transaction");
        Ok(tx)
    }

    /// A wallet with no introductions yet may always introduce. After that,
    /// mined blocks per introduction must exceed the configured ratio.
    pub fn check_funds(&self, pubkey_hash: &PubKeyHash) -> Result<()> {
        let introduced = self.introduction_txs_of(pubkey_hash)?.len();
        if introduced == 0 {
            return Ok(());
        }

        let mined = self.blocks_mined_by(pubkey_hash)?.len();
        let ratio = self.config().mined_to_spend_ratio;
        if (mined as f64 / introduced as f64) > ratio {
            return Ok(());
        }

        Err(LedgerError::InsufficientFunds {
            mined,
            introduced,
            ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::error::ErrorKind;
    use itemchain_consensus::DifficultyPolicy;
    use itemchain_core::hash;
    use itemchain_storage::Storage;

    fn config() -> LedgerConfig {
        LedgerConfig {
            difficulty: DifficultyPolicy::Fixed { difficulty: 1 },
            ..Default::default()
        }
    }

    #[test]
    fn test_build_introduction() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let wallet = Wallet::generate();

        let tx = chain.build_introduction(&wallet, hash(b"x"), 100).unwrap();
        assert!(tx.is_introduction());
        assert_eq!(tx.buyer_hash, wallet.pubkey_hash());
        assert!(tx.verify_id().is_ok());
        assert!(tx.verify_signature(&wallet.public_key).is_ok());
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let wallet = Wallet::generate();

        let tx = chain.build_introduction(&wallet, hash(b"x"), 100).unwrap();
        let block = chain.mine_block(vec![tx], &wallet.pubkey_hash()).unwrap();
        chain.add_block(&block).unwrap();

        let other = Wallet::generate();
        let err = chain.build_introduction(&other, hash(b"x"), 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateItem);
    }

    #[test]
    fn test_funding_ratio() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let wallet = Wallet::generate();
        let helper = Wallet::generate();

        // First introduction is free; mined by someone else.
        let tx = chain.build_introduction(&wallet, hash(b"1"), 1).unwrap();
        let block = chain.mine_block(vec![tx], &helper.pubkey_hash()).unwrap();
        chain.add_block(&block).unwrap();

        // 0 mined / 1 introduced is not above 0.5.
        let err = chain.build_introduction(&wallet, hash(b"2"), 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                mined: 0,
                introduced: 1,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

        // Mining one block lifts the ratio to 1.
        let block = chain.mine_block(vec![], &wallet.pubkey_hash()).unwrap();
        chain.add_block(&block).unwrap();
        assert!(chain.build_introduction(&wallet, hash(b"2"), 1).is_ok());
    }

    #[test]
    fn test_build_transfer() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let seller = Wallet::generate();
        let buyer = Wallet::generate();

        let intro = chain.build_introduction(&seller, hash(b"x"), 100).unwrap();
        let block = chain.mine_block(vec![intro.clone()], &seller.pubkey_hash()).unwrap();
        chain.add_block(&block).unwrap();

        let tx = chain
            .build_transfer(&seller, &buyer.address(), hash(b"x"), 150)
            .unwrap();
        assert_eq!(tx.utxo_id, Some(intro.tx_id));
        assert_eq!(tx.seller_hash, Some(seller.pubkey_hash()));
        assert_eq!(tx.buyer_hash, buyer.pubkey_hash());
        assert!(tx.verify_signature(&seller.public_key).is_ok());
    }

    #[test]
    fn test_transfer_errors() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let owner = Wallet::generate();
        let thief = Wallet::generate();

        let err = chain
            .build_transfer(&owner, &thief.address(), hash(b"ghost"), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let intro = chain.build_introduction(&owner, hash(b"x"), 100).unwrap();
        let block = chain.mine_block(vec![intro], &owner.pubkey_hash()).unwrap();
        chain.add_block(&block).unwrap();

        let err = chain
            .build_transfer(&thief, &thief.address(), hash(b"x"), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ownership);

        let err = chain
            .build_transfer(&owner, "0OIl", hash(b"x"), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }
}
