//! Read-only queries over the chain.
//!
//! Every query is a full backward traversal from the tip; nothing is indexed.
//! Blocks are immutable and keyed by hash, so a traversal started from one
//! tip sees a consistent chain even while other threads append.

use crate::blockchain::Blockchain;
use crate::error::{LedgerError, Result};
use itemchain_core::{Block, Hash, PubKeyHash, Transaction};
use std::collections::{BTreeSet, HashMap};

impl<'a> Blockchain<'a> {
    /// The block at the tip.
    pub fn last_block(&self) -> Result<Block> {
        self.iter()
            .next()
            .unwrap_or_else(|| Err(LedgerError::Corrupted("traversal yielded no tip block".into())))
    }

    /// Up to `n` blocks, newest first.
    pub fn last_n_blocks(&self, n: usize) -> Result<Vec<Block>> {
        self.iter().take(n).collect()
    }

    /// Up to `n` transactions, newest block first and leaf order within a block.
    pub fn last_n_txs(&self, n: usize) -> Result<Vec<Transaction>> {
        let mut txs = Vec::with_capacity(n);
        for block in self.iter() {
            if txs.len() >= n {
                break;
            }
            txs.extend_from_slice(block?.transactions());
        }
        txs.truncate(n);
        Ok(txs)
    }

    /// Whether any transaction on the chain moves this item.
    pub fn item_exists(&self, item_hash: &Hash) -> Result<bool> {
        for block in self.iter() {
            if block?.last_leaf_with_item(item_hash).is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The newest block that moves this item, with the index of the item's
    /// last leaf in it.
    pub fn last_block_with_item(&self, item_hash: &Hash) -> Result<(Block, usize)> {
        for block in self.iter() {
            let block = block?;
            if let Some(index) = block.last_leaf_with_item(item_hash) {
                return Ok((block, index));
            }
        }
        Err(LedgerError::ItemNotFound(*item_hash))
    }

    /// The newest transaction that moves this item.
    pub fn last_tx_for_item(&self, item_hash: &Hash) -> Result<Transaction> {
        let (block, index) = self.last_block_with_item(item_hash)?;
        block
            .transactions()
            .get(index)
            .cloned()
            .ok_or_else(|| LedgerError::Corrupted(format!("leaf {index} vanished from block")))
    }

    /// Current holder of the item.
    pub fn item_owner(&self, item_hash: &Hash) -> Result<PubKeyHash> {
        Ok(self.last_tx_for_item(item_hash)?.buyer_hash)
    }

    /// Every transaction moving this item, newest block first.
    pub fn txs_including_item(&self, item_hash: &Hash) -> Result<Vec<Transaction>> {
        let mut txs = Vec::new();
        for block in self.iter() {
            let block = block?;
            txs.extend(
                block
                    .transactions()
                    .iter()
                    .filter(|tx| tx.item_hash == *item_hash)
                    .cloned(),
            );
        }
        Ok(txs)
    }

    /// Introduction transactions whose buyer is the wallet at `address`.
    pub fn wallet_introduction_txs(&self, address: &str) -> Result<Vec<Transaction>> {
        self.introduction_txs_of(&PubKeyHash::from_address(address)?)
    }

    pub fn introduction_txs_of(&self, pubkey_hash: &PubKeyHash) -> Result<Vec<Transaction>> {
        let mut txs = Vec::new();
        for block in self.iter() {
            let block = block?;
            txs.extend(
                block
                    .transactions()
                    .iter()
                    .filter(|tx| tx.is_introduction() && tx.buyer_hash == *pubkey_hash)
                    .cloned(),
            );
        }
        Ok(txs)
    }

    /// Blocks mined by the wallet at `address`, newest first.
    pub fn wallet_mined_blocks(&self, address: &str) -> Result<Vec<Block>> {
        self.blocks_mined_by(&PubKeyHash::from_address(address)?)
    }

    pub fn blocks_mined_by(&self, pubkey_hash: &PubKeyHash) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        for block in self.iter() {
            let block = block?;
            if block.header.miner_pubkey_hash == Some(*pubkey_hash) {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    /// Items the wallet at `address` currently holds.
    pub fn wallet_owned_items(&self, address: &str) -> Result<BTreeSet<Hash>> {
        self.items_owned_by(&PubKeyHash::from_address(address)?)
    }

    /// One backward pass. The first time an item is seen is its newest
    /// transaction, and that transaction alone decides ownership.
    pub fn items_owned_by(&self, pubkey_hash: &PubKeyHash) -> Result<BTreeSet<Hash>> {
        let mut owned: HashMap<Hash, bool> = HashMap::new();
        for block in self.iter() {
            let block = block?;
            for tx in block.transactions().iter().rev() {
                owned
                    .entry(tx.item_hash)
                    .or_insert(tx.buyer_hash == *pubkey_hash);
            }
        }
        Ok(owned
            .into_iter()
            .filter_map(|(item, is_owner)| is_owner.then_some(item))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use itemchain_consensus::DifficultyPolicy;
    use itemchain_core::{hash, Wallet};
    use itemchain_storage::Storage;

    fn config() -> LedgerConfig {
        LedgerConfig {
            difficulty: DifficultyPolicy::Fixed { difficulty: 1 },
            ..Default::default()
        }
    }

    fn append(chain: &Blockchain, txs: Vec<Transaction>, miner: &Wallet) -> Block {
        let block = chain.mine_block(txs, &miner.pubkey_hash()).unwrap();
        chain.add_block(&block).unwrap();
        block
    }

    fn intro(wallet: &Wallet, item: Hash, ts: u64) -> Transaction {
        Transaction::introduction(wallet.pubkey_hash(), item, 100, ts).signed(wallet)
    }

    fn transfer(prev: &Transaction, from: &Wallet, to: &Wallet, ts: u64) -> Transaction {
        Transaction::transfer(
            prev.tx_id,
            from.pubkey_hash(),
            to.pubkey_hash(),
            prev.item_hash,
            150,
            ts,
        )
        .signed(from)
    }

    #[test]
    fn test_last_blocks() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let miner = Wallet::generate();

        let b1 = append(&chain, vec![intro(&miner, hash(b"a"), 1)], &miner);
        let b2 = append(&chain, vec![intro(&miner, hash(b"b"), 2)], &miner);

        assert_eq!(chain.last_block().unwrap(), b2);
        let blocks = chain.last_n_blocks(2).unwrap();
        assert_eq!(blocks, vec![b2.clone(), b1]);
        assert_eq!(chain.last_n_blocks(10).unwrap().len(), 3);
        assert!(chain.last_n_blocks(0).unwrap().is_empty());
    }

    #[test]
    fn test_last_n_txs() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let w = Wallet::generate();

        let t1 = intro(&w, hash(b"1"), 1);
        let t2 = intro(&w, hash(b"2"), 2);
        let t3 = intro(&w, hash(b"3"), 3);
        append(&chain, vec![t1.clone()], &w);
        append(&chain, vec![t2.clone(), t3.clone()], &w);

        assert_eq!(chain.last_n_txs(1).unwrap(), vec![t2.clone()]);
        assert_eq!(chain.last_n_txs(2).unwrap(), vec![t2.clone(), t3.clone()]);
        assert_eq!(chain.last_n_txs(10).unwrap(), vec![t2, t3, t1]);
    }

    #[test]
    fn test_item_lookups() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let a = Wallet::generate();
        let b = Wallet::generate();
        let item = hash(b"watch");

        let introduce = intro(&a, item, 1);
        append(&chain, vec![intro(&a, hash(b"other"), 1), introduce.clone()], &a);
        let sell = transfer(&introduce, &a, &b, 2);
        let block = append(&chain, vec![sell.clone()], &a);

        assert!(chain.item_exists(&item).unwrap());
        assert!(!chain.item_exists(&hash(b"missing")).unwrap());

        let (found, index) = chain.last_block_with_item(&item).unwrap();
        assert_eq!(found, block);
        assert_eq!(index, 0);

        assert_eq!(chain.item_owner(&item).unwrap(), b.pubkey_hash());
        assert_eq!(chain.txs_including_item(&item).unwrap(), vec![sell, introduce]);
        assert!(matches!(
            chain.last_block_with_item(&hash(b"missing")),
            Err(LedgerError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_wallet_queries() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let a = Wallet::generate();
        let b = Wallet::generate();

        let x = intro(&a, hash(b"x"), 1);
        let y = intro(&a, hash(b"y"), 2);
        append(&chain, vec![x.clone(), y.clone()], &a);
        append(&chain, vec![transfer(&x, &a, &b, 3)], &b);

        assert_eq!(chain.wallet_introduction_txs(&a.address()).unwrap(), vec![x, y]);
        assert!(chain.wallet_introduction_txs(&b.address()).unwrap().is_empty());

        assert_eq!(chain.wallet_mined_blocks(&a.address()).unwrap().len(), 1);
        assert_eq!(chain.wallet_mined_blocks(&b.address()).unwrap().len(), 1);

        let owned_a = chain.wallet_owned_items(&a.address()).unwrap();
        let owned_b = chain.wallet_owned_items(&b.address()).unwrap();
        assert_eq!(owned_a, BTreeSet::from([hash(b"y")]));
        assert_eq!(owned_b, BTreeSet::from([hash(b"x")]));
    }

    #[test]
    fn test_owned_items_within_one_block() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();
        let a = Wallet::generate();
        let b = Wallet::generate();

        let x = intro(&a, hash(b"x"), 1);
        let sell = transfer(&x, &a, &b, 2);
        let back = transfer(&sell, &b, &a, 3);
        append(&chain, vec![x, sell, back], &a);

        assert_eq!(
            chain.wallet_owned_items(&a.address()).unwrap(),
            BTreeSet::from([hash(b"x")])
        );
        assert!(chain.wallet_owned_items(&b.address()).unwrap().is_empty());
    }

    #[test]
    fn test_wallet_query_rejects_bad_address() {
        let storage = Storage::open_temporary().unwrap();
        let chain = Blockchain::init(&storage, config()).unwrap();

        let err = chain.wallet_owned_items("not-an-address").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Encoding);
    }
}
