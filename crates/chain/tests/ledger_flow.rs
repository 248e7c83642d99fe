//! End-to-end ledger flows across storage, consensus and the chain.

use itemchain_chain::{Blockchain, ErrorKind, LedgerConfig, LedgerError};
use itemchain_consensus::{verify, DifficultyPolicy};
use itemchain_core::{Block, Hash, Transaction, Wallet};
use itemchain_storage::{Storage, StorageError};

fn config(difficulty: u64) -> LedgerConfig {
    LedgerConfig {
        difficulty: DifficultyPolicy::Fixed { difficulty },
        ..Default::default()
    }
}

fn item() -> Hash {
    Hash([0xAA; 32])
}

fn mine_and_add(chain: &Blockchain, txs: Vec<Transaction>, miner: &Wallet) -> Block {
    let block = chain.mine_block(txs, &miner.pubkey_hash()).unwrap();
    chain.add_block(&block).unwrap();
    block
}

#[test]
fn introduce_mine_and_query() {
    let storage = Storage::open_temporary().unwrap();
    let chain = Blockchain::init(&storage, config(1)).unwrap();
    assert_eq!(chain.last_n_blocks(10).unwrap(), vec![Block::genesis()]);

    let a = Wallet::generate();
    let tx = chain.build_introduction(&a, item(), 100).unwrap();
    let block = chain.mine_block(vec![tx.clone()], &a.pubkey_hash()).unwrap();
    assert_eq!(block.header.difficulty, 1);
    assert!(verify(&block));
    chain.add_block(&block).unwrap();

    let (found, index) = chain.last_block_with_item(&item()).unwrap();
    assert_eq!(found, block);
    assert_eq!(index, 0);
    assert!(found.merkle_tree.as_ref().unwrap().verify_membership(&tx));

    assert_eq!(chain.wallet_mined_blocks(&a.address()).unwrap(), vec![block]);
    assert_eq!(chain.wallet_introduction_txs(&a.address()).unwrap(), vec![tx]);
}

#[test]
fn transfer_moves_ownership() {
    let storage = Storage::open_temporary().unwrap();
    let chain = Blockchain::init(&storage, config(1)).unwrap();
    let a = Wallet::generate();
    let b = Wallet::generate();

    let intro = chain.build_introduction(&a, item(), 100).unwrap();
    mine_and_add(&chain, vec![intro.clone()], &a);
    assert!(chain.wallet_owned_items(&a.address()).unwrap().contains(&item()));

    let tx = chain.build_transfer(&a, &b.address(), item(), 120).unwrap();
    assert_eq!(tx.utxo_id, Some(intro.tx_id));
    mine_and_add(&chain, vec![tx.clone()], &b);

    assert!(!chain.wallet_owned_items(&a.address()).unwrap().contains(&item()));
    assert!(chain.wallet_owned_items(&b.address()).unwrap().contains(&item()));
    assert_eq!(chain.item_owner(&item()).unwrap(), b.pubkey_hash());
    assert_eq!(chain.txs_including_item(&item()).unwrap(), vec![tx, intro]);

    // The previous owner can no longer sell it.
    let err = chain
        .build_transfer(&a, &a.address(), item(), 1)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ownership);
}

#[test]
fn tampered_block_leaves_tip_unchanged() {
    let storage = Storage::open_temporary().unwrap();
    let chain = Blockchain::init(&storage, config(1)).unwrap();
    let a = Wallet::generate();

    let tx = chain.build_introduction(&a, item(), 100).unwrap();
    let mut block = chain.mine_block(vec![tx], &a.pubkey_hash()).unwrap();
    block.header.nonce = block.header.nonce.wrapping_add(1);

    let err = chain.add_block(&block).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HashMismatch);
    assert_eq!(chain.tip_hash(), Block::genesis_hash());
    assert!(chain.get_block(&block.hash()).unwrap().is_none());
    assert!(!chain.item_exists(&item()).unwrap());
}

#[test]
fn missing_item_and_wrong_owner() {
    let storage = Storage::open_temporary().unwrap();
    let chain = Blockchain::init(&storage, config(0)).unwrap();
    let a = Wallet::generate();
    let b = Wallet::generate();

    let err = chain
        .build_transfer(&a, &b.address(), item(), 1)
        .unwrap_err();
    assert!(matches!(err, LedgerError::ItemNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let intro = chain.build_introduction(&a, item(), 100).unwrap();
    mine_and_add(&chain, vec![intro], &a);

    let err = chain
        .build_transfer(&b, &a.address(), item(), 1)
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotOwner { owner, .. } if owner == a.pubkey_hash()));
}

#[test]
fn concurrent_appends_are_serialized() {
    let storage = Storage::open_temporary().unwrap();
    let chain = Blockchain::init(&storage, config(1)).unwrap();
    let miners: Vec<Wallet> = (0..4).map(|_| Wallet::generate()).collect();

    // Every miner builds on genesis; exactly one can win.
    let candidates: Vec<Block> = miners
        .iter()
        .enumerate()
        .map(|(i, miner)| {
            let tx = Transaction::introduction(miner.pubkey_hash(), Hash([i as u8; 32]), 1, 1)
                .signed(miner);
            chain.mine_block(vec![tx], &miner.pubkey_hash()).unwrap()
        })
        .collect();

    let chain = &chain;
    let results: Vec<Result<(), LedgerError>> = std::thread::scope(|s| {
        let handles: Vec<_> = candidates
            .iter()
            .map(|block| s.spawn(move || chain.add_block(block)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            err,
            LedgerError::Storage(StorageError::TipMismatch { .. })
        ));
    }

    let blocks = chain.last_n_blocks(10).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].hash(), chain.tip_hash());
    assert_eq!(blocks[0].header.previous_hash, Some(Block::genesis_hash()));
}

#[test]
fn concurrent_miners_extend_one_chain() {
    let storage = Storage::open_temporary().unwrap();
    let chain = Blockchain::init(&storage, config(1)).unwrap();

    std::thread::scope(|s| {
        for i in 0..4u8 {
            let chain = &chain;
            s.spawn(move || {
                let miner = Wallet::generate();
                let mut added = 0;
                while added < 3 {
                    let tx = Transaction::introduction(
                        miner.pubkey_hash(),
                        Hash([i * 16 + added; 32]),
                        1,
                        1,
                    )
                    .signed(&miner);
                    let block = chain.mine_block(vec![tx], &miner.pubkey_hash()).unwrap();
                    if chain.add_block(&block).is_ok() {
                        added += 1;
                    }
                }
            });
        }
    });

    let blocks = chain.last_n_blocks(100).unwrap();
    assert_eq!(blocks.len(), 13);
    for (i, pair) in blocks.windows(2).enumerate() {
        assert_eq!(pair[0].header.previous_hash, Some(pair[1].hash()), "gap at {i}");
        assert_eq!(pair[0].height(), pair[1].height() + 1);
    }
}

#[test]
fn reopening_the_store_keeps_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let a = Wallet::generate();

    let tip = {
        let storage = Storage::open(dir.path()).unwrap();
        let chain = Blockchain::init(&storage, config(1)).unwrap();
        let tx = chain.build_introduction(&a, item(), 100).unwrap();
        let block = mine_and_add(&chain, vec![tx], &a);
        storage.flush().unwrap();
        block.hash()
    };

    let storage = Storage::open(dir.path()).unwrap();
    let chain = Blockchain::init(&storage, config(1)).unwrap();
    assert_eq!(chain.tip_hash(), tip);
    assert_eq!(chain.item_owner(&item()).unwrap(), a.pubkey_hash());
    assert_eq!(chain.last_n_blocks(10).unwrap().len(), 2);
}
