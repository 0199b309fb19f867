use crate::repository::TransactionRecord;
use crate::rpc::{FetchedBlock, FetchedTransaction};
use crate::units::wei_to_eth;

/// Maps every transaction of `block` to a record carrying the block's number
/// and timestamp. Values are converted from wei to exact ether strings.
pub fn extract(block: &FetchedBlock) -> Vec<TransactionRecord> {
    block
        .transactions
        .iter()
        .map(|tx| to_record(block, tx))
        .collect()
}

fn to_record(block: &FetchedBlock, tx: &FetchedTransaction) -> TransactionRecord {
    TransactionRecord {
        hash: tx.hash,
        block_number: block.number,
        from_address: tx.from,
        to_address: tx.to,
        value_eth: wei_to_eth(tx.value),
        gas: tx.gas,
        gas_price: tx.gas_price,
        nonce: tx.nonce,
        block_timestamp: block.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};

    fn transaction(hash_byte: u8, to: Option<Address>, value: U256) -> FetchedTransaction {
        FetchedTransaction {
            hash: B256::repeat_byte(hash_byte),
            from: Address::repeat_byte(0x01),
            to,
            value,
            gas: 21_000,
            gas_price: 12_000_000_000,
            nonce: hash_byte as u64,
        }
    }

    #[test]
    fn test_empty_block_yields_no_records() {
        let block = FetchedBlock {
            number: 42,
            timestamp: 1_704_067_212,
            transactions: vec![],
        };
        assert!(extract(&block).is_empty());
    }

    #[test]
    fn test_records_inherit_block_fields() {
        let block = FetchedBlock {
            number: 19_000_000,
            timestamp: 1_704_067_211,
            transactions: vec![
                transaction(0x01, Some(Address::repeat_byte(0x02)), U256::from(10u64).pow(U256::from(18u64))),
                transaction(0x02, Some(Address::repeat_byte(0x03)), U256::from(1u64)),
            ],
        };

        let records = extract(&block);
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.block_number, 19_000_000);
            assert_eq!(record.block_timestamp, 1_704_067_211);
        }
        assert_eq!(records[0].value_eth, "1");
        assert_eq!(records[1].value_eth, "0.000000000000000001");
        assert_eq!(records[1].hash, B256::repeat_byte(0x02));
        assert_eq!(records[1].nonce, 2);
        assert_eq!(records[1].gas_price, 12_000_000_000);
    }

    #[test]
    fn test_contract_creation_has_no_recipient() {
        let block = FetchedBlock {
            number: 1,
            timestamp: 0,
            transactions: vec![transaction(0x09, None, U256::ZERO)],
        };

        let records = extract(&block);
        assert_eq!(records[0].to_address, None);
        assert_eq!(records[0].value_eth, "0");
    }
}
