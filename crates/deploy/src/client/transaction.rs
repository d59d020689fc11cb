//! EIP-155 legacy transaction encoding and signing.

use alloy_core::{
    primitives::{Address, B256, Bytes, TxHash, U256, keccak256},
    rlp::{BufMut, EMPTY_STRING_CODE, Encodable, Header},
};
use k256::ecdsa::SigningKey;

/// An unsigned legacy transaction. `to == None` creates a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub raw: Bytes,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl LegacyTransaction {
    /// A contract creation carrying `init_code` (creation bytecode + encoded args).
    pub fn creation(
        chain_id: u64,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        init_code: Bytes,
    ) -> Self {
        Self {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            to: None,
            value: U256::ZERO,
            input: init_code,
        }
    }

    fn fields_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.map_or(1, |to| to.length())
            + self.value.length()
            + self.input.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        match self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.input.encode(out);
    }

    /// RLP payload that is hashed and signed: the fields followed by `chain_id, 0, 0`.
    pub fn encode_for_signing(&self) -> Vec<u8> {
        let payload_length = self.fields_length() + self.chain_id.length() + 2;
        let mut out = Vec::with_capacity(payload_length + 4);
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.encode_fields(&mut out);
        self.chain_id.encode(&mut out);
        0u8.encode(&mut out);
        0u8.encode(&mut out);
        out
    }

    pub fn signing_hash(&self) -> B256 {
        keccak256(self.encode_for_signing())
    }

    pub fn sign(&self, key: &SigningKey) -> Result<SignedTransaction, k256::ecdsa::Error> {
        let hash = self.signing_hash();
        let (signature, recovery_id) = key.sign_prehash_recoverable(hash.as_slice())?;

        let bytes = signature.to_bytes();
        let r = U256::from_be_slice(&bytes[..32]);
        let s = U256::from_be_slice(&bytes[32..]);
        let v = u64::from(recovery_id.to_byte()) + self.chain_id * 2 + 35;

        let payload_length = self.fields_length() + v.length() + r.length() + s.length();
        let mut raw = Vec::with_capacity(payload_length + 4);
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut raw);
        self.encode_fields(&mut raw);
        v.encode(&mut raw);
        r.encode(&mut raw);
        s.encode(&mut raw);

        Ok(SignedTransaction {
            hash: keccak256(&raw),
            raw: raw.into(),
            v,
            r,
            s,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    /// The worked example transaction from EIP-155.
    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            chain_id: 1,
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Some(Address::repeat_byte(0x35)),
            value: U256::from(1_000_000_000_000_000_000u128),
            input: Bytes::new(),
        }
    }

    fn eip155_key() -> SigningKey {
        SigningKey::from_slice(&[0x46; 32]).unwrap()
    }

    #[test]
    fn test_eip155_signing_payload() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.encode_for_signing()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_signature_recovers_signer() {
        let tx = eip155_example();
        let key = eip155_key();
        let signed = tx.sign(&key).unwrap();

        assert!(signed.v == 37 || signed.v == 38);
        assert_eq!(signed.hash, keccak256(&signed.raw));

        let mut rs = signed.r.to_be_bytes::<32>().to_vec();
        rs.extend_from_slice(&signed.s.to_be_bytes::<32>());
        let signature = Signature::from_slice(&rs).unwrap();
        let recovery_id = RecoveryId::from_byte((signed.v - 37) as u8).unwrap();

        let recovered = VerifyingKey::recover_from_prehash(
            tx.signing_hash().as_slice(),
            &signature,
            recovery_id,
        )
        .unwrap();
        assert_eq!(&recovered, key.verifying_key());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let tx = LegacyTransaction::creation(369, 0, 1, 100_000, Bytes::from_static(&[0x60, 0x80]));
        let key = eip155_key();
        assert_eq!(tx.sign(&key).unwrap(), tx.sign(&key).unwrap());
    }

    #[test]
    fn test_creation_encodes_empty_recipient() {
        let tx = LegacyTransaction::creation(369, 0, 1, 21_000, Bytes::new());
        let payload = tx.encode_for_signing();
        // nonce=0 (0x80), gas_price=1 (0x01), gas_limit (0x825208), to=empty (0x80)
        assert_eq!(&payload[1..7], &[0x80, 0x01, 0x82, 0x52, 0x08, 0x80]);
    }
}
