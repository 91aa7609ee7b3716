//! Raw Transaction Codec
//!
//! Legacy layout with a timestamp after the version:
//!
//! ```text
//! version:u32 time:u32 varint(n_in) { prev_txid[32] vout:u32 varint(len) script sequence:u32 }
//! varint(n_out) { value:u64 varint(len) script } lock_time:u32
//! ```
//!
//! All integers little-endian. Txids are stored internally in wire order and
//! displayed byte-reversed.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256d;
use crate::error::{LanaError, LanaResult};

// =============================================================================
// Writers
// =============================================================================

pub fn write_varint(out: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        out.push(n as u8);
    } else if n <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&n.to_le_bytes());
    }
}

pub fn varint_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

pub fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn write_u64_le(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Length-prefixed byte string
pub fn write_var_bytes(out: &mut Vec<u8>, data: &[u8]) {
    write_varint(out, data.len() as u64);
    out.extend_from_slice(data);
}

// =============================================================================
// Reader
// =============================================================================

/// Cursor over untrusted bytes; every read is bounds-checked
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> LanaResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(LanaError::invalid_transaction(format!(
                "Unexpected end of data at offset {} (wanted {} bytes, {} left)",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> LanaResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> LanaResult<u16> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.read_bytes(2)?);
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32_le(&mut self) -> LanaResult<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64_le(&mut self) -> LanaResult<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_varint(&mut self) -> LanaResult<u64> {
        match self.read_u8()? {
            0xfd => Ok(self.read_u16_le()? as u64),
            0xfe => Ok(self.read_u32_le()? as u64),
            0xff => self.read_u64_le(),
            n => Ok(n as u64),
        }
    }

    pub fn read_var_bytes(&mut self) -> LanaResult<&'a [u8]> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| LanaError::invalid_transaction("Length prefix overflows usize"))?;
        self.read_bytes(len)
    }

    /// Element count, bounded by the bytes left so a hostile prefix cannot
    /// trigger a huge allocation
    fn read_count(&mut self, min_item_size: usize) -> LanaResult<usize> {
        let count = self.read_varint()?;
        let max = (self.remaining() / min_item_size.max(1)) as u64;
        if count > max {
            return Err(LanaError::invalid_transaction(format!(
                "Element count {} exceeds remaining data",
                count
            )));
        }
        Ok(count as usize)
    }
}

// =============================================================================
// Transaction model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    /// Wire order (reverse of the displayed txid)
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// From a displayed (big-endian hex) txid
    pub fn from_display_hex(txid: &str, vout: u32) -> LanaResult<Self> {
        let bytes = hex::decode(txid.trim())?;
        if bytes.len() != 32 {
            return Err(LanaError::invalid_input(format!(
                "Txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut wire = [0u8; 32];
        wire.copy_from_slice(&bytes);
        wire.reverse();
        Ok(Self { txid: wire, vout })
    }

    pub fn display_txid(&self) -> String {
        let mut display = self.txid;
        display.reverse();
        hex::encode(display)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prev_out: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub time: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.estimated_len());
        write_u32_le(&mut out, self.version);
        write_u32_le(&mut out, self.time);

        write_varint(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.prev_out.txid);
            write_u32_le(&mut out, input.prev_out.vout);
            write_var_bytes(&mut out, &input.script_sig);
            write_u32_le(&mut out, input.sequence);
        }

        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            write_u64_le(&mut out, output.value);
            write_var_bytes(&mut out, &output.script_pubkey);
        }

        write_u32_le(&mut out, self.lock_time);
        out
    }

    fn estimated_len(&self) -> usize {
        let inputs: usize = self.inputs.iter().map(|i| 41 + 9 + i.script_sig.len()).sum();
        let outputs: usize = self.outputs.iter().map(|o| 8 + 9 + o.script_pubkey.len()).sum();
        12 + 18 + inputs + outputs
    }

    /// Byte-reversed double SHA-256 of the serialization, hex
    pub fn txid(&self) -> String {
        txid_of(&self.serialize())
    }
}

pub fn txid_of(raw: &[u8]) -> String {
    let mut hash = sha256d(raw);
    hash.reverse();
    hex::encode(hash)
}

/// Parse a complete transaction; trailing bytes are an error
pub fn decode_transaction(raw: &[u8]) -> LanaResult<Transaction> {
    let mut reader = Reader::new(raw);
    let version = reader.read_u32_le()?;
    let time = reader.read_u32_le()?;

    // outpoint + empty script + sequence
    let input_count = reader.read_count(41)?;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        let mut txid = [0u8; 32];
        txid.copy_from_slice(reader.read_bytes(32)?);
        let vout = reader.read_u32_le()?;
        let script_sig = reader.read_var_bytes()?.to_vec();
        let sequence = reader.read_u32_le()?;
        inputs.push(TxIn {
            prev_out: OutPoint { txid, vout },
            script_sig,
            sequence,
        });
    }

    // value + empty script
    let output_count = reader.read_count(9)?;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        let value = reader.read_u64_le()?;
        let script_pubkey = reader.read_var_bytes()?.to_vec();
        outputs.push(TxOut { value, script_pubkey });
    }

    let lock_time = reader.read_u32_le()?;
    if reader.remaining() != 0 {
        return Err(LanaError::invalid_transaction(format!(
            "{} trailing bytes after transaction",
            reader.remaining()
        )));
    }

    Ok(Transaction {
        version,
        time,
        inputs,
        outputs,
        lock_time,
    })
}

pub fn decode_transaction_hex(raw_hex: &str) -> LanaResult<Transaction> {
    let bytes = hex::decode(raw_hex.trim())?;
    decode_transaction(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(n: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, n);
        out
    }

    #[test]
    fn test_varint_boundaries() {
        assert_eq!(varint(0), vec![0x00]);
        assert_eq!(varint(0xfc), vec![0xfc]);
        assert_eq!(varint(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(varint(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(varint(0x1_0000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(varint(0x1_0000_0000), vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0]);
        for n in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, u64::MAX] {
            assert_eq!(varint(n).len(), varint_len(n));
            assert_eq!(Reader::new(&varint(n)).read_varint().unwrap(), n);
        }
    }

    #[test]
    fn test_reader_bounds() {
        let mut reader = Reader::new(&[1, 2, 3]);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert!(reader.read_u32_le().is_err());
        assert_eq!(reader.position(), 1);
    }

    fn sample() -> Transaction {
        Transaction {
            version: 1,
            time: 1_700_000_000,
            inputs: vec![TxIn {
                prev_out: OutPoint::from_display_hex(&"ab".repeat(32), 2).unwrap(),
                script_sig: vec![0x51],
                sequence: 0xffff_ffff,
            }],
            outputs: vec![TxOut {
                value: 50_000,
                script_pubkey: vec![0x76, 0xa9],
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn test_serialize_layout() {
        let raw = sample().serialize();
        assert_eq!(&raw[0..4], &[1, 0, 0, 0]);
        assert_eq!(&raw[4..8], &1_700_000_000u32.to_le_bytes());
        assert_eq!(raw[8], 1);
        assert_eq!(&raw[41..45], &[2, 0, 0, 0]);
        assert_eq!(&raw[45..47], &[1, 0x51]);
        assert_eq!(&raw[47..51], &[0xff; 4]);
        assert_eq!(raw[51], 1);
        assert_eq!(&raw[52..60], &50_000u64.to_le_bytes());
        assert_eq!(&raw[60..63], &[2, 0x76, 0xa9]);
        assert_eq!(&raw[63..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_matches_encode() {
        let tx = sample();
        let decoded = decode_transaction(&tx.serialize()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.inputs[0].prev_out.display_txid(), "ab".repeat(32));
    }

    #[test]
    fn test_decode_rejects_truncated_and_trailing() {
        let raw = sample().serialize();
        assert!(decode_transaction(&raw[..raw.len() - 1]).is_err());
        let mut extra = raw.clone();
        extra.push(0);
        assert!(decode_transaction(&extra).is_err());
    }

    #[test]
    fn test_decode_rejects_absurd_count() {
        let mut raw = vec![1, 0, 0, 0, 0, 0, 0, 0];
        raw.extend_from_slice(&[0xfe, 0xff, 0xff, 0xff, 0x7f]);
        assert!(decode_transaction(&raw).is_err());
    }

    #[test]
    fn test_txid_is_reversed_hash() {
        let raw = sample().serialize();
        let mut expected = sha256d(&raw);
        expected.reverse();
        assert_eq!(sample().txid(), hex::encode(expected));
    }
}
