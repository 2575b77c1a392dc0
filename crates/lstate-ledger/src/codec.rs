// Copyright 2024 PRAGMA
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Snapshot blobs: the CBOR encoding of a ledger state, immediately followed by a trailer carrying
//! the [`EpochBlockNo`] of the checkpoint.
//!
//! ```text
//! ┌──────────────────────┬─────┬──────────────────────┐
//! │ CBOR(state)          │ tag │ height (u64, BE)     │
//! └──────────────────────┴─────┴──────────────────────┘
//!                         0: Genesis
//!                         1: EpochBoundaryBlock
//!                         2: Normal, followed by the height
//! ```

use lstate_kernel::{cbor, EpochBlockNo};

const TAG_GENESIS: u8 = 0;
const TAG_EPOCH_BOUNDARY_BLOCK: u8 = 1;
const TAG_NORMAL: u8 = 2;

const HEIGHT_SIZE: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to decode ledger state: {0}")]
    State(#[from] cbor::decode::Error),
    #[error("missing epoch block number after the ledger state")]
    MissingEpochBlockNo,
    #[error("unknown epoch block number tag: {0}")]
    UnknownEpochBlockNoTag(u8),
    #[error("truncated block height: expected {HEIGHT_SIZE} bytes, got {0}")]
    TruncatedHeight(usize),
    #[error("{0} unexpected trailing byte(s) after the epoch block number")]
    TrailingBytes(usize),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode ledger state: {0}")]
pub struct EncodeError(String);

pub fn encode<S: cbor::Encode<()>>(
    state: &S,
    epoch_block_no: EpochBlockNo,
) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = cbor::to_vec(state).map_err(|e| EncodeError(e.to_string()))?;
    bytes.extend(encode_epoch_block_no(epoch_block_no));
    Ok(bytes)
}

pub fn decode<S: for<'d> cbor::Decode<'d, ()>>(
    bytes: &[u8],
) -> Result<(S, EpochBlockNo), DecodeError> {
    let mut d = cbor::Decoder::new(bytes);
    let state = d.decode()?;
    let epoch_block_no = decode_epoch_block_no_trailer(&bytes[d.position()..])?;
    Ok((state, epoch_block_no))
}

/// Read only the epoch block number of a blob, skipping over the state without decoding it.
pub fn decode_epoch_block_no(bytes: &[u8]) -> Result<EpochBlockNo, DecodeError> {
    let mut d = cbor::Decoder::new(bytes);
    d.skip()?;
    decode_epoch_block_no_trailer(&bytes[d.position()..])
}

pub fn encode_epoch_block_no(epoch_block_no: EpochBlockNo) -> Vec<u8> {
    match epoch_block_no {
        EpochBlockNo::Genesis => vec![TAG_GENESIS],
        EpochBlockNo::EpochBoundaryBlock => vec![TAG_EPOCH_BOUNDARY_BLOCK],
        EpochBlockNo::Normal(height) => {
            let mut bytes = Vec::with_capacity(1 + HEIGHT_SIZE);
            bytes.push(TAG_NORMAL);
            bytes.extend_from_slice(&height.to_be_bytes());
            bytes
        }
    }
}

/// Decode a trailer, which must be consumed entirely.
pub fn decode_epoch_block_no_trailer(trailer: &[u8]) -> Result<EpochBlockNo, DecodeError> {
    let (tag, payload) = trailer
        .split_first()
        .ok_or(DecodeError::MissingEpochBlockNo)?;

    let (epoch_block_no, rest) = match *tag {
        TAG_GENESIS => (EpochBlockNo::Genesis, payload),
        TAG_EPOCH_BOUNDARY_BLOCK => (EpochBlockNo::EpochBoundaryBlock, payload),
        TAG_NORMAL => {
            let (height, rest) = payload
                .split_first_chunk::<HEIGHT_SIZE>()
                .ok_or(DecodeError::TruncatedHeight(payload.len()))?;
            (EpochBlockNo::Normal(u64::from_be_bytes(*height)), rest)
        }
        unknown => return Err(DecodeError::UnknownEpochBlockNoTag(unknown)),
    };

    if !rest.is_empty() {
        return Err(DecodeError::TrailingBytes(rest.len()));
    }

    Ok(epoch_block_no)
}
