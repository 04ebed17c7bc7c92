// Randomness coordinator integration: outbound request and winner selection
use crate::raffle_error::RaffleError;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
};
use std::convert::TryInto;

/// Parameters forwarded to the coordinator with every request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    pub gas_lane: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Instructions the raffle sends to a randomness coordinator.
///
/// A coordinator answers `RequestRandomWords` by setting its return data to
/// the little-endian `u64` request id, and later calls the consumer's
/// `FulfillRandomWords` instruction signed by its authority PDA
/// (see `utils::find_coordinator_authority`).
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum CoordinatorInstruction {
    /// Accounts expected:
    /// 0. `[signer]` The consumer account the words are for
    /// 1.. Coordinator-specific accounts
    RequestRandomWords(RandomWordsRequest),
}

// Ask the coordinator for random words and return its request id
pub fn request_random_words<'a>(
    coordinator_program: &AccountInfo<'a>,
    consumer_info: &AccountInfo<'a>,
    consumer_seeds: &[&[u8]],
    coordinator_accounts: &[AccountInfo<'a>],
    request: RandomWordsRequest,
) -> Result<u64, ProgramError> {
    let data = CoordinatorInstruction::RequestRandomWords(request)
        .try_to_vec()
        .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;

    let mut accounts = vec![AccountMeta::new_readonly(*consumer_info.key, true)];
    accounts.extend(coordinator_accounts.iter().map(|acc| AccountMeta {
        pubkey: *acc.key,
        is_signer: acc.is_signer,
        is_writable: acc.is_writable,
    }));

    let mut account_infos = Vec::with_capacity(coordinator_accounts.len() + 2);
    account_infos.push(consumer_info.clone());
    account_infos.extend_from_slice(coordinator_accounts);
    account_infos.push(coordinator_program.clone());

    invoke_signed(
        &Instruction {
            program_id: *coordinator_program.key,
            accounts,
            data,
        },
        &account_infos,
        &[consumer_seeds],
    )?;

    let (returning_program, return_data) = get_return_data().ok_or_else(|| {
        msg!("Coordinator returned no data");
        ProgramError::from(RaffleError::MissingRequestId)
    })?;
    if returning_program != *coordinator_program.key {
        msg!("Return data came from {}, not the coordinator", returning_program);
        return Err(RaffleError::MissingRequestId.into());
    }
    let request_id = parse_request_id(&return_data)?;

    msg!("Coordinator accepted request {}", request_id);
    Ok(request_id)
}

fn parse_request_id(data: &[u8]) -> Result<u64, ProgramError> {
    data.try_into()
        .map(u64::from_le_bytes)
        .map_err(|_| RaffleError::MissingRequestId.into())
}

/// Index of the winning entry: the raw random word reduced modulo the number
/// of entries, with no further mixing.
pub fn winner_index(random_word: u64, player_count: u64) -> u64 {
    if player_count == 0 {
        return 0;
    }
    random_word % player_count
}
