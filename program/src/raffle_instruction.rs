use crate::raffle_error::RaffleError;
use crate::raffle_state::RaffleConfig;
use crate::utils::find_raffle_address;

use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;
use std::mem::size_of;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the raffle account and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The payer funding the raffle account
    /// 1. `[writable]` The raffle account (PDA of `["raffle"]`)
    /// 2. `[]` The system program
    Initialize {
        /// Immutable raffle parameters
        config: RaffleConfig,
    },

    /// Buy one entry into the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player paying the entrance fee
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, must equal the entrance fee
        payment: u64,
    },

    /// Report whether the round may close; answer is written as return data
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    CheckUpkeep {
        /// Opaque payload echoed back as perform data
        check_data: Vec<u8>,
    },

    /// Close the round and request randomness from the coordinator
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    /// 1. `[]` The coordinator program
    /// Remaining accounts are forwarded to the coordinator
    PerformUpkeep {
        /// Payload produced by `CheckUpkeep`
        perform_data: Vec<u8>,
    },

    /// Coordinator callback delivering the random words
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority PDA
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The winning player
    FulfillRandomWords {
        /// Id returned by the coordinator at request time
        request_id: u64,
        /// Random words, the first one picks the winner
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_u64(rest)?;
                let (coordinator, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (gas_lane, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_gas_limit, rest) = Self::unpack_u32(rest)?;
                let (request_confirmations, _) = Self::unpack_u16(rest)?;
                Self::Initialize {
                    config: RaffleConfig {
                        entrance_fee,
                        interval,
                        coordinator: Pubkey::new_from_array(coordinator),
                        gas_lane,
                        subscription_id,
                        callback_gas_limit,
                        request_confirmations,
                    },
                }
            }
            1 => {
                let (payment, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { payment }
            }
            2 => {
                let (check_data, _) = Self::unpack_bytes(rest)?;
                Self::CheckUpkeep { check_data }
            }
            3 => {
                let (perform_data, _) = Self::unpack_bytes(rest)?;
                Self::PerformUpkeep { perform_data }
            }
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (count, mut rest) = Self::unpack_u32(rest)?;
                let count = count as usize;
                if rest.len() < count.saturating_mul(8) {
                    return Err(RaffleError::InvalidInstructionData.into());
                }
                let mut random_words = Vec::with_capacity(count);
                for _ in 0..count {
                    let (word, next) = Self::unpack_u64(rest)?;
                    random_words.push(word);
                    rest = next;
                }
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(RaffleError::InvalidInstructionData.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::Initialize { config } => {
                buf.push(0);
                buf.extend_from_slice(&config.entrance_fee.to_le_bytes());
                buf.extend_from_slice(&config.interval.to_le_bytes());
                buf.extend_from_slice(config.coordinator.as_ref());
                buf.extend_from_slice(&config.gas_lane);
                buf.extend_from_slice(&config.subscription_id.to_le_bytes());
                buf.extend_from_slice(&config.callback_gas_limit.to_le_bytes());
                buf.extend_from_slice(&config.request_confirmations.to_le_bytes());
            }
            Self::EnterRaffle { payment } => {
                buf.push(1);
                buf.extend_from_slice(&payment.to_le_bytes());
            }
            Self::CheckUpkeep { check_data } => {
                buf.push(2);
                Self::pack_bytes(&mut buf, check_data);
            }
            Self::PerformUpkeep { perform_data } => {
                buf.push(3);
                Self::pack_bytes(&mut buf, perform_data);
            }
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
                for word in random_words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (value, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(value), rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (value, rest) = Self::unpack_fixed_bytes::<4>(input)?;
        Ok((u32::from_le_bytes(value), rest))
    }

    fn unpack_u16(input: &[u8]) -> Result<(u16, &[u8]), ProgramError> {
        let (value, rest) = Self::unpack_fixed_bytes::<2>(input)?;
        Ok((u16::from_le_bytes(value), rest))
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = input.split_at(N);
        let bytes = bytes
            .try_into()
            .map_err(|_| ProgramError::from(RaffleError::InvalidInstructionData))?;
        Ok((bytes, rest))
    }

    fn unpack_bytes(input: &[u8]) -> Result<(Vec<u8>, &[u8]), ProgramError> {
        let (len, rest) = Self::unpack_u32(input)?;
        let len = len as usize;
        if rest.len() < len {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = rest.split_at(len);
        Ok((bytes.to_vec(), rest))
    }

    fn pack_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }
}

/// Create initialize instruction
pub fn initialize(program_id: &Pubkey, payer: &Pubkey, config: RaffleConfig) -> Instruction {
    let (raffle_account, _) = find_raffle_address(program_id);
    let data = RaffleInstruction::Initialize { config }.pack();

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, player: &Pubkey, payment: u64) -> Instruction {
    let (raffle_account, _) = find_raffle_address(program_id);
    let data = RaffleInstruction::EnterRaffle { payment }.pack();

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(raffle_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, check_data: Vec<u8>) -> Instruction {
    let (raffle_account, _) = find_raffle_address(program_id);
    let data = RaffleInstruction::CheckUpkeep { check_data }.pack();

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(raffle_account, false)],
        data,
    }
}

/// Create perform_upkeep instruction
///
/// `coordinator_accounts` are appended after the coordinator program and
/// forwarded to it with the randomness request.
pub fn perform_upkeep(
    program_id: &Pubkey,
    coordinator_program: &Pubkey,
    coordinator_accounts: &[AccountMeta],
    perform_data: Vec<u8>,
) -> Instruction {
    let (raffle_account, _) = find_raffle_address(program_id);
    let data = RaffleInstruction::PerformUpkeep { perform_data }.pack();

    let mut accounts = vec![
        AccountMeta::new(raffle_account, false),
        AccountMeta::new_readonly(*coordinator_program, false),
    ];
    accounts.extend_from_slice(coordinator_accounts);

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Create fulfill_random_words instruction, issued by a coordinator
pub fn fulfill_random_words(
    program_id: &Pubkey,
    coordinator_authority: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Instruction {
    let (raffle_account, _) = find_raffle_address(program_id);
    let data = RaffleInstruction::FulfillRandomWords {
        request_id,
        random_words,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new_readonly(*coordinator_authority, true),
        AccountMeta::new(raffle_account, false),
        AccountMeta::new(*winner, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}
