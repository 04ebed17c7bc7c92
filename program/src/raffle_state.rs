use crate::raffle_error::RaffleError;
use crate::vrf;

use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};
use std::convert::TryFrom;
use std::fmt;

/// Maximum number of entries a single round can hold
pub const MAX_PLAYERS: usize = 64;
/// Random words requested per round
pub const NUM_WORDS: u32 = 1;
/// Confirmations the coordinator waits for before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

const PLAYERS_LEN: usize = 32 * MAX_PLAYERS;

/// Phase of the current round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries, no request outstanding
    Open,
    /// Closed to entries, waiting for the coordinator callback
    Calculating,
}

impl TryFrom<u8> for RaffleState {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Calculating),
            _ => Err("Invalid raffle state"),
        }
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Immutable parameters supplied when the raffle is created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Exact lamports required per entry
    pub entrance_fee: u64,
    /// Seconds a round stays open before it may close
    pub interval: u64,
    /// Program id of the randomness coordinator
    pub coordinator: Pubkey,
    /// Key hash selecting the coordinator's gas lane
    pub gas_lane: [u8; 32],
    /// Coordinator subscription billed for requests
    pub subscription_id: u64,
    /// Compute budget the coordinator grants the callback
    pub callback_gas_limit: u32,
    /// Confirmations to wait before the request is answered
    pub request_confirmations: u16,
}

/// Snapshot of the four conditions that gate closing a round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub is_open: bool,
    pub time_passed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepCheck {
    pub fn upkeep_needed(&self) -> bool {
        self.is_open && self.time_passed && self.has_players && self.has_balance
    }
}

impl fmt::Display for UpkeepCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "open={} time_passed={} has_players={} has_balance={}",
            self.is_open, self.time_passed, self.has_players, self.has_balance
        )
    }
}

/// Answer to a `CheckUpkeep` query, written as return data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpkeepResponse {
    pub upkeep_needed: bool,
    pub perform_data: Vec<u8>,
}

/// Raffle account data
#[derive(Debug, Clone, PartialEq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Bump of the raffle PDA
    pub bump: u8,
    /// Phase of the current round
    pub state: RaffleState,
    /// Exact price of one entry in lamports
    pub entrance_fee: u64,
    /// Minimum seconds between `last_timestamp` and closing
    pub interval: u64,
    /// Start of the current eligibility window
    pub last_timestamp: UnixTimestamp,
    /// Lamports collected from entries this round
    pub pot: u64,
    pub coordinator: Pubkey,
    pub gas_lane: [u8; 32],
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub request_confirmations: u16,
    /// Request id awaiting fulfillment, present only while calculating
    pub pending_request: Option<u64>,
    /// Winner of the last completed round (zero before the first payout)
    pub recent_winner: Pubkey,
    /// Entries in order, one key per entry
    pub players: Vec<Pubkey>,
}

impl Raffle {
    /// Create a fresh round from the constructor parameters
    pub fn new(config: &RaffleConfig, bump: u8, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            bump,
            state: RaffleState::Open,
            entrance_fee: config.entrance_fee,
            interval: config.interval,
            last_timestamp: now,
            pot: 0,
            coordinator: config.coordinator,
            gas_lane: config.gas_lane,
            subscription_id: config.subscription_id,
            callback_gas_limit: config.callback_gas_limit,
            request_confirmations: config.request_confirmations,
            pending_request: None,
            recent_winner: Pubkey::default(),
            players: Vec::new(),
        }
    }

    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn pot(&self) -> u64 {
        self.pot
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn recent_winner(&self) -> Pubkey {
        self.recent_winner
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending_request
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        self.request_confirmations
    }

    pub fn player_count(&self) -> u64 {
        self.players.len() as u64
    }

    /// Player at `index` in entry order
    pub fn player(&self, index: usize) -> Result<&Pubkey, ProgramError> {
        self.players
            .get(index)
            .ok_or_else(|| RaffleError::IndexOutOfRange.into())
    }

    /// Evaluate whether the round may close at `now`. Never mutates.
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck {
        let elapsed = now.saturating_sub(self.last_timestamp);
        UpkeepCheck {
            is_open: self.state == RaffleState::Open,
            time_passed: elapsed >= 0 && elapsed as u64 >= self.interval,
            has_players: !self.players.is_empty(),
            has_balance: self.pot > 0,
        }
    }

    /// Admit one paid entry for `participant`
    pub fn record_entry(&mut self, participant: Pubkey, payment: u64) -> Result<(), ProgramError> {
        if self.state != RaffleState::Open {
            return Err(RaffleError::NotOpen.into());
        }
        if payment < self.entrance_fee {
            return Err(RaffleError::InsufficientPayment.into());
        }
        if payment > self.entrance_fee {
            return Err(RaffleError::ExcessPayment.into());
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RaffleError::RaffleFull.into());
        }

        self.pot = self
            .pot
            .checked_add(payment)
            .ok_or(ProgramError::InvalidArgument)?;
        self.players.push(participant);
        Ok(())
    }

    /// Close the round to entries and remember the outstanding request
    pub fn begin_calculating(&mut self, request_id: u64) {
        self.state = RaffleState::Calculating;
        self.pending_request = Some(request_id);
    }

    /// Resolve the winner for a fulfillment of `request_id`.
    ///
    /// Returns the winning index together with the winning key. Fails with
    /// `UnknownRequest` unless `request_id` is the outstanding request.
    pub fn select_winner(
        &self,
        request_id: u64,
        random_words: &[u64],
    ) -> Result<(u64, Pubkey), ProgramError> {
        match self.pending_request {
            Some(pending) if pending == request_id => {}
            _ => return Err(RaffleError::UnknownRequest.into()),
        }
        let random_word = random_words
            .first()
            .ok_or(RaffleError::MissingRandomWords)?;

        let index = vrf::winner_index(*random_word, self.player_count());
        let winner = *self.player(index as usize)?;
        Ok((index, winner))
    }

    /// Record `winner`, empty the round and reopen it. Returns the prize that
    /// was held in the pot.
    pub fn settle_round(&mut self, winner: Pubkey, now: UnixTimestamp) -> u64 {
        let prize = self.pot;
        self.recent_winner = winner;
        self.players.clear();
        self.pot = 0;
        self.last_timestamp = now;
        self.state = RaffleState::Open;
        self.pending_request = None;
        prize
    }
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Raffle {
    const LEN: usize = 1 + 1 + 1 + 8 + 8 + 8 + 8 + 32 + 32 + 8 + 4 + 2 + 1 + 8 + 32 + 4 + PLAYERS_LEN;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Raffle::LEN];
        let (
            is_initialized,
            bump,
            state,
            entrance_fee,
            interval,
            last_timestamp,
            pot,
            coordinator,
            gas_lane,
            subscription_id,
            callback_gas_limit,
            request_confirmations,
            has_pending_request,
            pending_request_id,
            recent_winner,
            player_count,
            players_src,
        ) = array_refs![src, 1, 1, 1, 8, 8, 8, 8, 32, 32, 8, 4, 2, 1, 8, 32, 4, PLAYERS_LEN];

        let state = RaffleState::try_from(state[0]).map_err(|_| ProgramError::InvalidAccountData)?;

        let player_count = u32::from_le_bytes(*player_count) as usize;
        if player_count > MAX_PLAYERS {
            return Err(ProgramError::InvalidAccountData);
        }
        let players = players_src
            .chunks_exact(32)
            .take(player_count)
            .map(|chunk| Pubkey::new_from_array(*array_ref![chunk, 0, 32]))
            .collect();

        let pending_request = match has_pending_request[0] {
            0 => None,
            1 => Some(u64::from_le_bytes(*pending_request_id)),
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(Raffle {
            is_initialized: is_initialized[0] != 0,
            bump: bump[0],
            state,
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: u64::from_le_bytes(*interval),
            last_timestamp: UnixTimestamp::from_le_bytes(*last_timestamp),
            pot: u64::from_le_bytes(*pot),
            coordinator: Pubkey::new_from_array(*coordinator),
            gas_lane: *gas_lane,
            subscription_id: u64::from_le_bytes(*subscription_id),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            request_confirmations: u16::from_le_bytes(*request_confirmations),
            pending_request,
            recent_winner: Pubkey::new_from_array(*recent_winner),
            players,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Raffle::LEN];
        let (
            is_initialized_dst,
            bump_dst,
            state_dst,
            entrance_fee_dst,
            interval_dst,
            last_timestamp_dst,
            pot_dst,
            coordinator_dst,
            gas_lane_dst,
            subscription_id_dst,
            callback_gas_limit_dst,
            request_confirmations_dst,
            has_pending_request_dst,
            pending_request_id_dst,
            recent_winner_dst,
            player_count_dst,
            players_dst,
        ) = mut_array_refs![dst, 1, 1, 1, 8, 8, 8, 8, 32, 32, 8, 4, 2, 1, 8, 32, 4, PLAYERS_LEN];

        is_initialized_dst[0] = self.is_initialized as u8;
        bump_dst[0] = self.bump;
        state_dst[0] = self.state.into();
        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        *last_timestamp_dst = self.last_timestamp.to_le_bytes();
        *pot_dst = self.pot.to_le_bytes();
        coordinator_dst.copy_from_slice(self.coordinator.as_ref());
        *gas_lane_dst = self.gas_lane;
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *request_confirmations_dst = self.request_confirmations.to_le_bytes();
        has_pending_request_dst[0] = self.pending_request.is_some() as u8;
        *pending_request_id_dst = self.pending_request.unwrap_or_default().to_le_bytes();
        recent_winner_dst.copy_from_slice(self.recent_winner.as_ref());
        *player_count_dst = (self.players.len() as u32).to_le_bytes();

        players_dst.fill(0);
        for (slot, player) in players_dst.chunks_exact_mut(32).zip(self.players.iter()) {
            slot.copy_from_slice(player.as_ref());
        }
    }
}
