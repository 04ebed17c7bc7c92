use crate::raffle_error::RaffleError;
use crate::raffle_event::RaffleEvent;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_state::{Raffle, RaffleConfig, UpkeepResponse, NUM_WORDS};
use crate::utils::{find_coordinator_authority, find_raffle_address, RAFFLE_SEED};
use crate::vrf::{self, RandomWordsRequest};

use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::Initialize { config } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(accounts, config, program_id)
            }
            RaffleInstruction::EnterRaffle { payment } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, payment, program_id)
            }
            RaffleInstruction::CheckUpkeep { check_data } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, check_data, program_id)
            }
            RaffleInstruction::PerformUpkeep { perform_data } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, perform_data, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, random_words, program_id)
            }
        }
    }

    /// Create the raffle PDA and open the first round
    fn process_initialize(
        accounts: &[AccountInfo],
        config: RaffleConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_raffle_pubkey, bump_seed) = find_raffle_address(program_id);
        if *raffle_info.key != expected_raffle_pubkey {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidSeeds);
        }

        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(RaffleError::AlreadyInitialized.into());
        }

        if config.entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(RaffleError::InvalidConfiguration.into());
        }

        let rent = Rent::get()?;
        let rent_lamports = rent.minimum_balance(Raffle::LEN);
        let bump = [bump_seed];
        let signer_seeds: &[&[u8]] = &[RAFFLE_SEED, &bump];

        if raffle_info.lamports() == 0 {
            invoke_signed(
                &system_instruction::create_account(
                    payer_info.key,
                    raffle_info.key,
                    rent_lamports,
                    Raffle::LEN as u64,
                    program_id,
                ),
                &[
                    payer_info.clone(),
                    raffle_info.clone(),
                    system_program_info.clone(),
                ],
                &[signer_seeds],
            )?;
        } else {
            // Someone already sent lamports to the address, so create_account
            // would fail. Top up, then allocate and assign in place.
            let top_up = rent_lamports.saturating_sub(raffle_info.lamports());
            if top_up > 0 {
                invoke(
                    &system_instruction::transfer(payer_info.key, raffle_info.key, top_up),
                    &[
                        payer_info.clone(),
                        raffle_info.clone(),
                        system_program_info.clone(),
                    ],
                )?;
            }
            invoke_signed(
                &system_instruction::allocate(raffle_info.key, Raffle::LEN as u64),
                &[raffle_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
            invoke_signed(
                &system_instruction::assign(raffle_info.key, program_id),
                &[raffle_info.clone(), system_program_info.clone()],
                &[signer_seeds],
            )?;
        }

        let clock = Clock::get()?;
        let raffle = Raffle::new(&config, bump_seed, clock.unix_timestamp);
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: EntranceFee={}, Interval={}s, Coordinator={}, Subscription={}",
            config.entrance_fee,
            config.interval,
            config.coordinator,
            config.subscription_id
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        payment: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }

        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;

        raffle_data
            .record_entry(*player_info.key, payment)
            .map_err(|err| {
                msg!(
                    "Entry rejected: paid {} lamports, fee is {} lamports, state {:?}",
                    payment,
                    raffle_data.entrance_fee,
                    raffle_data.state
                );
                err
            })?;

        if player_info.lamports() < payment {
            msg!(
                "Insufficient funds: needed {} lamports, had {} lamports",
                payment,
                player_info.lamports()
            );
            return Err(ProgramError::InsufficientFunds);
        }

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, payment),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        msg!(
            "Entry {} recorded, pot is now {} lamports",
            raffle_data.player_count(),
            raffle_data.pot
        );
        Raffle::pack(raffle_data, &mut raffle_info.data.borrow_mut())?;

        RaffleEvent::EntryRecorded {
            participant: *player_info.key,
        }
        .emit()
    }

    /// Read-only eligibility check for automation. Never writes the raffle.
    fn process_check_upkeep(
        accounts: &[AccountInfo],
        check_data: Vec<u8>,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        if raffle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;
        let check = raffle_data.check_upkeep(Clock::get()?.unix_timestamp);
        msg!("Upkeep needed: {} ({})", check.upkeep_needed(), check);

        let response = UpkeepResponse {
            upkeep_needed: check.upkeep_needed(),
            perform_data: check_data,
        };
        let data = response
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        set_return_data(&data);
        Ok(())
    }

    /// Close the round and hand the randomness request to the coordinator
    fn process_perform_upkeep(
        accounts: &[AccountInfo],
        perform_data: Vec<u8>,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;
        let coordinator_accounts = account_info_iter.as_slice();

        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;

        let check = raffle_data.check_upkeep(Clock::get()?.unix_timestamp);
        if !check.upkeep_needed() {
            msg!(
                "Upkeep not needed: {}, pot={} players={}",
                check,
                raffle_data.pot,
                raffle_data.player_count()
            );
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        if *coordinator_info.key != raffle_data.coordinator {
            msg!(
                "Coordinator {} does not match configured {}",
                coordinator_info.key,
                raffle_data.coordinator
            );
            return Err(RaffleError::InvalidCoordinator.into());
        }

        msg!(
            "Closing round: {} players, pot {} lamports, perform data {} bytes",
            raffle_data.player_count(),
            raffle_data.pot,
            perform_data.len()
        );

        let bump = [raffle_data.bump];
        let signer_seeds: &[&[u8]] = &[RAFFLE_SEED, &bump];
        let request_id = vrf::request_random_words(
            coordinator_info,
            raffle_info,
            signer_seeds,
            coordinator_accounts,
            RandomWordsRequest {
                gas_lane: raffle_data.gas_lane,
                subscription_id: raffle_data.subscription_id,
                request_confirmations: raffle_data.request_confirmations,
                callback_gas_limit: raffle_data.callback_gas_limit,
                num_words: NUM_WORDS,
            },
        )?;

        raffle_data.begin_calculating(request_id);
        Raffle::pack(raffle_data, &mut raffle_info.data.borrow_mut())?;

        RaffleEvent::RandomnessRequested { request_id }.emit()
    }

    /// Coordinator callback: pick the winner, pay the pot, open the next round
    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: Vec<u64>,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle_data = Raffle::unpack(&raffle_info.data.borrow())?;

        let (expected_authority, _) = find_coordinator_authority(&raffle_data.coordinator);
        if !authority_info.is_signer || *authority_info.key != expected_authority {
            msg!(
                "Fulfillment must be signed by coordinator authority {}",
                expected_authority
            );
            return Err(RaffleError::UnauthorizedCoordinator.into());
        }

        let (winner_index, winner) = raffle_data
            .select_winner(request_id, &random_words)
            .map_err(|err| {
                msg!(
                    "Rejected fulfillment for request {}, outstanding request {:?}",
                    request_id,
                    raffle_data.pending_request
                );
                err
            })?;
        msg!(
            "Random word {} selects entry {} of {}",
            random_words[0],
            winner_index,
            raffle_data.player_count()
        );

        if *winner_info.key != winner || !winner_info.is_writable {
            msg!(
                "Winner account {} cannot receive the prize for {}",
                winner_info.key,
                winner
            );
            return Err(RaffleError::PayoutFailed.into());
        }

        let prize = raffle_data.pot;
        let rent_lamports = Rent::get()?.minimum_balance(Raffle::LEN);
        let raffle_lamports = raffle_info
            .lamports()
            .checked_sub(prize)
            .filter(|remaining| *remaining >= rent_lamports)
            .ok_or_else(|| {
                msg!(
                    "Raffle holds {} lamports, cannot release a pot of {}",
                    raffle_info.lamports(),
                    prize
                );
                ProgramError::from(RaffleError::PayoutFailed)
            })?;
        let winner_lamports = winner_info
            .lamports()
            .checked_add(prize)
            .ok_or(RaffleError::PayoutFailed)?;

        **raffle_info.try_borrow_mut_lamports()? = raffle_lamports;
        **winner_info.try_borrow_mut_lamports()? = winner_lamports;

        raffle_data.settle_round(winner, Clock::get()?.unix_timestamp);
        Raffle::pack(raffle_data, &mut raffle_info.data.borrow_mut())?;

        msg!("Paid {} lamports to {}", prize, winner);
        RaffleEvent::WinnerPicked { winner }.emit()
    }
}
