//! The vote bank: a per-account budget of votes.
//!
//! Placing a vote debits the bank by one; retracting one credits it back.
//! Which of the two an action is depends on the direction of the action and
//! the account's vote on the fact *before* the action.

use crate::{Error, Result, account::Account, store::AccountStore};

/// What a vote action does to the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankMovement {
  /// A net new vote: costs one unit.
  Debit,
  /// A vote being withdrawn: refunds one unit.
  Credit,
}

impl BankMovement {
  /// Classify an action from its direction and the prior vote value.
  ///
  /// Voting in the direction the prior vote already leans (or from neutral)
  /// places a vote. Anything else moves back toward zero and is a retraction.
  pub fn for_action(casting_up: bool, current_vote: i64) -> Self {
    if (casting_up && current_vote >= 0) || (!casting_up && current_vote <= 0) {
      Self::Debit
    } else {
      Self::Credit
    }
  }

  /// The opposite movement.
  pub fn reversed(self) -> Self {
    match self {
      Self::Debit => Self::Credit,
      Self::Credit => Self::Debit,
    }
  }
}

/// Attempts at writing back a reversal before giving up.
const UNDO_ATTEMPTS: usize = 3;

impl Account {
  /// Debit or credit the bank for a vote action and persist the account.
  ///
  /// Fails with [`Error::NoVotesLeft`] when a debit is needed and the bank
  /// is empty. Credits are not capped, so the bank may grow past its initial
  /// allotment.
  pub async fn update_vote_bank<S: AccountStore>(
    &mut self,
    store: &S,
    casting_up: bool,
    current_vote: i64,
  ) -> Result<()> {
    let previous = self.vote_bank;
    self.vote_bank = match BankMovement::for_action(casting_up, current_vote) {
      BankMovement::Debit => previous.checked_sub(1).ok_or(Error::NoVotesLeft)?,
      BankMovement::Credit => previous.saturating_add(1),
    };

    if let Err(e) = store.save_account(self).await {
      self.vote_bank = previous;
      return Err(Error::storage(e));
    }
    Ok(())
  }

  /// Reverse a bank movement that was already persisted, e.g. because the
  /// vote it paid for could not be recorded.
  ///
  /// The stored account may have moved on in the meantime (a replenishment
  /// grant bumps every version), so a conflicting write reloads the account
  /// and retries.
  pub async fn undo_bank_movement<S: AccountStore>(
    &mut self,
    store: &S,
    movement: BankMovement,
  ) -> Result<()> {
    let mut attempt = 1;
    loop {
      let previous = self.vote_bank;
      self.vote_bank = match movement.reversed() {
        BankMovement::Debit => previous.saturating_sub(1),
        BankMovement::Credit => previous.saturating_add(1),
      };

      let err = match store.save_account(self).await {
        Ok(()) => return Ok(()),
        Err(e) => {
          self.vote_bank = previous;
          Error::storage(e)
        }
      };
      if !matches!(err, Error::Conflict(_)) || attempt == UNDO_ATTEMPTS {
        return Err(err);
      }

      attempt += 1;
      *self = store
        .load_account_by_id(self.id)
        .await
        .map_err(Error::storage)?
        .ok_or(Error::AccountNotFound)?;
    }
  }
}
