//! UtilityToken ("ManaToken")
//!
//! Fungible ERC-20 style ledger with an Ownable owner and an immutable
//! reference to the MANA ledger it converts into. Conversion entry points
//! live in [`crate::conversion`]; this module holds the plain token.

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::context::CallContext;
use crate::errors::{ManaError, ManaResult};
use crate::events::{EventRecord, ManaEvent};

pub const MANA_TOKEN_NAME: &str = "Uncollateralized Mana";
pub const MANA_TOKEN_SYMBOL: &str = "mana";
pub const MANA_TOKEN_DECIMALS: u8 = 18;

/// Fungible ledger plus the bookkeeping the conversion engine relies on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityToken {
    /// Contract address (the identity it uses when calling the MANA ledger)
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    /// Ownable owner; zero after renouncing
    owner: Address,
    /// MANA ledger this token mints into
    mana_governance_token: Address,

    /// Account balances
    balances: BTreeMap<Address, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    /// Current total supply in circulation
    total_supply: Amount,
    /// Supply minted at deployment
    initial_supply: Amount,
    /// Total amount burned
    total_burned: Amount,
    /// Amount converted into uncollateralized MANA
    total_contributed: Amount,

    /// Events emitted by the running transaction
    #[serde(skip)]
    pending_events: Vec<EventRecord>,
}

impl UtilityToken {
    /// Deploy the token at `address`, crediting `initial_supply` to `deployer`
    pub fn new(
        address: Address,
        deployer: Address,
        initial_supply: Amount,
        mana_governance_token: Address,
    ) -> ManaResult<Self> {
        if address.is_zero() || deployer.is_zero() {
            return Err(ManaError::ZeroAddress(
                "token address and deployer must be non-zero".to_string(),
            ));
        }
        if mana_governance_token.is_zero() {
            return Err(ManaError::ZeroAddress(
                "MANA ledger reference cannot be zero".to_string(),
            ));
        }

        info!(
            %address,
            owner = %deployer,
            initial_supply,
            mana = %mana_governance_token,
            "ManaToken deployed"
        );

        let mut token = Self {
            address,
            name: MANA_TOKEN_NAME.to_string(),
            symbol: MANA_TOKEN_SYMBOL.to_string(),
            decimals: MANA_TOKEN_DECIMALS,
            owner: deployer,
            mana_governance_token,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: 0,
            initial_supply,
            total_burned: 0,
            total_contributed: 0,
            pending_events: Vec::new(),
        };

        token.emit(ManaEvent::OwnershipTransferred {
            previous: Address::zero(),
            new: deployer,
        });
        if initial_supply > 0 {
            token.balances.insert(deployer, initial_supply);
            token.total_supply = initial_supply;
            token.emit(ManaEvent::Transfer {
                from: Address::zero(),
                to: deployer,
                amount: initial_supply,
            });
        }
        Ok(token)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Address of the MANA ledger this token converts into
    pub fn mana_governance_token(&self) -> Address {
        self.mana_governance_token
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn initial_supply(&self) -> Amount {
        self.initial_supply
    }

    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    pub fn total_contributed(&self) -> Amount {
        self.total_contributed
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn balances(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Get the total number of holders
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    // =========================================================================
    // ERC-20
    // =========================================================================

    /// Transfer from the sender to `to`
    ///
    /// Zero-amount transfers succeed.
    ///
    /// # Errors
    /// - `ZeroAddress`: recipient is the zero address
    /// - `InsufficientBalance`: sender holds less than `amount`
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> ManaResult<()> {
        let from = ctx.sender();
        self.move_balance(from, to, amount)
    }

    /// Set the sender's allowance for `spender`
    pub fn approve(&mut self, ctx: &CallContext, spender: Address, amount: Amount) -> ManaResult<()> {
        let owner = ctx.sender();
        if spender.is_zero() {
            return Err(ManaError::ZeroAddress(
                "cannot approve the zero address".to_string(),
            ));
        }
        self.set_allowance(owner, spender, amount);
        Ok(())
    }

    /// Spend the sender's allowance over `from` to move `amount` to `to`
    ///
    /// # Errors
    /// - `InsufficientAllowance`: allowance below `amount`
    /// - transfer errors
    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ManaResult<()> {
        let spender = ctx.sender();
        let allowance = self.allowance(&from, &spender);
        if allowance < amount {
            return Err(ManaError::InsufficientAllowance {
                have: allowance,
                need: amount,
            });
        }

        self.move_balance(from, to, amount)?;
        self.set_allowance(from, spender, allowance - amount);
        Ok(())
    }

    // =========================================================================
    // Ownable
    // =========================================================================

    /// Fail with the Ownable rejection unless the sender is the owner
    pub fn ensure_owner(&self, ctx: &CallContext) -> ManaResult<()> {
        let sender = ctx.sender();
        if sender != self.owner {
            warn!(%sender, owner = %self.owner, "ManaToken owner check failed");
            return Err(ManaError::not_owner());
        }
        Ok(())
    }

    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> ManaResult<()> {
        self.ensure_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(ManaError::ZeroAddress(
                "Ownable: new owner is the zero address".to_string(),
            ));
        }
        self.set_owner(new_owner);
        Ok(())
    }

    /// Give up ownership; owner-gated operations become unreachable
    pub fn renounce_ownership(&mut self, ctx: &CallContext) -> ManaResult<()> {
        self.ensure_owner(ctx)?;
        self.set_owner(Address::zero());
        Ok(())
    }

    /// Take the events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Destroy `amount` of `from`'s balance as part of a cooperative contribution
    pub(crate) fn burn_contribution(&mut self, from: Address, amount: Amount) -> ManaResult<()> {
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(ManaError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }

        let total_supply = self.total_supply.checked_sub(amount).ok_or(ManaError::Underflow)?;
        let total_burned = self.total_burned.checked_add(amount).ok_or(ManaError::Overflow)?;
        let total_contributed = self
            .total_contributed
            .checked_add(amount)
            .ok_or(ManaError::Overflow)?;

        self.set_balance(from, balance - amount);
        self.total_supply = total_supply;
        self.total_burned = total_burned;
        self.total_contributed = total_contributed;

        debug!(%from, amount, "ManaToken burned");
        self.emit(ManaEvent::Transfer {
            from,
            to: Address::zero(),
            amount,
        });
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: ManaEvent) {
        self.pending_events.push(EventRecord {
            emitter: self.address,
            event,
        });
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> ManaResult<()> {
        if to.is_zero() {
            return Err(ManaError::ZeroAddress(
                "cannot transfer to the zero address".to_string(),
            ));
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(ManaError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }

        if from != to {
            let to_balance = self
                .balance_of(&to)
                .checked_add(amount)
                .ok_or(ManaError::Overflow)?;
            self.set_balance(from, from_balance - amount);
            self.set_balance(to, to_balance);
        }

        debug!(%from, %to, amount, "ManaToken transfer");
        self.emit(ManaEvent::Transfer { from, to, amount });
        Ok(())
    }

    fn set_balance(&mut self, account: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        let spenders = self.allowances.entry(owner).or_default();
        if amount == 0 {
            spenders.remove(&spender);
        } else {
            spenders.insert(spender, amount);
        }
        if spenders.is_empty() {
            self.allowances.remove(&owner);
        }
        self.emit(ManaEvent::Approval {
            owner,
            spender,
            amount,
        });
    }

    fn set_owner(&mut self, new_owner: Address) {
        let previous = self.owner;
        self.owner = new_owner;
        info!(%previous, new = %new_owner, "ManaToken ownership transferred");
        self.emit(ManaEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
    }
}
