use std::collections::HashMap;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;

use crate::config::LedgerConfig;
use crate::contract::{Contract, ContractUpdate};
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::export::LedgerReport;
use crate::installment::{DerivationContext, Installment, InstallmentEdit, InstallmentPatch};
use crate::mora::{self, LateFeePolicy};
use crate::ordering;
use crate::payments::{GeneratedSchedule, LedgerView, ScheduleGenerator, ScheduleRequest};
use crate::store::InstallmentStore;
use crate::types::{ContractId, InstallmentId};

/// values for a manually added row
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentDraft {
    pub concept: String,
    pub due_date: NaiveDate,
    pub capital: Money,
    pub interest: Money,
}

/// row state captured when editing started
#[derive(Debug, Clone)]
struct PendingEdit {
    contract_id: ContractId,
    snapshot: Installment,
}

/// in-memory cache of loaded contracts in front of an `InstallmentStore`.
///
/// Edits land on the cached row immediately and are written on `commit`.
/// A failed write restores the row as it was before the edit began. After
/// every successful write the contract is reconciled with the store; rows
/// with uncommitted edits keep their local values during reconciliation.
pub struct LedgerSession<S: InstallmentStore> {
    store: S,
    config: LedgerConfig,
    late_fees: Box<dyn LateFeePolicy>,
    contracts: HashMap<ContractId, Contract>,
    pending: HashMap<InstallmentId, PendingEdit>,
    events: EventStore,
}

impl<S: InstallmentStore> LedgerSession<S> {
    pub fn new(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let late_fees = Box::new(config.late_fee_engine());
        Ok(Self {
            store,
            config,
            late_fees,
            contracts: HashMap::new(),
            pending: HashMap::new(),
            events: EventStore::new(),
        })
    }

    /// replace the late-fee formula
    pub fn with_late_fee_policy(mut self, policy: Box<dyn LateFeePolicy>) -> Self {
        self.late_fees = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn events(&mut self) -> &mut EventStore {
        &mut self.events
    }

    /// cached contract, if loaded
    pub fn contract(&self, contract_id: ContractId) -> Option<&Contract> {
        self.contracts.get(&contract_id)
    }

    pub fn has_pending_edit(&self, installment_id: InstallmentId) -> bool {
        self.pending.contains_key(&installment_id)
    }

    pub fn pending_edit_count(&self, contract_id: ContractId) -> usize {
        self.pending
            .values()
            .filter(|p| p.contract_id == contract_id)
            .count()
    }

    /// fetch a contract into the cache
    pub fn load(&mut self, contract_id: ContractId, time: &SafeTimeProvider) -> Result<&Contract> {
        self.reconcile(contract_id, time)?;
        self.cached(contract_id)
    }

    /// refetch from the store and re-derive every row. stored totals are not
    /// trusted; rows with uncommitted edits keep their local copy
    pub fn reconcile(&mut self, contract_id: ContractId, time: &SafeTimeProvider) -> Result<()> {
        let mut fresh = self.store.load_contract(contract_id)?;
        let today = mora::today(time);

        let mut rederived = 0;
        {
            let ctx = self.derivation_context(fresh.daily_late_fee_rate, today);
            for installment in fresh.installments.iter_mut() {
                if !installment.is_consistent() {
                    warn!(
                        "installment {} of contract {} had inconsistent stored totals",
                        installment.id, contract_id
                    );
                }
                if installment.rederive(&ctx, &self.config.additional_label) {
                    rederived += 1;
                }
            }
        }

        let pending_ids: Vec<InstallmentId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.contract_id == contract_id)
            .map(|(id, _)| *id)
            .collect();
        if let Some(cached) = self.contracts.get(&contract_id) {
            for id in pending_ids {
                match (fresh.installment_mut(id), cached.installment(id)) {
                    (Some(stored), Some(local)) => *stored = local.clone(),
                    _ => {
                        warn!("installment {id} with an uncommitted edit is gone from the store");
                        self.pending.remove(&id);
                    }
                }
            }
        }

        if rederived > 0 {
            debug!("re-derived {rederived} rows of contract {contract_id}");
            self.events.emit(Event::RowsRederived {
                contract_id,
                count: rederived,
                timestamp: time.now(),
            });
        }

        self.contracts.insert(contract_id, fresh);
        Ok(())
    }

    /// apply an edit to the cached row; nothing is written until `commit`
    pub fn edit(
        &mut self,
        contract_id: ContractId,
        installment_id: InstallmentId,
        edit: InstallmentEdit,
        time: &SafeTimeProvider,
    ) -> Result<&Installment> {
        let today = mora::today(time);
        let contract = self
            .contracts
            .get_mut(&contract_id)
            .ok_or(LedgerError::ContractNotFound { id: contract_id })?;
        let daily_rate = contract.daily_late_fee_rate;
        let installment = contract
            .installment_mut(installment_id)
            .ok_or(LedgerError::InstallmentNotFound { id: installment_id })?;

        self.pending
            .entry(installment_id)
            .or_insert_with(|| PendingEdit {
                contract_id,
                snapshot: installment.clone(),
            });

        let ctx = DerivationContext {
            daily_rate,
            today,
            late_fees: self.late_fees.as_ref(),
            paid_tolerance: self.config.paid_tolerance,
        };
        debug!("editing installment {installment_id}: {edit:?}");
        installment.apply_edit(edit, &ctx);
        Ok(&*installment)
    }

    /// charge the suggested late fee on a row (uncommitted)
    pub fn accept_suggested_late_fee(
        &mut self,
        contract_id: ContractId,
        installment_id: InstallmentId,
        time: &SafeTimeProvider,
    ) -> Result<&Installment> {
        let suggested = self
            .cached(contract_id)?
            .installment(installment_id)
            .ok_or(LedgerError::InstallmentNotFound { id: installment_id })?
            .suggested_late_fee;
        self.edit(
            contract_id,
            installment_id,
            InstallmentEdit::LateFeeCharged(suggested),
            time,
        )
    }

    /// write a row's pending edit. on failure the row is rolled back
    pub fn commit(
        &mut self,
        contract_id: ContractId,
        installment_id: InstallmentId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        // look the row up before dropping the snapshot so a bad id leaves the edit intact
        let current = self
            .cached(contract_id)?
            .installment(installment_id)
            .cloned()
            .ok_or(LedgerError::InstallmentNotFound { id: installment_id })?;
        let pending = self
            .pending
            .remove(&installment_id)
            .ok_or(LedgerError::NoPendingEdit { id: installment_id })?;

        let patch = current.diff(&pending.snapshot);
        if patch.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.store.update_installment(installment_id, &patch) {
            error!("failed to save installment {installment_id}: {err}");
            self.restore(contract_id, pending.snapshot);
            self.events.emit(Event::EditRolledBack {
                contract_id,
                installment_id,
                reason: err.to_string(),
                timestamp: time.now(),
            });
            return Err(err);
        }

        info!(
            "saved installment {} of contract {} ({} fields)",
            installment_id,
            contract_id,
            patch.field_names().len()
        );
        self.events.emit(Event::InstallmentUpdated {
            contract_id,
            installment_id,
            fields: patch.field_names().into_iter().map(String::from).collect(),
            timestamp: time.now(),
        });

        self.reconcile(contract_id, time)
    }

    /// drop a pending edit and restore the row
    pub fn discard(&mut self, contract_id: ContractId, installment_id: InstallmentId) -> Result<()> {
        let pending = self
            .pending
            .remove(&installment_id)
            .ok_or(LedgerError::NoPendingEdit { id: installment_id })?;
        self.restore(contract_id, pending.snapshot);
        Ok(())
    }

    /// generate and persist a schedule after the contract's existing rows
    pub fn generate_schedule(
        &mut self,
        contract_id: ContractId,
        request: &ScheduleRequest,
        time: &SafeTimeProvider,
    ) -> Result<GeneratedSchedule> {
        let indices = self.cached(contract_id)?.sort_indices();

        let schedule = ScheduleGenerator::new(request.method)
            .with_additional_label(self.config.additional_label.clone())
            .generate(contract_id, request, &indices)?;

        self.store
            .insert_installments(contract_id, &schedule.installments)?;

        let update = ContractUpdate {
            opening_balance: schedule.opening_balance,
        };
        if let Err(err) = self.store.update_contract(contract_id, &update) {
            error!("failed to update opening balance of contract {contract_id}: {err}");
            // undo the inserted rows so the contract is not left half generated
            for installment in &schedule.installments {
                if let Err(undo) = self.store.delete_installment(installment.id) {
                    error!("failed to remove generated installment {}: {undo}", installment.id);
                }
            }
            self.reconcile(contract_id, time)?;
            return Err(err);
        }

        info!(
            "generated {} {} installments for contract {}",
            schedule.installments.len(),
            schedule.method,
            contract_id
        );
        self.events.emit(Event::ScheduleGenerated {
            contract_id,
            method: schedule.method,
            periods: schedule.installments.len() as u32,
            opening_balance: schedule.opening_balance,
            timestamp: time.now(),
        });

        self.reconcile(contract_id, time)?;
        Ok(schedule)
    }

    /// add a row after every existing row
    pub fn append_installment(
        &mut self,
        contract_id: ContractId,
        draft: InstallmentDraft,
        time: &SafeTimeProvider,
    ) -> Result<Installment> {
        let index = ordering::append_index(self.cached(contract_id)?.sort_indices());
        self.insert_at(contract_id, index, draft, time)
    }

    /// add a row directly after the row keyed `after`
    pub fn insert_after(
        &mut self,
        contract_id: ContractId,
        after: Decimal,
        draft: InstallmentDraft,
        time: &SafeTimeProvider,
    ) -> Result<Installment> {
        let index = ordering::insert_after_index(after, self.cached(contract_id)?.sort_indices())?;
        self.insert_at(contract_id, index, draft, time)
    }

    fn insert_at(
        &mut self,
        contract_id: ContractId,
        index: Decimal,
        draft: InstallmentDraft,
        time: &SafeTimeProvider,
    ) -> Result<Installment> {
        let daily_rate = self.cached(contract_id)?.daily_late_fee_rate;
        let mut installment = Installment::new(
            contract_id,
            index,
            ordering::label_for(index, &self.config.additional_label),
            draft.concept,
            draft.due_date,
            draft.capital,
            draft.interest,
        );
        let ctx = self.derivation_context(daily_rate, mora::today(time));
        installment.rederive(&ctx, &self.config.additional_label);

        let mut inserted = self
            .store
            .insert_installments(contract_id, std::slice::from_ref(&installment))?;
        let installment = inserted.pop().unwrap_or(installment);

        info!(
            "inserted installment {} at index {} in contract {}",
            installment.id, index, contract_id
        );
        self.events.emit(Event::InstallmentInserted {
            contract_id,
            installment_id: installment.id,
            sort_index: index,
            timestamp: time.now(),
        });

        self.reconcile(contract_id, time)?;
        Ok(installment)
    }

    pub fn delete_installment(
        &mut self,
        contract_id: ContractId,
        installment_id: InstallmentId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        self.store.delete_installment(installment_id)?;
        self.pending.remove(&installment_id);

        info!("deleted installment {installment_id} of contract {contract_id}");
        self.events.emit(Event::InstallmentDeleted {
            contract_id,
            installment_id,
            timestamp: time.now(),
        });

        self.reconcile(contract_id, time)
    }

    /// whole-table reset
    pub fn delete_all(&mut self, contract_id: ContractId, time: &SafeTimeProvider) -> Result<()> {
        let count = self.cached(contract_id)?.installments.len();
        self.store.delete_all_installments(contract_id)?;
        self.pending.retain(|_, p| p.contract_id != contract_id);

        info!("deleted {count} installments of contract {contract_id}");
        self.events.emit(Event::InstallmentsCleared {
            contract_id,
            count,
            timestamp: time.now(),
        });

        self.reconcile(contract_id, time)
    }

    /// compact sort keys back to 1..=n. refused while edits are pending
    pub fn renumber(&mut self, contract_id: ContractId, time: &SafeTimeProvider) -> Result<usize> {
        let pending = self.pending_edit_count(contract_id);
        if pending > 0 {
            return Err(LedgerError::PendingEdits { count: pending });
        }

        let mut rows = self.cached(contract_id)?.installments.clone();
        let changed = ordering::compact(&mut rows, &self.config.additional_label);
        if changed.is_empty() {
            return Ok(0);
        }

        let updates: Vec<(InstallmentId, InstallmentPatch)> = rows
            .iter()
            .filter(|r| changed.contains(&r.id))
            .map(|r| {
                let patch = InstallmentPatch {
                    sort_index: Some(r.sort_index),
                    label: Some(r.label.clone()),
                    ..InstallmentPatch::default()
                };
                (r.id, patch)
            })
            .collect();

        if let Err(err) = self.store.update_installments(&updates) {
            error!("renumbering contract {contract_id} failed: {err}");
            self.reconcile(contract_id, time)?;
            return Err(err);
        }

        info!("renumbered {} installments of contract {contract_id}", changed.len());
        self.events.emit(Event::InstallmentsRenumbered {
            contract_id,
            count: changed.len(),
            timestamp: time.now(),
        });

        self.reconcile(contract_id, time)?;
        Ok(changed.len())
    }

    /// running balances and totals from the cached rows
    pub fn ledger(&self, contract_id: ContractId) -> Result<LedgerView> {
        Ok(self.cached(contract_id)?.ledger())
    }

    /// fully derived report for the export sink
    pub fn report(&self, contract_id: ContractId, time: &SafeTimeProvider) -> Result<LedgerReport> {
        Ok(LedgerReport::build(self.cached(contract_id)?, time.now()))
    }

    fn cached(&self, contract_id: ContractId) -> Result<&Contract> {
        self.contracts
            .get(&contract_id)
            .ok_or(LedgerError::ContractNotFound { id: contract_id })
    }

    fn restore(&mut self, contract_id: ContractId, snapshot: Installment) {
        if let Some(row) = self
            .contracts
            .get_mut(&contract_id)
            .and_then(|c| c.installment_mut(snapshot.id))
        {
            warn!("rolling back installment {}", snapshot.id);
            *row = snapshot;
        }
    }

    fn derivation_context(&self, daily_rate: Rate, today: NaiveDate) -> DerivationContext<'_> {
        DerivationContext {
            daily_rate,
            today,
            late_fees: self.late_fees.as_ref(),
            paid_tolerance: self.config.paid_tolerance,
        }
    }
}
