use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use log::debug;

use crate::contract::{Contract, ContractUpdate};
use crate::errors::{LedgerError, Result};
use crate::installment::{Installment, InstallmentPatch};
use crate::types::{ContractId, InstallmentId};

/// persistence collaborator for contracts and their installments
pub trait InstallmentStore {
    /// insert all records or none
    fn insert_installments(
        &self,
        contract_id: ContractId,
        records: &[Installment],
    ) -> Result<Vec<Installment>>;

    fn update_installment(&self, id: InstallmentId, patch: &InstallmentPatch) -> Result<()>;

    /// apply every patch or none
    fn update_installments(&self, updates: &[(InstallmentId, InstallmentPatch)]) -> Result<()>;

    fn delete_installment(&self, id: InstallmentId) -> Result<()>;

    /// delete every installment of the contract or none
    fn delete_all_installments(&self, contract_id: ContractId) -> Result<()>;

    fn update_contract(&self, contract_id: ContractId, update: &ContractUpdate) -> Result<()>;

    /// contract with nested installments
    fn load_contract(&self, contract_id: ContractId) -> Result<Contract>;
}

/// in-process store keyed by contract id
#[derive(Debug, Default)]
pub struct InMemoryStore {
    contracts: RwLock<HashMap<ContractId, Contract>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a contract (installments included) and return its id
    pub fn create_contract(&self, contract: Contract) -> Result<ContractId> {
        let id = contract.id;
        self.write("create_contract")?.insert(id, contract);
        Ok(id)
    }

    fn read(
        &self,
        operation: &str,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ContractId, Contract>>> {
        self.contracts
            .read()
            .map_err(|e| LedgerError::store(operation, e.to_string()))
    }

    fn write(
        &self,
        operation: &str,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ContractId, Contract>>> {
        self.contracts
            .write()
            .map_err(|e| LedgerError::store(operation, e.to_string()))
    }
}

impl InstallmentStore for InMemoryStore {
    fn insert_installments(
        &self,
        contract_id: ContractId,
        records: &[Installment],
    ) -> Result<Vec<Installment>> {
        let mut contracts = self.write("insert_installments")?;
        let contract = contracts
            .get_mut(&contract_id)
            .ok_or(LedgerError::ContractNotFound { id: contract_id })?;

        // validate the whole batch before touching the contract
        let mut indices: HashSet<_> = contract.installments.iter().map(|i| i.sort_index.normalize()).collect();
        let mut ids: HashSet<_> = contract.installments.iter().map(|i| i.id).collect();
        for record in records {
            if !indices.insert(record.sort_index.normalize()) {
                return Err(LedgerError::DuplicateIndex {
                    index: record.sort_index,
                });
            }
            if !ids.insert(record.id) {
                return Err(LedgerError::store(
                    "insert_installments",
                    format!("duplicate installment id {}", record.id),
                ));
            }
        }

        let inserted: Vec<Installment> = records
            .iter()
            .cloned()
            .map(|mut record| {
                record.contract_id = contract_id;
                record
            })
            .collect();
        contract.installments.extend(inserted.iter().cloned());
        debug!("inserted {} installments into contract {}", inserted.len(), contract_id);
        Ok(inserted)
    }

    fn update_installment(&self, id: InstallmentId, patch: &InstallmentPatch) -> Result<()> {
        let mut contracts = self.write("update_installment")?;
        for contract in contracts.values_mut() {
            if let Some(new_index) = patch.sort_index {
                let taken = contract
                    .installments
                    .iter()
                    .any(|i| i.id != id && i.sort_index == new_index);
                if taken && contract.installment(id).is_some() {
                    return Err(LedgerError::DuplicateIndex { index: new_index });
                }
            }
            if let Some(installment) = contract.installment_mut(id) {
                patch.apply_to(installment);
                return Ok(());
            }
        }
        Err(LedgerError::InstallmentNotFound { id })
    }

    fn update_installments(&self, updates: &[(InstallmentId, InstallmentPatch)]) -> Result<()> {
        let mut contracts = self.write("update_installments")?;

        // apply to copies of the touched contracts, keep them only if every key stays unique
        let mut staged: HashMap<ContractId, Contract> = HashMap::new();
        for (id, patch) in updates {
            let owner = contracts
                .values()
                .find(|c| c.installment(*id).is_some())
                .map(|c| c.id)
                .ok_or(LedgerError::InstallmentNotFound { id: *id })?;
            if !staged.contains_key(&owner) {
                let copy = contracts
                    .get(&owner)
                    .cloned()
                    .ok_or(LedgerError::ContractNotFound { id: owner })?;
                staged.insert(owner, copy);
            }
            if let Some(installment) = staged.get_mut(&owner).and_then(|c| c.installment_mut(*id)) {
                patch.apply_to(installment);
            }
        }

        for contract in staged.values() {
            let mut seen = HashSet::new();
            for installment in &contract.installments {
                if !seen.insert(installment.sort_index.normalize()) {
                    return Err(LedgerError::DuplicateIndex {
                        index: installment.sort_index,
                    });
                }
            }
        }

        debug!("updated {} installments in one batch", updates.len());
        contracts.extend(staged);
        Ok(())
    }

    fn delete_installment(&self, id: InstallmentId) -> Result<()> {
        let mut contracts = self.write("delete_installment")?;
        for contract in contracts.values_mut() {
            if let Some(position) = contract.installments.iter().position(|i| i.id == id) {
                contract.installments.remove(position);
                return Ok(());
            }
        }
        Err(LedgerError::InstallmentNotFound { id })
    }

    fn delete_all_installments(&self, contract_id: ContractId) -> Result<()> {
        let mut contracts = self.write("delete_all_installments")?;
        let contract = contracts
            .get_mut(&contract_id)
            .ok_or(LedgerError::ContractNotFound { id: contract_id })?;
        contract.installments.clear();
        Ok(())
    }

    fn update_contract(&self, contract_id: ContractId, update: &ContractUpdate) -> Result<()> {
        let mut contracts = self.write("update_contract")?;
        let contract = contracts
            .get_mut(&contract_id)
            .ok_or(LedgerError::ContractNotFound { id: contract_id })?;
        contract.opening_balance = update.opening_balance;
        Ok(())
    }

    fn load_contract(&self, contract_id: ContractId) -> Result<Contract> {
        self.read("load_contract")?
            .get(&contract_id)
            .cloned()
            .ok_or(LedgerError::ContractNotFound { id: contract_id })
    }
}
