//! Allocator Implementation

use std::sync::Arc;
use storage::{Machine, MachineStatus, Repository, StorageError};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors during machine allocation
#[derive(Debug, Error)]
pub enum AllocatorError {
    /// The machine was not available at bind time (race lost or offline)
    #[error("Machine is not available (current status: {current})")]
    MachineUnavailable { current: MachineStatus },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Isolation-aware machine allocator.
///
/// The bind is a check-and-set under the machine table lock: it succeeds
/// only if the machine status is still `available` at commit, so two
/// near-simultaneous `start()` calls on the same machine cannot both win.
#[derive(Clone)]
pub struct MachineAllocator {
    repository: Arc<Repository>,
}

impl MachineAllocator {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// Machines currently available for a session, in stable machine-number
    /// order. With `require_isolation`, only isolation-only machines qualify.
    pub fn find_available(&self, require_isolation: bool) -> Result<Vec<Machine>, AllocatorError> {
        let machines = self
            .repository
            .list_machines()?
            .into_iter()
            .filter(|m| m.status == MachineStatus::Available)
            .filter(|m| !require_isolation || m.isolation_only)
            .collect();
        Ok(machines)
    }

    /// Bind a machine exclusively to a session (status → in_use).
    pub fn bind(&self, session_id: Uuid, machine_id: Uuid) -> Result<Machine, AllocatorError> {
        self.repository.with_machine_mut(machine_id, |machine| {
            if machine.status != MachineStatus::Available {
                warn!(
                    "Bind rejected for session {}: machine {} is {}",
                    session_id, machine.machine_number, machine.status
                );
                return Err(AllocatorError::MachineUnavailable {
                    current: machine.status,
                });
            }
            machine.status = MachineStatus::InUse;
            info!(
                "Machine {} bound to session {}",
                machine.machine_number, session_id
            );
            Ok(machine.clone())
        })
    }

    /// Release a machine binding. The machine returns to `available` unless
    /// the external maintenance flag was set while it was in use.
    pub fn release(&self, machine_id: Uuid) -> Result<Machine, AllocatorError> {
        self.repository.with_machine_mut(machine_id, |machine| {
            machine.status = if machine.maintenance_pending {
                debug!(
                    "Machine {} released into maintenance",
                    machine.machine_number
                );
                MachineStatus::Maintenance
            } else {
                debug!("Machine {} released", machine.machine_number);
                MachineStatus::Available
            };
            Ok::<Machine, AllocatorError>(machine.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(number: &str, status: MachineStatus, isolation_only: bool) -> Machine {
        Machine {
            id: Uuid::new_v4(),
            machine_number: number.to_string(),
            status,
            isolation_only,
            maintenance_pending: false,
        }
    }

    fn setup() -> (Arc<Repository>, MachineAllocator) {
        let repo = Arc::new(Repository::new());
        let allocator = MachineAllocator::new(Arc::clone(&repo));
        (repo, allocator)
    }

    #[test]
    fn test_find_available_filters_and_orders() {
        let (repo, allocator) = setup();
        repo.insert_machine(machine("M-02", MachineStatus::Available, false)).unwrap();
        repo.insert_machine(machine("M-01", MachineStatus::Available, true)).unwrap();
        repo.insert_machine(machine("M-03", MachineStatus::InUse, false)).unwrap();
        repo.insert_machine(machine("M-04", MachineStatus::Maintenance, true)).unwrap();

        let all: Vec<String> = allocator
            .find_available(false)
            .unwrap()
            .into_iter()
            .map(|m| m.machine_number)
            .collect();
        assert_eq!(all, ["M-01", "M-02"]);

        let isolation: Vec<String> = allocator
            .find_available(true)
            .unwrap()
            .into_iter()
            .map(|m| m.machine_number)
            .collect();
        assert_eq!(isolation, ["M-01"]);
    }

    #[test]
    fn test_bind_takes_machine_exclusively() {
        let (repo, allocator) = setup();
        let m = machine("M-01", MachineStatus::Available, false);
        let machine_id = m.id;
        repo.insert_machine(m).unwrap();

        let bound = allocator.bind(Uuid::new_v4(), machine_id).unwrap();
        assert_eq!(bound.status, MachineStatus::InUse);

        // Second bind loses the race
        let err = allocator.bind(Uuid::new_v4(), machine_id).unwrap_err();
        assert!(matches!(
            err,
            AllocatorError::MachineUnavailable {
                current: MachineStatus::InUse
            }
        ));
    }

    #[test]
    fn test_bind_unknown_machine() {
        let (_repo, allocator) = setup();
        let err = allocator.bind(Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AllocatorError::Storage(StorageError::NotFound)));
    }

    #[test]
    fn test_release_returns_to_available() {
        let (repo, allocator) = setup();
        let m = machine("M-01", MachineStatus::InUse, false);
        let machine_id = m.id;
        repo.insert_machine(m).unwrap();

        let released = allocator.release(machine_id).unwrap();
        assert_eq!(released.status, MachineStatus::Available);
    }

    #[test]
    fn test_release_honors_maintenance_flag() {
        let (repo, allocator) = setup();
        let mut m = machine("M-01", MachineStatus::InUse, false);
        m.maintenance_pending = true;
        let machine_id = m.id;
        repo.insert_machine(m).unwrap();

        let released = allocator.release(machine_id).unwrap();
        assert_eq!(released.status, MachineStatus::Maintenance);
    }
}
