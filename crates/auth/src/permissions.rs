use serde::{Deserialize, Serialize};

use crate::Role;

/// Capability checked by screens before they issue a request or show a control.
///
/// The remote service enforces its own row-level policies; these checks only
/// decide what the client offers. They are never a substitute for the server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read patient, appointment and billing records.
    ViewClinical,
    ManagePatients,
    ManageAppointments,
    ManageBilling,
    ManageInventory,
    /// Delete rows from any clinic collection.
    DeleteRecords,
    ViewReports,
    ManageUsers,
    /// Edit the clinic ("cabinet") settings row.
    ManageSettings,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::ViewClinical,
        Permission::ManagePatients,
        Permission::ManageAppointments,
        Permission::ManageBilling,
        Permission::ManageInventory,
        Permission::DeleteRecords,
        Permission::ViewReports,
        Permission::ManageUsers,
        Permission::ManageSettings,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Permission::ViewClinical => "clinical.read",
            Permission::ManagePatients => "patients.write",
            Permission::ManageAppointments => "appointments.write",
            Permission::ManageBilling => "billing.write",
            Permission::ManageInventory => "inventory.write",
            Permission::DeleteRecords => "records.delete",
            Permission::ViewReports => "reports.read",
            Permission::ManageUsers => "admin.users.write",
            Permission::ManageSettings => "admin.settings.write",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Permissions granted by this role.
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => &Permission::ALL,
            Role::Dentist => &[
                ViewClinical,
                ManagePatients,
                ManageAppointments,
                ManageBilling,
                ManageInventory,
                ViewReports,
            ],
            Role::Assistant => &[
                ViewClinical,
                ManagePatients,
                ManageAppointments,
                ManageInventory,
                ViewReports,
            ],
        }
    }

    pub fn grants(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}
