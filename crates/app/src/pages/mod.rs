//! Screen view models.
//!
//! Each page is bound to the [`MountToken`] it was opened under. Loads and
//! writes check the token before issuing a request and again before applying
//! the result, so nothing started for an old mount or an old identity lands
//! on the current one.

pub mod appointments;
pub mod billing;
pub mod dashboard;
pub mod inventory;
pub mod login;
pub mod patients;
pub mod reports;
pub mod settings;
pub mod shell;
pub mod users;

use std::future::Future;

use dentalcare_infra::DataRequestError;

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

pub use appointments::AppointmentsPage;
pub use billing::BillingPage;
pub use dashboard::DashboardPage;
pub use inventory::InventoryPage;
pub use login::LoginPage;
pub use patients::PatientsPage;
pub use reports::ReportsPage;
pub use settings::{ClinicSettings, SettingsPage};
pub use shell::{Shell, UserBadge};
pub use users::UsersPage;

fn inactive() -> DataRequestError {
    DataRequestError::Forbidden("screen is no longer active".into())
}

/// Fail unless `mount` is still the screen shown for the current identity.
pub(crate) fn ensure_mounted(ctx: &AppContext, mount: &MountToken) -> Result<(), DataRequestError> {
    if ctx.is_current(mount) { Ok(()) } else { Err(inactive()) }
}

/// Run `fetch` as one load of `slot`.
pub(crate) async fn load_into<T, F>(
    ctx: &AppContext,
    mount: &MountToken,
    slot: &ScreenSlot<T>,
    fetch: F,
) -> ScreenState<T>
where
    T: Clone,
    F: Future<Output = Result<T, DataRequestError>>,
{
    let ticket = slot.begin();
    if let Err(e) = ensure_mounted(ctx, mount) {
        slot.settle(ticket, true, Err::<T, _>(e));
        return slot.state();
    }
    let result = fetch.await;
    slot.settle(ticket, ctx.is_current(mount), result);
    slot.state()
}
