//! Background polling for the NetPlay coordinator.
//!
//! The native core pushes some changes as callbacks but not all of them;
//! roster counts in particular only show up when asked. The
//! [`BackgroundPoller`] asks on two independent cadences while the session
//! is `Connected`:
//!
//! - **Roster refresh** (default 1000 ms): reads player count and list and
//!   reports them as a [`RosterReport`] for the coordinator to apply.
//! - **Message drain** (default 500 ms): calls `process_messages`, which
//!   makes the core raise any queued callbacks through its sink.
//!
//! # Integration
//!
//! Each cadence is a [`Cadence`] sitting in its own task's `tokio::select!`
//! loop next to the stop signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         () = stopped(&mut stop_rx, &mut status_rx) => break,
//!         _ = cadence.wait_for_cycle() => {}
//!     }
//!     // one native call, also raced against the stop signal
//! }
//! ```
//!
//! The poller never writes the session store. Roster reads go out as
//! reports; callbacks go through the native sink. Both land on the
//! coordinator's single mutation path.

mod cadence;
mod config;
mod poller;

pub use cadence::{Cadence, CadenceStats, CycleInfo};
pub use config::PollConfig;
pub use poller::{BackgroundPoller, RosterReport};
