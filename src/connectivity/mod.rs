pub mod monitor;
pub mod reachability;

pub use monitor::ConnectivityMonitor;
pub use reachability::{check_reachable, watch_reachability};
