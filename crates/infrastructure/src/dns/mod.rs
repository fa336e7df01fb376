pub mod client;
pub mod ddns_updater;
pub mod desec_updater;
pub mod presentation;
pub mod records;

pub use client::HickoryDnsLookup;
pub use ddns_updater::DdnsUpdater;
pub use desec_updater::DesecApiUpdater;
