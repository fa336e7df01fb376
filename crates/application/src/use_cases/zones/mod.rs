pub mod add_zone;
pub mod delete_zone;
pub mod join_group;
pub mod leave_group;
pub mod list_zones;
pub mod set_meta;
pub mod step_fsm;

pub use add_zone::AddZoneUseCase;
pub use delete_zone::DeleteZoneUseCase;
pub use join_group::ZoneJoinGroupUseCase;
pub use leave_group::ZoneLeaveGroupUseCase;
pub use list_zones::ListZonesUseCase;
pub use set_meta::SetZoneMetaUseCase;
pub use step_fsm::StepFsmUseCase;
