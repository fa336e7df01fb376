pub mod groups;
pub mod signers;
pub mod zones;

pub use groups::{AddGroupUseCase, DeleteGroupUseCase, ListGroupsUseCase};
pub use signers::{
    AddSignerUseCase, DeleteSignerUseCase, ListSignersUseCase, SignerJoinGroupUseCase,
    SignerLeaveGroupUseCase, UpdateSignerUseCase,
};
pub use zones::{
    AddZoneUseCase, DeleteZoneUseCase, ListZonesUseCase, SetZoneMetaUseCase, StepFsmUseCase,
    ZoneJoinGroupUseCase, ZoneLeaveGroupUseCase,
};
