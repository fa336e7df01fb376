pub mod add_group;
pub mod delete_group;
pub mod list_groups;

pub use add_group::AddGroupUseCase;
pub use delete_group::DeleteGroupUseCase;
pub use list_groups::ListGroupsUseCase;
