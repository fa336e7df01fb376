pub mod add_signer;
pub mod delete_signer;
pub mod join_group;
pub mod leave_group;
pub mod list_signers;
pub mod update_signer;

pub use add_signer::AddSignerUseCase;
pub use delete_signer::DeleteSignerUseCase;
pub use join_group::SignerJoinGroupUseCase;
pub use leave_group::SignerLeaveGroupUseCase;
pub use list_signers::ListSignersUseCase;
pub use update_signer::UpdateSignerUseCase;
