use serde::{Deserialize, Serialize};

/// A set of signers jointly serving one or more zones.
///
/// The group is locked while any member zone runs a group-scoped process
/// (add-signer or remove-signer). `pending_addition` and `pending_removal`
/// are applied when the last zone leaves `current_process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerGroup {
    pub name: String,
    pub signers: Vec<String>,
    pub locked: bool,
    pub current_process: String,
    pub pending_addition: Option<String>,
    pub pending_removal: Option<String>,
    pub num_zones: u32,
    pub num_process_zones: u32,
}

impl SignerGroup {
    pub fn new(name: String) -> Self {
        Self {
            name,
            signers: Vec::new(),
            locked: false,
            current_process: String::new(),
            pending_addition: None,
            pending_removal: None,
            num_zones: 0,
            num_process_zones: 0,
        }
    }

    pub fn contains(&self, signer: &str) -> bool {
        self.signers.iter().any(|s| s == signer)
    }

    /// Members the group will have once the pending change is applied.
    pub fn target_signers(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .signers
            .iter()
            .filter(|s| Some(s.as_str()) != self.pending_removal.as_deref())
            .cloned()
            .collect();
        if let Some(add) = &self.pending_addition {
            if !out.iter().any(|s| s == add) {
                out.push(add.clone());
            }
        }
        out
    }
}
